// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use mp3cat::merge::{Event, Options, merge_files};
use std::ffi::OsString;

const USAGE: &str = "* Usage: mp3-cat [-f] [-t] [-v] <in 1.mp3> [in 2.mp3] ... <out.mp3>
  -f  overwrite output file if it exists
  -t  copy ID3v2 tag from first input file
  -v  display each step of the merge";

fn main() {
    let mut options = Options::default();
    let mut verbose = false;
    let mut paths: Vec<OsString> = Vec::new();

    for arg in std::env::args_os().skip(1) {
        match arg.to_str() {
            Some("-f") => options = options.overwrite(true),
            Some("-t") => options = options.tag_source(Some(0)),
            Some("-v") => verbose = true,
            Some("-h" | "--help") => {
                eprintln!("{USAGE}");
                return;
            }
            _ => paths.push(arg),
        }
    }

    match paths.as_slice() {
        [inputs @ .., output] if !inputs.is_empty() => {
            match merge_files(inputs, output, &options, |event| {
                if verbose {
                    display_event(event)
                }
            }) {
                Ok(stats) => {
                    if verbose {
                        eprintln!(
                            "* {} frames, {} bytes written to {}",
                            stats.frames,
                            stats.bytes,
                            output.display()
                        );
                    }
                }
                Err(err) => {
                    eprintln!("* Error: {err}");
                    std::process::exit(1);
                }
            }
        }
        _ => eprintln!("{USAGE}"),
    }
}

fn display_event(event: Event<'_>) {
    match event {
        Event::Finished(_) => { /* summarized afterward */ }
        Event::Input(_) => eprintln!("{event}"),
        event => eprintln!("  {event}"),
    }
}
