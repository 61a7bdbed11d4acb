// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For prepending headers to a finished output file
//!
//! Each operation rewrites the whole file to a temporary
//! sibling named `<file>.mp3cat.tmp` with the new data first,
//! then renames that over the original.

use crate::Error;
use crate::merge::MergeStats;
use crate::stream::read_frames;
use crate::tag::{Id3v2Tag, read_id3v2_tag};
use crate::vbr::XingHeader;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Prepends an Xing header frame with the given totals to a file
///
/// The file's first frame large enough to hold the header
/// is used as the header frame's template.
/// Returns the header that was written.
///
/// # Errors
///
/// Returns `Error::MissingTemplateFrame` if the file has no frames,
/// `Error::TemplateTooSmall` if none of its frames can hold the header,
/// or any I/O error from reading or rewriting the file.
pub fn prepend_xing_header<P: AsRef<Path>>(
    path: P,
    stats: &MergeStats,
) -> Result<XingHeader, Error> {
    let path = path.as_ref();
    let xing = XingHeader::new(stats.frames, stats.bytes);

    let mut frames = read_frames(BufReader::new(
        File::open(path).map_err(|e| Error::File(path.into(), e))?,
    ));
    let mut result = Err(Error::MissingTemplateFrame);

    while let Some(template) = frames.read_frame().map_err(|err| err.at(path))? {
        result = xing.build_frame(&template);
        match result {
            Err(Error::TemplateTooSmall) => {
                log::debug!("{} byte frame too small for Xing header", template.len());
            }
            _ => break,
        }
    }
    drop(frames);

    prepend(path, result?.as_bytes())?;

    log::info!(
        "added Xing header with {} frames and {} bytes",
        stats.frames,
        stats.bytes
    );

    Ok(xing)
}

/// Prepends a copy of the source file's ID3v2 tag to a file
///
/// Returns the tag that was copied, or `None`
/// if the source has no ID3v2 tag, in which case
/// the file is left untouched.
///
/// # Errors
///
/// Returns any I/O error from reading the source
/// or from reading or rewriting the file.
pub fn prepend_id3v2_tag<P, S>(path: P, source: S) -> Result<Option<Id3v2Tag>, Error>
where
    P: AsRef<Path>,
    S: AsRef<Path>,
{
    let source = source.as_ref();

    match read_id3v2_tag(source)? {
        Some(tag) => {
            prepend(path.as_ref(), tag.as_bytes())?;
            log::info!(
                "added {} byte ID3v2 tag from {}",
                tag.len(),
                source.display()
            );
            Ok(Some(tag))
        }
        None => {
            log::info!("no ID3v2 tag found in {}", source.display());
            Ok(None)
        }
    }
}

/// Rewrites file with the given bytes ahead of its current contents
fn prepend(path: &Path, prefix: &[u8]) -> Result<(), Error> {
    let temp = temp_path(path);

    let rewritten = File::open(path)
        .map_err(|e| Error::File(path.into(), e))
        .and_then(|original| {
            let mut w = File::create(&temp)
                .map(BufWriter::new)
                .map_err(|e| Error::File(temp.clone(), e))?;

            w.write_all(prefix)
                .and_then(|()| std::io::copy(&mut BufReader::new(original), &mut w))
                .and_then(|_| w.flush())
                .map_err(|e| Error::File(temp.clone(), e))
        });

    match rewritten {
        Ok(()) => replace(temp, path),
        Err(err) => {
            // the original is still intact
            if let Err(cleanup) = std::fs::remove_file(&temp) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("unable to remove {}: {cleanup}", temp.display());
                }
            }
            Err(err)
        }
    }
}

/// Renames rewritten file over the original
fn replace(temp: PathBuf, path: &Path) -> Result<(), Error> {
    std::fs::rename(&temp, path).map_err(|e| Error::Rename(temp, path.into(), e))
}

/// Sibling of the given path used while rewriting it
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".mp3cat.tmp");
    path.with_file_name(name)
}
