// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A library for concatenating MP3 files without re-encoding
//!
//! MPEG audio streams are split into their individual frames,
//! which are copied verbatim from each input to the output.
//! ID3 tags and garbage data between frames are discarded.
//!
//! If the inputs don't all share a single bit rate,
//! an Xing header carrying the true frame and byte counts
//! is prepended to the output so that players can
//! seek through it correctly.
//! An ID3v2 tag may also be copied from one of the inputs.
//!
//! # Example
//!
//! ```no_run
//! use mp3cat::merge::{Options, merge_files};
//!
//! let stats = merge_files(
//!     &["one.mp3", "two.mp3"],
//!     "output.mp3",
//!     &Options::default().tag_source(Some(0)),
//!     |_event| {},
//! ).unwrap();
//!
//! println!("{} frames written", stats.frames);
//! ```

pub mod finalize;
pub mod frame;
pub mod merge;
pub mod stream;
pub mod tag;
pub mod vbr;

use std::path::{Path, PathBuf};

/// A possible error when handling MPEG audio streams
#[derive(Debug)]
pub enum Error {
    /// A general I/O error from the underlying stream
    Io(std::io::Error),
    /// An I/O error from a particular file
    File(PathBuf, std::io::Error),
    /// An I/O error writing concatenated output
    Write(std::io::Error),
    /// Failure renaming a rewritten file over the original
    ///
    /// The original file may no longer match what was merged.
    Rename(PathBuf, PathBuf, std::io::Error),
    /// Frame header lacks a frame sync code
    InvalidSyncCode,
    /// Frame header's MPEG version is reserved
    ReservedVersion,
    /// Frame header's layer is reserved
    ReservedLayer,
    /// Frame header's bit rate index is free or invalid
    InvalidBitRate,
    /// Frame header's sample rate index is reserved
    InvalidSampleRate,
    /// Frame header's emphasis is reserved
    ReservedEmphasis,
    /// Frame data doesn't match the length its header indicates
    InvalidFrameLength,
    /// ID3v2 tag header lacks its "ID3" identifier
    MissingId3Tag,
    /// VBR header lacks its "Xing" or "Info" identifier
    MissingXingTag,
    /// ID3v2 tag source index falls outside the list of inputs
    InvalidSelection(usize),
    /// The output file is also one of the inputs
    OutputCollision(PathBuf),
    /// The output file exists and may not be overwritten
    OutputExists(PathBuf),
    /// Merged output contains no frames to use as a template
    MissingTemplateFrame,
    /// Template frame is too small to hold an Xing header
    TemplateTooSmall,
    /// Merged output has too many frames or bytes for an Xing header
    ExcessiveStreamSize,
}

impl Error {
    /// Attaches a file path to a bare I/O error
    ///
    /// Other errors are returned unchanged.
    pub fn at<P: AsRef<Path>>(self, path: P) -> Self {
        match self {
            Self::Io(err) => Self::File(path.as_ref().to_path_buf(), err),
            err => err,
        }
    }

    /// Whether the error comes from a malformed stream header
    /// rather than a failed operation
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::InvalidSyncCode
                | Self::ReservedVersion
                | Self::ReservedLayer
                | Self::InvalidBitRate
                | Self::InvalidSampleRate
                | Self::ReservedEmphasis
                | Self::InvalidFrameLength
                | Self::MissingId3Tag
                | Self::MissingXingTag
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) | Self::File(_, e) | Self::Write(e) | Self::Rename(_, _, e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Io(e) => e.fmt(f),
            Self::File(path, e) => write!(f, "{}: {e}", path.display()),
            Self::Write(e) => write!(f, "write error: {e}"),
            Self::Rename(from, to, e) => write!(
                f,
                "unable to rename {} to {}: {e}",
                from.display(),
                to.display()
            ),
            Self::InvalidSyncCode => "invalid frame sync code".fmt(f),
            Self::ReservedVersion => "reserved MPEG version".fmt(f),
            Self::ReservedLayer => "reserved MPEG layer".fmt(f),
            Self::InvalidBitRate => "invalid bit rate index".fmt(f),
            Self::InvalidSampleRate => "reserved sample rate index".fmt(f),
            Self::ReservedEmphasis => "reserved emphasis".fmt(f),
            Self::InvalidFrameLength => "frame data length mismatch".fmt(f),
            Self::MissingId3Tag => "missing ID3 tag".fmt(f),
            Self::MissingXingTag => "missing Xing tag".fmt(f),
            Self::InvalidSelection(index) => {
                write!(f, "tag source index {index} out of range")
            }
            Self::OutputCollision(path) => write!(
                f,
                "the list of input files includes the output file {}",
                path.display()
            ),
            Self::OutputExists(path) => {
                write!(f, "the file {} already exists", path.display())
            }
            Self::MissingTemplateFrame => "no frames found in merged output".fmt(f),
            Self::TemplateTooSmall => "template frame too small for Xing header".fmt(f),
            Self::ExcessiveStreamSize => "merged stream too large for Xing header".fmt(f),
        }
    }
}
