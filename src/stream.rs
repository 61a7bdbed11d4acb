// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For splitting raw MPEG audio streams into frames and tags
//!
//! Real-world MP3 files often contain ID3 tags,
//! padding or plain garbage between their frames.
//! The readers in this module skip over anything
//! they don't recognize one byte at a time until
//! they find the next tag or valid frame header.

use crate::Error;
use crate::frame::{Frame, FrameHeader};
use crate::tag::{Id3v1Tag, Id3v2Header, Id3v2Tag};
use std::io::Read;

/// An object recognized in an MPEG audio stream
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Object {
    /// An MPEG audio frame
    Frame(Frame),
    /// An ID3v1 tag
    Id3v1(Id3v1Tag),
    /// An ID3v2 tag
    Id3v2(Id3v2Tag),
}

/// An iterator over the objects in an MPEG audio stream
///
/// Unrecognized bytes are skipped.
/// The stream ends once fewer than 4 bytes remain,
/// or when an object is cut short by the end of the stream,
/// in which case the incomplete object is dropped.
pub struct ObjectReader<R> {
    reader: R,
    skipped: u64,
    failed: bool,
}

impl<R: Read> ObjectReader<R> {
    /// Creates an iterator over something that implements `Read`.
    /// Because this performs many small reads,
    /// performance is greatly improved by buffering reads
    /// when reading from a raw `File`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            skipped: 0,
            failed: false,
        }
    }

    /// Total number of unrecognized bytes skipped so far
    #[inline]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Reads the next object from the stream
    ///
    /// Returns `Ok(None)` at the end of the stream.
    ///
    /// # Errors
    ///
    /// Passes along any I/O error from the underlying stream
    /// other than reaching its end.
    pub fn read_object(&mut self) -> Result<Option<Object>, Error> {
        let mut window = [0; 4];
        let mut run = 0;

        if !fill(self.reader.by_ref(), &mut window)? {
            return Ok(None);
        }

        loop {
            // tag identifiers are checked before the frame sync
            // so a tag is never mistaken for a frame
            match &window {
                [b'T', b'A', b'G', _] => {
                    self.resynced(run);
                    return Ok(Id3v1Tag::read_body(window, self.reader.by_ref())?
                        .map(Object::Id3v1));
                }
                [b'I', b'D', b'3', _] => {
                    self.resynced(run);
                    return self.read_id3v2(window);
                }
                [0xFF, b, _, _] if b & 0xE0 == 0xE0 => {
                    if let Ok(header) = FrameHeader::parse(window) {
                        self.resynced(run);
                        return Ok(Frame::read_body(window, header, self.reader.by_ref())?
                            .map(Object::Frame));
                    }
                }
                _ => { /* not recognized */ }
            }

            // shift window forward by one byte and try again
            run += 1;
            window.rotate_left(1);
            if !fill(self.reader.by_ref(), &mut window[3..])? {
                self.resynced(run);
                return Ok(None);
            }
        }
    }

    fn read_id3v2(&mut self, start: [u8; 4]) -> Result<Option<Object>, Error> {
        let mut header = [0; Id3v2Header::SIZE];
        header[0..4].copy_from_slice(&start);

        if !fill(self.reader.by_ref(), &mut header[4..])? {
            return Ok(None);
        }

        Ok(Id3v2Tag::read_body(header, self.reader.by_ref())?.map(Object::Id3v2))
    }

    fn resynced(&mut self, run: u64) {
        if run > 0 {
            log::trace!("sync error: skipped {run} bytes");
            self.skipped += run;
        }
    }
}

impl<R: Read> Iterator for ObjectReader<R> {
    type Item = Result<Object, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            // once we hit an error, stop any further reads
            None
        } else {
            self.read_object()
                .inspect_err(|_| {
                    self.failed = true;
                })
                .transpose()
        }
    }
}

/// Returns iterator of objects from the given reader
///
/// Because this may perform many small reads,
/// using a buffered reader may greatly improve performance
/// when reading from a raw `File`.
///
/// # Example
/// ```
/// use mp3cat::stream::{Object, read_objects};
///
/// let mut data = b"garbage".to_vec();
/// data.extend(b"ID3\x03\x00\x00\x00\x00\x00\x02ab");
///
/// let objects = read_objects(data.as_slice())
///     .collect::<Result<Vec<_>, _>>()
///     .unwrap();
///
/// assert_eq!(objects.len(), 1);
/// assert!(matches!(&objects[0], Object::Id3v2(tag) if tag.len() == 12));
/// ```
pub fn read_objects<R: Read>(r: R) -> ObjectReader<R> {
    ObjectReader::new(r)
}

/// An iterator over the audio frames in an MPEG audio stream
///
/// ID3 tags are discarded along with any unrecognized bytes.
pub struct FrameReader<R> {
    objects: ObjectReader<R>,
}

impl<R: Read> FrameReader<R> {
    /// Creates an iterator over something that implements `Read`.
    pub fn new(reader: R) -> Self {
        Self {
            objects: ObjectReader::new(reader),
        }
    }

    /// Reads the next audio frame from the stream
    ///
    /// Returns `Ok(None)` at the end of the stream.
    ///
    /// # Errors
    ///
    /// Passes along any I/O error from the underlying stream
    /// other than reaching its end.
    pub fn read_frame(&mut self) -> Result<Option<Frame>, Error> {
        loop {
            match self.objects.read_object()? {
                Some(Object::Frame(frame)) => break Ok(Some(frame)),
                Some(Object::Id3v1(_)) => log::debug!("skipping ID3v1 tag"),
                Some(Object::Id3v2(tag)) => log::debug!("skipping {} byte ID3v2 tag", tag.len()),
                None => break Ok(None),
            }
        }
    }

    /// Total number of unrecognized bytes skipped so far
    #[inline]
    pub fn skipped(&self) -> u64 {
        self.objects.skipped()
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Frame, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.objects.failed {
            None
        } else {
            self.read_frame()
                .inspect_err(|_| {
                    self.objects.failed = true;
                })
                .transpose()
        }
    }
}

/// Returns iterator of audio frames from the given reader
///
/// Because this may perform many small reads,
/// using a buffered reader may greatly improve performance
/// when reading from a raw `File`.
pub fn read_frames<R: Read>(r: R) -> FrameReader<R> {
    FrameReader::new(r)
}

/// Attempts to fill buffer completely from reader
///
/// Returns `Ok(false)` if the stream ends first.
pub(crate) fn fill<R: Read>(mut reader: R, buf: &mut [u8]) -> std::io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(err),
    }
}
