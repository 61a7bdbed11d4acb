// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For concatenating MPEG audio streams

use crate::Error;
use crate::frame::Frame;
use crate::stream::{Object, ObjectReader};
use crate::vbr::{VbrHeader, XingHeader};
use std::io::{Read, Write};
use std::path::Path;

/// Running totals of a merge
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MergeStats {
    /// Audio frames written
    pub frames: u32,
    /// Audio bytes written
    pub bytes: u32,
    /// Inputs read to completion
    pub files: usize,
    /// Bit rate of the first frame written, in bits per second
    pub first_bit_rate: Option<u32>,
    /// Whether frames with differing bit rates have been written
    pub vbr: bool,
}

/// Something observable that happens during a merge
#[derive(Debug)]
pub enum Event<'p> {
    /// Started reading an input file
    Input(&'p Path),
    /// Discarded an ID3v1 tag from the current input
    SkippedId3v1,
    /// Discarded an ID3v2 tag of the given total size from the current input
    SkippedId3v2(usize),
    /// Discarded a VBR header frame at the start of the current input
    SkippedVbrHeader(VbrHeader),
    /// Discarded unrecognized bytes from the current input
    SkippedBytes(u64),
    /// Found a frame whose bit rate differs from the first frame's
    VariableBitRate {
        /// The first frame's bit rate
        first: u32,
        /// The differing frame's bit rate
        found: u32,
    },
    /// Finished reading the current input
    InputFinished {
        /// Audio frames written from the input
        frames: u32,
    },
    /// Prepended an Xing header to the output
    XingHeaderAdded(XingHeader),
    /// Prepended an ID3v2 tag to the output
    TagTransplanted {
        /// The file the tag was copied from
        source: &'p Path,
        /// The tag's total size in bytes
        size: usize,
    },
    /// Completed the whole merge
    Finished(&'p MergeStats),
}

impl std::fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Input(path) => write!(f, "+ {}", path.display()),
            Self::SkippedId3v1 => "skipping ID3v1 tag".fmt(f),
            Self::SkippedId3v2(size) => write!(f, "skipping {size} byte ID3v2 tag"),
            Self::SkippedVbrHeader(vbr) => write!(f, "skipping {vbr} header frame"),
            Self::SkippedBytes(bytes) => write!(f, "skipped {bytes} bytes of unrecognized data"),
            Self::VariableBitRate { first, found } => write!(
                f,
                "multiple bit rates detected ({} and {} kbps)",
                first / 1000,
                found / 1000
            ),
            Self::InputFinished { frames } => write!(f, "{frames} frames appended"),
            Self::XingHeaderAdded(XingHeader { frames, bytes }) => write!(
                f,
                "added Xing header ({} frames, {} bytes)",
                frames.unwrap_or(0),
                bytes.unwrap_or(0)
            ),
            Self::TagTransplanted { source, size } => {
                write!(f, "added {size} byte ID3v2 tag from {}", source.display())
            }
            Self::Finished(stats) => write!(f, "{} files merged", stats.files),
        }
    }
}

/// Appends the audio frames of any number of streams to a writer
///
/// Frames are written verbatim.
/// ID3 tags, unrecognized bytes and any VBR header frame
/// found at the very start of a stream are discarded.
pub struct Concatenator<W> {
    writer: W,
    stats: MergeStats,
}

impl<W: Write> Concatenator<W> {
    /// Creates new concatenator writing to the given stream
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            stats: MergeStats::default(),
        }
    }

    /// Totals of everything appended so far
    #[inline]
    pub fn stats(&self) -> &MergeStats {
        &self.stats
    }

    /// Appends all of a stream's audio frames to our writer
    ///
    /// `observer` is called with each notable event
    /// that occurs while reading the stream.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if an error occurs reading the stream
    /// and `Error::Write` if an error occurs writing frames.
    pub fn append<R: Read>(
        &mut self,
        reader: R,
        observer: &mut impl FnMut(Event<'_>),
    ) -> Result<(), Error> {
        let mut objects = ObjectReader::new(reader);
        let mut first_frame = true;
        let mut frames = 0;

        while let Some(object) = objects.read_object()? {
            let frame = match object {
                Object::Frame(frame) => frame,
                Object::Id3v1(_) => {
                    log::debug!("skipping ID3v1 tag");
                    observer(Event::SkippedId3v1);
                    continue;
                }
                Object::Id3v2(tag) => {
                    log::debug!("skipping {} byte ID3v2 tag", tag.len());
                    observer(Event::SkippedId3v2(tag.len()));
                    continue;
                }
            };

            // only a stream's very first frame may be its VBR header
            if std::mem::take(&mut first_frame) {
                if let Some(vbr) = VbrHeader::detect(&frame) {
                    log::debug!("skipping {vbr} header frame");
                    observer(Event::SkippedVbrHeader(vbr));
                    continue;
                }
            }

            self.write_frame(&frame, observer)?;
            frames += 1;
        }

        if objects.skipped() > 0 {
            observer(Event::SkippedBytes(objects.skipped()));
        }

        self.stats.files += 1;
        observer(Event::InputFinished { frames });

        Ok(())
    }

    fn write_frame(
        &mut self,
        frame: &Frame,
        observer: &mut impl FnMut(Event<'_>),
    ) -> Result<(), Error> {
        let header = frame.header();
        let bit_rate = header.bit_rate;

        let frames = self
            .stats
            .frames
            .checked_add(1)
            .ok_or(Error::ExcessiveStreamSize)?;

        let bytes = u32::try_from(frame.len())
            .ok()
            .and_then(|len| self.stats.bytes.checked_add(len))
            .ok_or(Error::ExcessiveStreamSize)?;

        match self.stats.first_bit_rate {
            None => {
                log::debug!(
                    "first frame is {} {} at {} kbps",
                    header.version,
                    header.layer,
                    bit_rate / 1000
                );
                self.stats.first_bit_rate = Some(bit_rate);
            }
            Some(first) if first != bit_rate && !self.stats.vbr => {
                log::info!("multiple bit rates detected");
                self.stats.vbr = true;
                observer(Event::VariableBitRate {
                    first,
                    found: bit_rate,
                });
            }
            Some(_) => {}
        }

        self.writer
            .write_all(frame.as_bytes())
            .map_err(Error::Write)?;

        self.stats.frames = frames;
        self.stats.bytes = bytes;

        Ok(())
    }

    /// Flushes our writer and returns it along with the final totals
    ///
    /// # Errors
    ///
    /// Returns `Error::Write` if an error occurs flushing the writer.
    pub fn finish(mut self) -> Result<(W, MergeStats), Error> {
        self.writer.flush().map_err(Error::Write)?;
        Ok((self.writer, self.stats))
    }
}

/// Concatenates the audio frames of the given streams to a writer
///
/// This performs no finalization, so the output
/// will lack any VBR header even if the returned
/// totals indicate one is needed.
///
/// # Errors
///
/// Returns any error from reading the inputs or writing the output.
///
/// # Example
/// ```
/// use mp3cat::merge::concatenate;
///
/// let mut frame = vec![0; 417];
/// frame[0..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
///
/// let mut output = vec![];
/// let stats = concatenate([frame.as_slice(), &b"junk"[..], frame.as_slice()], &mut output).unwrap();
///
/// assert_eq!(stats.frames, 2);
/// assert_eq!(stats.bytes, 834);
/// assert_eq!(stats.files, 3);
/// assert!(!stats.vbr);
/// assert_eq!(output.len(), 834);
/// ```
pub fn concatenate<R, W>(inputs: impl IntoIterator<Item = R>, output: W) -> Result<MergeStats, Error>
where
    R: Read,
    W: Write,
{
    let mut concatenator = Concatenator::new(output);

    for input in inputs {
        concatenator.append(input, &mut |_| {})?;
    }

    concatenator.finish().map(|(_, stats)| stats)
}

/// Options for merging files
#[derive(Clone, Debug, Default)]
pub struct Options {
    tag_source: Option<usize>,
    overwrite: bool,
}

impl Options {
    /// Copies the ID3v2 tag of the input at the given index to the output
    ///
    /// The index is 0-based.
    /// If the input has no ID3v2 tag, the output has none either.
    pub fn tag_source(self, tag_source: Option<usize>) -> Self {
        Self { tag_source, ..self }
    }

    /// Whether an existing output file may be replaced
    pub fn overwrite(self, overwrite: bool) -> Self {
        Self { overwrite, ..self }
    }
}

/// Merges the audio frames of input files to a new output file
///
/// Inputs are read one at a time, in order.
/// If the inputs don't share a single bit rate,
/// an Xing header with the merged totals is prepended to the output.
/// If a tag source is given in the options, that input's ID3v2 tag
/// is then prepended ahead of everything else.
///
/// `observer` is called with each notable event of the merge.
///
/// # Errors
///
/// Before anything is written, returns an error if the
/// tag source index is out of range, if the output path
/// is among the inputs, or if the output exists and
/// overwriting isn't allowed.
///
/// Afterward, returns the first I/O error from any file
/// along with that file's path.
pub fn merge_files<P, Q>(
    inputs: &[P],
    output: Q,
    options: &Options,
    mut observer: impl FnMut(Event<'_>),
) -> Result<MergeStats, Error>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    use crate::finalize::{prepend_id3v2_tag, prepend_xing_header};
    use std::fs::File;
    use std::io::{BufReader, BufWriter};

    let output = output.as_ref();

    let tag_source = options
        .tag_source
        .map(|index| {
            inputs
                .get(index)
                .map(AsRef::<Path>::as_ref)
                .ok_or(Error::InvalidSelection(index))
        })
        .transpose()?;

    check_collision(inputs, output)?;

    if !options.overwrite && output.try_exists().map_err(|e| Error::File(output.into(), e))? {
        return Err(Error::OutputExists(output.into()));
    }

    let mut concatenator = Concatenator::new(BufWriter::new(
        File::create(output).map_err(|e| Error::File(output.into(), e))?,
    ));

    let on_output = |err: Error| match err {
        Error::Write(err) => Error::File(output.into(), err),
        err => err,
    };

    for input in inputs.iter().map(AsRef::<Path>::as_ref) {
        log::debug!("reading {}", input.display());
        observer(Event::Input(input));

        let file = File::open(input).map_err(|e| Error::File(input.into(), e))?;

        concatenator
            .append(BufReader::new(file), &mut observer)
            .map_err(|err| on_output(err).at(input))?;
    }

    // output must be flushed and closed before any rewriting
    let (writer, stats) = concatenator.finish().map_err(on_output)?;
    drop(writer);

    log::info!(
        "{} frames, {} bytes merged from {} files",
        stats.frames,
        stats.bytes,
        stats.files
    );

    if stats.vbr {
        let xing = prepend_xing_header(output, &stats)?;
        observer(Event::XingHeaderAdded(xing));
    }

    // the tag must go ahead of any VBR header
    if let Some(source) = tag_source {
        if let Some(tag) = prepend_id3v2_tag(output, source)? {
            observer(Event::TagTransplanted {
                source,
                size: tag.len(),
            });
        }
    }

    observer(Event::Finished(&stats));

    Ok(stats)
}

/// Ensures the output isn't also one of the inputs
fn check_collision<P: AsRef<Path>>(inputs: &[P], output: &Path) -> Result<(), Error> {
    // a missing output can't be the same file as any input
    let canonical = output.canonicalize().ok();

    match inputs.iter().map(AsRef::<Path>::as_ref).any(|input| {
        input == output || (canonical.is_some() && input.canonicalize().ok() == canonical)
    }) {
        true => Err(Error::OutputCollision(output.into())),
        false => Ok(()),
    }
}
