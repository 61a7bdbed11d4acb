// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For handling VBR header frames
//!
//! Encoders of variable bit rate streams typically place
//! a metadata frame at the start of the stream
//! holding the stream's total frame and byte counts,
//! so that players can compute its duration and seek positions.
//! That frame is a valid MPEG frame whose audio payload
//! is replaced by one of these headers.

use crate::Error;
use crate::frame::{Frame, FrameHeader};
use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter, FromBitStream, ToBitStream};

/// The kind of VBR header a frame carries
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VbrHeader {
    /// An Xing header, as written for VBR streams
    Xing,
    /// An Xing header, as written for CBR streams
    Info,
    /// A Fraunhofer VBRI header
    Vbri,
}

impl VbrHeader {
    /// Fixed offset of VBRI tag, header included
    const VBRI_OFFSET: usize = FrameHeader::SIZE + 32;

    /// Returns the kind of VBR header the frame carries, if any
    ///
    /// Xing and Info headers follow the frame's side information,
    /// while VBRI headers are at a fixed offset.
    /// Frames too short to hold a header's tag never match.
    ///
    /// # Example
    /// ```
    /// use mp3cat::frame::Frame;
    /// use mp3cat::vbr::VbrHeader;
    ///
    /// let mut data = vec![0; 417];
    /// data[0..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
    /// let frame = Frame::from_bytes(data.clone()).unwrap();
    /// assert_eq!(VbrHeader::detect(&frame), None);
    ///
    /// // stereo MPEG-1 Layer III has 32 bytes of side information
    /// data[36..40].copy_from_slice(b"Info");
    /// let frame = Frame::from_bytes(data).unwrap();
    /// assert_eq!(VbrHeader::detect(&frame), Some(VbrHeader::Info));
    /// ```
    pub fn detect(frame: &Frame) -> Option<Self> {
        let data = frame.as_bytes();
        let xing_offset = xing_offset(frame.header());

        match data.get(xing_offset..xing_offset + 4) {
            Some(b"Xing") => return Some(Self::Xing),
            Some(b"Info") => return Some(Self::Info),
            _ => { /* try VBRI next */ }
        }

        match data.get(Self::VBRI_OFFSET..Self::VBRI_OFFSET + 4) {
            Some(b"VBRI") => Some(Self::Vbri),
            _ => None,
        }
    }
}

impl std::fmt::Display for VbrHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Xing => "Xing".fmt(f),
            Self::Info => "Info".fmt(f),
            Self::Vbri => "VBRI".fmt(f),
        }
    }
}

/// Offset of an Xing header in a frame, frame header included
fn xing_offset(header: &FrameHeader) -> usize {
    FrameHeader::SIZE + header.side_info_size()
}

/// The frame and byte count fields of an Xing header
///
/// | Bytes | Field | Meaning |
/// |------:|------:|---------|
/// | 4     | | "Xing" (or "Info") |
/// | 4     | flags | which fields follow |
/// | 4     | `frames` | total frames, if flag bit 0 is set |
/// | 4     | `bytes` | total bytes, if flag bit 1 is set |
///
/// Additional fields (seek table, quality)
/// may follow in headers written by encoders,
/// but are neither read nor written here.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct XingHeader {
    /// Total audio frames in stream, not counting the header's own frame
    pub frames: Option<u32>,
    /// Total audio bytes in stream, not counting the header's own frame
    pub bytes: Option<u32>,
}

impl XingHeader {
    const FRAMES_PRESENT: u32 = 0b01;
    const BYTES_PRESENT: u32 = 0b10;

    /// Builds header with both frame and byte counts
    pub fn new(frames: u32, bytes: u32) -> Self {
        Self {
            frames: Some(frames),
            bytes: Some(bytes),
        }
    }

    /// Reads Xing or Info header from frame, if present
    ///
    /// # Example
    /// ```
    /// use mp3cat::frame::Frame;
    /// use mp3cat::vbr::XingHeader;
    ///
    /// let mut data = vec![0; 417];
    /// data[0..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
    /// let template = Frame::from_bytes(data).unwrap();
    ///
    /// let header = XingHeader::new(1000, 417000).build_frame(&template).unwrap();
    /// assert_eq!(XingHeader::read(&header), Some(XingHeader::new(1000, 417000)));
    /// assert_eq!(XingHeader::read(&template), None);
    /// ```
    pub fn read(frame: &Frame) -> Option<Self> {
        let offset = xing_offset(frame.header());

        BitReader::endian(frame.as_bytes().get(offset..)?, BigEndian)
            .parse()
            .ok()
    }

    /// Builds VBR header frame shaped like the template frame
    ///
    /// The header frame has the same length as the template
    /// and begins with the template's frame header,
    /// so that it may stand in for any other frame of the stream.
    /// All bytes besides the frame header and the Xing fields are 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the template frame is too
    /// small to hold the Xing header.
    pub fn build_frame(&self, template: &Frame) -> Result<Frame, Error> {
        let header = *template.header();
        let offset = xing_offset(&header);

        let mut data = vec![0; template.len()];
        data[0..FrameHeader::SIZE].copy_from_slice(&template.as_bytes()[0..FrameHeader::SIZE]);

        let fields = data
            .get_mut(offset..offset + self.size())
            .ok_or(Error::TemplateTooSmall)?;

        BitWriter::endian(fields, BigEndian).build(self)?;

        Ok(Frame::from_parts(header, data))
    }

    /// Size of encoded header, in bytes
    fn size(&self) -> usize {
        8 + self.frames.map(|_| 4).unwrap_or(0) + self.bytes.map(|_| 4).unwrap_or(0)
    }
}

impl FromBitStream for XingHeader {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        match &r.read_to::<[u8; 4]>()? {
            b"Xing" | b"Info" => {
                let flags = r.read_to::<u32>()?;

                Ok(Self {
                    frames: match flags & Self::FRAMES_PRESENT {
                        0 => None,
                        _ => Some(r.read_to()?),
                    },
                    bytes: match flags & Self::BYTES_PRESENT {
                        0 => None,
                        _ => Some(r.read_to()?),
                    },
                })
            }
            _ => Err(Error::MissingXingTag),
        }
    }
}

impl ToBitStream for XingHeader {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write_bytes(b"Xing")?;
        w.write_from(
            self.frames.map(|_| Self::FRAMES_PRESENT).unwrap_or(0)
                | self.bytes.map(|_| Self::BYTES_PRESENT).unwrap_or(0),
        )?;
        if let Some(frames) = self.frames {
            w.write_from(frames)?;
        }
        if let Some(bytes) = self.bytes {
            w.write_from(bytes)?;
        }
        Ok(())
    }
}
