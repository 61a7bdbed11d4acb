// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For handling MPEG audio frames and their headers

use crate::Error;
use bitstream_io::{BigEndian, BitRead, BitReader, FromBitStream};

/// An MPEG audio frame header
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 11   | sync | all 1 bits |
/// | 2    | `version` | MPEG version |
/// | 2    | `layer` | MPEG layer |
/// | 1    | `crc_protected` | 0 if followed by a CRC-16 |
/// | 4    | `bit_rate` | bit rate index |
/// | 2    | `sample_rate` | sample rate index |
/// | 1    | `padding` | whether frame has an extra slot |
/// | 1    | `private` | application-specific |
/// | 2    | `channel_mode` | channel mode |
/// | 2    | `mode_extension` | joint stereo extension |
/// | 1    | `copyright` | whether audio is copyrighted |
/// | 1    | `original` | whether audio is original media |
/// | 2    | `emphasis` | de-emphasis to apply |
///
/// # Example
/// ```
/// use mp3cat::frame::{ChannelMode, Emphasis, FrameHeader, Layer, MpegVersion};
///
/// assert_eq!(
///     FrameHeader::parse([0xFF, 0xFB, 0x90, 0x64]).unwrap(),
///     FrameHeader {
///         version: MpegVersion::Mpeg1,
///         layer: Layer::III,
///         crc_protected: false,
///         bit_rate: 128000,
///         sample_rate: 44100,
///         padding: false,
///         private: false,
///         channel_mode: ChannelMode::JointStereo,
///         mode_extension: 2,
///         copyright: false,
///         original: true,
///         emphasis: Emphasis::None,
///     },
/// );
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FrameHeader {
    /// The stream's MPEG version
    pub version: MpegVersion,
    /// The stream's MPEG layer
    pub layer: Layer,
    /// Whether the header is followed by a CRC-16
    pub crc_protected: bool,
    /// Bit rate in bits per second
    pub bit_rate: u32,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Whether the frame carries an additional padding slot
    pub padding: bool,
    /// The private bit
    pub private: bool,
    /// The frame's channel mode
    pub channel_mode: ChannelMode,
    /// Joint stereo mode extension
    pub mode_extension: u8,
    /// Whether the audio is copyrighted
    pub copyright: bool,
    /// Whether the audio is on its original media
    pub original: bool,
    /// De-emphasis to apply
    pub emphasis: Emphasis,
}

impl FrameHeader {
    /// Size of an encoded frame header, in bytes
    pub const SIZE: usize = 4;

    /// Decodes a frame header from its 4 bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes lack a frame sync code
    /// or any of the header's fields are invalid or reserved.
    pub fn parse(header: [u8; 4]) -> Result<Self, Error> {
        BitReader::endian(header.as_slice(), BigEndian).parse()
    }

    /// Number of PCM samples per channel in the frame
    pub fn sample_count(&self) -> u32 {
        match (self.version, self.layer) {
            (_, Layer::I) => 384,
            (_, Layer::II) => 1152,
            (MpegVersion::Mpeg1, Layer::III) => 1152,
            (MpegVersion::Mpeg2 | MpegVersion::Mpeg25, Layer::III) => 576,
        }
    }

    /// Size of the padding slot, in bytes, if the padding bit is set
    pub fn padding_size(&self) -> u32 {
        match (self.padding, self.layer) {
            (false, _) => 0,
            (true, Layer::I) => 4,
            (true, Layer::II | Layer::III) => 1,
        }
    }

    /// Length of the whole frame in bytes, including the header
    pub fn frame_length(&self) -> usize {
        // dividing sample count first avoids rounding errors
        ((self.sample_count() / 8) * self.bit_rate / self.sample_rate + self.padding_size())
            as usize
    }

    /// Length of the Layer III side information following the header
    ///
    /// Other layers have no side information.
    pub fn side_info_size(&self) -> usize {
        match (self.layer, self.version, self.channel_mode) {
            (Layer::III, MpegVersion::Mpeg1, ChannelMode::Mono) => 17,
            (Layer::III, MpegVersion::Mpeg1, _) => 32,
            (Layer::III, _, ChannelMode::Mono) => 9,
            (Layer::III, _, _) => 17,
            (Layer::I | Layer::II, _, _) => 0,
        }
    }
}

impl FromBitStream for FrameHeader {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        if r.read::<11, u16>()? != 0b111_1111_1111 {
            return Err(Error::InvalidSyncCode);
        }

        let version = match r.read::<2, u8>()? {
            0b00 => MpegVersion::Mpeg25,
            0b01 => return Err(Error::ReservedVersion),
            0b10 => MpegVersion::Mpeg2,
            0b11 => MpegVersion::Mpeg1,
            _ => unreachable!(), // 2-bit field
        };

        let layer = match r.read::<2, u8>()? {
            0b00 => return Err(Error::ReservedLayer),
            0b01 => Layer::III,
            0b10 => Layer::II,
            0b11 => Layer::I,
            _ => unreachable!(), // 2-bit field
        };

        let crc_protected = !r.read_bit()?;

        let bit_rate = match r.read::<4, u8>()? {
            0b0000 | 0b1111 => return Err(Error::InvalidBitRate),
            index => bit_rate(version, layer, index),
        };

        let sample_rate = match r.read::<2, u8>()? {
            0b11 => return Err(Error::InvalidSampleRate),
            index => version.sample_rates()[usize::from(index)],
        };

        let padding = r.read_bit()?;
        let private = r.read_bit()?;

        let channel_mode = match r.read::<2, u8>()? {
            0b00 => ChannelMode::Stereo,
            0b01 => ChannelMode::JointStereo,
            0b10 => ChannelMode::DualChannel,
            0b11 => ChannelMode::Mono,
            _ => unreachable!(), // 2-bit field
        };

        let mode_extension = r.read::<2, u8>()?;
        let copyright = r.read_bit()?;
        let original = r.read_bit()?;

        let emphasis = match r.read::<2, u8>()? {
            0b00 => Emphasis::None,
            0b01 => Emphasis::Ms50_15,
            0b10 => return Err(Error::ReservedEmphasis),
            0b11 => Emphasis::CcittJ17,
            _ => unreachable!(), // 2-bit field
        };

        Ok(Self {
            version,
            layer,
            crc_protected,
            bit_rate,
            sample_rate,
            padding,
            private,
            channel_mode,
            mode_extension,
            copyright,
            original,
            emphasis,
        })
    }
}

/// An MPEG audio version
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MpegVersion {
    /// MPEG-1
    Mpeg1,
    /// MPEG-2
    Mpeg2,
    /// The unofficial MPEG-2.5 extension
    Mpeg25,
}

impl MpegVersion {
    fn sample_rates(self) -> [u32; 3] {
        match self {
            Self::Mpeg1 => [44100, 48000, 32000],
            Self::Mpeg2 => [22050, 24000, 16000],
            Self::Mpeg25 => [11025, 12000, 8000],
        }
    }
}

impl std::fmt::Display for MpegVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Mpeg1 => "MPEG-1".fmt(f),
            Self::Mpeg2 => "MPEG-2".fmt(f),
            Self::Mpeg25 => "MPEG-2.5".fmt(f),
        }
    }
}

/// An MPEG audio layer
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Layer {
    /// Layer I
    I,
    /// Layer II
    II,
    /// Layer III
    III,
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::I => "Layer I".fmt(f),
            Self::II => "Layer II".fmt(f),
            Self::III => "Layer III".fmt(f),
        }
    }
}

/// A frame's channel mode
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChannelMode {
    /// Two independent channels
    Stereo,
    /// Two channels sharing stereo information
    JointStereo,
    /// Two unrelated mono channels
    DualChannel,
    /// A single channel
    Mono,
}

/// De-emphasis to apply to decoded audio
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Emphasis {
    /// No emphasis
    None,
    /// 50/15 microseconds
    Ms50_15,
    /// CCITT J.17
    CcittJ17,
}

// bit rates in kbps, where index 0 is unused
const MPEG1_LAYER1: [u16; 15] = [
    0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448,
];
const MPEG1_LAYER2: [u16; 15] = [
    0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384,
];
const MPEG1_LAYER3: [u16; 15] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];
const MPEG2_LAYER1: [u16; 15] = [
    0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256,
];
const MPEG2_LAYER2: [u16; 15] = [
    0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160,
];
const MPEG2_LAYER3: [u16; 15] = MPEG2_LAYER2;

/// Bit rate in bits per second, for an index between 1 and 14
fn bit_rate(version: MpegVersion, layer: Layer, index: u8) -> u32 {
    let table = match (version, layer) {
        (MpegVersion::Mpeg1, Layer::I) => &MPEG1_LAYER1,
        (MpegVersion::Mpeg1, Layer::II) => &MPEG1_LAYER2,
        (MpegVersion::Mpeg1, Layer::III) => &MPEG1_LAYER3,
        (MpegVersion::Mpeg2 | MpegVersion::Mpeg25, Layer::I) => &MPEG2_LAYER1,
        (MpegVersion::Mpeg2 | MpegVersion::Mpeg25, Layer::II) => &MPEG2_LAYER2,
        (MpegVersion::Mpeg2 | MpegVersion::Mpeg25, Layer::III) => &MPEG2_LAYER3,
    };

    u32::from(table[usize::from(index)]) * 1000
}

/// A complete MPEG audio frame
///
/// The frame's data always has the length
/// its header indicates, header bytes included.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    header: FrameHeader,
    data: Vec<u8>,
}

impl Frame {
    /// Builds frame from its complete data
    ///
    /// # Errors
    ///
    /// Returns an error if the header is invalid
    /// or the data's length doesn't match the header's frame length.
    ///
    /// # Example
    /// ```
    /// use mp3cat::frame::Frame;
    ///
    /// let mut data = vec![0; 417];
    /// data[0..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
    ///
    /// let frame = Frame::from_bytes(data).unwrap();
    /// assert_eq!(frame.header().bit_rate, 128000);
    /// assert_eq!(frame.len(), 417);
    /// ```
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, Error> {
        let header = data
            .first_chunk::<4>()
            .ok_or(Error::InvalidFrameLength)
            .and_then(|h| FrameHeader::parse(*h))?;

        match data.len() == header.frame_length() {
            true => Ok(Self { header, data }),
            false => Err(Error::InvalidFrameLength),
        }
    }

    /// Reads the remainder of a frame whose header has been read
    ///
    /// Returns `None` if the stream ends before the frame is complete.
    pub(crate) fn read_body<R: std::io::Read>(
        header_bytes: [u8; 4],
        header: FrameHeader,
        reader: R,
    ) -> std::io::Result<Option<Self>> {
        let mut data = vec![0; header.frame_length()];
        data[0..FrameHeader::SIZE].copy_from_slice(&header_bytes);

        crate::stream::fill(reader, &mut data[FrameHeader::SIZE..])
            .map(|filled| filled.then_some(Self { header, data }))
    }

    /// Builds frame from header and data whose lengths are known to match
    pub(crate) fn from_parts(header: FrameHeader, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), header.frame_length());
        Self { header, data }
    }

    /// The frame's decoded header
    #[inline]
    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// The frame's raw bytes, header included
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Length of the whole frame in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false, since every frame contains at least its header
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
