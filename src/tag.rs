// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For handling ID3 tags embedded in MPEG audio streams
//!
//! Tags are carried as raw bytes only.
//! Their frames are never parsed or modified.

use crate::Error;
use crate::stream::fill;
use bitstream_io::{BigEndian, BitRead, BitReader, FromBitStream};
use std::path::Path;

/// An ID3v1 tag, always 128 bytes long
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Id3v1Tag {
    data: Box<[u8; 128]>,
}

impl Id3v1Tag {
    /// Size of an ID3v1 tag, in bytes
    pub const SIZE: usize = 128;

    /// Reads the remainder of a tag whose first 4 bytes have been read
    pub(crate) fn read_body<R: std::io::Read>(
        start: [u8; 4],
        reader: R,
    ) -> std::io::Result<Option<Self>> {
        let mut data = Box::new([0; Self::SIZE]);
        data[0..4].copy_from_slice(&start);

        fill(reader, &mut data[4..]).map(|filled| filled.then_some(Self { data }))
    }

    /// The tag's raw bytes, beginning with "TAG"
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_slice()
    }
}

/// An ID3v2 tag header
///
/// | Bytes | Field | Meaning |
/// |------:|------:|---------|
/// | 3     | | "ID3" |
/// | 1     | `major_version` | tag's ID3v2 major version |
/// | 1     | `revision` | tag's ID3v2 revision |
/// | 1     | `flags` | tag flags |
/// | 4     | `size` | synchsafe tag size, header excluded |
///
/// Each size byte carries 7 bits, so its most significant bit
/// is always 0 and the size can never resemble a frame sync code.
///
/// # Example
/// ```
/// use bitstream_io::{BitReader, BitRead, BigEndian};
/// use mp3cat::tag::Id3v2Header;
///
/// let data: &[u8] = b"ID3\x04\x00\x00\x00\x00\x02\x01";
/// let mut r = BitReader::endian(data, BigEndian);
/// assert_eq!(
///     r.parse::<Id3v2Header>().unwrap(),
///     Id3v2Header {
///         major_version: 4,
///         revision: 0,
///         flags: 0,
///         size: 257,
///     },
/// );
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Id3v2Header {
    /// ID3v2 major version
    pub major_version: u8,
    /// ID3v2 revision
    pub revision: u8,
    /// Tag flags
    pub flags: u8,
    /// Tag size in bytes, not including this header
    pub size: u32,
}

impl Id3v2Header {
    /// Size of an encoded ID3v2 header, in bytes
    pub const SIZE: usize = 10;

    /// Decodes a header from its 10 bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the header lacks its "ID3" identifier.
    pub fn parse(header: [u8; 10]) -> Result<Self, Error> {
        BitReader::endian(header.as_slice(), BigEndian).parse()
    }

    /// Total tag length, header included
    pub fn tag_length(&self) -> usize {
        Self::SIZE + self.size as usize
    }
}

impl FromBitStream for Id3v2Header {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        if &r.read_to::<[u8; 3]>()? != b"ID3" {
            return Err(Error::MissingId3Tag);
        }

        Ok(Self {
            major_version: r.read_to()?,
            revision: r.read_to()?,
            flags: r.read_to()?,
            size: (0..4).try_fold(0, |size, _| {
                r.skip(1)?;
                r.read::<7, u32>().map(|bits| size << 7 | bits)
            })?,
        })
    }
}

/// An ID3v2 tag
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Id3v2Tag {
    header: Id3v2Header,
    data: Vec<u8>,
}

impl Id3v2Tag {
    /// Reads the remainder of a tag whose header has been read
    ///
    /// Returns `None` if the stream ends before the tag is complete.
    pub(crate) fn read_body<R: std::io::Read>(
        header_bytes: [u8; Id3v2Header::SIZE],
        reader: R,
    ) -> Result<Option<Self>, Error> {
        use std::io::Read;

        let header = Id3v2Header::parse(header_bytes)?;

        // buffer only what the stream actually holds
        let mut data = header_bytes.to_vec();
        reader
            .take(header.size.into())
            .read_to_end(&mut data)?;

        Ok((data.len() == header.tag_length()).then_some(Self { header, data }))
    }

    /// The tag's decoded header
    #[inline]
    pub fn header(&self) -> &Id3v2Header {
        &self.header
    }

    /// The tag's raw bytes, header included
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Length of the whole tag in bytes, header included
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false, since every tag contains at least its header
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Given a path, returns the ID3v2 tag at the start of the file, if any
///
/// Any garbage before the tag is skipped,
/// but if the file's first recognized object is something
/// other than an ID3v2 tag, returns `None`.
///
/// # Errors
///
/// Returns any I/O error from opening or reading the file.
pub fn read_id3v2_tag<P: AsRef<Path>>(path: P) -> Result<Option<Id3v2Tag>, Error> {
    use crate::stream::{Object, ObjectReader};
    use std::fs::File;
    use std::io::BufReader;

    File::open(path.as_ref())
        .map_err(Error::Io)
        .and_then(|f| ObjectReader::new(BufReader::new(f)).read_object())
        .map(|object| match object {
            Some(Object::Id3v2(tag)) => Some(tag),
            _ => None,
        })
        .map_err(|err| err.at(path))
}
