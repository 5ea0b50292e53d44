//! Versioned little-endian binary codec.
//!
//! # Layout
//!
//! ```text
//! structure   [u16 major][u16 minor][fields in declaration order]
//! numbers     little-endian, fixed width
//! bool        [u8 0 | 1]
//! String      [u32 length][raw UTF-8 bytes]
//! Vec<T>      [u32 count][T]*
//! Option<T>   [u8 flag][T if flag == 1]
//! ```
//!
//! There is no checksum and no self-description: a reader must know the exact
//! structure and version it expects.

use crate::error::{FeaturizerError, Result};

/// A value with a fixed binary representation.
pub trait Archived: Sized {
    fn serialize(&self, archive: &mut ArchiveWriter) -> Result<()>;
    fn deserialize(archive: &mut ArchiveReader<'_>) -> Result<Self>;
}

#[derive(Debug, Clone, Default)]
pub struct ArchiveWriter {
    buf: Vec<u8>,
}
impl ArchiveWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serialize<T: Archived>(&mut self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    pub fn write_version(&mut self, major: u16, minor: u16) -> Result<()> {
        self.serialize(&major)?;
        self.serialize(&minor)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a `u32` length prefix.
    pub fn write_len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len).map_err(|_| {
            FeaturizerError::invalid_argument(format!("length {len} does not fit in u32"))
        })?;
        self.serialize(&len)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn commit(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveReader<'a> {
    buf: &'a [u8],
    pos: usize,
}
impl<'a> ArchiveReader<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn deserialize<T: Archived>(&mut self) -> Result<T> {
        T::deserialize(self)
    }

    /// Consumes a version stamp and fails unless it equals `(major, minor)`.
    pub fn expect_version(&mut self, major: u16, minor: u16) -> Result<()> {
        let found_major: u16 = self.deserialize()?;
        let found_minor: u16 = self.deserialize()?;
        if (found_major, found_minor) != (major, minor) {
            return Err(FeaturizerError::corrupt_archive(format!(
                "unsupported version {found_major}.{found_minor}, expected {major}.{minor}"
            )));
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(FeaturizerError::corrupt_archive(format!(
                "needed {n} bytes at offset {}, {} left",
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    pub fn read_len(&mut self) -> Result<usize> {
        let len: u32 = self.deserialize()?;
        usize::try_from(len).map_err(|_| FeaturizerError::corrupt_archive("length overflow"))
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.remaining() == 0
    }
}

macro_rules! impl_archived_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Archived for $ty {
                fn serialize(&self, archive: &mut ArchiveWriter) -> Result<()> {
                    archive.write_bytes(&self.to_le_bytes());
                    Ok(())
                }
                fn deserialize(archive: &mut ArchiveReader<'_>) -> Result<Self> {
                    Ok(<$ty>::from_le_bytes(archive.read_array()?))
                }
            }
        )*
    };
}
impl_archived_number!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Archived for bool {
    fn serialize(&self, archive: &mut ArchiveWriter) -> Result<()> {
        archive.serialize(&u8::from(*self))
    }
    fn deserialize(archive: &mut ArchiveReader<'_>) -> Result<Self> {
        match archive.deserialize::<u8>()? {
            0 => Ok(false),
            1 => Ok(true),
            x => Err(FeaturizerError::corrupt_archive(format!(
                "invalid bool byte {x}"
            ))),
        }
    }
}

impl Archived for String {
    fn serialize(&self, archive: &mut ArchiveWriter) -> Result<()> {
        archive.write_len(self.len())?;
        archive.write_bytes(self.as_bytes());
        Ok(())
    }
    fn deserialize(archive: &mut ArchiveReader<'_>) -> Result<Self> {
        let len = archive.read_len()?;
        let bytes = archive.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| FeaturizerError::corrupt_archive(format!("invalid string: {e}")))
    }
}

impl<T: Archived> Archived for Vec<T> {
    fn serialize(&self, archive: &mut ArchiveWriter) -> Result<()> {
        archive.write_len(self.len())?;
        for x in self {
            archive.serialize(x)?;
        }
        Ok(())
    }
    fn deserialize(archive: &mut ArchiveReader<'_>) -> Result<Self> {
        let len = archive.read_len()?;
        // Every element takes at least one byte
        if archive.remaining() < len {
            return Err(FeaturizerError::corrupt_archive(format!(
                "vector of {len} elements exceeds the {} bytes left",
                archive.remaining()
            )));
        }
        (0..len).map(|_| archive.deserialize()).collect()
    }
}

impl<T: Archived> Archived for Option<T> {
    fn serialize(&self, archive: &mut ArchiveWriter) -> Result<()> {
        match self {
            Some(x) => {
                archive.serialize(&1_u8)?;
                archive.serialize(x)
            }
            None => archive.serialize(&0_u8),
        }
    }
    fn deserialize(archive: &mut ArchiveReader<'_>) -> Result<Self> {
        match archive.deserialize::<u8>()? {
            0 => Ok(None),
            1 => Ok(Some(archive.deserialize()?)),
            x => Err(FeaturizerError::corrupt_archive(format!(
                "invalid option flag {x}"
            ))),
        }
    }
}
