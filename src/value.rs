use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    archive::{ArchiveReader, ArchiveWriter, Archived},
    error::{FeaturizerError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ScalarKind {
    Int8 = 0,
    Int16 = 1,
    Int32 = 2,
    Int64 = 3,
    UInt8 = 4,
    UInt16 = 5,
    UInt32 = 6,
    UInt64 = 7,
    Float32 = 8,
    Float64 = 9,
    Bool = 10,
    String = 11,
}
impl ScalarKind {
    pub const ALL: [Self; 12] = [
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::UInt8,
        Self::UInt16,
        Self::UInt32,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
        Self::Bool,
        Self::String,
    ];

    #[must_use]
    pub fn from_u8(tag: u8) -> Option<Self> {
        Self::ALL.get(usize::from(tag)).copied()
    }

    #[must_use]
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::Bool | Self::String)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::String => "string",
        }
    }
}
impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A scalar of any supported type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    String(String),
}
impl ScalarValue {
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::Int8(_) => ScalarKind::Int8,
            Self::Int16(_) => ScalarKind::Int16,
            Self::Int32(_) => ScalarKind::Int32,
            Self::Int64(_) => ScalarKind::Int64,
            Self::UInt8(_) => ScalarKind::UInt8,
            Self::UInt16(_) => ScalarKind::UInt16,
            Self::UInt32(_) => ScalarKind::UInt32,
            Self::UInt64(_) => ScalarKind::UInt64,
            Self::Float32(_) => ScalarKind::Float32,
            Self::Float64(_) => ScalarKind::Float64,
            Self::Bool(_) => ScalarKind::Bool,
            Self::String(_) => ScalarKind::String,
        }
    }

    /// NaN is the only null a bare scalar can carry.
    #[must_use]
    pub fn is_null(&self) -> bool {
        match self {
            Self::Float32(x) => x.is_nan(),
            Self::Float64(x) => x.is_nan(),
            _ => false,
        }
    }
}

impl Archived for ScalarValue {
    fn serialize(&self, archive: &mut ArchiveWriter) -> Result<()> {
        archive.serialize(&(self.kind() as u8))?;
        match self {
            Self::Int8(x) => archive.serialize(x),
            Self::Int16(x) => archive.serialize(x),
            Self::Int32(x) => archive.serialize(x),
            Self::Int64(x) => archive.serialize(x),
            Self::UInt8(x) => archive.serialize(x),
            Self::UInt16(x) => archive.serialize(x),
            Self::UInt32(x) => archive.serialize(x),
            Self::UInt64(x) => archive.serialize(x),
            Self::Float32(x) => archive.serialize(x),
            Self::Float64(x) => archive.serialize(x),
            Self::Bool(x) => archive.serialize(x),
            Self::String(x) => archive.serialize(x),
        }
    }
    fn deserialize(archive: &mut ArchiveReader<'_>) -> Result<Self> {
        let tag: u8 = archive.deserialize()?;
        let kind = ScalarKind::from_u8(tag)
            .ok_or_else(|| FeaturizerError::corrupt_archive(format!("unknown scalar tag {tag}")))?;
        Ok(match kind {
            ScalarKind::Int8 => Self::Int8(archive.deserialize()?),
            ScalarKind::Int16 => Self::Int16(archive.deserialize()?),
            ScalarKind::Int32 => Self::Int32(archive.deserialize()?),
            ScalarKind::Int64 => Self::Int64(archive.deserialize()?),
            ScalarKind::UInt8 => Self::UInt8(archive.deserialize()?),
            ScalarKind::UInt16 => Self::UInt16(archive.deserialize()?),
            ScalarKind::UInt32 => Self::UInt32(archive.deserialize()?),
            ScalarKind::UInt64 => Self::UInt64(archive.deserialize()?),
            ScalarKind::Float32 => Self::Float32(archive.deserialize()?),
            ScalarKind::Float64 => Self::Float64(archive.deserialize()?),
            ScalarKind::Bool => Self::Bool(archive.deserialize()?),
            ScalarKind::String => Self::String(archive.deserialize()?),
        })
    }
}
