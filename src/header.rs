use std::{fmt, io::Read};

use tracing::debug;
use zerocopy::{
    byteorder::little_endian::{I32, U32},
    FromBytes, IntoBytes,
};
use zerocopy_derive::*;

use crate::error::{Error, Result};

/// File format identifier, the bytes `RBSP` read as a little-endian integer
pub const RBSP_IDENT: i32 = i32::from_le_bytes(*b"RBSP");
/// The only supported file format version
pub const RBSP_VERSION: i32 = 1;
/// Lump definition count
pub const LUMP_COUNT: usize = 18;
/// Size of the on-disk header in bytes
pub const HEADER_SIZE: usize = size_of::<Header>();

/// Lumps in header directory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LumpKind {
    Entities,
    Shaders,
    Planes,
    Nodes,
    Leafs,
    LeafSurfaces,
    LeafBrushes,
    Models,
    Brushes,
    BrushSides,
    DrawVerts,
    DrawIndexes,
    Fogs,
    Surfaces,
    Lightmaps,
    LightGrid,
    Visibility,
    LightArray,
}

impl LumpKind {
    pub const ALL: [LumpKind; LUMP_COUNT] = [
        Self::Entities,
        Self::Shaders,
        Self::Planes,
        Self::Nodes,
        Self::Leafs,
        Self::LeafSurfaces,
        Self::LeafBrushes,
        Self::Models,
        Self::Brushes,
        Self::BrushSides,
        Self::DrawVerts,
        Self::DrawIndexes,
        Self::Fogs,
        Self::Surfaces,
        Self::Lightmaps,
        Self::LightGrid,
        Self::Visibility,
        Self::LightArray,
    ];

    /// Position of this lump in the header directory
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Entities => "entities",
            Self::Shaders => "shaders",
            Self::Planes => "planes",
            Self::Nodes => "nodes",
            Self::Leafs => "leafs",
            Self::LeafSurfaces => "leafsurfaces",
            Self::LeafBrushes => "leafbrushes",
            Self::Models => "models",
            Self::Brushes => "brushes",
            Self::BrushSides => "brushsides",
            Self::DrawVerts => "drawverts",
            Self::DrawIndexes => "drawindexes",
            Self::Fogs => "fogs",
            Self::Surfaces => "surfaces",
            Self::Lightmaps => "lightmaps",
            Self::LightGrid => "lightgrid",
            Self::Visibility => "visibility",
            Self::LightArray => "lightarray",
        }
    }
}

impl From<LumpKind> for usize {
    fn from(kind: LumpKind) -> Self {
        kind.index()
    }
}

impl fmt::Display for LumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// BSP lump directory entry
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Lump {
    /// Absolute offset in file
    offset: U32,
    /// Length of data
    length: U32,
}

impl Lump {
    pub fn new(offset: u32, length: u32) -> Self {
        Self {
            offset: U32::new(offset),
            length: U32::new(length),
        }
    }

    pub fn offset(&self) -> u32 {
        self.offset.get()
    }

    pub fn length(&self) -> u32 {
        self.length.get()
    }

    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }
}

impl Default for Lump {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// BSP file header
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Debug, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct Header {
    /// File format identifier
    ident: I32,
    /// File format version
    version: I32,
    /// Lump definitions
    lumps: [Lump; LUMP_COUNT],
}

impl Header {
    /// Build a valid header around the given lump directory.
    pub fn new(lumps: [Lump; LUMP_COUNT]) -> Self {
        Self {
            ident: I32::new(RBSP_IDENT),
            version: I32::new(RBSP_VERSION),
            lumps,
        }
    }

    /// Decode and validate a header from the start of `data`.
    ///
    /// Bytes past [`HEADER_SIZE`] are ignored. Individual lump entries are not
    /// checked against the length of `data`; that is left to whoever reads them.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let (header, _) = Self::read_from_prefix(data).map_err(|_| Error::TruncatedHeader {
            expected: HEADER_SIZE,
            found: data.len(),
        })?;
        header.validate()?;

        let ident = header.ident().to_le_bytes();
        debug!(
            ident = %ident.escape_ascii(),
            version = header.version(),
            "decoded BSP header"
        );
        Ok(header)
    }

    /// Read exactly [`HEADER_SIZE`] bytes from `reader` and decode them.
    ///
    /// On success the reader is left just past the header.
    pub fn read_from_io<R>(reader: R) -> Result<Self>
    where
        R: Read,
    {
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        reader.take(HEADER_SIZE as u64).read_to_end(&mut buf)?;
        Self::parse(&buf)
    }

    fn validate(&self) -> Result<()> {
        if self.ident() != RBSP_IDENT {
            return Err(Error::BadIdent {
                expected: RBSP_IDENT,
                actual: self.ident(),
            });
        }
        if self.version() != RBSP_VERSION {
            return Err(Error::BadVersion {
                expected: RBSP_VERSION,
                actual: self.version(),
            });
        }
        Ok(())
    }

    pub fn ident(&self) -> i32 {
        self.ident.get()
    }

    pub fn version(&self) -> i32 {
        self.version.get()
    }

    pub fn lump(&self, kind: LumpKind) -> &Lump {
        &self.lumps[kind.index()]
    }

    /// Directory entries paired with their kinds, in file order
    pub fn lumps(&self) -> impl Iterator<Item = (LumpKind, &Lump)> {
        LumpKind::ALL.into_iter().zip(self.lumps.iter())
    }

    /// The on-disk encoding of this header
    pub fn to_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}
