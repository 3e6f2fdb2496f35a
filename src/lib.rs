//! Extract the entity and shader lumps from `RBSP` map files.
//!
//! ```no_run
//! use std::{fs::File, io::BufReader};
//!
//! use rbsp::{emit::JsonLines, shaders::TrailingBytes, Bsp, LumpSelector};
//!
//! # fn main() -> rbsp::Result<()> {
//! let selector: LumpSelector = "entities".parse()?;
//! let mut bsp = Bsp::open(BufReader::new(File::open("q3dm17.bsp")?))?;
//! let records = bsp.extract(selector, TrailingBytes::Ignore)?;
//! records.emit(&mut JsonLines::new(std::io::stdout().lock()))?;
//! # Ok(())
//! # }
//! ```

use std::{
    borrow::Cow,
    io::{Read, Seek, SeekFrom, Write},
    str::FromStr,
};

use tracing::debug;

pub mod cli;
pub mod emit;
pub mod entities;
pub mod error;
pub mod header;
pub mod shaders;

pub use entities::Entity;
pub use error::{Error, ErrorKind, ParseError, Result};
pub use header::{Header, Lump, LumpKind, HEADER_SIZE, LUMP_COUNT};
pub use shaders::{Shader, TrailingBytes};

use emit::JsonLines;

/// A lump this crate knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LumpSelector {
    Entities,
    Shaders,
}

impl LumpSelector {
    pub fn kind(self) -> LumpKind {
        match self {
            Self::Entities => LumpKind::Entities,
            Self::Shaders => LumpKind::Shaders,
        }
    }
}

impl FromStr for LumpSelector {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "ents" | "entities" => Ok(Self::Entities),
            "shaders" => Ok(Self::Shaders),
            _ => Err(Error::UnknownLump(name.to_owned())),
        }
    }
}

/// Decoded records of one lump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Entities(Vec<Entity>),
    Shaders(Vec<Shader>),
}

impl Extracted {
    pub fn len(&self) -> usize {
        match self {
            Self::Entities(entities) => entities.len(),
            Self::Shaders(shaders) => shaders.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write every record to `sink` in decode order.
    pub fn emit<W>(&self, sink: &mut JsonLines<W>) -> Result<usize>
    where
        W: Write,
    {
        match self {
            Self::Entities(entities) => sink.emit_all(entities),
            Self::Shaders(shaders) => sink.emit_all(shaders),
        }
    }
}

/// Representation of an open BSP file
pub struct Bsp<R> {
    source: R,
    /// BSP Header
    header: Header,
    /// Total length of the source in bytes
    len: u64,
}

impl<R> Bsp<R>
where
    R: Read + Seek,
{
    /// Read and validate the header at the start of `source`.
    pub fn open(mut source: R) -> Result<Self> {
        let len = source.seek(SeekFrom::End(0))?;
        source.rewind()?;
        let header = Header::read_from_io(&mut source)?;
        Ok(Self {
            source,
            header,
            len,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Length of the underlying source in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read the raw bytes of a lump.
    ///
    /// Fails if the directory entry points outside the file.
    pub fn lump_bytes(&mut self, kind: LumpKind) -> Result<Vec<u8>> {
        let lump = *self.header.lump(kind);
        let (offset, length) = (lump.offset(), lump.length());

        if u64::from(offset) + u64::from(length) > self.len {
            return Err(Error::LumpOutOfBounds {
                lump: kind,
                offset,
                length,
                file_len: self.len,
            });
        }

        debug!(lump = %kind, offset, length, "reading lump");
        self.source.seek(SeekFrom::Start(offset.into()))?;
        let mut data = vec![0; length as usize];
        self.source.read_exact(&mut data)?;
        Ok(data)
    }

    pub fn entities(&mut self) -> Result<Vec<Entity>> {
        let data = self.lump_bytes(LumpKind::Entities)?;
        Ok(entities::decode(&data)?)
    }

    pub fn shaders(&mut self, trailing: TrailingBytes) -> Result<Vec<Shader>> {
        let data = self.lump_bytes(LumpKind::Shaders)?;
        shaders::decode(&data, trailing)
    }

    /// Decode the lump named by `selector`.
    pub fn extract(&mut self, selector: LumpSelector, trailing: TrailingBytes) -> Result<Extracted> {
        match selector {
            LumpSelector::Entities => self.entities().map(Extracted::Entities),
            LumpSelector::Shaders => self.shaders(trailing).map(Extracted::Shaders),
        }
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R> std::fmt::Debug for Bsp<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bsp")
            .field("ident", &self.header.ident())
            .field("version", &self.header.version())
            .field("len", &self.len)
            // Indicate that we have omitted data (lump entries)
            .finish_non_exhaustive()
    }
}

/// Text up to the first NUL byte, or all of `bytes` if there is none.
///
/// Invalid UTF-8 is replaced rather than rejected.
pub(crate) fn nul_terminated(bytes: &[u8]) -> Cow<'_, str> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end])
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn selector_names() {
        assert_eq!("ents".parse::<LumpSelector>().unwrap(), LumpSelector::Entities);
        assert_eq!("entities".parse::<LumpSelector>().unwrap(), LumpSelector::Entities);
        assert_eq!("shaders".parse::<LumpSelector>().unwrap(), LumpSelector::Shaders);
        assert_eq!(LumpSelector::Shaders.kind(), LumpKind::Shaders);

        for name in ["Entities", "SHADERS", "planes", "", "ents "] {
            let err = name.parse::<LumpSelector>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Usage, "{name:?}");
        }
    }

    #[test]
    fn nul_terminated_text() {
        assert_eq!(nul_terminated(b"abc\0def"), "abc");
        assert_eq!(nul_terminated(b"abc"), "abc");
        assert_eq!(nul_terminated(b"\0"), "");
        assert_eq!(nul_terminated(b"a\xFFb"), "a\u{FFFD}b");
    }

    #[test]
    fn lump_past_end_is_rejected() {
        let mut lumps = [Lump::default(); LUMP_COUNT];
        lumps[LumpKind::Entities.index()] = Lump::new(HEADER_SIZE as u32, 10);
        let mut data = Header::new(lumps).to_bytes().to_vec();
        data.extend_from_slice(b"{}");

        let mut bsp = Bsp::open(Cursor::new(data)).unwrap();
        let err = bsp.entities().unwrap_err();
        assert!(matches!(
            err,
            Error::LumpOutOfBounds {
                lump: LumpKind::Entities,
                length: 10,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn open_rewinds_source() {
        let data = Header::new([Lump::default(); LUMP_COUNT]).to_bytes().to_vec();
        let mut cursor = Cursor::new(data);
        cursor.set_position(20);
        let bsp = Bsp::open(cursor).unwrap();
        assert_eq!(bsp.len(), HEADER_SIZE as u64);
        assert_eq!(bsp.header().version(), header::RBSP_VERSION);
    }
}
