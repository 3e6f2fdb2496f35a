use serde::Serialize;
use tracing::{debug, warn};
use zerocopy::{byteorder::little_endian::U32, FromBytes};
use zerocopy_derive::*;

use crate::{
    error::{Error, Result},
    header::LumpKind,
};

/// Maximum length of a shader name, including any NUL padding
pub const MAX_QPATH: usize = 64;
/// Size of one on-disk shader record
pub const SHADER_RECORD_SIZE: usize = size_of::<RawShader>();

const _: () = assert!(SHADER_RECORD_SIZE == 72);

/// On-disk shader record
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Debug, Clone, Copy)]
#[repr(C)]
pub struct RawShader {
    /// NUL-padded name, not terminated when all 64 bytes are used
    name: [u8; MAX_QPATH],
    surface_flags: U32,
    content_flags: U32,
}

impl RawShader {
    /// Build a record, truncating `name` to [`MAX_QPATH`] bytes.
    pub fn new(name: &str, surface_flags: u32, content_flags: u32) -> Self {
        let mut raw = [0u8; MAX_QPATH];
        let len = name.len().min(MAX_QPATH);
        raw[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self {
            name: raw,
            surface_flags: U32::new(surface_flags),
            content_flags: U32::new(content_flags),
        }
    }
}

/// A decoded shader reference.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Shader {
    #[serde(rename = "shader")]
    pub name: String,
    pub surface_flags: u32,
    pub content_flags: u32,
}

impl From<&RawShader> for Shader {
    fn from(raw: &RawShader) -> Self {
        Self {
            name: crate::nul_terminated(&raw.name).into_owned(),
            surface_flags: raw.surface_flags.get(),
            content_flags: raw.content_flags.get(),
        }
    }
}

/// What to do with bytes after the last whole record of a lump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingBytes {
    /// Drop them with a warning
    #[default]
    Ignore,
    /// Fail with [`Error::PartialRecord`]
    Reject,
}

/// Decode raw shader lump bytes into `len / SHADER_RECORD_SIZE` shaders.
pub fn decode(lump: &[u8], trailing: TrailingBytes) -> Result<Vec<Shader>> {
    let count = lump.len() / SHADER_RECORD_SIZE;
    let (records, rest) = <[RawShader]>::ref_from_prefix_with_elems(lump, count).map_err(|_| {
        Error::RecordLayout {
            lump: LumpKind::Shaders,
            record_size: SHADER_RECORD_SIZE,
        }
    })?;

    if !rest.is_empty() {
        match trailing {
            TrailingBytes::Ignore => warn!(
                remainder = rest.len(),
                record_size = SHADER_RECORD_SIZE,
                "ignoring partial record at end of shaders lump"
            ),
            TrailingBytes::Reject => {
                return Err(Error::PartialRecord {
                    lump: LumpKind::Shaders,
                    remainder: rest.len(),
                    record_size: SHADER_RECORD_SIZE,
                })
            }
        }
    }

    let shaders: Vec<Shader> = records.iter().map(Shader::from).collect();
    debug!(count = shaders.len(), "decoded shaders");
    Ok(shaders)
}
