//! Decoding of toolchain-embedded build provenance.
//!
//! Executables produced by the Go toolchain carry a small header pointing at
//! two strings: the toolchain version and the module-info text. Since Go 1.18
//! both strings follow the header inline, prefixed by a varint length. Older
//! images store pointers to string headers instead, which are resolved
//! through the loadable segments.

pub mod locate;
pub mod modinfo;

use locate::{find_header, ElfImage, BUILDINFO_MAGIC, HEADER_SIZE};
pub use modinfo::{BuildSetting, ModInfo, Module};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const FLAG_BIG_ENDIAN: u8 = 0x1;
const FLAG_INLINE_STRINGS: u8 = 0x2;

// Pointer-form string lengths above this are treated as corrupt.
const MAX_STRING_LEN: u64 = 1 << 32;

/// Provenance decoding failures.
#[derive(Debug, Error)]
pub enum BuildInfoError {
    #[error("not an ELF image")]
    NotElf,

    #[error("object parse failed: {0}")]
    Object(#[from] object::Error),

    #[error("no build info header found")]
    NotFound,

    #[error("build info truncated: {0}")]
    Truncated(&'static str),

    #[error("unsupported pointer size {0}")]
    UnsupportedPointerSize(u8),

    #[error("address {0:#x} is not mapped by any segment")]
    AddressNotMapped(u64),

    #[error("build info has no toolchain version")]
    MissingVersion,

    #[error("invalid module info at line {line}: {reason}")]
    InvalidModInfo { line: usize, reason: String },
}

/// Decoded provenance of one executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub go_version: String,
    pub path: String,
    pub main: Module,
    pub deps: Vec<Module>,
    pub settings: Vec<BuildSetting>,
}

impl BuildInfo {
    /// Value of the last `build` record with `key`.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings
            .iter()
            .rev()
            .find(|s| s.key == key)
            .map(|s| s.value.as_str())
    }
}

/// True when `data` is an ELF image exposing a provenance header.
///
/// Only the header's presence is checked; the strings behind it are decoded
/// by [`read`], which reports corruption as an error.
pub fn has_buildinfo(data: &[u8]) -> bool {
    ElfImage::parse(data)
        .ok()
        .and_then(|image| image.data_region())
        .and_then(find_header)
        .is_some()
}

/// Decode the provenance embedded in an ELF image.
pub fn read(data: &[u8]) -> Result<BuildInfo, BuildInfoError> {
    let image = ElfImage::parse(data)?;
    let region = image.data_region().ok_or(BuildInfoError::NotFound)?;
    let header = find_header(region).ok_or(BuildInfoError::NotFound)?;
    debug_assert!(header.starts_with(BUILDINFO_MAGIC));

    let ptr_size = header[14];
    let flags = header[15];

    let (version, raw_modinfo) = if flags & FLAG_INLINE_STRINGS != 0 {
        let (version, rest) = decode_inline(&header[HEADER_SIZE..])?;
        let (module_text, _) = decode_inline(rest)?;
        (version, module_text)
    } else {
        let reader = PointerReader::new(&image, ptr_size, flags & FLAG_BIG_ENDIAN != 0)?;
        let version = reader.string_at(reader.read_ptr(&header[16..])?)?;
        let module_text =
            reader.string_at(reader.read_ptr(&header[16 + ptr_size as usize..])?)?;
        (version, module_text)
    };

    if version.is_empty() {
        return Err(BuildInfoError::MissingVersion);
    }
    let go_version = String::from_utf8_lossy(version).into_owned();

    let text = String::from_utf8_lossy(modinfo::strip_sentinels(raw_modinfo));
    let info = modinfo::parse(&text)?;

    debug!(
        go_version = %go_version,
        module = %info.main.path,
        settings = info.settings.len(),
        "Decoded build info"
    );

    Ok(BuildInfo {
        go_version,
        path: info.path,
        main: info.main,
        deps: info.deps,
        settings: info.settings,
    })
}

/// Split a varint-length-prefixed string off the front of `data`.
fn decode_inline(data: &[u8]) -> Result<(&[u8], &[u8]), BuildInfoError> {
    let (len, used) = read_uvarint(data).ok_or(BuildInfoError::Truncated("string length"))?;
    let rest = &data[used..];
    let len = usize::try_from(len).map_err(|_| BuildInfoError::Truncated("string length"))?;
    if len > rest.len() {
        return Err(BuildInfoError::Truncated("inline string"));
    }
    Ok(rest.split_at(len))
}

/// Unsigned LEB128, at most 10 bytes.
fn read_uvarint(data: &[u8]) -> Option<(u64, usize)> {
    let mut value = 0u64;
    for (i, &byte) in data.iter().enumerate().take(10) {
        if i == 9 && byte > 1 {
            return None;
        }
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

/// Reads pointer-form string headers out of a pre-1.18 image.
struct PointerReader<'a, 'data> {
    image: &'a ElfImage<'data>,
    ptr_size: usize,
    big_endian: bool,
}

impl<'a, 'data> PointerReader<'a, 'data> {
    fn new(image: &'a ElfImage<'data>, ptr_size: u8, big_endian: bool) -> Result<Self, BuildInfoError> {
        if ptr_size != 4 && ptr_size != 8 {
            return Err(BuildInfoError::UnsupportedPointerSize(ptr_size));
        }
        Ok(Self {
            image,
            ptr_size: ptr_size as usize,
            // Older headers leave the flag unset; trust the ELF header then.
            big_endian: big_endian || image.is_big_endian(),
        })
    }

    fn read_ptr(&self, bytes: &[u8]) -> Result<u64, BuildInfoError> {
        let bytes = bytes
            .get(..self.ptr_size)
            .ok_or(BuildInfoError::Truncated("pointer"))?;
        let value = match (self.ptr_size, self.big_endian) {
            (4, false) => u64::from(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            (4, true) => u64::from(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            (_, big_endian) => {
                let mut word = [0u8; 8];
                word.copy_from_slice(bytes);
                if big_endian {
                    u64::from_be_bytes(word)
                } else {
                    u64::from_le_bytes(word)
                }
            }
        };
        Ok(value)
    }

    fn string_at(&self, address: u64) -> Result<&'data [u8], BuildInfoError> {
        let header = self
            .image
            .read_at(address, 2 * self.ptr_size as u64)
            .ok_or(BuildInfoError::AddressNotMapped(address))?;
        let data_address = self.read_ptr(header)?;
        let len = self.read_ptr(&header[self.ptr_size..])?;
        if len > MAX_STRING_LEN {
            return Err(BuildInfoError::Truncated("string length"));
        }
        if len == 0 {
            return Ok(&[]);
        }
        self.image
            .read_at(data_address, len)
            .ok_or(BuildInfoError::AddressNotMapped(data_address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uvarint_decoding() {
        assert_eq!(read_uvarint(&[0x05]), Some((5, 1)));
        assert_eq!(read_uvarint(&[0xac, 0x02]), Some((300, 2)));
        assert_eq!(read_uvarint(&[0x80]), None);
        assert_eq!(read_uvarint(&[]), None);
    }

    #[test]
    fn inline_string_split() {
        let (s, rest) = decode_inline(b"\x03abcdef").unwrap();
        assert_eq!(s, b"abc");
        assert_eq!(rest, b"def");
    }

    #[test]
    fn inline_string_overrun() {
        let err = decode_inline(b"\x09abc").unwrap_err();
        assert!(matches!(err, BuildInfoError::Truncated("inline string")));
    }

    #[test]
    fn setting_lookup_prefers_last() {
        let info = BuildInfo {
            go_version: "go1.22.5".into(),
            path: String::new(),
            main: Module::default(),
            deps: Vec::new(),
            settings: vec![
                BuildSetting { key: "CGO_ENABLED".into(), value: "0".into() },
                BuildSetting { key: "CGO_ENABLED".into(), value: "1".into() },
            ],
        };
        assert_eq!(info.setting("CGO_ENABLED"), Some("1"));
        assert_eq!(info.setting("GOEXPERIMENT"), None);
    }

    #[test]
    fn garbage_is_not_buildinfo() {
        assert!(!has_buildinfo(b"\x7fELF garbage"));
        assert!(read(b"plain text").is_err());
    }
}
