//! Locating the provenance header inside an ELF image.
//!
//! The toolchain writes a 32-byte header, 16-byte aligned, at the start of
//! the `.go.buildinfo` section. Stripped images lose the section table, so the
//! fallback is the first loadable segment that is writable but not executable.

use super::BuildInfoError;
use crate::io::MAX_PROVENANCE_SEARCH;
use object::read::{Object, ObjectSection, ObjectSegment};
use object::{BinaryFormat, SegmentFlags};
use tracing::trace;

/// Header magic: `\xff Go buildinf:`.
pub const BUILDINFO_MAGIC: &[u8; 14] = b"\xff Go buildinf:";
pub const HEADER_SIZE: usize = 32;
const HEADER_ALIGN: usize = 16;

pub const SECTION_NAME: &str = ".go.buildinfo";

/// A parsed ELF image able to resolve virtual addresses to file bytes.
pub struct ElfImage<'data> {
    file: object::File<'data>,
}

impl<'data> ElfImage<'data> {
    pub fn parse(data: &'data [u8]) -> Result<Self, BuildInfoError> {
        let file = object::File::parse(data)?;
        if file.format() != BinaryFormat::Elf {
            return Err(BuildInfoError::NotElf);
        }
        Ok(Self { file })
    }

    pub fn is_big_endian(&self) -> bool {
        !self.file.is_little_endian()
    }

    /// The region searched for the header, capped at `MAX_PROVENANCE_SEARCH`.
    pub fn data_region(&self) -> Option<&'data [u8]> {
        let region = match self.file.section_by_name(SECTION_NAME) {
            Some(section) => section.data().ok(),
            None => self.first_data_segment(),
        }?;
        Some(&region[..region.len().min(MAX_PROVENANCE_SEARCH)])
    }

    fn first_data_segment(&self) -> Option<&'data [u8]> {
        self.file.segments().find_map(|segment| match segment.flags() {
            SegmentFlags::Elf { p_flags }
                if p_flags & (object::elf::PF_X | object::elf::PF_W) == object::elf::PF_W =>
            {
                segment.data().ok()
            }
            _ => None,
        })
    }

    /// File bytes backing `[address, address + len)`, if one segment maps all of it.
    pub fn read_at(&self, address: u64, len: u64) -> Option<&'data [u8]> {
        self.file
            .segments()
            .find_map(|segment| segment.data_range(address, len).ok().flatten())
    }
}

/// Find the aligned header within `region`, returning the slice starting at it.
pub fn find_header(region: &[u8]) -> Option<&[u8]> {
    let mut offset = 0usize;
    loop {
        let rest = region.get(offset..)?;
        let found = offset + memchr::memmem::find(rest, BUILDINFO_MAGIC)?;
        if region.len() - found < HEADER_SIZE {
            return None;
        }
        if found % HEADER_ALIGN == 0 {
            trace!(offset = found, "Build info header located");
            return Some(&region[found..]);
        }
        // Misaligned hit: resume at the next alignment boundary.
        offset = (found + HEADER_ALIGN - 1) & !(HEADER_ALIGN - 1);
    }
}
