//! Common test utilities and helpers.
//!
//! Synthetic ELF images carrying toolchain provenance, helpers for writing
//! executable files, and probes with scripted behaviour.

#![allow(dead_code)]

pub mod test_utils;

use std::path::Path;

/// Header magic written by the toolchain.
pub const MAGIC: &[u8; 14] = b"\xff Go buildinf:";

const SENTINEL_START: [u8; 16] = [
    0x30, 0x77, 0xaf, 0x0c, 0x92, 0x74, 0x08, 0x02, 0x41, 0xe1, 0xc1, 0x07, 0xe6, 0xd6, 0x18, 0xe6,
];
const SENTINEL_END: [u8; 16] = [
    0xf9, 0x32, 0x43, 0x31, 0x86, 0x18, 0x20, 0x72, 0x00, 0x82, 0x42, 0x10, 0x41, 0x16, 0xd8, 0xf2,
];

const LOAD_VADDR: u64 = 0x50_0080;
const BLOB_OFFSET: u64 = 128;

/// Common test data and constants
pub mod test_data {
    pub const GO_VERSION: &str = "go1.22.7";

    /// Built with the system crypto experiment and native interop.
    pub const SYSTEMCRYPTO_MODINFO: &str = "path\texample.com/agent\n\
        mod\texample.com/agent\tv1.4.0\th1:abc=\n\
        dep\tgolang.org/x/crypto\tv0.21.0\th1:def=\n\
        dep\tgolang.org/x/sys\tv0.18.0\th1:ghi=\n\
        build\t-compiler=gc\n\
        build\tCGO_ENABLED=1\n\
        build\tGOEXPERIMENT=systemcrypto\n\
        build\tGOOS=linux\n";

    /// Plain build with the toolchain's own crypto.
    pub const NATIVE_MODINFO: &str = "path\texample.com/tool\n\
        mod\texample.com/tool\t(devel)\t\n\
        build\tCGO_ENABLED=0\n\
        build\tGOOS=linux\n";
}

fn uvarint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// The 32-byte header followed by inline, length-prefixed strings.
pub fn buildinfo_blob(version: &str, modinfo: &str) -> Vec<u8> {
    let mut blob = Vec::new();
    blob.extend_from_slice(MAGIC);
    blob.push(8);
    blob.push(0x2);
    blob.extend_from_slice(&[0u8; 16]);

    uvarint(version.len() as u64, &mut blob);
    blob.extend_from_slice(version.as_bytes());

    let mut wrapped = Vec::new();
    wrapped.extend_from_slice(&SENTINEL_START);
    wrapped.extend_from_slice(modinfo.as_bytes());
    wrapped.extend_from_slice(&SENTINEL_END);
    uvarint(wrapped.len() as u64, &mut blob);
    blob.extend_from_slice(&wrapped);
    blob
}

/// A header whose version string claims more bytes than follow it.
pub fn truncated_blob() -> Vec<u8> {
    let mut blob = Vec::new();
    blob.extend_from_slice(MAGIC);
    blob.push(8);
    blob.push(0x2);
    blob.extend_from_slice(&[0u8; 16]);
    uvarint(200, &mut blob);
    blob.extend_from_slice(b"go1.2");
    blob
}

/// Minimal little-endian ELF64 executable with no section table and a single
/// writable, non-executable `PT_LOAD` segment holding `blob`.
pub fn elf_with_segment(blob: &[u8]) -> Vec<u8> {
    let mut image = Vec::with_capacity(BLOB_OFFSET as usize + blob.len());

    // e_ident
    image.extend_from_slice(b"\x7fELF");
    image.extend_from_slice(&[2, 1, 1, 0]);
    image.extend_from_slice(&[0u8; 8]);
    image.extend_from_slice(&2u16.to_le_bytes()); // ET_EXEC
    image.extend_from_slice(&62u16.to_le_bytes()); // EM_X86_64
    image.extend_from_slice(&1u32.to_le_bytes());
    image.extend_from_slice(&LOAD_VADDR.to_le_bytes()); // e_entry
    image.extend_from_slice(&64u64.to_le_bytes()); // e_phoff
    image.extend_from_slice(&0u64.to_le_bytes()); // e_shoff
    image.extend_from_slice(&0u32.to_le_bytes()); // e_flags
    image.extend_from_slice(&64u16.to_le_bytes()); // e_ehsize
    image.extend_from_slice(&56u16.to_le_bytes()); // e_phentsize
    image.extend_from_slice(&1u16.to_le_bytes()); // e_phnum
    image.extend_from_slice(&64u16.to_le_bytes()); // e_shentsize
    image.extend_from_slice(&0u16.to_le_bytes()); // e_shnum
    image.extend_from_slice(&0u16.to_le_bytes()); // e_shstrndx
    assert_eq!(image.len(), 64);

    // Program header: PT_LOAD, PF_R | PF_W
    image.extend_from_slice(&1u32.to_le_bytes());
    image.extend_from_slice(&6u32.to_le_bytes());
    image.extend_from_slice(&BLOB_OFFSET.to_le_bytes());
    image.extend_from_slice(&LOAD_VADDR.to_le_bytes());
    image.extend_from_slice(&LOAD_VADDR.to_le_bytes());
    image.extend_from_slice(&(blob.len() as u64).to_le_bytes());
    image.extend_from_slice(&(blob.len() as u64).to_le_bytes());
    image.extend_from_slice(&0x1000u64.to_le_bytes());
    assert_eq!(image.len(), 120);

    image.resize(BLOB_OFFSET as usize, 0);
    image.extend_from_slice(blob);
    image
}

/// ELF image carrying well-formed provenance.
pub fn go_elf(version: &str, modinfo: &str) -> Vec<u8> {
    elf_with_segment(&buildinfo_blob(version, modinfo))
}

/// ELF image without any provenance header.
pub fn plain_elf() -> Vec<u8> {
    elf_with_segment(&[0u8; 64])
}

/// Route library logs through the shared subscriber (`RUST_LOG` filters).
pub fn init_logging() {
    fipscan::logging::init_tracing(fipscan::logging::LogFormat::from_env());
}

/// Write a Go-looking executable at `dir/name`.
pub fn write_go_binary(dir: &Path, name: &str, modinfo: &str) -> std::path::PathBuf {
    test_utils::write_executable(dir, name, &go_elf(test_data::GO_VERSION, modinfo))
}
