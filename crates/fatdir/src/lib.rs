#![no_std]

// FAT directory record codec: short entries, long-name chains, DOS timestamps.
// Everything here writes into caller buffers and never allocates.

use core::fmt;

mod date;
mod entry;
mod lfn;

pub use date::{decode_dos_date, decode_dos_time, dos_date, dos_time};
pub use entry::{write_short_entry, Attributes, DirEntry};
pub use lfn::{
    lfn_checksum, lfn_entry_count, write_lfn_entries, write_lfn_record, LfnDecoder, LfnName,
};

#[cfg(test)]
extern crate std;

/// Size of every serialized directory record, short or long.
pub const DIR_ENTRY_SIZE: usize = 32;
pub const NAME_LEN: usize = 8;
pub const EXT_LEN: usize = 3;
pub const SHORT_NAME_LEN: usize = NAME_LEN + EXT_LEN;
/// Longest long name FAT accepts, in UTF-16 code units.
pub const MAX_NAME_LEN: usize = 255;
pub const LFN_CHARS_PER_ENTRY: usize = 13;
/// Records needed for a `MAX_NAME_LEN` name.
pub const MAX_LFN_ENTRIES: usize = (MAX_NAME_LEN + LFN_CHARS_PER_ENTRY - 1) / LFN_CHARS_PER_ENTRY;
/// Ordinal flag on the record holding the tail of the name.
pub const LAST_LFN: u8 = 0x40;
pub const DELETED_ENTRY: u8 = 0xe5;
pub const LFN_ORDINAL_MASK: u8 = 0x1f;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FatError {
    Invalid,
    NoSpace,
    BadName,
    Duplicate,
    TooManyEntries,
    TooLarge,
    Geometry,
}

impl fmt::Display for FatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Invalid => "invalid argument",
            Self::NoSpace => "output buffer too small",
            Self::BadName => "illegal file name",
            Self::Duplicate => "duplicate short name",
            Self::TooManyEntries => "directory entries exceed capacity",
            Self::TooLarge => "file exceeds one cluster",
            Self::Geometry => "inconsistent volume geometry",
        };
        f.write_str(msg)
    }
}

pub type FatResult<T> = core::result::Result<T, FatError>;

pub fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

pub fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

pub fn write_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
