use bitflags::bitflags;

use crate::{
    read_u16, read_u32, write_u16, write_u32, FatError, FatResult, DIR_ENTRY_SIZE, EXT_LEN,
    NAME_LEN, SHORT_NAME_LEN,
};

const NAME_OFFSET: usize = 0;
const EXT_OFFSET: usize = 8;
const ATTRS_OFFSET: usize = 11;
const RESERVED_OFFSET: usize = 12;
const CTIME_MS_OFFSET: usize = 13;
const CTIME_OFFSET: usize = 14;
const CDATE_OFFSET: usize = 16;
const ADATE_OFFSET: usize = 18;
const EA_INDEX_OFFSET: usize = 20;
const MTIME_OFFSET: usize = 22;
const MDATE_OFFSET: usize = 24;
const START_OFFSET: usize = 26;
const SIZE_OFFSET: usize = 28;

const ILLEGAL_NAME_CHARS: &[u8] = b"\"*+,./:;<=>?[\\]|";

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Attributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN = 0x02;
        const SYSTEM = 0x04;
        const VOLUME_LABEL = 0x08;
        const SUBDIRECTORY = 0x10;
        const ARCHIVE = 0x20;
        /// Marker combination identifying a long-name record.
        const LONG_NAME = Self::READ_ONLY.bits()
            | Self::HIDDEN.bits()
            | Self::SYSTEM.bits()
            | Self::VOLUME_LABEL.bits();
    }
}

/// One 32-byte short-name record, field for field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: [u8; NAME_LEN],
    pub ext: [u8; EXT_LEN],
    pub attrs: Attributes,
    pub reserved: u8,
    pub ctime_ms: u8,
    pub ctime: u16,
    pub cdate: u16,
    pub adate: u16,
    /// High cluster word on FAT32, zero on FAT12.
    pub ea_index: u16,
    pub mtime: u16,
    pub mdate: u16,
    pub start: u16,
    pub size: u32,
}

impl DirEntry {
    pub const fn empty() -> Self {
        Self {
            name: [b' '; NAME_LEN],
            ext: [b' '; EXT_LEN],
            attrs: Attributes::empty(),
            reserved: 0,
            ctime_ms: 0,
            ctime: 0,
            cdate: 0,
            adate: 0,
            ea_index: 0,
            mtime: 0,
            mdate: 0,
            start: 0,
            size: 0,
        }
    }

    /// Build a record from an 8.3 name, padding both parts with spaces.
    ///
    /// Only upper-case printable ASCII outside the reserved punctuation set
    /// is accepted, so the first byte can never read as a deleted or free
    /// slot. Trailing spaces in either part are ignored.
    pub fn new(name: &str, ext: &str) -> FatResult<Self> {
        let name = name.trim_end_matches(' ');
        let ext = ext.trim_end_matches(' ');
        if name.is_empty() || name.len() > NAME_LEN || ext.len() > EXT_LEN {
            return Err(FatError::BadName);
        }
        let mut entry = Self::empty();
        for (idx, ch) in name.bytes().enumerate() {
            if !is_short_name_char(ch) {
                return Err(FatError::BadName);
            }
            entry.name[idx] = ch;
        }
        for (idx, ch) in ext.bytes().enumerate() {
            if !is_short_name_char(ch) {
                return Err(FatError::BadName);
            }
            entry.ext[idx] = ch;
        }
        Ok(entry)
    }

    pub const fn with_attrs(mut self, attrs: Attributes) -> Self {
        self.attrs = attrs;
        self
    }

    pub const fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub const fn with_created(mut self, date: u16, time: u16) -> Self {
        self.cdate = date;
        self.ctime = time;
        self
    }

    pub const fn with_modified(mut self, date: u16, time: u16) -> Self {
        self.mdate = date;
        self.mtime = time;
        self.adate = date;
        self
    }

    /// The 11 name bytes the long-name checksum covers.
    pub fn short_name(&self) -> [u8; SHORT_NAME_LEN] {
        let mut out = [b' '; SHORT_NAME_LEN];
        out[..NAME_LEN].copy_from_slice(&self.name);
        out[NAME_LEN..].copy_from_slice(&self.ext);
        out
    }

    /// Base name without padding.
    pub fn base(&self) -> &[u8] {
        trim_padding(&self.name)
    }

    /// Extension without padding.
    pub fn extension(&self) -> &[u8] {
        trim_padding(&self.ext)
    }

    pub fn is_long_name(&self) -> bool {
        self.attrs.contains(Attributes::LONG_NAME)
    }

    pub fn to_bytes(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut out = [0u8; DIR_ENTRY_SIZE];
        out[NAME_OFFSET..NAME_OFFSET + NAME_LEN].copy_from_slice(&self.name);
        out[EXT_OFFSET..EXT_OFFSET + EXT_LEN].copy_from_slice(&self.ext);
        out[ATTRS_OFFSET] = self.attrs.bits();
        out[RESERVED_OFFSET] = self.reserved;
        out[CTIME_MS_OFFSET] = self.ctime_ms;
        write_u16(&mut out, CTIME_OFFSET, self.ctime);
        write_u16(&mut out, CDATE_OFFSET, self.cdate);
        write_u16(&mut out, ADATE_OFFSET, self.adate);
        write_u16(&mut out, EA_INDEX_OFFSET, self.ea_index);
        write_u16(&mut out, MTIME_OFFSET, self.mtime);
        write_u16(&mut out, MDATE_OFFSET, self.mdate);
        write_u16(&mut out, START_OFFSET, self.start);
        write_u32(&mut out, SIZE_OFFSET, self.size);
        out
    }

    pub fn parse(buf: &[u8]) -> FatResult<Self> {
        if buf.len() < DIR_ENTRY_SIZE {
            return Err(FatError::Invalid);
        }
        let mut entry = Self::empty();
        entry.name.copy_from_slice(&buf[NAME_OFFSET..NAME_OFFSET + NAME_LEN]);
        entry.ext.copy_from_slice(&buf[EXT_OFFSET..EXT_OFFSET + EXT_LEN]);
        entry.attrs = Attributes::from_bits_retain(buf[ATTRS_OFFSET]);
        entry.reserved = buf[RESERVED_OFFSET];
        entry.ctime_ms = buf[CTIME_MS_OFFSET];
        entry.ctime = read_u16(buf, CTIME_OFFSET);
        entry.cdate = read_u16(buf, CDATE_OFFSET);
        entry.adate = read_u16(buf, ADATE_OFFSET);
        entry.ea_index = read_u16(buf, EA_INDEX_OFFSET);
        entry.mtime = read_u16(buf, MTIME_OFFSET);
        entry.mdate = read_u16(buf, MDATE_OFFSET);
        entry.start = read_u16(buf, START_OFFSET);
        entry.size = read_u32(buf, SIZE_OFFSET);
        Ok(entry)
    }
}

impl Default for DirEntry {
    fn default() -> Self {
        Self::empty()
    }
}

/// Copy `entry` into the head of `out`. Returns the bytes written (always 32).
pub fn write_short_entry(entry: &DirEntry, out: &mut [u8]) -> FatResult<usize> {
    if out.len() < DIR_ENTRY_SIZE {
        return Err(FatError::NoSpace);
    }
    out[..DIR_ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
    Ok(DIR_ENTRY_SIZE)
}

fn is_short_name_char(ch: u8) -> bool {
    ch.is_ascii_graphic() && !ch.is_ascii_lowercase() && !ILLEGAL_NAME_CHARS.contains(&ch)
}

fn trim_padding(field: &[u8]) -> &[u8] {
    let len = field
        .iter()
        .rposition(|ch| *ch != b' ')
        .map(|idx| idx + 1)
        .unwrap_or(0);
    &field[..len]
}
