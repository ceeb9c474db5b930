use crate::{
    read_u16, write_u16, Attributes, DirEntry, FatError, FatResult, DIR_ENTRY_SIZE,
    LAST_LFN, LFN_CHARS_PER_ENTRY, LFN_ORDINAL_MASK, MAX_LFN_ENTRIES, SHORT_NAME_LEN,
};

const ORDINAL_OFFSET: usize = 0;
const ATTRS_OFFSET: usize = 11;
const TYPE_OFFSET: usize = 12;
const CHECKSUM_OFFSET: usize = 13;
const CLUSTER_OFFSET: usize = 26;
/// Byte offsets of the 13 UTF-16 slots: 5 + 6 + 2 around the fixed fields.
const NAME_SLOTS: [usize; LFN_CHARS_PER_ENTRY] = [1, 3, 5, 7, 9, 14, 16, 18, 20, 22, 24, 28, 30];
const NAME_TERMINATOR: u16 = 0x0000;
const NAME_PADDING: u16 = 0xffff;
const DECODE_CAPACITY: usize = MAX_LFN_ENTRIES * LFN_CHARS_PER_ENTRY;

/// Rotate-and-add hash of the 11 short-name bytes.
pub fn lfn_checksum(short_name: &[u8; SHORT_NAME_LEN]) -> u8 {
    short_name[1..]
        .iter()
        .fold(short_name[0], |sum, byte| sum.rotate_right(1).wrapping_add(*byte))
}

pub fn lfn_entry_count(name: &str) -> usize {
    (name.encode_utf16().count() + LFN_CHARS_PER_ENTRY - 1) / LFN_CHARS_PER_ENTRY
}

/// Write the record carrying chunk `ordinal` (1-based) of a `count`-record chain.
pub fn write_lfn_record(
    name: &str,
    ordinal: u8,
    count: u8,
    checksum: u8,
    out: &mut [u8],
) -> FatResult<usize> {
    if ordinal == 0 || ordinal > count {
        return Err(FatError::Invalid);
    }
    if out.len() < DIR_ENTRY_SIZE {
        return Err(FatError::NoSpace);
    }
    let record = &mut out[..DIR_ENTRY_SIZE];
    record[ORDINAL_OFFSET] = if ordinal == count {
        ordinal | LAST_LFN
    } else {
        ordinal
    };
    record[ATTRS_OFFSET] = Attributes::LONG_NAME.bits();
    record[TYPE_OFFSET] = 0;
    record[CHECKSUM_OFFSET] = checksum;
    write_u16(record, CLUSTER_OFFSET, 0);

    let start = (ordinal as usize - 1) * LFN_CHARS_PER_ENTRY;
    let mut units = name.encode_utf16().skip(start);
    let mut terminated = false;
    for offset in NAME_SLOTS {
        let unit = match units.next() {
            Some(unit) => unit,
            None if !terminated => {
                terminated = true;
                NAME_TERMINATOR
            }
            None => NAME_PADDING,
        };
        write_u16(record, offset, unit);
    }
    Ok(DIR_ENTRY_SIZE)
}

/// Write the full record chain for `name`, tail chunk first.
///
/// The checksum is taken from `entry`, the short record that must follow the
/// chain. Returns the bytes written. The 5-bit ordinal is not range checked;
/// callers keep names within `MAX_NAME_LEN`.
pub fn write_lfn_entries(name: &str, entry: &DirEntry, out: &mut [u8]) -> FatResult<usize> {
    let count = lfn_entry_count(name);
    let total = count * DIR_ENTRY_SIZE;
    if out.len() < total {
        return Err(FatError::NoSpace);
    }
    let checksum = lfn_checksum(&entry.short_name());
    for (slot, ordinal) in (1..=count).rev().enumerate() {
        let offset = slot * DIR_ENTRY_SIZE;
        write_lfn_record(name, ordinal as u8, count as u8, checksum, &mut out[offset..])?;
    }
    Ok(total)
}

#[derive(Clone, Copy)]
pub struct LfnName {
    units: [u16; DECODE_CAPACITY],
    len: usize,
}

impl LfnName {
    pub fn units(&self) -> &[u16] {
        &self.units[..self.len]
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        char::decode_utf16(self.units().iter().copied())
            .map(|ch| ch.unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    pub fn eq_str(&self, name: &str) -> bool {
        self.units().iter().copied().eq(name.encode_utf16())
    }
}

/// Reassembles a long name from records fed in on-disk order.
pub struct LfnDecoder {
    buf: [u16; DECODE_CAPACITY],
    expected: u8,
    count: u8,
    checksum: u8,
    active: bool,
}

impl LfnDecoder {
    pub const fn new() -> Self {
        Self {
            buf: [0; DECODE_CAPACITY],
            expected: 0,
            count: 0,
            checksum: 0,
            active: false,
        }
    }

    pub fn reset(&mut self) {
        self.buf = [0; DECODE_CAPACITY];
        self.expected = 0;
        self.count = 0;
        self.checksum = 0;
        self.active = false;
    }

    /// Feed one long-name record. A record that breaks the sequence drops
    /// everything collected so far and returns `false`.
    pub fn push(&mut self, record: &[u8]) -> bool {
        if record.len() < DIR_ENTRY_SIZE {
            self.reset();
            return false;
        }
        let ordinal = record[ORDINAL_OFFSET] & LFN_ORDINAL_MASK;
        if (record[ORDINAL_OFFSET] & LAST_LFN) != 0 {
            self.reset();
            self.active = true;
            self.expected = ordinal;
            self.count = ordinal;
            self.checksum = record[CHECKSUM_OFFSET];
        }
        if !self.active
            || ordinal == 0
            || ordinal != self.expected
            || record[CHECKSUM_OFFSET] != self.checksum
        {
            self.reset();
            return false;
        }
        let index = (ordinal - 1) as usize * LFN_CHARS_PER_ENTRY;
        if index + LFN_CHARS_PER_ENTRY > self.buf.len() {
            self.reset();
            return false;
        }
        for (idx, offset) in NAME_SLOTS.iter().enumerate() {
            self.buf[index + idx] = read_u16(record, *offset);
        }
        self.expected -= 1;
        true
    }

    /// Close the chain with the short entry that follows it. Yields the name
    /// only if every chunk arrived and the checksum matches `entry`.
    pub fn finish(&mut self, entry: &DirEntry) -> Option<LfnName> {
        if !self.active
            || self.expected != 0
            || self.checksum != lfn_checksum(&entry.short_name())
        {
            self.reset();
            return None;
        }
        let total = self.count as usize * LFN_CHARS_PER_ENTRY;
        let len = self.buf[..total]
            .iter()
            .position(|unit| *unit == NAME_TERMINATOR || *unit == NAME_PADDING)
            .unwrap_or(total);
        let name = LfnName {
            units: self.buf,
            len,
        };
        self.reset();
        if len == 0 {
            None
        } else {
            Some(name)
        }
    }
}

impl Default for LfnDecoder {
    fn default() -> Self {
        Self::new()
    }
}
