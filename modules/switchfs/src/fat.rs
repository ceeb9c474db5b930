use fatdir::{FatError, FatResult};

use crate::block::SECTOR_SIZE;
use crate::layout::Layout;

pub const FAT12_EOC: u16 = 0x0fff;
const FAT12_ENTRY_MASK: u16 = 0x0fff;

/// Render the first sector of the FAT for `file_count` virtual files.
pub fn build_fat_sector(layout: &Layout, file_count: usize) -> FatResult<[u8; SECTOR_SIZE]> {
    let first = layout.first_data_cluster as usize;
    let last = first + file_count;
    if file_count > 0 && fat12_offset(last - 1) + 1 >= SECTOR_SIZE {
        return Err(FatError::TooManyEntries);
    }
    let mut sector = [0u8; SECTOR_SIZE];
    set_fat12_entry(&mut sector, 0, 0x0f00 | layout.media as u16);
    set_fat12_entry(&mut sector, 1, FAT12_EOC);
    for cluster in first..last {
        set_fat12_entry(&mut sector, cluster, FAT12_EOC);
    }
    Ok(sector)
}

pub fn fat12_entry(fat: &[u8], index: usize) -> u16 {
    let offset = fat12_offset(index);
    let raw = u16::from_le_bytes([fat[offset], fat[offset + 1]]);
    if index % 2 == 0 {
        raw & FAT12_ENTRY_MASK
    } else {
        raw >> 4
    }
}

fn set_fat12_entry(fat: &mut [u8], index: usize, value: u16) {
    let offset = fat12_offset(index);
    let value = value & FAT12_ENTRY_MASK;
    if index % 2 == 0 {
        fat[offset] = value as u8;
        fat[offset + 1] = (fat[offset + 1] & 0xf0) | (value >> 8) as u8;
    } else {
        fat[offset] = (fat[offset] & 0x0f) | ((value & 0x0f) << 4) as u8;
        fat[offset + 1] = (value >> 4) as u8;
    }
}

fn fat12_offset(index: usize) -> usize {
    index + index / 2
}
