use fatdir::{read_u16, read_u32, write_u16, write_u32, FatError, FatResult};

use crate::block::SECTOR_SIZE;
use crate::layout::Layout;

const BPB_JUMP: [u8; 3] = [0xeb, 0x3c, 0x90];
const BPB_OEM_OFFSET: usize = 3;
const BPB_BYTES_PER_SECTOR_OFFSET: usize = 11;
const BPB_SECTORS_PER_CLUSTER_OFFSET: usize = 13;
const BPB_RESERVED_SECTORS_OFFSET: usize = 14;
const BPB_NUM_FATS_OFFSET: usize = 16;
const BPB_ROOT_ENTRIES_OFFSET: usize = 17;
const BPB_TOTAL_SECTORS_16_OFFSET: usize = 19;
const BPB_MEDIA_OFFSET: usize = 21;
const BPB_FAT_SIZE_16_OFFSET: usize = 22;
const BPB_SECTORS_PER_TRACK_OFFSET: usize = 24;
const BPB_HEADS_OFFSET: usize = 26;
const BPB_HIDDEN_SECTORS_OFFSET: usize = 28;
const BPB_TOTAL_SECTORS_32_OFFSET: usize = 32;
const BPB_DRIVE_NUMBER_OFFSET: usize = 36;
const BPB_EXT_SIGNATURE_OFFSET: usize = 38;
const BPB_VOLUME_ID_OFFSET: usize = 39;
const BPB_VOLUME_LABEL_OFFSET: usize = 43;
const BPB_FS_TYPE_OFFSET: usize = 54;
pub const BPB_SIGNATURE_OFFSET: usize = 510;
const BPB_SIGNATURE: u16 = 0xaa55;
const BPB_EXT_SIGNATURE: u8 = 0x29;
const FS_TYPE_FAT12: [u8; 8] = *b"FAT12   ";

/// Render the boot sector for `layout`, trailing `55 AA` included.
pub fn build_boot_sector(layout: &Layout) -> [u8; SECTOR_SIZE] {
    let mut sector = [0u8; SECTOR_SIZE];
    sector[..BPB_JUMP.len()].copy_from_slice(&BPB_JUMP);
    sector[BPB_OEM_OFFSET..BPB_OEM_OFFSET + 8].copy_from_slice(&layout.oem_id);
    write_u16(&mut sector, BPB_BYTES_PER_SECTOR_OFFSET, layout.bytes_per_sector());
    sector[BPB_SECTORS_PER_CLUSTER_OFFSET] = layout.sectors_per_cluster;
    write_u16(&mut sector, BPB_RESERVED_SECTORS_OFFSET, layout.reserved_sectors);
    sector[BPB_NUM_FATS_OFFSET] = layout.fat_copies;
    write_u16(&mut sector, BPB_ROOT_ENTRIES_OFFSET, layout.root_entries);
    write_u16(&mut sector, BPB_TOTAL_SECTORS_16_OFFSET, layout.total_sectors);
    sector[BPB_MEDIA_OFFSET] = layout.media;
    write_u16(&mut sector, BPB_FAT_SIZE_16_OFFSET, layout.sectors_per_fat);
    write_u16(&mut sector, BPB_SECTORS_PER_TRACK_OFFSET, layout.sectors_per_track);
    write_u16(&mut sector, BPB_HEADS_OFFSET, layout.heads);
    write_u32(&mut sector, BPB_HIDDEN_SECTORS_OFFSET, 0);
    write_u32(&mut sector, BPB_TOTAL_SECTORS_32_OFFSET, 0);
    sector[BPB_DRIVE_NUMBER_OFFSET] = 0;
    sector[BPB_EXT_SIGNATURE_OFFSET] = BPB_EXT_SIGNATURE;
    write_u32(&mut sector, BPB_VOLUME_ID_OFFSET, layout.volume_serial);
    sector[BPB_VOLUME_LABEL_OFFSET..BPB_VOLUME_LABEL_OFFSET + 11]
        .copy_from_slice(&layout.volume_label);
    sector[BPB_FS_TYPE_OFFSET..BPB_FS_TYPE_OFFSET + 8].copy_from_slice(&FS_TYPE_FAT12);
    write_u16(&mut sector, BPB_SIGNATURE_OFFSET, BPB_SIGNATURE);
    sector
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bpb {
    pub oem_id: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub root_entries: u16,
    pub total_sectors: u32,
    pub media: u8,
    pub sectors_per_fat: u16,
    pub volume_serial: u32,
    pub volume_label: [u8; 11],
    pub fs_type: [u8; 8],
}

impl Bpb {
    pub fn parse(buf: &[u8]) -> FatResult<Self> {
        if buf.len() < SECTOR_SIZE {
            return Err(FatError::Invalid);
        }
        if read_u16(buf, BPB_SIGNATURE_OFFSET) != BPB_SIGNATURE {
            return Err(FatError::Invalid);
        }
        let bytes_per_sector = read_u16(buf, BPB_BYTES_PER_SECTOR_OFFSET);
        let sectors_per_cluster = buf[BPB_SECTORS_PER_CLUSTER_OFFSET];
        let reserved_sectors = read_u16(buf, BPB_RESERVED_SECTORS_OFFSET);
        let num_fats = buf[BPB_NUM_FATS_OFFSET];
        let root_entries = read_u16(buf, BPB_ROOT_ENTRIES_OFFSET);
        let total_sectors_16 = read_u16(buf, BPB_TOTAL_SECTORS_16_OFFSET);
        let total_sectors_32 = read_u32(buf, BPB_TOTAL_SECTORS_32_OFFSET);
        let sectors_per_fat = read_u16(buf, BPB_FAT_SIZE_16_OFFSET);
        let total_sectors = if total_sectors_16 != 0 {
            total_sectors_16 as u32
        } else {
            total_sectors_32
        };
        // Root entries and a 16-bit FAT size only exist below FAT32.
        if bytes_per_sector == 0
            || sectors_per_cluster == 0
            || reserved_sectors == 0
            || num_fats == 0
            || total_sectors == 0
            || sectors_per_fat == 0
            || root_entries == 0
        {
            return Err(FatError::Invalid);
        }
        let (volume_serial, volume_label, fs_type) =
            if buf[BPB_EXT_SIGNATURE_OFFSET] == BPB_EXT_SIGNATURE {
                let mut label = [0u8; 11];
                label.copy_from_slice(&buf[BPB_VOLUME_LABEL_OFFSET..BPB_VOLUME_LABEL_OFFSET + 11]);
                let mut fs_type = [0u8; 8];
                fs_type.copy_from_slice(&buf[BPB_FS_TYPE_OFFSET..BPB_FS_TYPE_OFFSET + 8]);
                (read_u32(buf, BPB_VOLUME_ID_OFFSET), label, fs_type)
            } else {
                (0, [b' '; 11], [b' '; 8])
            };
        let mut oem_id = [0u8; 8];
        oem_id.copy_from_slice(&buf[BPB_OEM_OFFSET..BPB_OEM_OFFSET + 8]);
        Ok(Self {
            oem_id,
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            num_fats,
            root_entries,
            total_sectors,
            media: buf[BPB_MEDIA_OFFSET],
            sectors_per_fat,
            volume_serial,
            volume_label,
            fs_type,
        })
    }

    pub fn fat_start_sector(&self) -> u32 {
        self.reserved_sectors as u32
    }

    pub fn root_dir_start_sector(&self) -> u32 {
        self.fat_start_sector() + self.sectors_per_fat as u32 * self.num_fats as u32
    }

    pub fn data_start_sector(&self) -> u32 {
        let root_bytes = self.root_entries as u32 * 32;
        let bytes_per_sector = self.bytes_per_sector as u32;
        self.root_dir_start_sector() + (root_bytes + bytes_per_sector - 1) / bytes_per_sector
    }
}
