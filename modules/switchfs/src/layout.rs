use fatdir::{FatError, FatResult, DIR_ENTRY_SIZE};

use crate::block::{Lba, SECTOR_SIZE};

/// Cluster number of the first virtual file. Cluster 2 stays unused.
pub const FIRST_DATA_CLUSTER: u16 = 3;
pub const MEDIA_FIXED_DISK: u8 = 0xf8;
/// FAT12 cannot address this many clusters.
pub const FAT12_MAX_CLUSTERS: u32 = 4085;
pub const ENTRIES_PER_SECTOR: usize = SECTOR_SIZE / DIR_ENTRY_SIZE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    /// Volume capacity, also the block count reported to the transport.
    pub total_sectors: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub fat_copies: u8,
    pub sectors_per_fat: u16,
    pub root_entries: u16,
    pub first_data_cluster: u16,
    pub media: u8,
    pub sectors_per_track: u16,
    pub heads: u16,
    pub volume_serial: u32,
    pub volume_label: [u8; 11],
    pub oem_id: [u8; 8],
}

impl Layout {
    /// 64 KiB switch volume: boot sector, two one-sector FATs, 32 root
    /// directory sectors, data from LBA 35.
    pub const DEFAULT: Self = Self {
        total_sectors: 128,
        sectors_per_cluster: 1,
        reserved_sectors: 1,
        fat_copies: 2,
        sectors_per_fat: 1,
        root_entries: 512,
        first_data_cluster: FIRST_DATA_CLUSTER,
        media: MEDIA_FIXED_DISK,
        sectors_per_track: 32,
        heads: 64,
        volume_serial: 0x55aa_6922,
        volume_label: *b"SWITCH     ",
        oem_id: *b"mkfs.fat",
    };

    pub const fn bytes_per_sector(&self) -> u16 {
        SECTOR_SIZE as u16
    }

    pub const fn cluster_size(&self) -> usize {
        SECTOR_SIZE * self.sectors_per_cluster as usize
    }

    pub const fn fat_start(&self, copy: u8) -> Lba {
        self.reserved_sectors as Lba + copy as Lba * self.sectors_per_fat as Lba
    }

    pub const fn root_dir_start(&self) -> Lba {
        self.fat_start(self.fat_copies)
    }

    pub const fn root_dir_sectors(&self) -> Lba {
        let bytes = self.root_entries as usize * DIR_ENTRY_SIZE;
        ((bytes + SECTOR_SIZE - 1) / SECTOR_SIZE) as Lba
    }

    /// First sector of cluster 2.
    pub const fn data_region_start(&self) -> Lba {
        self.root_dir_start() + self.root_dir_sectors()
    }

    pub const fn cluster_to_sector(&self, cluster: u16) -> Lba {
        let index = if cluster < 2 { 0 } else { cluster - 2 };
        self.data_region_start() + index as Lba * self.sectors_per_cluster as Lba
    }

    /// First sector of the first virtual file.
    pub const fn file_data_start(&self) -> Lba {
        self.cluster_to_sector(self.first_data_cluster)
    }

    /// Clusters in the data region, including the unused ones before
    /// `first_data_cluster`.
    pub const fn cluster_count(&self) -> u32 {
        let total = self.total_sectors as Lba;
        let start = self.data_region_start();
        if self.sectors_per_cluster == 0 || total <= start {
            return 0;
        }
        (total - start) / self.sectors_per_cluster as u32
    }

    /// Virtual files the data region can hold, one cluster each.
    pub const fn file_capacity(&self) -> u32 {
        let unused = (self.first_data_cluster as u32).saturating_sub(2);
        let clusters = self.cluster_count();
        if clusters <= unused {
            0
        } else {
            clusters - unused
        }
    }

    pub fn validate(&self) -> FatResult<()> {
        if self.sectors_per_cluster == 0
            || !self.sectors_per_cluster.is_power_of_two()
            || self.reserved_sectors == 0
            || self.fat_copies == 0
            || self.sectors_per_fat == 0
            || self.root_entries == 0
            || self.first_data_cluster < 2
        {
            return Err(FatError::Geometry);
        }
        if (self.root_entries as usize * DIR_ENTRY_SIZE) % SECTOR_SIZE != 0 {
            return Err(FatError::Geometry);
        }
        if self.file_data_start() >= self.total_sectors as Lba {
            return Err(FatError::Geometry);
        }
        let clusters = self.cluster_count();
        if clusters >= FAT12_MAX_CLUSTERS {
            return Err(FatError::Geometry);
        }
        // Every cluster plus the two reserved entries, 12 bits apiece.
        let fat_bytes = ((clusters as usize + 2) * 3 + 1) / 2;
        if fat_bytes > self.sectors_per_fat as usize * SECTOR_SIZE {
            return Err(FatError::Geometry);
        }
        Ok(())
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::DEFAULT
    }
}
