use fatdir::{
    lfn_checksum, write_lfn_record, write_short_entry, FatError, FatResult, DIR_ENTRY_SIZE,
    MAX_NAME_LEN,
};
use log::{debug, info, trace, warn};

use crate::block::{BlockDevice, Lba, SECTOR_SIZE};
use crate::boot::build_boot_sector;
use crate::fat::build_fat_sector;
use crate::layout::{Layout, ENTRIES_PER_SECTOR};
use crate::vfile::VirtualFile;

/// The switch device: `switch_position` and its GRUB snippet.
pub type SwitchDisk<'a> = VirtualDisk<'a, 2>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Region {
    Boot,
    Fat,
    /// Sector index within the root directory.
    RootDir(u32),
    /// Only `offset == 0` invokes the producer; later sectors of the cluster
    /// read as zero. Files are capped at one sector, so nothing is lost.
    FileData { index: usize, offset: u32 },
    Unmapped,
}

pub struct VirtualDisk<'a, const N: usize> {
    layout: Layout,
    boot: [u8; SECTOR_SIZE],
    fat: [u8; SECTOR_SIZE],
    files: [VirtualFile<'a>; N],
}

impl<'a, const N: usize> VirtualDisk<'a, N> {
    /// Build the volume, panicking on an inconsistent layout or file table.
    pub fn new(layout: Layout, files: [VirtualFile<'a>; N]) -> Self {
        match Self::try_new(layout, files) {
            Ok(disk) => disk,
            Err(err) => panic!("virtual disk configuration: {}", err),
        }
    }

    /// Validate the table against `layout` and assign one cluster per file,
    /// in table order from `first_data_cluster`.
    pub fn try_new(layout: Layout, mut files: [VirtualFile<'a>; N]) -> FatResult<Self> {
        layout.validate()?;
        if N as u32 > layout.file_capacity() {
            return Err(FatError::Geometry);
        }
        let mut slots = 0usize;
        for (idx, file) in files.iter().enumerate() {
            if file.long_name().encode_utf16().count() > MAX_NAME_LEN {
                return Err(FatError::BadName);
            }
            // Producers fill only the first sector of their cluster.
            if file.size() as usize > SECTOR_SIZE {
                return Err(FatError::TooLarge);
            }
            let short_name = file.entry().short_name();
            if files[..idx]
                .iter()
                .any(|other| other.entry().short_name() == short_name)
            {
                return Err(FatError::Duplicate);
            }
            slots += file.dir_entry_count();
        }
        if slots > layout.root_entries as usize {
            return Err(FatError::TooManyEntries);
        }
        for (idx, file) in files.iter_mut().enumerate() {
            file.set_start_cluster(layout.first_data_cluster + idx as u16);
        }
        let boot = build_boot_sector(&layout);
        let fat = build_fat_sector(&layout, N)?;
        info!(
            "switchfs: {} sectors, {} root entries, {} files from lba {}",
            layout.total_sectors,
            layout.root_entries,
            N,
            layout.file_data_start()
        );
        Ok(Self {
            layout,
            boot,
            fat,
            files,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn files(&self) -> &[VirtualFile<'a>] {
        &self.files
    }

    fn region(&self, lba: Lba) -> Region {
        let layout = &self.layout;
        if lba >= layout.total_sectors as Lba {
            return Region::Unmapped;
        }
        if lba == 0 {
            return Region::Boot;
        }
        let fat_start = layout.fat_start(0);
        let root_start = layout.root_dir_start();
        if lba >= fat_start && lba < root_start {
            // Only the first sector of each copy carries entries.
            if (lba - fat_start) % layout.sectors_per_fat as Lba == 0 {
                return Region::Fat;
            }
            return Region::Unmapped;
        }
        if lba >= root_start && lba < layout.data_region_start() {
            return Region::RootDir(lba - root_start);
        }
        let data_start = layout.file_data_start();
        if lba >= data_start {
            let rel = lba - data_start;
            let per_cluster = layout.sectors_per_cluster as Lba;
            let index = (rel / per_cluster) as usize;
            if index < N {
                return Region::FileData {
                    index,
                    offset: rel % per_cluster,
                };
            }
        }
        Region::Unmapped
    }

    /// Emit directory slots `sector * 16 .. sector * 16 + 16` of the record
    /// stream: each file's long-name chain, tail first, then its short entry.
    fn fill_root_dir(&self, sector: u32, out: &mut [u8]) -> FatResult<()> {
        let first = sector as usize * ENTRIES_PER_SECTOR;
        let window = first..first + ENTRIES_PER_SECTOR;
        let mut slot = 0usize;
        for file in self.files.iter() {
            if slot >= window.end {
                break;
            }
            let name = file.long_name();
            let count = file.dir_entry_count() - 1;
            let checksum = lfn_checksum(&file.entry().short_name());
            for ordinal in (1..=count).rev() {
                if window.contains(&slot) {
                    let offset = (slot - first) * DIR_ENTRY_SIZE;
                    let record = &mut out[offset..];
                    write_lfn_record(name, ordinal as u8, count as u8, checksum, record)?;
                }
                slot += 1;
            }
            if window.contains(&slot) {
                let offset = (slot - first) * DIR_ENTRY_SIZE;
                write_short_entry(file.entry(), &mut out[offset..])?;
            }
            slot += 1;
        }
        debug!("switchfs: root dir sector {} ({} records total)", sector, slot);
        Ok(())
    }
}

impl<const N: usize> BlockDevice for VirtualDisk<'_, N> {
    fn block_size(&self) -> usize {
        SECTOR_SIZE
    }

    fn block_count(&self) -> u32 {
        self.layout.total_sectors as u32
    }

    fn read_block(&self, lba: Lba, buf: &mut [u8]) -> FatResult<()> {
        if buf.len() < SECTOR_SIZE {
            return Err(FatError::Invalid);
        }
        let out = &mut buf[..SECTOR_SIZE];
        out.fill(0);
        let region = self.region(lba);
        trace!("switchfs: read lba {} -> {:?}", lba, region);
        match region {
            Region::Boot => out.copy_from_slice(&self.boot),
            Region::Fat => out.copy_from_slice(&self.fat),
            Region::RootDir(sector) => self.fill_root_dir(sector, out)?,
            Region::FileData { index, offset } => {
                if offset == 0 {
                    self.files[index].read(out);
                }
            }
            Region::Unmapped => debug!("switchfs: unmapped lba {}", lba),
        }
        Ok(())
    }

    fn write_block(&self, lba: Lba, buf: &[u8]) -> FatResult<()> {
        warn!("switchfs: discarding {} byte write to lba {}", buf.len(), lba);
        Ok(())
    }

    fn flush(&self) -> FatResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot::Bpb;
    use crate::fat::{fat12_entry, FAT12_EOC};
    use crate::switch::{switch_files, GrubConfig, SwitchPosition};
    use core::cell::Cell;
    use fatdir::{DirEntry, LfnDecoder, LfnName};
    use std::io::{Cursor, Read};
    use std::string::String;
    use std::vec;
    use std::vec::Vec;

    fn read(disk: &impl BlockDevice, lba: Lba) -> [u8; SECTOR_SIZE] {
        let mut sector = [0xa5u8; SECTOR_SIZE];
        disk.read_block(lba, &mut sector).unwrap();
        sector
    }

    fn render(disk: &impl BlockDevice) -> Vec<u8> {
        let mut image = vec![0u8; disk.block_count() as usize * SECTOR_SIZE];
        disk.read_blocks(0, &mut image).unwrap();
        image
    }

    /// Walk a root directory dump, returning `(long name, short entry)` pairs.
    fn list_dir(records: &[u8]) -> Vec<(Option<LfnName>, DirEntry)> {
        let mut decoder = LfnDecoder::new();
        let mut found = Vec::new();
        for record in records.chunks_exact(DIR_ENTRY_SIZE) {
            if record[0] == 0 {
                break;
            }
            if record[11] == 0x0f {
                decoder.push(record);
                continue;
            }
            let entry = DirEntry::parse(record).unwrap();
            found.push((decoder.finish(&entry), entry));
        }
        found
    }

    fn blank(_: &mut [u8]) {}

    #[test]
    fn boot_sector_and_geometry() {
        let position = SwitchPosition::new(|| '0');
        let grub = GrubConfig::new(|| '0');
        let disk = SwitchDisk::new(Layout::DEFAULT, switch_files(&position, &grub).unwrap());
        assert_eq!(disk.block_size(), 512);
        assert_eq!(disk.block_count(), 128);
        let boot = read(&disk, 0);
        assert_eq!(&boot[510..], &[0x55, 0xaa]);
        let bpb = Bpb::parse(&boot).unwrap();
        assert_eq!(bpb.root_dir_start_sector(), 3);
        assert_eq!(bpb.data_start_sector(), 35);
        assert_eq!(bpb.volume_serial, 0x55aa_6922);
    }

    #[test]
    fn both_fat_copies_match() {
        let position = SwitchPosition::new(|| '0');
        let grub = GrubConfig::new(|| '0');
        let disk = SwitchDisk::new(Layout::DEFAULT, switch_files(&position, &grub).unwrap());
        for lba in [1, 2] {
            let fat = read(&disk, lba);
            assert_eq!(&fat[..8], &[0xf8, 0xff, 0xff, 0x00, 0xf0, 0xff, 0xff, 0x0f]);
            assert!(fat[8..].iter().all(|b| *b == 0));
        }
    }

    #[test]
    fn single_file_root_dir() {
        let position = SwitchPosition::new(|| '1');
        let entry = DirEntry::new("SWITCH~1", "").unwrap().with_size(1);
        let disk = VirtualDisk::new(
            Layout::DEFAULT,
            [VirtualFile::new("switch_position", entry, &position)],
        );
        let dir = read(&disk, 3);
        // Two long-name records, tail first, then the short entry.
        assert_eq!(dir[0], 0x42);
        assert_eq!(dir[32], 0x01);
        assert_eq!(dir[11], 0x0f);
        assert_eq!(dir[13], 0x6f);
        assert_eq!(&dir[64..75], b"SWITCH~1   ");
        assert_eq!(u16::from_le_bytes([dir[90], dir[91]]), 3);
        assert!(dir[96..].iter().all(|b| *b == 0));

        let listing = list_dir(&dir);
        assert_eq!(listing.len(), 1);
        let (name, short) = &listing[0];
        assert!(name.as_ref().unwrap().eq_str("switch_position"));
        assert_eq!(short.start, 3);
        assert_eq!(short.size, 1);

        assert_eq!(read(&disk, 36)[0], b'1');
    }

    #[test]
    fn two_file_root_dir() {
        let position = SwitchPosition::new(|| '0');
        let grub = GrubConfig::new(|| '0');
        let disk = SwitchDisk::new(Layout::DEFAULT, switch_files(&position, &grub).unwrap());
        let listing = list_dir(&read(&disk, 3));
        assert_eq!(listing.len(), 2);
        assert!(listing[0].0.as_ref().unwrap().eq_str("switch_position"));
        assert_eq!(listing[0].1.start, 3);
        assert!(listing[1].0.as_ref().unwrap().eq_str("switch_position_grub.cfg"));
        assert_eq!(&listing[1].1.short_name(), b"SWITCH~1CFG");
        assert_eq!(listing[1].1.start, 4);
        assert_eq!(listing[1].1.size, 19);
        assert_eq!(&read(&disk, 37)[..19], b"set os_hw_switch=0\n");
        // Remaining root sectors are empty.
        for lba in 4..35 {
            assert!(read(&disk, lba).iter().all(|b| *b == 0), "lba {lba}");
        }
    }

    #[test]
    fn empty_table() {
        let disk = VirtualDisk::<0>::new(Layout::DEFAULT, []);
        assert!(read(&disk, 3).iter().all(|b| *b == 0));
        assert!(read(&disk, 36).iter().all(|b| *b == 0));
        let fat = read(&disk, 1);
        assert_eq!(&fat[..3], &[0xf8, 0xff, 0xff]);
        assert!(fat[3..].iter().all(|b| *b == 0));
        let bpb = Bpb::parse(&read(&disk, 0)).unwrap();
        assert_eq!(bpb.total_sectors, 128);
        assert_eq!(bpb.root_entries, 512);
    }

    #[test]
    fn unmapped_reads_are_zero_and_stable() {
        let position = SwitchPosition::new(|| '1');
        let grub = GrubConfig::new(|| '1');
        let disk = SwitchDisk::new(Layout::DEFAULT, switch_files(&position, &grub).unwrap());
        // Cluster 2, an unallocated cluster, and past the end of the volume.
        for lba in [35, 38, 127, 128, 5000] {
            let first = read(&disk, lba);
            let second = read(&disk, lba);
            assert!(first.iter().all(|b| *b == 0), "lba {lba}");
            assert_eq!(first, second);
        }
    }

    #[test]
    fn content_follows_switch() {
        let state = Cell::new('0');
        let reader = || state.get();
        let position = SwitchPosition::new(&reader);
        let grub = GrubConfig::new(&reader);
        let disk = SwitchDisk::new(Layout::DEFAULT, switch_files(&position, &grub).unwrap());
        let before = read(&disk, 36);
        let grub_before = read(&disk, 37);
        state.set('1');
        let after = read(&disk, 36);
        assert_ne!(before, after);
        assert_eq!(before[0], b'0');
        assert_eq!(after[0], b'1');
        assert!(after[1..].iter().all(|b| *b == 0));
        assert_eq!(&grub_before[..19], b"set os_hw_switch=0\n");
        assert_eq!(&read(&disk, 37)[..19], b"set os_hw_switch=1\n");
    }

    #[test]
    fn writes_are_discarded() {
        let position = SwitchPosition::new(|| '0');
        let grub = GrubConfig::new(|| '0');
        let disk = SwitchDisk::new(Layout::DEFAULT, switch_files(&position, &grub).unwrap());
        let before = render(&disk);
        let junk = [0xffu8; SECTOR_SIZE];
        for lba in [0, 1, 3, 36, 100] {
            assert_eq!(disk.write_block(lba, &junk), Ok(()));
        }
        assert_eq!(disk.flush(), Ok(()));
        assert_eq!(render(&disk), before);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let disk = VirtualDisk::<0>::new(Layout::DEFAULT, []);
        let mut buf = [0u8; 100];
        assert_eq!(disk.read_block(0, &mut buf), Err(FatError::Invalid));
        let mut odd = [0u8; 700];
        assert_eq!(disk.read_blocks(0, &mut odd), Err(FatError::Invalid));
    }

    #[test]
    fn configuration_defects() {
        let producer = blank;
        let entry = |name: &str| DirEntry::new(name, "").unwrap().with_size(1);

        let long = "a".repeat(256);
        assert_eq!(
            VirtualDisk::try_new(
                Layout::DEFAULT,
                [VirtualFile::new(&long, entry("LONG~1"), &producer)],
            )
            .err(),
            Some(FatError::BadName)
        );

        let big = DirEntry::new("BIG", "").unwrap().with_size(513);
        assert_eq!(
            VirtualDisk::try_new(Layout::DEFAULT, [VirtualFile::new("big", big, &producer)]).err(),
            Some(FatError::TooLarge)
        );

        assert_eq!(
            VirtualDisk::try_new(
                Layout::DEFAULT,
                [
                    VirtualFile::new("first", entry("SAME"), &producer),
                    VirtualFile::new("second", entry("SAME"), &producer),
                ],
            )
            .err(),
            Some(FatError::Duplicate)
        );

        // Six files of three records each overflow a one-sector directory.
        let small_root = Layout {
            root_entries: 16,
            ..Layout::DEFAULT
        };
        let names = ["F1", "F2", "F3", "F4", "F5", "F6"];
        let files = names.map(|name| VirtualFile::new("fourteen_chars", entry(name), &producer));
        assert_eq!(
            VirtualDisk::try_new(small_root, files).err(),
            Some(FatError::TooManyEntries)
        );

        let bad_layout = Layout {
            fat_copies: 0,
            ..Layout::DEFAULT
        };
        assert_eq!(
            VirtualDisk::<0>::try_new(bad_layout, []).err(),
            Some(FatError::Geometry)
        );

        // Three sectors of data leave room for two files after cluster 2.
        let tiny = Layout {
            total_sectors: 38,
            ..Layout::DEFAULT
        };
        let files = ["A", "B", "C"].map(|name| VirtualFile::new("x", entry(name), &producer));
        assert_eq!(
            VirtualDisk::try_new(tiny, files).err(),
            Some(FatError::Geometry)
        );
    }

    #[test]
    #[should_panic(expected = "duplicate short name")]
    fn duplicate_short_names_panic() {
        let producer = blank;
        let entry = DirEntry::new("SAME", "TXT").unwrap();
        VirtualDisk::new(
            Layout::DEFAULT,
            [
                VirtualFile::new("one.txt", entry, &producer),
                VirtualFile::new("two.txt", entry, &producer),
            ],
        );
    }

    #[test]
    fn root_dir_spans_sectors() {
        let producer = |out: &mut [u8]| out[0] = b'x';
        let names = [
            "long_file_name_0",
            "long_file_name_1",
            "long_file_name_2",
            "long_file_name_3",
            "long_file_name_4",
            "long_file_name_5",
            "long_file_name_6",
            "long_file_name_7",
        ];
        let mut idx = 0;
        let files = names.map(|name| {
            idx += 1;
            let short = std::format!("LONG_~{idx}");
            let entry = DirEntry::new(&short, "").unwrap().with_size(1);
            VirtualFile::new(name, entry, &producer)
        });
        let disk = VirtualDisk::new(Layout::DEFAULT, files);

        // 24 records: 16 in the first sector, 8 in the second.
        let mut dir = Vec::new();
        dir.extend_from_slice(&read(&disk, 3));
        dir.extend_from_slice(&read(&disk, 4));
        assert!(dir[16 * DIR_ENTRY_SIZE..24 * DIR_ENTRY_SIZE].iter().any(|b| *b != 0));
        assert!(dir[24 * DIR_ENTRY_SIZE..].iter().all(|b| *b == 0));

        let listing = list_dir(&dir);
        assert_eq!(listing.len(), 8);
        for (idx, (name, entry)) in listing.iter().enumerate() {
            assert!(name.as_ref().unwrap().eq_str(names[idx]), "file {idx}");
            assert_eq!(entry.start, 3 + idx as u16);
            assert_eq!(read(&disk, 36 + idx as Lba)[0], b'x');
        }
        let fat = read(&disk, 1);
        for cluster in 3..11 {
            assert_eq!(fat12_entry(&fat, cluster), FAT12_EOC);
        }
    }

    #[test]
    fn multi_sector_clusters() {
        let layout = Layout {
            sectors_per_cluster: 4,
            ..Layout::DEFAULT
        };
        let position = SwitchPosition::new(|| '1');
        let grub = GrubConfig::new(|| '1');
        let disk = SwitchDisk::new(layout, switch_files(&position, &grub).unwrap());
        assert_eq!(read(&disk, 39)[0], b'1');
        for lba in 40..43 {
            assert!(read(&disk, lba).iter().all(|b| *b == 0), "lba {lba}");
        }
        assert_eq!(&read(&disk, 43)[..19], b"set os_hw_switch=1\n");
        assert!(read(&disk, 47).iter().all(|b| *b == 0));
    }

    #[test]
    fn mounts_with_fatfs() {
        let position = SwitchPosition::new(|| '1');
        let grub = GrubConfig::new(|| '1');
        let disk = SwitchDisk::new(Layout::DEFAULT, switch_files(&position, &grub).unwrap());
        let fs = fatfs::FileSystem::new(Cursor::new(render(&disk)), fatfs::FsOptions::new())
            .unwrap();
        assert_eq!(fs.fat_type(), fatfs::FatType::Fat12);
        assert_eq!(fs.volume_id(), 0x55aa_6922);

        let root = fs.root_dir();
        let names: Vec<String> = root.iter().map(|entry| entry.unwrap().file_name()).collect();
        assert_eq!(names, ["switch_position", "switch_position_grub.cfg"]);

        let mut content = Vec::new();
        root.open_file("switch_position")
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"1");

        let mut content = String::new();
        root.open_file("switch_position_grub.cfg")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "set os_hw_switch=1\n");
    }
}
