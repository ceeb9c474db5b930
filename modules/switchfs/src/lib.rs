#![no_std]

// Read-only FAT12 volume synthesized on demand for a USB mass-storage
// transport. Sectors are computed per request; no image is stored.

pub mod block;
pub mod boot;
pub mod disk;
pub mod fat;
pub mod layout;
pub mod switch;
pub mod vfile;

pub use block::{BlockDevice, Lba, SECTOR_SIZE};
pub use boot::{build_boot_sector, Bpb};
pub use disk::{SwitchDisk, VirtualDisk};
pub use fat::build_fat_sector;
pub use fatdir::{FatError, FatResult};
pub use layout::Layout;
pub use switch::{switch_files, GrubConfig, SwitchPosition, SwitchReader};
pub use vfile::{ContentProducer, VirtualFile};

#[cfg(test)]
extern crate std;
