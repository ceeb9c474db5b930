use fatdir::{FatError, FatResult};

/// Sector index as seen by the mass-storage transport.
pub type Lba = u32;

/// Sector size fixed by the USB mass-storage driver.
pub const SECTOR_SIZE: usize = 512;

/// Block-level seam between the storage transport and a volume.
pub trait BlockDevice {
    fn block_size(&self) -> usize;
    /// Capacity advertised to the host, in blocks.
    fn block_count(&self) -> u32;
    fn read_block(&self, lba: Lba, buf: &mut [u8]) -> FatResult<()>;
    fn write_block(&self, lba: Lba, buf: &[u8]) -> FatResult<()>;
    fn flush(&self) -> FatResult<()>;

    /// Read consecutive blocks starting at `start` into `buf`, whose length
    /// must be a whole number of blocks. Returns the block count read.
    fn read_blocks(&self, start: Lba, buf: &mut [u8]) -> FatResult<usize> {
        let block_size = self.block_size();
        if block_size == 0 || buf.len() % block_size != 0 {
            return Err(FatError::Invalid);
        }
        for (idx, chunk) in buf.chunks_exact_mut(block_size).enumerate() {
            let lba = start.checked_add(idx as Lba).ok_or(FatError::Invalid)?;
            self.read_block(lba, chunk)?;
        }
        Ok(buf.len() / block_size)
    }
}
