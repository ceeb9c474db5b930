use fatdir::{lfn_entry_count, DirEntry};

/// Source of a virtual file's bytes.
///
/// Called on every read of the file's data sector; nothing is cached. `out`
/// is one zero-filled sector, so a producer only writes its content bytes.
/// Producers must not block and must give the same bytes for the same
/// external state.
pub trait ContentProducer {
    fn produce(&self, out: &mut [u8]);
}

impl<F: Fn(&mut [u8])> ContentProducer for F {
    fn produce(&self, out: &mut [u8]) {
        self(out)
    }
}

#[derive(Clone, Copy)]
pub struct VirtualFile<'a> {
    long_name: &'a str,
    entry: DirEntry,
    producer: &'a dyn ContentProducer,
}

impl<'a> VirtualFile<'a> {
    /// `entry` carries the 8.3 name and the advertised size; its start
    /// cluster is assigned when the file is placed on a disk.
    pub fn new(long_name: &'a str, entry: DirEntry, producer: &'a dyn ContentProducer) -> Self {
        Self {
            long_name,
            entry,
            producer,
        }
    }

    pub fn long_name(&self) -> &'a str {
        self.long_name
    }

    pub fn entry(&self) -> &DirEntry {
        &self.entry
    }

    pub fn size(&self) -> u32 {
        self.entry.size
    }

    pub fn start_cluster(&self) -> u16 {
        self.entry.start
    }

    /// Directory slots taken: the long-name chain plus the short record.
    pub fn dir_entry_count(&self) -> usize {
        lfn_entry_count(self.long_name) + 1
    }

    pub fn read(&self, out: &mut [u8]) {
        self.producer.produce(out);
    }

    pub(crate) fn set_start_cluster(&mut self, cluster: u16) {
        self.entry.start = cluster;
    }
}
