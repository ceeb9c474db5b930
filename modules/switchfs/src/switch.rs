use fatdir::{DirEntry, FatResult};

use crate::vfile::{ContentProducer, VirtualFile};

pub const SWITCH_POSITION_NAME: &str = "switch_position";
pub const GRUB_CONFIG_NAME: &str = "switch_position_grub.cfg";
/// GRUB line; the byte before the newline is replaced by the switch value.
pub const GRUB_CONFIG_TEMPLATE: &[u8; 19] = b"set os_hw_switch=0\n";
const GRUB_VALUE_OFFSET: usize = GRUB_CONFIG_TEMPLATE.len() - 2;

/// Live switch state, sampled on every call.
pub trait SwitchReader {
    /// A printable character for the current position, usually `'0'` or `'1'`.
    fn read_switch(&self) -> char;
}

impl<F: Fn() -> char> SwitchReader for F {
    fn read_switch(&self) -> char {
        self()
    }
}

pub struct SwitchPosition<R> {
    reader: R,
}

impl<R: SwitchReader> SwitchPosition<R> {
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: SwitchReader> ContentProducer for SwitchPosition<R> {
    fn produce(&self, out: &mut [u8]) {
        if let Some(byte) = out.first_mut() {
            *byte = switch_byte(self.reader.read_switch());
        }
    }
}

/// `switch_position_grub.cfg`: `set os_hw_switch=<value>` for GRUB to source.
pub struct GrubConfig<R> {
    reader: R,
}

impl<R: SwitchReader> GrubConfig<R> {
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: SwitchReader> ContentProducer for GrubConfig<R> {
    fn produce(&self, out: &mut [u8]) {
        let mut line = *GRUB_CONFIG_TEMPLATE;
        line[GRUB_VALUE_OFFSET] = switch_byte(self.reader.read_switch());
        let len = line.len().min(out.len());
        out[..len].copy_from_slice(&line[..len]);
    }
}

/// The device's root directory: both files share the `SWITCH~1` base name
/// and differ by extension.
pub fn switch_files<'a, P: SwitchReader, G: SwitchReader>(
    position: &'a SwitchPosition<P>,
    grub: &'a GrubConfig<G>,
) -> FatResult<[VirtualFile<'a>; 2]> {
    let position_entry = DirEntry::new("SWITCH~1", "")?.with_size(1);
    let grub_entry =
        DirEntry::new("SWITCH~1", "CFG")?.with_size(GRUB_CONFIG_TEMPLATE.len() as u32);
    Ok([
        VirtualFile::new(SWITCH_POSITION_NAME, position_entry, position),
        VirtualFile::new(GRUB_CONFIG_NAME, grub_entry, grub),
    ])
}

fn switch_byte(value: char) -> u8 {
    if value.is_ascii() && !value.is_ascii_control() {
        value as u8
    } else {
        b'?'
    }
}
