//! Host-side inspector for the switch volume.
//!
//! Builds the same `SwitchDisk` the firmware exposes, with the switch
//! simulated by `--switch`, and reads it through the block interface.
//!
//! ```bash
//! image_dump render -o switch.img      # full image, mountable with `mount -o loop`
//! image_dump --switch 1 list
//! image_dump sector 3
//! ```

use std::fmt::Write as _;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use fatdir::{DirEntry, FatError, LfnDecoder, DIR_ENTRY_SIZE};
use log::{debug, LevelFilter};
use switchfs::{
    switch_files, BlockDevice, Bpb, GrubConfig, Layout, Lba, SwitchDisk, SwitchPosition,
    SECTOR_SIZE,
};

/// Render and inspect the synthesized FAT12 switch volume.
#[derive(Parser, Debug)]
#[command(name = "image_dump")]
#[command(about = "Render and inspect the synthesized FAT12 switch volume")]
struct Args {
    /// Simulated switch position reported by the volume
    #[arg(long, default_value_t = '0')]
    switch: char,

    /// Log sector dispatch at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the whole image (stdout unless -o is given)
    Render {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the boot-sector geometry
    Info,
    /// List the root directory
    List,
    /// Hex dump one sector
    Sector { lba: Lba },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if args.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let value = args.switch;
    let reader = move || value;
    let position = SwitchPosition::new(reader);
    let grub = GrubConfig::new(reader);
    let files = switch_files(&position, &grub).map_err(fat_error("switch file table"))?;
    let disk = SwitchDisk::try_new(Layout::DEFAULT, files).map_err(fat_error("volume setup"))?;
    debug!("simulated switch position {:?}", value);

    match args.command {
        Command::Render { output } => {
            let image = render(&disk)?;
            match output {
                Some(path) => std::fs::write(&path, &image)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => std::io::stdout()
                    .lock()
                    .write_all(&image)
                    .context("failed to write image to stdout")?,
            }
        }
        Command::Info => print!("{}", describe_boot(&read_sector(&disk, 0)?)?),
        Command::List => print!("{}", list_root(&disk)?),
        Command::Sector { lba } => print!("{}", hex_dump(lba, &read_sector(&disk, lba)?)),
    }
    Ok(())
}

fn fat_error(what: &'static str) -> impl Fn(FatError) -> anyhow::Error {
    move |err| anyhow!("{what}: {err}")
}

fn read_sector(disk: &impl BlockDevice, lba: Lba) -> Result<[u8; SECTOR_SIZE]> {
    let mut sector = [0u8; SECTOR_SIZE];
    disk.read_block(lba, &mut sector)
        .map_err(|err| anyhow!("read lba {lba}: {err}"))?;
    Ok(sector)
}

fn render(disk: &impl BlockDevice) -> Result<Vec<u8>> {
    let mut image = vec![0u8; disk.block_count() as usize * disk.block_size()];
    disk.read_blocks(0, &mut image)
        .map_err(fat_error("render image"))?;
    Ok(image)
}

fn describe_boot(sector: &[u8]) -> Result<String> {
    let bpb = Bpb::parse(sector).map_err(fat_error("parse boot sector"))?;
    let mut out = String::new();
    writeln!(out, "oem id:            {}", String::from_utf8_lossy(&bpb.oem_id))?;
    writeln!(out, "bytes/sector:      {}", bpb.bytes_per_sector)?;
    writeln!(out, "sectors/cluster:   {}", bpb.sectors_per_cluster)?;
    writeln!(out, "reserved sectors:  {}", bpb.reserved_sectors)?;
    writeln!(out, "fat copies:        {}", bpb.num_fats)?;
    writeln!(out, "sectors/fat:       {}", bpb.sectors_per_fat)?;
    writeln!(out, "root entries:      {}", bpb.root_entries)?;
    writeln!(out, "total sectors:     {}", bpb.total_sectors)?;
    writeln!(out, "media:             {:#04x}", bpb.media)?;
    writeln!(out, "volume serial:     {:08X}", bpb.volume_serial)?;
    writeln!(out, "volume label:      {}", String::from_utf8_lossy(&bpb.volume_label))?;
    writeln!(out, "fs type:           {}", String::from_utf8_lossy(&bpb.fs_type))?;
    writeln!(out, "root dir lba:      {}", bpb.root_dir_start_sector())?;
    writeln!(out, "data region lba:   {}", bpb.data_start_sector())?;
    Ok(out)
}

fn list_root(disk: &impl BlockDevice) -> Result<String> {
    let bpb = Bpb::parse(&read_sector(disk, 0)?).map_err(fat_error("parse boot sector"))?;
    let mut decoder = LfnDecoder::new();
    let mut out = String::new();
    'sectors: for lba in bpb.root_dir_start_sector()..bpb.data_start_sector() {
        let sector = read_sector(disk, lba)?;
        for record in sector.chunks_exact(DIR_ENTRY_SIZE) {
            if record[0] == 0 {
                break 'sectors;
            }
            let entry = DirEntry::parse(record).map_err(fat_error("parse dir entry"))?;
            if entry.is_long_name() {
                decoder.push(record);
                continue;
            }
            let long_name = decoder
                .finish(&entry)
                .map(|name| name.chars().collect::<String>())
                .unwrap_or_default();
            let mut short_name = String::from_utf8_lossy(entry.base()).into_owned();
            if !entry.extension().is_empty() {
                short_name.push('.');
                short_name.push_str(&String::from_utf8_lossy(entry.extension()));
            }
            writeln!(
                out,
                "{:<32} {:<12} cluster {:>4} {:>6} bytes",
                long_name, short_name, entry.start, entry.size
            )?;
        }
    }
    Ok(out)
}

fn hex_dump(lba: Lba, sector: &[u8]) -> String {
    let base = lba as usize * SECTOR_SIZE;
    let mut out = String::new();
    for (row, chunk) in sector.chunks(16).enumerate() {
        let _ = write!(out, "{:08x} ", base + row * 16);
        for byte in chunk {
            let _ = write!(out, " {byte:02x}");
        }
        let ascii: String = chunk
            .iter()
            .map(|b| if b.is_ascii_graphic() || *b == b' ' { *b as char } else { '.' })
            .collect();
        let _ = writeln!(out, "  |{ascii}|");
    }
    out
}
