use std::{fs::OpenOptions, io::Write, path::Path};

use anyhow::{anyhow, Result};

use crate::Configuration;

/// Generates the linker script `memory.x`. The bootloader image is confined
/// to the flash that precedes the application, so a build that outgrows its
/// reserved sectors fails to link instead of overlapping the application.
pub fn generate_linker_script(out_dir: &Path, configuration: &Configuration) -> Result<()> {
    let memory = configuration.memory();
    if memory.bootloader_size_kb == 0 {
        return Err(anyhow!("Bootloader region must not be empty."));
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(out_dir.join("memory.x"))?;

    write!(
        file,
        "MEMORY\n\
         {{\n\
             FLASH : ORIGIN = 0x{:08X}, LENGTH = {}K\n\
             RAM : ORIGIN = 0x{:08X}, LENGTH = {}K\n\
         }}\n",
        memory.flash_start,
        memory.bootloader_size_kb,
        memory.ram.start,
        memory.ram.size / 1024,
    )?;

    Ok(())
}
