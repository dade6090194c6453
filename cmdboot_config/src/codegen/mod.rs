//! Generates the source and linker files the bootloader includes at build time.
use std::{fs::OpenOptions, io::Write, path::Path};

use anyhow::Result;
use proc_macro2::{Literal, TokenStream};
use quote::quote;

use crate::{memory::Region, Configuration};

mod linker_script;
mod prettify;

pub use linker_script::generate_linker_script;
use prettify::prettify_file;

/// Writes `configuration.rs` and `memory.x` into `out_dir`.
pub fn generate_modules<P: AsRef<Path>>(out_dir: P, configuration: &Configuration) -> Result<()> {
    let out_dir = out_dir.as_ref();
    let filename = out_dir.join("configuration.rs");
    let mut file =
        OpenOptions::new().write(true).create(true).truncate(true).open(&filename)?;
    file.write_all(format!("{}", configuration_tokens(configuration)).as_bytes())?;
    drop(file);

    // Formatting is cosmetic, a missing rustfmt is no reason to fail the build.
    let _ = prettify_file(&filename);

    generate_linker_script(out_dir, configuration)
}

fn hex(value: u32) -> Literal { Literal::u32_unsuffixed(value) }

fn region_tokens(region: &Region) -> TokenStream {
    let (start, size) = (hex(region.start), hex(region.size));
    quote! { crate::devices::memory_map::Region { start: #start, size: #size } }
}

fn configuration_tokens(configuration: &Configuration) -> TokenStream {
    let memory = configuration.memory();
    let protocol = &configuration.protocol_configuration;
    let trigger = &configuration.trigger_configuration;

    let version = protocol.version;
    let receive_buffer_size = protocol.receive_buffer_size;
    let inter_byte_timeout = protocol.inter_byte_timeout_ms;
    let drain_timeout = protocol.drain_timeout_ms;
    let extended_commands = protocol.extended_commands;
    let active_low = trigger.active_low;
    let settle_delay = trigger.settle_delay_ms;

    let flash = region_tokens(&Region {
        start: memory.flash_start,
        size: memory.flash_size_kb * 1024,
    });
    let page_size = hex(memory.page_size);
    let pages_per_sector = hex(memory.pages_per_sector);
    let application_start = hex(memory.application_start());
    let ram = region_tokens(&memory.ram);
    let system_memory = region_tokens(&memory.system_memory);
    let otp = region_tokens(&memory.otp);

    quote! {
        use crate::{devices::memory_map::MemoryMap, hal::time::Milliseconds};

        pub const BOOTLOADER_VERSION: u8 = #version;
        pub const RECEIVE_BUFFER_SIZE: usize = #receive_buffer_size;
        pub const INTER_BYTE_TIMEOUT: Milliseconds = Milliseconds(#inter_byte_timeout);
        pub const DRAIN_TIMEOUT: Milliseconds = Milliseconds(#drain_timeout);
        pub const EXTENDED_COMMANDS: bool = #extended_commands;
        pub const TRIGGER_ACTIVE_LOW: bool = #active_low;
        pub const TRIGGER_SETTLE_DELAY: Milliseconds = Milliseconds(#settle_delay);

        pub const MEMORY_MAP: MemoryMap = MemoryMap {
            flash: #flash,
            page_size: #page_size,
            pages_per_sector: #pages_per_sector,
            application_start: #application_start,
            ram: #ram,
            system_memory: #system_memory,
            otp: #otp,
        };
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generated_constants_reflect_configuration() {
        let mut configuration = Configuration::default();
        configuration.protocol_configuration.extended_commands = true;
        let code = configuration_tokens(&configuration).to_string();
        assert!(code.contains("EXTENDED_COMMANDS : bool = true"));
        assert!(code.contains("RECEIVE_BUFFER_SIZE : usize = 200usize"));
        assert!(code.contains("application_start : 134250496"));
    }
}
