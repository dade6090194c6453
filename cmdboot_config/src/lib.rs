//! This sub-crate contains all definitions to help generate
//! final bootloader binaries.
//!
//! NOTE: This code is not included anywhere from the bootloader itself! This
//! is a dependency of the bootloader **build script**. The build script
//! uses this dependency to help generate the code that the bootloader includes
//! (protocol constants, memory map, linker script).

use std::fmt::Display;

use memory::MemoryConfiguration;
use port::Port;
use protocol::ProtocolConfiguration;
use serde::{Deserialize, Serialize};
use trigger::TriggerConfiguration;

pub mod codegen;
pub mod memory;
pub mod port;
pub mod protocol;
pub mod trigger;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Configuration {
    pub port: Port,
    #[serde(default)]
    pub memory_configuration: Option<MemoryConfiguration>,
    #[serde(default)]
    pub protocol_configuration: ProtocolConfiguration,
    #[serde(default)]
    pub trigger_configuration: TriggerConfiguration,
}

impl Configuration {
    /// Memory layout in effect: the explicit one if the configuration file
    /// supplies it, the port default otherwise.
    pub fn memory(&self) -> MemoryConfiguration {
        self.memory_configuration.clone().unwrap_or_else(|| self.port.default_memory())
    }

    pub fn complete(&self) -> bool { self.configuration_problems().next().is_none() }

    pub fn configuration_problems(&self) -> impl Iterator<Item = ConfigurationProblem> {
        let memory = self.memory();
        let protocol = &self.protocol_configuration;
        let sector_size = memory.page_size * memory.pages_per_sector;

        #[rustfmt::skip]
        let problems = [
            (sector_size == 0)
                .then_some(ConfigurationProblem::SectorSize),

            (sector_size != 0 && (memory.bootloader_size_kb * 1024) % sector_size != 0)
                .then_some(ConfigurationProblem::BootloaderNotSectorAligned),

            (memory.bootloader_size_kb >= memory.flash_size_kb)
                .then_some(ConfigurationProblem::NoApplicationSpace),

            (sector_size != 0 && (memory.flash_size_kb * 1024) / sector_size > 32)
                .then_some(ConfigurationProblem::TooManySectors),

            // Length byte, opcode and CRC must always fit
            (!(6..=256).contains(&protocol.receive_buffer_size))
                .then_some(ConfigurationProblem::ReceiveBufferSize),

            (protocol.inter_byte_timeout_ms == 0)
                .then_some(ConfigurationProblem::Timeout),
        ];
        problems.into_iter().flatten()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConfigurationProblem {
    SectorSize,
    BootloaderNotSectorAligned,
    NoApplicationSpace,
    TooManySectors,
    ReceiveBufferSize,
    Timeout,
}

impl Display for ConfigurationProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConfigurationProblem::SectorSize => "[Memory Map] Sector size must be non-zero",
            ConfigurationProblem::BootloaderNotSectorAligned => {
                "[Memory Map] Bootloader size must be a whole number of sectors"
            }
            ConfigurationProblem::NoApplicationSpace => {
                "[Memory Map] Bootloader leaves no flash for the application"
            }
            ConfigurationProblem::TooManySectors => {
                "[Memory Map] At most 32 protection sectors are supported"
            }
            ConfigurationProblem::ReceiveBufferSize => {
                "[Protocol] Receive buffer must hold between 6 and 256 bytes"
            }
            ConfigurationProblem::Timeout => "[Protocol] Inter-byte timeout must be non-zero",
        })
    }
}
