use serde::{Deserialize, Serialize};

use crate::memory::{MemoryConfiguration, Region};

/// Supported target boards.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Port {
    /// "Blue pill" class STM32F103 with 64KB flash and 20KB RAM.
    #[default]
    Stm32F103C8,
    /// STM32F103 with 128KB flash and 20KB RAM.
    Stm32F103CB,
}

impl Port {
    /// Name of the cargo feature that must be enabled for this port.
    pub fn feature_name(&self) -> &'static str {
        match self {
            Port::Stm32F103C8 | Port::Stm32F103CB => "stm32f103",
        }
    }

    /// Memory layout of the port when the configuration file doesn't override it.
    pub fn default_memory(&self) -> MemoryConfiguration {
        let flash_size_kb = match self {
            Port::Stm32F103C8 => 64,
            Port::Stm32F103CB => 128,
        };
        MemoryConfiguration {
            flash_start: 0x0800_0000,
            flash_size_kb,
            page_size: 1024,
            pages_per_sector: 4,
            bootloader_size_kb: 32,
            ram: Region { start: 0x2000_0000, size: 20 * 1024 },
            system_memory: Region { start: 0x1FFF_F000, size: 0x800 },
            otp: Region { start: 0x1FFF_F7E0, size: 0x20 },
        }
    }
}
