use serde::{Deserialize, Serialize};

#[macro_export(local_inner_macros)]
macro_rules! KB {
    ($val:expr) => {
        $val * 1024
    };
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Region {
    pub start: u32,
    pub size: u32,
}

impl Region {
    pub fn end(&self) -> u32 { self.start + self.size }
}

/// Layout of the MCU address space as seen by the bootloader.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MemoryConfiguration {
    pub flash_start: u32,
    pub flash_size_kb: u32,
    /// Size of the smallest erasable unit.
    pub page_size: u32,
    /// Pages sharing a single write protection bit.
    pub pages_per_sector: u32,
    /// Flash reserved for the bootloader image, starting at `flash_start`.
    /// The application image starts right after it.
    pub bootloader_size_kb: u32,
    pub ram: Region,
    pub system_memory: Region,
    /// Factory programmed, read only window served by OTP_READ.
    pub otp: Region,
}

impl MemoryConfiguration {
    pub fn application_start(&self) -> u32 { self.flash_start + KB!(self.bootloader_size_kb) }
    pub fn flash_end(&self) -> u32 { self.flash_start + KB!(self.flash_size_kb) }
}
