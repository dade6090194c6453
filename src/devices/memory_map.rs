//! Static description of the MCU address space: flash and its sectors,
//! the split between bootloader and application, SRAM, system memory
//! and the OTP window.
use core::ops::Range;

use crate::utilities::memory::contains_range;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub start: u32,
    pub size: u32,
}

impl Region {
    pub const fn end(&self) -> u32 { self.start + self.size }

    pub fn contains(&self, address: u32) -> bool {
        address >= self.start && address - self.start < self.size
    }

    /// Whether `[address, address + length)` lies entirely inside the region.
    pub fn contains_range(&self, address: u32, length: u32) -> bool {
        contains_range(self.start, self.size, address, length)
    }
}

/// Address space areas a MEM_READ may target.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Area {
    Flash,
    Ram,
    SystemMemory,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemoryMap {
    pub flash: Region,
    /// Smallest erasable unit.
    pub page_size: u32,
    /// Pages sharing one write protection bit. A sector is also the
    /// unit of the erase command.
    pub pages_per_sector: u32,
    /// First address past the bootloader image.
    pub application_start: u32,
    pub ram: Region,
    pub system_memory: Region,
    pub otp: Region,
}

impl MemoryMap {
    pub const fn sector_size(&self) -> u32 { self.page_size * self.pages_per_sector }

    pub const fn sector_count(&self) -> u8 { (self.flash.size / self.sector_size()) as u8 }

    /// Bytes needed for a bitmap with one bit per sector.
    pub const fn bitmap_len(&self) -> usize { (self.sector_count() as usize + 7) / 8 }

    pub const fn application(&self) -> Region {
        Region {
            start: self.application_start,
            size: self.flash.end() - self.application_start,
        }
    }

    pub fn application_sectors(&self) -> Range<u8> {
        let first = ((self.application_start - self.flash.start) / self.sector_size()) as u8;
        first..self.sector_count()
    }

    pub fn is_application_sector(&self, sector: u8) -> bool {
        self.application_sectors().contains(&sector)
    }

    pub fn sector_of(&self, address: u32) -> Option<u8> {
        self.flash
            .contains(address)
            .then(|| ((address - self.flash.start) / self.sector_size()) as u8)
    }

    pub fn sector_region(&self, sector: u8) -> Region {
        Region {
            start: self.flash.start + sector as u32 * self.sector_size(),
            size: self.sector_size(),
        }
    }

    /// Start addresses of every page in a sector.
    pub fn pages(&self, sector: u8) -> impl Iterator<Item = u32> {
        let Region { start, .. } = self.sector_region(sector);
        let page_size = self.page_size;
        (0..self.pages_per_sector).map(move |page| start + page * page_size)
    }

    /// Sectors overlapped by `[address, address + length)`. `length` must be non-zero.
    pub fn sectors_spanned(&self, address: u32, length: u32) -> Option<Range<u8>> {
        let first = self.sector_of(address)?;
        let last = self.sector_of(address.checked_add(length.checked_sub(1)?)?)?;
        Some(first..last + 1)
    }

    /// Addresses a GO_TO_ADDR command may branch to.
    pub fn is_executable(&self, address: u32) -> bool {
        self.flash.contains(address) || self.ram.contains(address)
    }

    /// Area fully containing `[address, address + length)`, if any.
    pub fn readable_area(&self, address: u32, length: u32) -> Option<Area> {
        if self.flash.contains_range(address, length) {
            Some(Area::Flash)
        } else if self.ram.contains_range(address, length) {
            Some(Area::Ram)
        } else if self.system_memory.contains_range(address, length) {
            Some(Area::SystemMemory)
        } else {
            None
        }
    }
}

#[cfg(test)]
pub mod test {
    use super::*;

    /// 64KB flash in 1KB pages, 32KB bootloader, 20KB SRAM.
    pub const BLUE_PILL: MemoryMap = MemoryMap {
        flash: Region { start: 0x0800_0000, size: 0x1_0000 },
        page_size: 0x400,
        pages_per_sector: 4,
        application_start: 0x0800_8000,
        ram: Region { start: 0x2000_0000, size: 0x5000 },
        system_memory: Region { start: 0x1FFF_F000, size: 0x800 },
        otp: Region { start: 0x1FFF_F7E0, size: 0x20 },
    };

    #[test]
    fn sectors_and_application_split() {
        assert_eq!(BLUE_PILL.sector_size(), 0x1000);
        assert_eq!(BLUE_PILL.sector_count(), 16);
        assert_eq!(BLUE_PILL.bitmap_len(), 2);
        assert_eq!(BLUE_PILL.application_sectors(), 8..16);
        assert_eq!(BLUE_PILL.application(), Region { start: 0x0800_8000, size: 0x8000 });
        assert!(!BLUE_PILL.is_application_sector(7));
        assert!(BLUE_PILL.is_application_sector(15));
    }

    #[test]
    fn locating_sectors_and_pages() {
        assert_eq!(BLUE_PILL.sector_of(0x0800_8000), Some(8));
        assert_eq!(BLUE_PILL.sector_of(0x0800_FFFF), Some(15));
        assert_eq!(BLUE_PILL.sector_of(0x0801_0000), None);
        assert_eq!(BLUE_PILL.sectors_spanned(0x0800_8FFE, 4), Some(8..10));
        assert_eq!(BLUE_PILL.sectors_spanned(0x0800_8000, 0), None);
        let pages: Vec<_> = BLUE_PILL.pages(9).collect();
        assert_eq!(pages, [0x0800_9000, 0x0800_9400, 0x0800_9800, 0x0800_9C00]);
    }

    #[test]
    fn classifying_addresses() {
        assert!(BLUE_PILL.is_executable(0x0800_8000));
        assert!(BLUE_PILL.is_executable(0x2000_4FFF));
        assert!(!BLUE_PILL.is_executable(0x2000_5000));
        assert!(!BLUE_PILL.is_executable(0x1FFF_F000));
        assert_eq!(BLUE_PILL.readable_area(0x0800_FFF0, 0x10), Some(Area::Flash));
        assert_eq!(BLUE_PILL.readable_area(0x0800_FFF0, 0x11), None);
        assert_eq!(BLUE_PILL.readable_area(0x2000_0000, 4), Some(Area::Ram));
        assert_eq!(BLUE_PILL.readable_area(0x1FFF_F7E0, 0x20), Some(Area::SystemMemory));
    }
}
