//! Erase, program and protection operations over the embedded flash.
//!
//! Every operation validates its whole range before touching the hardware,
//! and the controller is relocked on every exit path. The bootloader
//! sectors are never erased or programmed from here.
use crate::{
    devices::memory_map::MemoryMap,
    hal::flash::{FlashInterface, OptionBytes},
    log::{debug, info, warn},
    utilities::{bitwise::BitFlags, guard::Guard},
};

/// Status polls before an operation is declared stuck.
pub const BUSY_POLL_LIMIT: u32 = 2_000_000;

/// Status byte reported for a successful flash command.
pub const STATUS_OK: u8 = 0x00;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    AddressOutOfRange,
    SectorProtected,
    VerifyFailed,
    Timeout,
    Misaligned,
}

impl FlashError {
    /// Status byte reported over the wire.
    pub fn status(&self) -> u8 {
        match self {
            FlashError::AddressOutOfRange => 0x01,
            FlashError::SectorProtected => 0x02,
            FlashError::VerifyFailed => 0x03,
            FlashError::Timeout => 0x04,
            FlashError::Misaligned => 0x05,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FlashError::AddressOutOfRange => "[Flash] Address outside application flash",
            FlashError::SectorProtected => "[Flash] Sector is write protected",
            FlashError::VerifyFailed => "[Flash] Read-back verification failed",
            FlashError::Timeout => "[Flash] Controller stayed busy",
            FlashError::Misaligned => "[Flash] Address not half-word aligned",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EraseTarget {
    Sectors { first: u8, count: u8 },
    /// Every application sector.
    Mass,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadProtection {
    Level0,
    Level1,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtectionMode {
    Write,
    ReadWrite,
}

impl TryFrom<u8> for ProtectionMode {
    type Error = ();
    fn try_from(mode: u8) -> Result<Self, ()> {
        match mode {
            1 => Ok(ProtectionMode::Write),
            2 => Ok(ProtectionMode::ReadWrite),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Protection {
    /// One bit per sector, set bits are write protected.
    pub write_protected: u32,
    pub read_protection: ReadProtection,
}

impl Protection {
    pub fn is_write_protected(&self, sector: u8) -> bool {
        sector < 32 && self.write_protected.is_set(sector)
    }
}

pub struct FlashController<MCUF: FlashInterface> {
    flash: MCUF,
    map: MemoryMap,
}

impl<MCUF: FlashInterface> FlashController<MCUF> {
    pub fn new(flash: MCUF, map: MemoryMap) -> Self { Self { flash, map } }

    pub fn map(&self) -> &MemoryMap { &self.map }

    pub fn erase(&mut self, target: EraseTarget) -> Result<(), FlashError> {
        let sectors = match target {
            EraseTarget::Mass => self.map.application_sectors(),
            EraseTarget::Sectors { first, count } => {
                let last = first.checked_add(count).ok_or(FlashError::AddressOutOfRange)?;
                first..last
            }
        };
        let protection = self.protection();
        for sector in sectors.clone() {
            if !self.map.is_application_sector(sector) {
                return Err(FlashError::AddressOutOfRange);
            }
            if protection.is_write_protected(sector) {
                return Err(FlashError::SectorProtected);
            }
        }

        info!("Erasing sectors {}..{}", sectors.start, sectors.end);
        let map = self.map;
        let mut flash = Guard::new(&mut self.flash, MCUF::unlock, MCUF::lock);
        flash.clear_status();
        for sector in sectors.clone() {
            for page in map.pages(sector) {
                flash.start_page_erase(page);
                let result = wait_until_done(&mut *flash);
                flash.end_operation();
                result?;
            }
        }

        let mut chunk = [0u8; 64];
        for sector in sectors {
            let region = map.sector_region(sector);
            for address in (region.start..region.end()).step_by(chunk.len()) {
                flash.read(address, &mut chunk);
                if chunk.iter().any(|byte| *byte != 0xFF) {
                    warn!("Sector {} not blank after erase", sector);
                    return Err(FlashError::VerifyFailed);
                }
            }
        }
        Ok(())
    }

    /// Programs `bytes` at `address` in half-words, padding an odd
    /// tail with `0xFF`. The target area must be erased.
    pub fn program(&mut self, address: u32, bytes: &[u8]) -> Result<(), FlashError> {
        if bytes.is_empty() {
            return Ok(());
        }
        if !self.map.application().contains_range(address, bytes.len() as u32) {
            return Err(FlashError::AddressOutOfRange);
        }
        if address % 2 != 0 {
            return Err(FlashError::Misaligned);
        }
        let sectors = self
            .map
            .sectors_spanned(address, bytes.len() as u32)
            .ok_or(FlashError::AddressOutOfRange)?;
        let protection = self.protection();
        if sectors.clone().any(|sector| protection.is_write_protected(sector)) {
            return Err(FlashError::SectorProtected);
        }

        debug!("Programming {} bytes at {:x}", bytes.len(), address);
        let mut flash = Guard::new(&mut self.flash, MCUF::unlock, MCUF::lock);
        flash.clear_status();
        for (index, pair) in bytes.chunks(2).enumerate() {
            let half_word = u16::from_le_bytes([pair[0], pair.get(1).copied().unwrap_or(0xFF)]);
            let target = address + 2 * index as u32;
            flash.start_half_word_program(target, half_word);
            let result = wait_until_done(&mut *flash);
            flash.end_operation();
            result?;
            if flash.read_half_word(target) != half_word {
                warn!("Verification failed at {:x}", target);
                return Err(FlashError::VerifyFailed);
            }
        }
        Ok(())
    }

    /// Range checked read of any flash location, bootloader included.
    pub fn read(&mut self, address: u32, bytes: &mut [u8]) -> Result<(), FlashError> {
        if !self.map.flash.contains_range(address, bytes.len() as u32) {
            return Err(FlashError::AddressOutOfRange);
        }
        self.flash.read(address, bytes);
        Ok(())
    }

    /// Protection as it stands now or after the next reset, whichever
    /// is stricter.
    pub fn protection(&mut self) -> Protection {
        let programmed = self.flash.option_bytes();
        let effective_wrp = self.flash.write_protection();
        let read_protected =
            self.flash.read_protection_active() || programmed.read_protected();
        Protection {
            write_protected: !(effective_wrp & programmed.write_protection()),
            read_protection: if read_protected {
                ReadProtection::Level1
            } else {
                ReadProtection::Level0
            },
        }
    }

    /// Adds write protection to `sectors` (one bit each), and read
    /// protection too under [`ProtectionMode::ReadWrite`]. Existing
    /// protection is kept. Takes full effect after reset.
    pub fn protect(&mut self, sectors: u32, mode: ProtectionMode) -> Result<(), FlashError> {
        let sector_count = self.map.sector_count() as u32;
        if sector_count < 32 && sectors >> sector_count != 0 {
            return Err(FlashError::AddressOutOfRange);
        }
        let mut options = self.flash.option_bytes();
        options.wrp = (options.write_protection() & !sectors).to_le_bytes();
        if mode == ProtectionMode::ReadWrite {
            options.rdp = OptionBytes::RDP_LEVEL_1;
        }
        info!("Protecting sectors {:x}, mode {:?}", sectors, mode);
        self.write_option_bytes(options)
    }

    /// Removes write protection from every sector. Read protection is
    /// left as is, since lifting it mass erases the whole flash.
    pub fn unprotect_all(&mut self) -> Result<(), FlashError> {
        let mut options = self.flash.option_bytes();
        options.wrp = [0xFF; 4];
        info!("Removing write protection");
        self.write_option_bytes(options)
    }

    #[cfg(test)]
    pub fn interface(&mut self) -> &mut MCUF { &mut self.flash }

    fn write_option_bytes(&mut self, options: OptionBytes) -> Result<(), FlashError> {
        let mut flash = Guard::new(&mut self.flash, MCUF::unlock, MCUF::lock);
        flash.unlock_option_bytes();
        flash.clear_status();

        flash.start_option_erase();
        let mut result = wait_until_done(&mut *flash);
        flash.end_operation();

        // Once the erase has started, an erased RDP byte means read protection
        // after the next reset. Every byte is programmed whatever failed
        // before, RDP first, and the first failure is reported.
        for (index, value) in options.as_bytes().into_iter().enumerate() {
            // Erased bytes already hold the value
            if value == 0xFF {
                continue;
            }
            flash.start_option_program(index, value);
            let programmed = wait_until_done(&mut *flash);
            flash.end_operation();
            result = result.and(programmed);
        }
        if let Err(error) = result {
            warn!("Option byte rewrite failed: {:?}", error);
            return Err(error);
        }

        if flash.option_bytes() != options {
            warn!("Option bytes don't match after programming");
            return Err(FlashError::VerifyFailed);
        }
        Ok(())
    }
}

/// Polls until the controller leaves the busy state, then maps and
/// clears its error flags.
fn wait_until_done<MCUF: FlashInterface>(flash: &mut MCUF) -> Result<(), FlashError> {
    for _ in 0..BUSY_POLL_LIMIT {
        let status = flash.status();
        if status.busy {
            continue;
        }
        flash.clear_status();
        return if status.write_protection_error {
            Err(FlashError::SectorProtected)
        } else if status.programming_error {
            Err(FlashError::VerifyFailed)
        } else {
            Ok(())
        };
    }
    Err(FlashError::Timeout)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{devices::memory_map::test::BLUE_PILL, hal::doubles::flash::FakeFlash};

    const APPLICATION: u32 = 0x0800_8000;

    fn controller() -> FlashController<FakeFlash> {
        FlashController::new(FakeFlash::new(0x0800_0000, 0x1_0000, 0x400, 4), BLUE_PILL)
    }

    fn assert_relocked(controller: &FlashController<FakeFlash>) {
        assert!(controller.flash.locked);
        assert!(!controller.flash.option_bytes_unlocked);
        assert_eq!(controller.flash.unlocks, controller.flash.locks);
    }

    #[test]
    fn erasing_application_sectors() {
        // Given
        let mut controller = controller();
        controller.flash.write_contents(0x0800_9000, &[0x00; 0x2000]);
        controller.flash.write_contents(0x0800_B000, &[0x12]);

        // When
        let result = controller.erase(EraseTarget::Sectors { first: 9, count: 2 });

        // Then
        assert_eq!(result, Ok(()));
        assert!(controller.flash.contents(0x0800_9000, 0x2000).iter().all(|b| *b == 0xFF));
        assert_eq!(controller.flash.contents(0x0800_B000, 1), &[0x12]);
        assert_eq!(controller.flash.page_erases.len(), 8);
        assert_relocked(&controller);
    }

    #[test]
    fn bootloader_sectors_are_never_erased() {
        // Given
        let mut controller = controller();
        controller.flash.write_contents(0x0800_7000, &[0x00; 4]);

        // When
        let result = controller.erase(EraseTarget::Sectors { first: 7, count: 2 });

        // Then
        assert_eq!(result, Err(FlashError::AddressOutOfRange));
        assert!(controller.flash.page_erases.is_empty());
        assert_eq!(controller.flash.contents(0x0800_7000, 4), &[0x00; 4]);
        assert_eq!(controller.flash.unlocks, 0);
    }

    #[test]
    fn erase_past_the_last_sector_is_out_of_range() {
        let mut controller = controller();
        assert_eq!(
            controller.erase(EraseTarget::Sectors { first: 15, count: 2 }),
            Err(FlashError::AddressOutOfRange)
        );
        assert_eq!(
            controller.erase(EraseTarget::Sectors { first: 0xF0, count: 0x20 }),
            Err(FlashError::AddressOutOfRange)
        );
    }

    #[test]
    fn mass_erase_spares_the_bootloader() {
        // Given
        let mut controller = controller();
        controller.flash.write_contents(0x0800_0000, &[0xAA; 0x10]);
        controller.flash.write_contents(APPLICATION, &[0x55; 0x10]);
        controller.flash.write_contents(0x0800_FFF0, &[0x55; 0x10]);

        // When
        let result = controller.erase(EraseTarget::Mass);

        // Then
        assert_eq!(result, Ok(()));
        assert_eq!(controller.flash.contents(0x0800_0000, 0x10), &[0xAA; 0x10]);
        assert!(controller.flash.contents(APPLICATION, 0x8000).iter().all(|b| *b == 0xFF));
        assert_eq!(controller.flash.page_erases.len(), 32);
        assert_relocked(&controller);
    }

    #[test]
    fn protected_sector_refuses_erase_before_any_hardware_access() {
        // Given
        let mut controller = controller();
        controller.protect(1 << 10, ProtectionMode::Write).unwrap();
        controller.flash.reset();
        let unlocks_before = controller.flash.unlocks;

        // When
        let result = controller.erase(EraseTarget::Sectors { first: 9, count: 2 });

        // Then
        assert_eq!(result, Err(FlashError::SectorProtected));
        assert!(controller.flash.page_erases.is_empty());
        assert_eq!(controller.flash.unlocks, unlocks_before);
    }

    #[test]
    fn erase_reports_stuck_controller_and_relocks() {
        // Given
        let mut controller = controller();
        controller.flash.stuck_busy = true;

        // When
        let result = controller.erase(EraseTarget::Sectors { first: 8, count: 1 });

        // Then
        assert_eq!(result, Err(FlashError::Timeout));
        assert_relocked(&controller);
    }

    #[test]
    fn erase_reports_defective_cells() {
        let mut controller = controller();
        controller.flash.defect = Some(0x0800_8123);
        assert_eq!(
            controller.erase(EraseTarget::Sectors { first: 8, count: 1 }),
            Err(FlashError::VerifyFailed)
        );
        assert_relocked(&controller);
    }

    #[test]
    fn programming_pads_odd_tail() {
        // Given
        let mut controller = controller();

        // When
        let result = controller.program(APPLICATION + 2, &[0x01, 0x02, 0x03]);

        // Then
        assert_eq!(result, Ok(()));
        assert_eq!(controller.flash.contents(APPLICATION, 6), &[0xFF, 0xFF, 0x01, 0x02, 0x03, 0xFF]);
        assert_relocked(&controller);
    }

    #[test]
    fn programming_validates_address() {
        let mut controller = controller();
        assert_eq!(controller.program(0x0800_7FFE, &[0, 0]), Err(FlashError::AddressOutOfRange));
        assert_eq!(controller.program(0x0800_FFFE, &[0, 0, 0]), Err(FlashError::AddressOutOfRange));
        assert_eq!(controller.program(APPLICATION + 1, &[0]), Err(FlashError::Misaligned));
        assert_eq!(controller.flash.unlocks, 0);
    }

    #[test]
    fn programming_over_written_data_fails_verification() {
        // Given
        let mut controller = controller();
        controller.flash.write_contents(APPLICATION, &[0x34, 0x12]);

        // When
        let result = controller.program(APPLICATION, &[0x78, 0x56]);

        // Then
        assert_eq!(result, Err(FlashError::VerifyFailed));
        assert_relocked(&controller);
    }

    #[test]
    fn programming_detects_defective_cells() {
        let mut controller = controller();
        controller.flash.defect = Some(APPLICATION + 4);
        assert_eq!(controller.program(APPLICATION, &[0u8; 8]), Err(FlashError::VerifyFailed));
        assert_relocked(&controller);
    }

    #[test]
    fn programming_reports_stuck_controller_and_relocks() {
        // Given
        let mut controller = controller();
        controller.flash.stuck_busy = true;

        // When
        let result = controller.program(APPLICATION, &[0x00, 0x01]);

        // Then
        assert_eq!(result, Err(FlashError::Timeout));
        assert_relocked(&controller);
    }

    #[test]
    fn protecting_sectors_preserves_read_protection_level() {
        // Given
        let mut controller = controller();

        // When
        controller.protect(0b1000_0001_0000_0000, ProtectionMode::Write).unwrap();

        // Then
        let protection = controller.protection();
        assert_eq!(protection.write_protected, 0b1000_0001_0000_0000);
        assert_eq!(protection.read_protection, ReadProtection::Level0);
        assert_eq!(controller.flash.programmed.rdp, OptionBytes::RDP_LEVEL_0);
        assert_relocked(&controller);
    }

    #[test]
    fn protection_accumulates_and_read_protection_sticks() {
        // Given
        let mut controller = controller();
        controller.protect(1 << 8, ProtectionMode::ReadWrite).unwrap();

        // When
        controller.protect(1 << 9, ProtectionMode::Write).unwrap();
        controller.unprotect_all().unwrap();

        // Then
        let protection = controller.protection();
        assert_eq!(protection.write_protected, 0);
        assert_eq!(protection.read_protection, ReadProtection::Level1);
        assert_eq!(controller.flash.programmed.rdp, OptionBytes::RDP_LEVEL_1);
    }

    #[test]
    fn effective_protection_survives_until_reset() {
        // Given
        let mut controller = controller();
        controller.protect(1 << 12, ProtectionMode::Write).unwrap();
        controller.flash.reset();

        // When
        controller.unprotect_all().unwrap();

        // Then
        assert!(controller.protection().is_write_protected(12));
        controller.flash.reset();
        assert!(!controller.protection().is_write_protected(12));
    }

    #[test]
    fn stuck_option_byte_rewrite_still_restores_read_protection_level() {
        // Given
        let mut controller = controller();
        controller.flash.stuck_busy = true;

        // When
        let result = controller.protect(1 << 9, ProtectionMode::Write);

        // Then
        assert_eq!(result, Err(FlashError::Timeout));
        assert_eq!(controller.flash.programmed.rdp, OptionBytes::RDP_LEVEL_0);
        assert_eq!(controller.protection().read_protection, ReadProtection::Level0);
        assert_relocked(&controller);

        // When
        controller.flash.reset();

        // Then
        assert_eq!(controller.protection().read_protection, ReadProtection::Level0);
    }

    #[test]
    fn failed_option_byte_keeps_programming_the_rest() {
        // Given
        let mut controller = controller();
        controller.flash.programmed.user = 0x07;
        // Second write protection byte, covering sectors 8 to 15
        controller.flash.option_defect = Some(5);

        // When
        let result = controller.protect(1 << 9, ProtectionMode::Write);

        // Then
        assert_eq!(result, Err(FlashError::VerifyFailed));
        assert_eq!(controller.flash.programmed.rdp, OptionBytes::RDP_LEVEL_0);
        assert_eq!(controller.flash.programmed.user, 0x07);
        assert_eq!(controller.protection().read_protection, ReadProtection::Level0);
        assert_relocked(&controller);
    }

    #[test]
    fn protecting_missing_sectors_is_out_of_range() {
        let mut controller = controller();
        assert_eq!(controller.protect(1 << 16, ProtectionMode::Write), Err(FlashError::AddressOutOfRange));
    }

    #[test]
    fn reading_is_range_checked() {
        let mut controller = controller();
        controller.flash.write_contents(0x0800_0000, &[1, 2, 3]);
        let mut bytes = [0u8; 3];
        assert_eq!(controller.read(0x0800_0000, &mut bytes), Ok(()));
        assert_eq!(bytes, [1, 2, 3]);
        assert_eq!(controller.read(0x0800_FFFF, &mut bytes), Err(FlashError::AddressOutOfRange));
    }

    #[test]
    fn status_bytes() {
        assert_eq!(FlashError::AddressOutOfRange.status(), 1);
        assert_eq!(FlashError::Misaligned.status(), 5);
    }
}
