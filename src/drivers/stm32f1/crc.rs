//! Hardware CRC calculation unit.
use crate::{hal::crc::CrcUnit, stm32pac::CRC};

const CR_RESET: u32 = 1 << 0;

/// The peripheral clock must be enabled beforehand (see `rcc::Clocks`).
pub struct HardwareCrc {
    crc: CRC,
}

impl HardwareCrc {
    pub fn new(crc: CRC) -> Self { Self { crc } }
}

impl CrcUnit for HardwareCrc {
    fn reset(&mut self) {
        // NOTE(Safety): Unsafe blocks in this file refer to using the "bits()"
        // method for easy writing. Every bit written is defined.
        self.crc.cr.write(|w| unsafe { w.bits(CR_RESET) });
    }

    fn feed(&mut self, word: u32) -> u32 {
        self.crc.dr.write(|w| w.dr().bits(word));
        self.crc.dr.read().bits()
    }
}
