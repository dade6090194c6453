//! 32-bit CRC calculation unit.

/// Accumulator value after a reset.
pub const CRC_INITIAL: u32 = 0xFFFF_FFFF;

/// Word-fed CRC accumulator, modelled on the STM32 CRC peripheral:
/// polynomial `0x04C11DB7`, no reflection, no final XOR.
pub trait CrcUnit {
    /// Restores the accumulator to [`CRC_INITIAL`].
    fn reset(&mut self);
    /// Feeds one 32-bit word, most significant bit first, and returns
    /// the updated accumulator.
    fn feed(&mut self, word: u32) -> u32;
}
