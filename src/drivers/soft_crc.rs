//! CRC unit computed in software, bit-compatible with the STM32 CRC peripheral.
use crc::{Crc, CRC_32_MPEG_2};

use crate::hal::crc::{CrcUnit, CRC_INITIAL};

/// Feeding a word MSB first through the peripheral is CRC-32/MPEG-2
/// over the word's big-endian bytes.
const ALGORITHM: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

#[derive(Debug, Clone)]
pub struct SoftCrc {
    value: u32,
}

impl Default for SoftCrc {
    fn default() -> Self { Self { value: CRC_INITIAL } }
}

impl CrcUnit for SoftCrc {
    fn reset(&mut self) { self.value = CRC_INITIAL; }

    fn feed(&mut self, word: u32) -> u32 {
        let mut digest = ALGORITHM.digest_with_initial(self.value);
        digest.update(&word.to_be_bytes());
        self.value = digest.finalize();
        self.value
    }
}
