//! Frame checksum verification.
use crate::hal::crc::{CrcUnit, CRC_INITIAL};

pub struct ChecksumVerifier<CRC: CrcUnit> {
    crc: CRC,
}

impl<CRC: CrcUnit> ChecksumVerifier<CRC> {
    pub fn new(crc: CRC) -> Self { Self { crc } }

    /// CRC of `data`, each byte zero-extended to a word.
    pub fn compute(&mut self, data: &[u8]) -> u32 {
        self.crc.reset();
        data.iter().fold(CRC_INITIAL, |_, &byte| self.crc.feed(byte as u32))
    }

    pub fn verify(&mut self, data: &[u8], expected: u32) -> bool { self.compute(data) == expected }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::drivers::soft_crc::SoftCrc;

    #[test]
    fn known_frames_verify() {
        // Given
        let mut verifier = ChecksumVerifier::new(SoftCrc::default());

        // Then
        assert!(verifier.verify(&[0x05, 0x51], 0x7CAB_E9E7));
        assert!(verifier.verify(&[0x05, 0x52], 0x71E8_CF3E));
        assert!(verifier.verify(&[0x05, 0x53], 0x7529_D289));
        assert!(verifier.verify(&[0x05, 0x54], 0x6B6E_828C));
        assert!(!verifier.verify(&[0x05, 0x51], 0x7CAB_E9E6));
    }

    #[test]
    fn empty_data_yields_initial_value() {
        let mut verifier = ChecksumVerifier::new(SoftCrc::default());
        assert_eq!(verifier.compute(&[]), CRC_INITIAL);
    }
}
