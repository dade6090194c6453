//! Raw reads from the MCU address space.

/// Reads bytes from any readable region of the address space
/// (flash, SRAM, system memory, peripherals).
pub trait ReadMemory {
    fn read(&mut self, address: u32, bytes: &mut [u8]);

    fn read_word(&mut self, address: u32) -> u32 {
        let mut bytes = [0u8; 4];
        self.read(address, &mut bytes);
        u32::from_le_bytes(bytes)
    }
}
