//! Register-level interface to an embedded flash controller with
//! page erase, half-word programming and option bytes.

/// Snapshot of the controller status flags.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub busy: bool,
    /// Attempt to program a location that wasn't erased.
    pub programming_error: bool,
    /// Attempt to erase or program a write protected page.
    pub write_protection_error: bool,
}

/// Contents of the option byte block, complements excluded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OptionBytes {
    pub rdp: u8,
    pub user: u8,
    pub data: [u8; 2],
    /// One bit per protection sector, cleared bits are protected.
    pub wrp: [u8; 4],
}

impl OptionBytes {
    /// RDP key that leaves flash readable. Any other value enables read protection.
    pub const RDP_LEVEL_0: u8 = 0xA5;
    pub const RDP_LEVEL_1: u8 = 0x00;
    pub const COUNT: usize = 8;

    pub const fn erased() -> Self { Self { rdp: 0xFF, user: 0xFF, data: [0xFF; 2], wrp: [0xFF; 4] } }

    pub const fn factory() -> Self { Self { rdp: Self::RDP_LEVEL_0, ..Self::erased() } }

    pub fn as_bytes(&self) -> [u8; Self::COUNT] {
        let [d0, d1] = self.data;
        let [w0, w1, w2, w3] = self.wrp;
        [self.rdp, self.user, d0, d1, w0, w1, w2, w3]
    }

    pub fn from_bytes(bytes: [u8; Self::COUNT]) -> Self {
        let [rdp, user, d0, d1, w0, w1, w2, w3] = bytes;
        Self { rdp, user, data: [d0, d1], wrp: [w0, w1, w2, w3] }
    }

    /// Write protection register image, one bit per sector, cleared bits protected.
    pub fn write_protection(&self) -> u32 { u32::from_le_bytes(self.wrp) }

    pub fn read_protected(&self) -> bool { self.rdp != Self::RDP_LEVEL_0 }
}

pub trait FlashInterface {
    fn unlock(&mut self);
    fn lock(&mut self);
    fn is_locked(&mut self) -> bool;

    fn status(&mut self) -> Status;
    fn clear_status(&mut self);

    /// Starts erasing the page that contains `address`.
    fn start_page_erase(&mut self, address: u32);
    /// Starts programming one half-word. `address` must be half-word aligned.
    fn start_half_word_program(&mut self, address: u32, value: u16);
    /// Leaves programming or erase mode once the controller is idle.
    fn end_operation(&mut self);

    fn read(&mut self, address: u32, bytes: &mut [u8]);

    fn read_half_word(&mut self, address: u32) -> u16 {
        let mut bytes = [0u8; 2];
        self.read(address, &mut bytes);
        u16::from_le_bytes(bytes)
    }

    /// Enables option byte erase and programming. The flash must be unlocked.
    fn unlock_option_bytes(&mut self);
    fn start_option_erase(&mut self);
    /// Starts programming option byte `index` (`OptionBytes::as_bytes` order).
    fn start_option_program(&mut self, index: usize, value: u8);
    /// Option bytes as currently programmed. They take effect after reset.
    fn option_bytes(&mut self) -> OptionBytes;

    /// Write protection in effect since the last reset, cleared bits protected.
    fn write_protection(&mut self) -> u32;
    /// Read protection in effect since the last reset.
    fn read_protection_active(&mut self) -> bool;
}
