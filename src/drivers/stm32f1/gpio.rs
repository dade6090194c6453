//! Minimal GPIO support: single pins configured as inputs.
use crate::{hal::gpio::InputPin, stm32pac::gpioa::RegisterBlock};

/// Input configuration nibble (CNFy:MODEy) with pull-up/pull-down enabled.
const INPUT_PULL: u32 = 0b1000;
const CONFIGURATION_MASK: u32 = 0b1111;

/// Input pin with the internal pull-up enabled.
pub struct PullUpInput {
    port: &'static RegisterBlock,
    index: u8,
}

impl PullUpInput {
    /// Configures pin `index` (0..16) of `port`. The port clock must be enabled.
    pub fn new(port: &'static RegisterBlock, index: u8) -> Self {
        let shift = (index as u32 % 8) * 4;
        let configure = |bits: u32| (bits & !(CONFIGURATION_MASK << shift)) | (INPUT_PULL << shift);
        // NOTE(Safety): Unsafe blocks in this file refer to using the "bits()"
        // method for easy writing. Only the nibble for this pin is touched.
        if index < 8 {
            port.crl.modify(|r, w| unsafe { w.bits(configure(r.bits())) });
        } else {
            port.crh.modify(|r, w| unsafe { w.bits(configure(r.bits())) });
        }
        // Output register high selects the pull-up.
        port.bsrr.write(|w| unsafe { w.bits(1 << index) });
        Self { port, index }
    }
}

impl InputPin for PullUpInput {
    fn is_high(&self) -> bool { self.port.idr.read().bits() & (1 << self.index) != 0 }
}
