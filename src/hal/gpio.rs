//! # Simple GPIO interface
//!
//! Interface to input pins, automatically implemented by
//! GPIOs that support such operations.

/// Interface to a readable pin.
pub trait InputPin {
    fn is_high(&self) -> bool;
    fn is_low(&self) -> bool { !self.is_high() }
}
