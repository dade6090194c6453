//! Hardware Abstraction Layer, containing interfaces
//! for low level drivers.

pub mod chip;
pub mod cpu;
pub mod crc;
pub mod flash;
pub mod gpio;
pub mod memory;
pub mod serial;
pub mod time;

#[cfg(not(target_arch = "arm"))]
#[doc(hidden)]
pub mod doubles;
