//! # Serial Command Bootloader Library
//!
//! This crate contains all functionality for the
//! serial command bootloader in library form.
#![cfg_attr(test, allow(unused_imports))]
#![cfg_attr(target_arch = "arm", no_std)]

#[cfg(feature = "stm32f103")]
pub use stm32f1::stm32f103 as stm32pac;

#[cfg(feature = "defmt")]
pub(crate) use defmt as log;
#[cfg(not(feature = "defmt"))]
pub(crate) use ::log;

#[macro_use]
pub mod utilities {
    pub mod bitwise;
    pub mod buffer;
    pub mod guard;
    #[macro_use]
    pub mod memory;
    mod macros;
}

/// Constants generated at build time from the RON configuration file.
pub mod configuration {
    include!(concat!(env!("OUT_DIR"), "/configuration.rs"));
}

pub mod hal;
pub mod devices;
pub mod drivers;
pub mod ports;
pub mod error;
