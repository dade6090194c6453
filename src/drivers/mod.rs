//! Driver implementations for all supported platforms. They offer
//! a safe API over the `hal` traits, and hide every register access.

pub mod soft_crc;
pub mod systick;

#[cfg(feature = "cortex_m_any")]
pub mod cortex_m;

#[cfg(feature = "stm32f1_any")]
pub mod stm32f1 {
    pub mod chip;
    pub mod crc;
    pub mod flash;
    pub mod gpio;
    pub mod rcc;
    pub mod serial;
}
