//! Full project ports for specific targets. They mainly
//! provide a method to construct a generic bootloader from
//! specific parts.

#[cfg(feature = "stm32f103")]
port!(stm32f103: [bootloader,]);
