//! Reset and clock control for the STM32F1 family.
use crate::{
    hal::time::{Hertz, MegaHertz},
    stm32pac::{FLASH, RCC},
};

/// Internal RC oscillator frequency, the system clock out of reset.
pub const HSI: MegaHertz = MegaHertz(8);

// Enable bits, from the RCC register descriptions.
const AHBENR_CRCEN: u32 = 1 << 6;
const APB2ENR_AFIOEN: u32 = 1 << 0;
const APB2ENR_IOPAEN: u32 = 1 << 2;
const APB2ENR_IOPBEN: u32 = 1 << 3;
const APB1ENR_USART2EN: u32 = 1 << 17;

/// Frozen clock frequencies
///
/// The existence of this value indicates that the clock configuration can no longer be changed
#[derive(Clone, Copy, Debug)]
pub struct Clocks {
    pclk1: Hertz,
    sysclk: Hertz,
}

impl Clocks {
    pub fn pclk1(&self) -> Hertz { self.pclk1 }

    pub fn sysclk(&self) -> Hertz { self.sysclk }

    /// Keeps the core on the HSI with undivided buses, and gates on every
    /// peripheral the bootloader uses. The HSI must stay on for flash
    /// programming, so it is the only source considered.
    pub fn hardcoded(flash: &FLASH, rcc: RCC) -> Self {
        // NOTE(Safety): All unsafe blocks in this function refer to using the "bits()"
        // method for easy writing.
        flash.acr.write(|w| unsafe { w.bits(0) }); // Zero wait states up to 24MHz

        rcc.cr.modify(|_, w| w.hsion().set_bit());
        while rcc.cr.read().hsirdy().bit_is_clear() {}
        rcc.cfgr.write(|w| unsafe { w.bits(0) }); // HSI as sysclk, no prescalers

        rcc.ahbenr.modify(|r, w| unsafe { w.bits(r.bits() | AHBENR_CRCEN) });
        rcc.apb2enr.modify(|r, w| unsafe {
            w.bits(r.bits() | APB2ENR_AFIOEN | APB2ENR_IOPAEN | APB2ENR_IOPBEN)
        });
        rcc.apb1enr.modify(|r, w| unsafe { w.bits(r.bits() | APB1ENR_USART2EN) });

        let sysclk = Hertz::from(HSI);
        Clocks { pclk1: sysclk, sysclk }
    }
}
