//! USART driver for the STM32F1 family.
//!
//! Supports 8N1 framing only, which is what the command protocol uses.
use crate::{
    drivers::stm32f1::rcc::Clocks,
    hal::{
        serial::{self, ReadError, TimeoutRead},
        time::{Bps, Milliseconds, Now},
    },
    stm32pac::{GPIOA, USART2},
};
use core::marker::PhantomData;

const SR_PE: u32 = 1 << 0;
const SR_FE: u32 = 1 << 1;
const SR_NE: u32 = 1 << 2;
const SR_ORE: u32 = 1 << 3;
const SR_RXNE: u32 = 1 << 5;
const SR_TXE: u32 = 1 << 7;

const CR1_RE: u32 = 1 << 2;
const CR1_TE: u32 = 1 << 3;
const CR1_UE: u32 = 1 << 13;

// Pin configuration nibbles (CNFy:MODEy).
const ALTERNATE_PUSH_PULL_50MHZ: u32 = 0b1011;
const FLOATING_INPUT: u32 = 0b0100;

/// Serial error
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Framing error
    Framing,
    /// Noise error
    Noise,
    /// RX buffer overrun
    Overrun,
    /// Parity check error
    Parity,
}

/// USART2 on PA2 (TX) and PA3 (RX). `T` is the time source used to
/// bound reads.
pub struct Serial<T: Now> {
    usart: USART2,
    _time: PhantomData<T>,
}

impl<T: Now> Serial<T> {
    /// Configures the pins and the peripheral. Port A and USART2 clocks
    /// must be enabled beforehand.
    pub fn usart2(usart: USART2, gpioa: &GPIOA, baudrate: Bps, clocks: Clocks) -> Self {
        // NOTE(Safety): Unsafe blocks in this function refer to using the "bits()"
        // method for easy writing.
        gpioa.crl.modify(|r, w| unsafe {
            let cleared = r.bits() & !(0xFF << 8);
            w.bits(cleared | (ALTERNATE_PUSH_PULL_50MHZ << 8) | (FLOATING_INPUT << 12))
        });

        // Calculate correct baudrate divisor on the fly
        let div = (clocks.pclk1().0 + baudrate.0 / 2) / baudrate.0;
        usart.brr.write(|w| unsafe { w.bits(div) });

        // Reset other registers to disable advanced USART features
        usart.cr2.reset();
        usart.cr3.reset();
        usart.cr1.write(|w| unsafe { w.bits(CR1_UE | CR1_TE | CR1_RE) });

        Self { usart, _time: PhantomData }
    }
}

impl<T: Now> serial::Read for Serial<T> {
    type Error = Error;

    fn read(&mut self) -> nb::Result<u8, Error> {
        let sr = self.usart.sr.read().bits();

        // Reading the data register clears the error flags, and for
        // overruns it also discards the byte that was kept.
        if sr & (SR_PE | SR_FE | SR_NE | SR_ORE) != 0 {
            let _ = self.usart.dr.read();
        }

        Err(if sr & SR_PE != 0 {
            nb::Error::Other(Error::Parity)
        } else if sr & SR_FE != 0 {
            nb::Error::Other(Error::Framing)
        } else if sr & SR_NE != 0 {
            nb::Error::Other(Error::Noise)
        } else if sr & SR_ORE != 0 {
            nb::Error::Other(Error::Overrun)
        } else if sr & SR_RXNE != 0 {
            return Ok(self.usart.dr.read().bits() as u8);
        } else {
            nb::Error::WouldBlock
        })
    }
}

impl<T: Now> TimeoutRead for Serial<T> {
    fn read_with_timeout(&mut self, timeout: Milliseconds) -> Result<u8, ReadError<Error>> {
        let start = T::now();
        loop {
            match serial::Read::read(self) {
                Ok(byte) => return Ok(byte),
                Err(nb::Error::Other(error)) => return Err(ReadError::Device(error)),
                Err(nb::Error::WouldBlock) if T::now() - start >= timeout => {
                    return Err(ReadError::TimedOut)
                }
                Err(nb::Error::WouldBlock) => {}
            }
        }
    }
}

impl<T: Now> serial::Write for Serial<T> {
    type Error = Error;

    fn write(&mut self, byte: u8) -> nb::Result<(), Error> {
        if self.usart.sr.read().bits() & SR_TXE == 0 {
            return Err(nb::Error::WouldBlock);
        }
        // NOTE(Safety): Any byte is a valid data register value.
        self.usart.dr.write(|w| unsafe { w.bits(byte as u32) });
        Ok(())
    }
}
