//! Internal Flash controller for the STM32F1 family.
//!
//! Exposes the raw controller operations only. Sequencing, busy polling
//! and memory map checks live in `devices::flash_controller`.
use crate::{
    hal::flash::{FlashInterface, OptionBytes, Status},
    stm32pac::FLASH,
};
use core::ptr;

/// From the flash programming manual, section 2.3.1
const UNLOCK_KEYS: [u32; 2] = [0x4567_0123, 0xCDEF_89AB];

/// Option bytes are stored as half-words, value in the low byte and its
/// complement in the high byte.
const OPTION_BYTES_BASE: u32 = 0x1FFF_F800;

const SR_BSY: u32 = 1 << 0;
const SR_PGERR: u32 = 1 << 2;
const SR_WRPRTERR: u32 = 1 << 4;
const SR_EOP: u32 = 1 << 5;

const CR_PG: u32 = 1 << 0;
const CR_PER: u32 = 1 << 1;
const CR_OPTPG: u32 = 1 << 4;
const CR_OPTER: u32 = 1 << 5;
const CR_STRT: u32 = 1 << 6;
const CR_LOCK: u32 = 1 << 7;
const CR_OPTWRE: u32 = 1 << 9;

const OBR_RDPRT: u32 = 1 << 1;

pub struct McuFlash {
    flash: FLASH,
}

impl McuFlash {
    pub fn new(flash: FLASH) -> Self { Self { flash } }

    fn set_control(&mut self, bits: u32) {
        // NOTE(Safety): Unsafe block to use the 'bits' convenience function.
        // Applies to all blocks in this file unless specified otherwise
        self.flash.cr.modify(|r, w| unsafe { w.bits(r.bits() | bits) });
    }

    fn clear_control(&mut self, bits: u32) {
        self.flash.cr.modify(|r, w| unsafe { w.bits(r.bits() & !bits) });
    }
}

impl FlashInterface for McuFlash {
    fn unlock(&mut self) {
        if self.is_locked() {
            self.flash.keyr.write(|w| unsafe { w.bits(UNLOCK_KEYS[0]) });
            self.flash.keyr.write(|w| unsafe { w.bits(UNLOCK_KEYS[1]) });
        }
    }

    fn lock(&mut self) {
        self.clear_control(CR_OPTWRE);
        self.set_control(CR_LOCK);
    }

    fn is_locked(&mut self) -> bool { self.flash.cr.read().bits() & CR_LOCK != 0 }

    fn status(&mut self) -> Status {
        let sr = self.flash.sr.read().bits();
        Status {
            busy: sr & SR_BSY != 0,
            programming_error: sr & SR_PGERR != 0,
            write_protection_error: sr & SR_WRPRTERR != 0,
        }
    }

    fn clear_status(&mut self) {
        // Flags are cleared by writing ones.
        self.flash.sr.write(|w| unsafe { w.bits(SR_PGERR | SR_WRPRTERR | SR_EOP) });
    }

    fn start_page_erase(&mut self, address: u32) {
        self.set_control(CR_PER);
        self.flash.ar.write(|w| unsafe { w.bits(address) });
        self.set_control(CR_STRT);
    }

    fn start_half_word_program(&mut self, address: u32, value: u16) {
        self.set_control(CR_PG);
        // NOTE(Safety): Half-word writes to main flash with PG set are
        // intercepted by the controller. The caller has validated the address.
        unsafe { ptr::write_volatile(address as *mut u16, value) };
    }

    fn end_operation(&mut self) { self.clear_control(CR_PG | CR_PER | CR_OPTPG | CR_OPTER); }

    fn read(&mut self, address: u32, bytes: &mut [u8]) {
        let base = address as *const u8;
        for (index, byte) in bytes.iter_mut().enumerate() {
            // NOTE(Safety): Reads are bounded by the memory map before reaching
            // this driver, and writes go through a mutable reference to this same
            // struct, so there can't be a data race.
            *byte = unsafe { ptr::read_volatile(base.add(index)) };
        }
    }

    fn unlock_option_bytes(&mut self) {
        self.flash.optkeyr.write(|w| unsafe { w.bits(UNLOCK_KEYS[0]) });
        self.flash.optkeyr.write(|w| unsafe { w.bits(UNLOCK_KEYS[1]) });
    }

    fn start_option_erase(&mut self) {
        self.set_control(CR_OPTER);
        self.set_control(CR_STRT);
    }

    fn start_option_program(&mut self, index: usize, value: u8) {
        self.set_control(CR_OPTPG);
        let address = OPTION_BYTES_BASE + 2 * index as u32;
        // NOTE(Safety): Option byte slots are fixed hardware addresses and
        // `index` is bounded by `OptionBytes::COUNT` at the call site.
        unsafe { ptr::write_volatile(address as *mut u16, value as u16) };
    }

    fn option_bytes(&mut self) -> OptionBytes {
        let mut bytes = [0u8; OptionBytes::COUNT];
        for (index, byte) in bytes.iter_mut().enumerate() {
            let address = (OPTION_BYTES_BASE + 2 * index as u32) as *const u16;
            // NOTE(Safety): Always readable, fixed hardware location.
            *byte = unsafe { ptr::read_volatile(address) } as u8;
        }
        OptionBytes::from_bytes(bytes)
    }

    fn write_protection(&mut self) -> u32 { self.flash.wrpr.read().bits() }

    fn read_protection_active(&mut self) -> bool { self.flash.obr.read().bits() & OBR_RDPRT != 0 }
}
