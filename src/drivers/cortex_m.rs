//! Core level drivers shared by every Cortex-M port: raw address space
//! reads and the control transfer primitives.
use crate::hal::{cpu::Cpu, memory::ReadMemory};
use core::ptr;
use cortex_m::peripheral::{NVIC, SCB, SYST};

/// Handle to the core registers involved in handing off control.
pub struct CortexM {
    _private: (),
}

impl CortexM {
    /// # Safety
    /// There must be a single instance, as it writes core registers
    /// (SysTick, NVIC, VTOR) without ownership of their peripherals.
    pub unsafe fn new() -> Self { Self { _private: () } }
}

impl Cpu for CortexM {
    fn quiesce(&mut self) {
        cortex_m::interrupt::disable();

        // NOTE(Safety): Raw register writes on peripherals this driver has
        // exclusive use of as per `CortexM::new`. The application expects
        // a SysTick at its reset values and no stale interrupts.
        unsafe {
            let systick = &*SYST::PTR;
            systick.csr.write(0);
            systick.rvr.write(0);
            systick.cvr.write(0);

            let nvic = &*NVIC::PTR;
            for register in nvic.icer.iter() {
                register.write(u32::MAX);
            }
            for register in nvic.icpr.iter() {
                register.write(u32::MAX);
            }

            cortex_m::interrupt::enable();
        }
    }

    unsafe fn set_vector_table(&mut self, address: u32) {
        (*SCB::PTR).vtor.write(address);
        cortex_m::asm::dsb();
        cortex_m::asm::isb();
    }

    unsafe fn bootstrap(&mut self, stack_pointer: u32, reset_vector: u32) -> ! {
        cortex_m::asm::bootstrap(stack_pointer as *const u32, reset_vector as *const u32)
    }

    unsafe fn branch(&mut self, entry: u32) -> ! {
        let entry: extern "C" fn() -> ! = core::mem::transmute(entry as usize);
        entry()
    }
}

/// Volatile byte reads from the memory mapped address space.
pub struct AddressSpace {
    _private: (),
}

impl AddressSpace {
    /// # Safety
    /// Reads are only sound for addresses the memory map declares readable.
    /// Callers of [`ReadMemory::read`] on this type must guarantee it.
    pub unsafe fn new() -> Self { Self { _private: () } }
}

impl ReadMemory for AddressSpace {
    fn read(&mut self, address: u32, bytes: &mut [u8]) {
        let base = address as *const u8;
        for (index, byte) in bytes.iter_mut().enumerate() {
            // NOTE(Safety): Address validity is enforced by the memory map
            // checks that precede every read request.
            *byte = unsafe { ptr::read_volatile(base.add(index)) };
        }
    }
}
