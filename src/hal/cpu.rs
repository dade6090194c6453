//! Core operations needed to hand control to another image.

pub trait Cpu {
    /// Stops every source of asynchronous execution the bootloader
    /// started (SysTick, pending interrupts).
    fn quiesce(&mut self);

    /// # Safety
    /// `address` must point to a valid vector table.
    unsafe fn set_vector_table(&mut self, address: u32);

    /// Loads the main stack pointer and branches to `reset_vector`
    /// in a single step.
    ///
    /// # Safety
    /// Control never returns; whatever lives at `reset_vector` runs with
    /// the stack at `stack_pointer`.
    unsafe fn bootstrap(&mut self, stack_pointer: u32, reset_vector: u32) -> !;

    /// Branches to `entry` keeping the current stack.
    ///
    /// # Safety
    /// See [`Cpu::bootstrap`].
    unsafe fn branch(&mut self, entry: u32) -> !;
}
