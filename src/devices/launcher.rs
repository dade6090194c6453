//! One-way hand-off from the bootloader to another image.
use core::{convert::Infallible, mem::size_of};

use crate::{
    devices::memory_map::MemoryMap,
    hal::{cpu::Cpu, memory::ReadMemory},
    log::{info, warn},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LaunchError {
    InvalidStackPointer,
    InvalidResetVector,
    InvalidJumpTarget,
}

/// Destination of a GO_TO_ADDR command.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JumpTarget(pub u32);

/// The first two vector table entries of an application image.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub stack_pointer: u32,
    pub reset_vector: u32,
}

pub struct ApplicationLauncher<CPU, MEM> {
    cpu: CPU,
    memory: MEM,
    map: MemoryMap,
}

impl<CPU: Cpu, MEM: ReadMemory> ApplicationLauncher<CPU, MEM> {
    pub fn new(cpu: CPU, memory: MEM, map: MemoryMap) -> Self { Self { cpu, memory, map } }

    /// Reads and validates the application vector table. The initial stack
    /// pointer must be word aligned and inside SRAM (its end included, as the
    /// stack grows down). The reset vector must be a thumb address inside
    /// application flash.
    pub fn image_entry(&mut self) -> Result<ImageEntry, LaunchError> {
        let base = self.map.application_start;
        let stack_pointer = self.memory.read_word(base);
        let reset_vector = self.memory.read_word(base + size_of::<u32>() as u32);

        let ram = self.map.ram;
        if stack_pointer % 4 != 0 || stack_pointer < ram.start || stack_pointer > ram.end() {
            return Err(LaunchError::InvalidStackPointer);
        }
        if reset_vector & 1 == 0 || !self.map.application().contains(reset_vector & !1) {
            return Err(LaunchError::InvalidResetVector);
        }
        Ok(ImageEntry { stack_pointer, reset_vector })
    }

    /// Boots the resident application. Only returns if its vector table
    /// is invalid, in which case the CPU state is untouched.
    pub fn launch(&mut self) -> Result<Infallible, LaunchError> {
        let entry = self.image_entry().map_err(|error| {
            warn!("Application image rejected: {:?}", error);
            error
        })?;
        info!("Booting application at {:x}", self.map.application_start);

        self.cpu.quiesce();
        // NOTE(Safety): The vector table and its first two entries were
        // validated above. From here on the application owns the CPU.
        unsafe {
            self.cpu.set_vector_table(self.map.application_start);
            self.cpu.bootstrap(entry.stack_pointer, entry.reset_vector)
        }
    }

    /// Branches to `target` keeping the current stack. The thumb bit is
    /// forced, as the core can't execute in ARM state.
    pub fn jump_to(&mut self, target: JumpTarget) -> Result<Infallible, LaunchError> {
        if !self.map.is_executable(target.0) {
            return Err(LaunchError::InvalidJumpTarget);
        }
        info!("Jumping to {:x}", target.0);
        self.cpu.quiesce();
        // NOTE(Safety): Arbitrary code execution is exactly what the host
        // asked for. The target is at least inside flash or SRAM.
        unsafe { self.cpu.branch(target.0 | 1) }
    }

    #[cfg(test)]
    pub fn cpu(&self) -> &CPU { &self.cpu }
}
