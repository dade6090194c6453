use crate::hal::cpu::Cpu;

/// Records the hand-off sequence. Every non-returning operation
/// panics once recorded, so tests observe it through `catch_unwind`.
#[derive(Clone, Debug, Default)]
pub struct FakeCpu {
    pub quiesced: bool,
    pub vector_table: Option<u32>,
    pub stack_pointer: Option<u32>,
    pub entry: Option<u32>,
}

impl Cpu for FakeCpu {
    fn quiesce(&mut self) { self.quiesced = true; }

    unsafe fn set_vector_table(&mut self, address: u32) { self.vector_table = Some(address); }

    unsafe fn bootstrap(&mut self, stack_pointer: u32, reset_vector: u32) -> ! {
        self.stack_pointer = Some(stack_pointer);
        self.entry = Some(reset_vector);
        panic!("FakeCpu left the bootloader");
    }

    unsafe fn branch(&mut self, entry: u32) -> ! {
        self.entry = Some(entry);
        panic!("FakeCpu left the bootloader");
    }
}
