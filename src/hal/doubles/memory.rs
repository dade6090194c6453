use crate::hal::memory::ReadMemory;

/// Sparse address space. Bytes outside every region read as `0xFF`.
#[derive(Clone, Debug, Default)]
pub struct FakeMemory {
    regions: Vec<(u32, Vec<u8>)>,
    pub reads: Vec<(u32, usize)>,
}

impl FakeMemory {
    pub fn with_region(mut self, start: u32, contents: &[u8]) -> Self {
        self.regions.push((start, contents.to_vec()));
        self
    }

    pub fn with_word(self, address: u32, word: u32) -> Self {
        self.with_region(address, &word.to_le_bytes())
    }

    fn byte(&self, address: u32) -> u8 {
        self.regions
            .iter()
            .rev()
            .find_map(|(start, contents)| {
                address.checked_sub(*start).and_then(|offset| contents.get(offset as usize))
            })
            .copied()
            .unwrap_or(0xFF)
    }
}

impl ReadMemory for FakeMemory {
    fn read(&mut self, address: u32, bytes: &mut [u8]) {
        self.reads.push((address, bytes.len()));
        for (offset, byte) in bytes.iter_mut().enumerate() {
            *byte = self.byte(address.wrapping_add(offset as u32));
        }
    }
}
