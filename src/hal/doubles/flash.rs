use crate::{
    hal::flash::{FlashInterface, OptionBytes, Status},
    utilities::bitwise::BitFlags,
};

/// Simulated embedded flash with F1 programming rules: bits only go from
/// 1 to 0 outside of an erase, protected pages refuse erase and program,
/// and option bytes take effect on `reset`.
#[derive(Clone, Debug)]
pub struct FakeFlash {
    base: u32,
    page_size: u32,
    pages_per_sector: u32,
    pub data: Vec<u8>,
    pub locked: bool,
    pub option_bytes_unlocked: bool,
    pub unlocks: usize,
    pub locks: usize,
    status: Status,
    /// Polls reporting busy after each started operation.
    pub busy_polls: u32,
    busy_remaining: u32,
    /// Controller never leaves the busy state.
    pub stuck_busy: bool,
    /// Address whose byte doesn't erase and whose half-word programs inverted.
    pub defect: Option<u32>,
    /// Option byte index that refuses to program.
    pub option_defect: Option<usize>,
    pub programmed: OptionBytes,
    effective_wrp: u32,
    effective_rdp: bool,
    pub page_erases: Vec<u32>,
}

impl FakeFlash {
    pub fn new(base: u32, size: usize, page_size: u32, pages_per_sector: u32) -> Self {
        Self {
            base,
            page_size,
            pages_per_sector,
            data: vec![0xFF; size],
            locked: true,
            option_bytes_unlocked: false,
            unlocks: 0,
            locks: 0,
            status: Status::default(),
            busy_polls: 2,
            busy_remaining: 0,
            stuck_busy: false,
            defect: None,
            option_defect: None,
            programmed: OptionBytes::factory(),
            effective_wrp: u32::MAX,
            effective_rdp: false,
            page_erases: Vec::new(),
        }
    }

    pub fn write_contents(&mut self, address: u32, bytes: &[u8]) {
        let offset = (address - self.base) as usize;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn contents(&self, address: u32, length: usize) -> &[u8] {
        let offset = (address - self.base) as usize;
        &self.data[offset..offset + length]
    }

    /// Simulates a system reset: programmed option bytes become effective.
    pub fn reset(&mut self) {
        self.effective_wrp = self.programmed.write_protection();
        self.effective_rdp = self.programmed.read_protected();
        self.locked = true;
        self.option_bytes_unlocked = false;
    }

    fn offset(&self, address: u32) -> Option<usize> {
        address
            .checked_sub(self.base)
            .map(|offset| offset as usize)
            .filter(|offset| *offset < self.data.len())
    }

    fn is_protected(&self, address: u32) -> bool {
        let sector = (address - self.base) / (self.page_size * self.pages_per_sector);
        sector < 32 && self.effective_wrp.is_clear(sector as u8)
    }

    fn start(&mut self) {
        self.status.busy = true;
        self.busy_remaining = self.busy_polls;
    }
}

impl FlashInterface for FakeFlash {
    fn unlock(&mut self) {
        self.unlocks += 1;
        self.locked = false;
    }

    fn lock(&mut self) {
        self.locks += 1;
        self.locked = true;
        self.option_bytes_unlocked = false;
    }

    fn is_locked(&mut self) -> bool { self.locked }

    fn status(&mut self) -> Status {
        if self.stuck_busy {
            return Status { busy: true, ..self.status };
        }
        if self.busy_remaining > 0 {
            self.busy_remaining -= 1;
        } else {
            self.status.busy = false;
        }
        self.status
    }

    fn clear_status(&mut self) {
        self.status = Status { busy: self.status.busy, ..Status::default() };
    }

    fn start_page_erase(&mut self, address: u32) {
        if self.locked {
            return;
        }
        self.start();
        if self.is_protected(address) {
            self.status.write_protection_error = true;
            return;
        }
        let page_start = address - (address - self.base) % self.page_size;
        self.page_erases.push(page_start);
        let offset = (page_start - self.base) as usize;
        self.data[offset..offset + self.page_size as usize].iter_mut().for_each(|b| *b = 0xFF);
        if let Some(defect) = self.defect.filter(|d| (page_start..page_start + self.page_size).contains(d)) {
            self.data[(defect - self.base) as usize] = 0x00;
        }
    }

    fn start_half_word_program(&mut self, address: u32, value: u16) {
        if self.locked {
            return;
        }
        self.start();
        if self.is_protected(address) {
            self.status.write_protection_error = true;
            return;
        }
        let Some(offset) = self.offset(address) else { return };
        let current = u16::from_le_bytes([self.data[offset], self.data[offset + 1]]);
        if current != 0xFFFF && value != 0 {
            self.status.programming_error = true;
            return;
        }
        let value = if self.defect.map(|d| d & !1) == Some(address) { !value } else { value };
        self.data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn end_operation(&mut self) {}

    fn read(&mut self, address: u32, bytes: &mut [u8]) {
        for (index, byte) in bytes.iter_mut().enumerate() {
            *byte = self
                .offset(address + index as u32)
                .map(|offset| self.data[offset])
                .unwrap_or(0xFF);
        }
    }

    fn unlock_option_bytes(&mut self) {
        if !self.locked {
            self.option_bytes_unlocked = true;
        }
    }

    fn start_option_erase(&mut self) {
        if !self.option_bytes_unlocked {
            return;
        }
        self.start();
        self.programmed = OptionBytes::erased();
    }

    fn start_option_program(&mut self, index: usize, value: u8) {
        if !self.option_bytes_unlocked {
            return;
        }
        self.start();
        let mut bytes = self.programmed.as_bytes();
        if bytes[index] != 0xFF || self.option_defect == Some(index) {
            self.status.programming_error = true;
            return;
        }
        bytes[index] = value;
        self.programmed = OptionBytes::from_bytes(bytes);
    }

    fn option_bytes(&mut self) -> OptionBytes { self.programmed }

    fn write_protection(&mut self) -> u32 { self.effective_wrp }

    fn read_protection_active(&mut self) -> bool { self.effective_rdp }
}
