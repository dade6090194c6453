//! Device identification through the debug MCU block.
use crate::{hal::chip::ChipId, stm32pac::DBGMCU};

/// Some F1 silicon revisions read zero here unless a debugger is attached
/// (errata 2.3.2). The value is reported as-is.
pub struct DebugIdCode {
    dbgmcu: DBGMCU,
}

impl DebugIdCode {
    pub fn new(dbgmcu: DBGMCU) -> Self { Self { dbgmcu } }
}

impl ChipId for DebugIdCode {
    fn id_code(&self) -> u32 { self.dbgmcu.idcode.read().bits() }
}
