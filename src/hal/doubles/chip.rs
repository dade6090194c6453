use crate::hal::chip::ChipId;

#[derive(Clone, Copy, Debug, Default)]
pub struct FakeChip(pub u32);

impl ChipId for FakeChip {
    fn id_code(&self) -> u32 { self.0 }
}
