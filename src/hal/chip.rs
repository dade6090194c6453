//! Device identification.

pub trait ChipId {
    /// Raw identification code: device id in bits 0..12,
    /// revision id in bits 16..32.
    fn id_code(&self) -> u32;
}
