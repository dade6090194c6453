//! Convenience bitwise operations.

/// Simple check for particular bits being set or cleared.
pub trait BitFlags {
    fn is_set(&self, bit: u8) -> bool;
    fn is_clear(&self, bit: u8) -> bool;
}

/// Blanket implementation for any types convertible to u32.
impl<U: Copy + Into<u32>> BitFlags for U {
    fn is_set(&self, bit: u8) -> bool {
        assert!(bit < 32);
        ((*self).into() & (1u32 << bit)) != 0
    }

    fn is_clear(&self, bit: u8) -> bool { !self.is_set(bit) }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bit_flags_on_registers() {
        let register = 0x8000_0001u32;
        assert!(register.is_set(0));
        assert!(register.is_set(31));
        assert!(register.is_clear(1));
    }
}
