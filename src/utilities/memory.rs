//! Size conversion helpers.

#[macro_export(local_inner_macros)]
macro_rules! kb {
    ($val:expr) => {
        $val * 1024
    };
}

/// Half-open address range check that doesn't overflow at the top
/// of the address space.
pub fn contains_range(start: u32, size: u32, address: u32, length: u32) -> bool {
    address >= start
        && (address - start) <= size
        && length <= size - (address - start)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn conversion_macros() {
        assert_eq!(kb!(16), 0x4000);
    }

    #[test]
    fn ranges_are_checked_without_overflow() {
        assert!(contains_range(0x100, 0x100, 0x100, 0x100));
        assert!(contains_range(0x100, 0x100, 0x1FF, 1));
        assert!(!contains_range(0x100, 0x100, 0x1FF, 2));
        assert!(!contains_range(0x100, 0x100, 0xFF, 1));
        assert!(!contains_range(0xFFFF_FF00, 0x100, 0xFFFF_FFFF, u32::MAX));
        assert!(contains_range(0x100, 0x100, 0x200, 0));
    }
}
