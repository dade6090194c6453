//! Convenience macros for the bootloader project
#![macro_use]

/// Declares the modules of a board port and re-exports each of them at the
/// `ports` level, so the whole port sits under one configuration flag.
///
/// # Example
/// ```ignore
/// #[cfg(feature = "stm32f103")]
/// port!(stm32f103: [bootloader,]);
/// // Expands into:
/// pub mod stm32f103 { pub mod bootloader; }
/// pub use self::stm32f103::bootloader;
/// ```
#[macro_export]
macro_rules! port {
    ($outer:ident: [$($inner:ident,)+]) => {
        pub mod $outer {
        $(
            pub mod $inner;
        )+
        }
        $(
            pub use self::$outer::$inner;
        )+
    };
}
