//! Complex modules with business logic related to the problem
//! domain, that lay on top of abstract drivers. Devices are
//! generic, while board specifics (pins, clocks, peripherals) are
//! handled in the `ports` module.

pub mod boot_decision;
pub mod bootloader;
pub mod checksum;
pub mod dispatcher;
pub mod flash_controller;
pub mod frame;
pub mod launcher;
pub mod memory_map;

/// General purpose traits that summarize requirements on devices.
pub mod traits {
    use crate::hal::serial;
    use marker_blanket::marker_blanket;

    /// A supported serial must be able to write, and read both
    /// blocking and with a timeout.
    #[marker_blanket]
    pub trait Serial: serial::TimeoutRead + serial::Write {}

}
