//! Simulated hardware used by the host test suite.
pub mod chip;
pub mod cpu;
pub mod flash;
pub mod gpio;
pub mod memory;
pub mod serial;
