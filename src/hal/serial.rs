//! Byte transport interface.
use crate::hal::time::Milliseconds;

/// UART read half
pub trait Read {
    type Error: Copy + core::fmt::Debug;

    /// Reads a single byte
    fn read(&mut self) -> nb::Result<u8, Self::Error>;
}

/// Failure of a read bounded by a timeout.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadError<E> {
    TimedOut,
    Device(E),
}

/// Receive half that can give up on a silent line.
pub trait TimeoutRead: Read {
    fn read_with_timeout(&mut self, timeout: Milliseconds) -> Result<u8, ReadError<Self::Error>>;
}

/// UART write half
pub trait Write {
    type Error: Copy + core::fmt::Debug;

    /// Writes a single byte
    fn write(&mut self, byte: u8) -> nb::Result<(), Self::Error>;

    /// Writes every byte in order, blocking on each.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        bytes.iter().try_for_each(|&byte| nb::block!(self.write(byte)))
    }
}
