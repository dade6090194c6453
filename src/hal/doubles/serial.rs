use std::collections::VecDeque;

use crate::hal::{
    serial::{self, ReadError},
    time::Milliseconds,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FakeSerialError;

/// Serial port that replays scripted input and records everything sent.
///
/// A blocking read with nothing left to receive panics, which is how tests
/// stop loops that never return. Timed reads on an empty line time out.
#[derive(Debug, Default)]
pub struct FakeSerial {
    pub to_receive: VecDeque<u8>,
    pub sent: Vec<u8>,
    pub broken: bool,
    pub timeouts_requested: Vec<Milliseconds>,
}

impl FakeSerial {
    pub fn with_input(bytes: &[u8]) -> Self {
        Self { to_receive: bytes.iter().copied().collect(), ..Default::default() }
    }

    pub fn push(&mut self, bytes: &[u8]) { self.to_receive.extend(bytes.iter().copied()) }

    pub fn take_sent(&mut self) -> Vec<u8> { core::mem::take(&mut self.sent) }
}

impl serial::Read for FakeSerial {
    type Error = FakeSerialError;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        if self.broken {
            return Err(nb::Error::Other(FakeSerialError));
        }
        match self.to_receive.pop_front() {
            Some(byte) => Ok(byte),
            None => panic!("FakeSerial exhausted"),
        }
    }
}

impl serial::TimeoutRead for FakeSerial {
    fn read_with_timeout(&mut self, timeout: Milliseconds) -> Result<u8, ReadError<Self::Error>> {
        self.timeouts_requested.push(timeout);
        if self.broken {
            return Err(ReadError::Device(FakeSerialError));
        }
        self.to_receive.pop_front().ok_or(ReadError::TimedOut)
    }
}

impl serial::Write for FakeSerial {
    type Error = FakeSerialError;

    fn write(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        if self.broken {
            return Err(nb::Error::Other(FakeSerialError));
        }
        self.sent.push(byte);
        Ok(())
    }
}
