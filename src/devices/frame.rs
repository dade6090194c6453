//! Command frame reception and reply serialization.
//!
//! A frame on the wire is `[length, opcode, payload.., crc32 (LE)]`, where
//! `length` counts every byte after itself. Replies are either a single
//! NACK byte, or an ACK byte followed by the payload length and the payload.
use nb::block;

use crate::{
    hal::{
        serial::{ReadError, TimeoutRead, Write},
        time::Milliseconds,
    },
    log::{debug, warn},
    utilities::buffer::TryCollectSlice,
};

pub const ACK: u8 = 0xA5;
pub const NACK: u8 = 0x7F;
pub const CRC_SIZE: usize = 4;
/// Opcode plus CRC.
pub const MIN_FRAME_LENGTH: u8 = 1 + CRC_SIZE as u8;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FramingError {
    /// Declared length doesn't fit the receive buffer.
    Overflow,
    /// Declared length can't hold an opcode and a CRC.
    Truncated,
    /// The line went silent mid-frame.
    Timeout,
    Transport,
    /// Reply payload disagrees with its declared length.
    LengthMismatch,
}

/// A received frame, borrowing the receive buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CommandFrame<'a> {
    pub length: u8,
    pub opcode: u8,
    pub payload: &'a [u8],
    pub crc32: u32,
    /// Bytes protected by the CRC: everything before it, length byte included.
    pub covered: &'a [u8],
}

impl<'a> CommandFrame<'a> {
    /// Splits a complete frame. `bytes` must hold `length + 1` bytes, with
    /// `length >= MIN_FRAME_LENGTH`.
    fn split(bytes: &'a [u8]) -> Self {
        let (covered, crc) = bytes.split_at(bytes.len() - CRC_SIZE);
        let crc32 = u32::from_le_bytes([crc[0], crc[1], crc[2], crc[3]]);
        Self { length: covered[0], opcode: covered[1], payload: &covered[2..], crc32, covered }
    }
}

pub struct FrameCodec<SRL> {
    serial: SRL,
    inter_byte_timeout: Milliseconds,
    drain_timeout: Milliseconds,
}

impl<SRL: TimeoutRead + Write> FrameCodec<SRL> {
    pub fn new(serial: SRL, inter_byte_timeout: Milliseconds, drain_timeout: Milliseconds) -> Self {
        Self { serial, inter_byte_timeout, drain_timeout }
    }

    /// Waits as long as needed for a length byte, then receives the rest of
    /// the frame under the inter-byte timeout. Nothing past the length byte is
    /// stored when the declared length is invalid; the rest of the frame is
    /// drained instead.
    pub fn receive_frame<'b>(&mut self, buffer: &'b mut [u8]) -> Result<CommandFrame<'b>, FramingError> {
        let length = block!(self.serial.read()).map_err(|_| FramingError::Transport)?;
        let total = length as usize + 1;
        if total > buffer.len() {
            warn!("Frame of {} bytes exceeds the {} byte buffer", total, buffer.len());
            self.drain();
            return Err(FramingError::Overflow);
        }
        if length < MIN_FRAME_LENGTH {
            self.drain();
            return Err(FramingError::Truncated);
        }

        buffer[0] = length;
        let timeout = self.inter_byte_timeout;
        let serial = &mut self.serial;
        (0..length)
            .map(|_| {
                serial.read_with_timeout(timeout).map_err(|error| match error {
                    ReadError::TimedOut => FramingError::Timeout,
                    ReadError::Device(_) => FramingError::Transport,
                })
            })
            .try_collect_slice(&mut buffer[1..total])?;

        Ok(CommandFrame::split(&buffer[..total]))
    }

    /// Discards incoming bytes until the line stays idle for the drain timeout.
    fn drain(&mut self) {
        let mut discarded = 0usize;
        while self.serial.read_with_timeout(self.drain_timeout).is_ok() {
            discarded += 1;
        }
        debug!("Drained {} bytes", discarded);
    }

    pub fn send_ack(&mut self, follow_len: u8, payload: &[u8]) -> Result<(), FramingError> {
        if payload.len() != follow_len as usize {
            return Err(FramingError::LengthMismatch);
        }
        self.serial.write_all(&[ACK, follow_len]).map_err(|_| FramingError::Transport)?;
        self.serial.write_all(payload).map_err(|_| FramingError::Transport)
    }

    pub fn send_nack(&mut self) -> Result<(), FramingError> {
        self.serial.write_all(&[NACK]).map_err(|_| FramingError::Transport)
    }

    pub fn serial(&mut self) -> &mut SRL { &mut self.serial }
}
