//! Error type for the serial command bootloader as a whole.
//!
//! Every module reports failures through its own small error enum, which
//! converts into [`Error`]. The dispatcher answers any [`Error`] with a
//! single NACK byte, and the diagnostic log prints its description.
use crate::devices::{flash_controller::FlashError, frame::FramingError, launcher::LaunchError};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    Framing(FramingError),
    ChecksumMismatch,
    UnknownOpcode(u8),
    UnsupportedOpcode(u8),
    MalformedPayload,
    InvalidAddress,
    ReadProtected,
    Flash(FlashError),
    Launch(LaunchError),
}

impl From<FramingError> for Error {
    fn from(error: FramingError) -> Self { Error::Framing(error) }
}

impl From<FlashError> for Error {
    fn from(error: FlashError) -> Self { Error::Flash(error) }
}

impl From<LaunchError> for Error {
    fn from(error: LaunchError) -> Self { Error::Launch(error) }
}

impl Error {
    pub fn description(&self) -> &'static str {
        match self {
            Error::Framing(FramingError::Overflow) => "[Framing] Frame exceeds receive buffer",
            Error::Framing(FramingError::Truncated) => "[Framing] Frame too short",
            Error::Framing(FramingError::Timeout) => "[Framing] Inter-byte timeout",
            Error::Framing(FramingError::Transport) => "[Framing] Serial transport failure",
            Error::Framing(FramingError::LengthMismatch) => {
                "[Framing] Reply length doesn't match payload"
            }
            Error::ChecksumMismatch => "[Frame] CRC mismatch",
            Error::UnknownOpcode(_) => "[Command] Unknown opcode",
            Error::UnsupportedOpcode(_) => "[Command] Opcode not in the supported set",
            Error::MalformedPayload => "[Command] Malformed payload",
            Error::InvalidAddress => "[Command] Address outside the permitted regions",
            Error::ReadProtected => "[Command] Flash is read protected",
            Error::Flash(error) => error.description(),
            Error::Launch(LaunchError::InvalidStackPointer) => {
                "[Launch] Application stack pointer is not a valid SRAM address"
            }
            Error::Launch(LaunchError::InvalidResetVector) => {
                "[Launch] Application reset vector is not a valid thumb flash address"
            }
            Error::Launch(LaunchError::InvalidJumpTarget) => {
                "[Launch] Jump target is neither in flash nor in SRAM"
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn module_errors_convert_into_crate_error() {
        assert_eq!(Error::from(FlashError::Timeout), Error::Flash(FlashError::Timeout));
        assert_eq!(Error::from(FramingError::Overflow), Error::Framing(FramingError::Overflow));
        assert_eq!(
            Error::from(LaunchError::InvalidResetVector).description(),
            "[Launch] Application reset vector is not a valid thumb flash address"
        );
    }
}
