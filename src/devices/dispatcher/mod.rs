//! Command mode: receives frames, validates their checksum, routes each
//! opcode to its handler and writes the reply.
//!
//! Every frame goes through the same sequence of states:
//!
//! ```text
//! Idle -> Receiving -> Validating -> Dispatching -------> Responding -> Idle
//!                 \              \-> RejectedChecksum -/
//!                  \-----------------------------------/
//! Dispatching -> HandingOff (terminal)
//! ```
//!
//! Any rejection, whether framing, checksum or command level, is answered
//! with a single NACK byte and the loop carries on with the next frame.
use crate::{
    configuration::{BOOTLOADER_VERSION, EXTENDED_COMMANDS, RECEIVE_BUFFER_SIZE},
    devices::{
        checksum::ChecksumVerifier,
        flash_controller::FlashController,
        frame::{CommandFrame, FrameCodec, MIN_FRAME_LENGTH},
        launcher::{ApplicationLauncher, JumpTarget},
        traits::Serial,
    },
    error::Error,
    hal::{
        chip::ChipId,
        cpu::Cpu,
        crc::CrcUnit,
        flash::FlashInterface,
        memory::ReadMemory,
    },
    log::{debug, error, warn},
};
use static_assertions::const_assert;

mod commands;

// A frame is at least a length byte and the covered bytes, and the length
// byte can't describe anything longer than 256 bytes in total.
const_assert!(RECEIVE_BUFFER_SIZE > MIN_FRAME_LENGTH as usize);
const_assert!(RECEIVE_BUFFER_SIZE <= 256);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    GetVersion = 0x51,
    GetHelp = 0x52,
    GetCid = 0x53,
    GetRdpStatus = 0x54,
    GoToAddress = 0x55,
    FlashErase = 0x56,
    MemWrite = 0x57,
    EnableRwProtect = 0x58,
    MemRead = 0x59,
    ReadSectorStatus = 0x5A,
    OtpRead = 0x5B,
    DisableRwProtect = 0x5C,
}

/// Opcodes served by default, in the order GET_HELP reports them.
pub const DEFAULT_OPCODES: [Opcode; 8] = [
    Opcode::GetVersion,
    Opcode::GetHelp,
    Opcode::GetCid,
    Opcode::GetRdpStatus,
    Opcode::GoToAddress,
    Opcode::FlashErase,
    Opcode::MemWrite,
    Opcode::ReadSectorStatus,
];

pub const EXTENDED_OPCODES: [Opcode; 12] = [
    Opcode::GetVersion,
    Opcode::GetHelp,
    Opcode::GetCid,
    Opcode::GetRdpStatus,
    Opcode::GoToAddress,
    Opcode::FlashErase,
    Opcode::MemWrite,
    Opcode::EnableRwProtect,
    Opcode::MemRead,
    Opcode::ReadSectorStatus,
    Opcode::OtpRead,
    Opcode::DisableRwProtect,
];

impl TryFrom<u8> for Opcode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        EXTENDED_OPCODES
            .iter()
            .copied()
            .find(|opcode| *opcode as u8 == value)
            .ok_or(Error::UnknownOpcode(value))
    }
}

/// ACK payload. Its length always fits the reply's length byte.
pub type Reply = heapless::Vec<u8, 255>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Acknowledged(Reply),
    Rejected(Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Respond(CommandOutcome),
    /// Leave the bootloader without replying.
    Jump(JumpTarget),
}

/// Result of serving one frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    HandOff(JumpTarget),
}

/// States a frame goes through once its bytes are in the buffer.
enum State<'a> {
    Validating(CommandFrame<'a>),
    RejectedChecksum,
    Dispatching(CommandFrame<'a>),
    Responding(CommandOutcome),
    HandingOff(JumpTarget),
}

pub struct CommandDispatcher<SRL, CRC, MCUF, MEM, ID>
where
    CRC: CrcUnit,
    MCUF: FlashInterface,
{
    codec: FrameCodec<SRL>,
    checksum: ChecksumVerifier<CRC>,
    flash: FlashController<MCUF>,
    memory: MEM,
    chip: ID,
    version: u8,
    opcodes: &'static [Opcode],
}

impl<SRL, CRC, MCUF, MEM, ID> CommandDispatcher<SRL, CRC, MCUF, MEM, ID>
where
    SRL: Serial,
    CRC: CrcUnit,
    MCUF: FlashInterface,
    MEM: ReadMemory,
    ID: ChipId,
{
    const HANDLERS: [(Opcode, fn(&mut Self, &[u8]) -> Action); 12] = [
        (Opcode::GetVersion, Self::get_version),
        (Opcode::GetHelp, Self::get_help),
        (Opcode::GetCid, Self::get_cid),
        (Opcode::GetRdpStatus, Self::get_rdp_status),
        (Opcode::GoToAddress, Self::go_to_address),
        (Opcode::FlashErase, Self::flash_erase),
        (Opcode::MemWrite, Self::mem_write),
        (Opcode::EnableRwProtect, Self::enable_rw_protect),
        (Opcode::MemRead, Self::mem_read),
        (Opcode::ReadSectorStatus, Self::read_sector_status),
        (Opcode::OtpRead, Self::otp_read),
        (Opcode::DisableRwProtect, Self::disable_rw_protect),
    ];

    pub fn new(
        codec: FrameCodec<SRL>,
        checksum: ChecksumVerifier<CRC>,
        flash: FlashController<MCUF>,
        memory: MEM,
        chip: ID,
    ) -> Self {
        let opcodes: &'static [Opcode] =
            if EXTENDED_COMMANDS { &EXTENDED_OPCODES } else { &DEFAULT_OPCODES };
        Self { codec, checksum, flash, memory, chip, version: BOOTLOADER_VERSION, opcodes }
    }

    /// Replaces the set of served opcodes, which is also the GET_HELP reply.
    pub fn with_opcodes(self, opcodes: &'static [Opcode]) -> Self { Self { opcodes, ..self } }

    /// Serves frames forever. A GO_TO_ADDR command leaves through the launcher.
    pub fn run<CPU: Cpu, LMEM: ReadMemory>(
        &mut self,
        launcher: &mut ApplicationLauncher<CPU, LMEM>,
    ) -> ! {
        loop {
            if let Step::HandOff(target) = self.serve_frame() {
                let Err(error) = launcher.jump_to(target);
                self.respond(CommandOutcome::Rejected(error.into()));
            }
        }
    }

    /// Runs one frame from reception to reply, and reports whether
    /// the frame asked to leave the bootloader.
    pub fn serve_frame(&mut self) -> Step {
        let mut buffer = [0u8; RECEIVE_BUFFER_SIZE];
        let mut state = match self.codec.receive_frame(&mut buffer) {
            Ok(frame) => State::Validating(frame),
            Err(error) => State::Responding(CommandOutcome::Rejected(error.into())),
        };

        loop {
            state = match state {
                State::Validating(frame) => {
                    if self.checksum.verify(frame.covered, frame.crc32) {
                        State::Dispatching(frame)
                    } else {
                        State::RejectedChecksum
                    }
                }
                State::RejectedChecksum => {
                    State::Responding(CommandOutcome::Rejected(Error::ChecksumMismatch))
                }
                State::Dispatching(frame) => match self.dispatch(&frame) {
                    Action::Respond(outcome) => State::Responding(outcome),
                    Action::Jump(target) => State::HandingOff(target),
                },
                State::Responding(outcome) => {
                    self.respond(outcome);
                    return Step::Continue;
                }
                State::HandingOff(target) => return Step::HandOff(target),
            }
        }
    }

    fn dispatch(&mut self, frame: &CommandFrame) -> Action {
        let opcode = match Opcode::try_from(frame.opcode) {
            Ok(opcode) => opcode,
            Err(error) => return Action::Respond(CommandOutcome::Rejected(error)),
        };
        if !self.opcodes.contains(&opcode) {
            return Action::Respond(CommandOutcome::Rejected(Error::UnsupportedOpcode(frame.opcode)));
        }
        debug!("Serving {:?}", opcode);
        match Self::HANDLERS.iter().find(|(candidate, _)| *candidate == opcode) {
            Some((_, handler)) => handler(self, frame.payload),
            None => Action::Respond(CommandOutcome::Rejected(Error::UnknownOpcode(frame.opcode))),
        }
    }

    fn respond(&mut self, outcome: CommandOutcome) {
        let result = match outcome {
            CommandOutcome::Acknowledged(reply) => self.codec.send_ack(reply.len() as u8, &reply),
            CommandOutcome::Rejected(reason) => {
                warn!("Rejected: {}", reason.description());
                self.codec.send_nack()
            }
        };
        if let Err(failure) = result {
            error!("Reply not sent: {:?}", failure);
        }
    }

    #[cfg(test)]
    pub fn serial(&mut self) -> &mut SRL { self.codec.serial() }

    #[cfg(test)]
    pub fn flash(&mut self) -> &mut FlashController<MCUF> { &mut self.flash }
}
