//! Generic Bootloader.
//!
//! This module ties the start-up decision, the command loop and the
//! application hand-off together. Construction is handled by the `port`
//! module as it depends on board specific information.
use super::{
    boot_decision::BootDecision, dispatcher::CommandDispatcher, launcher::ApplicationLauncher,
    traits::Serial,
};
use crate::{
    error::Error,
    hal::{chip::ChipId, cpu::Cpu, crc::CrcUnit, flash::FlashInterface, memory::ReadMemory},
    log::{error, info},
};

pub struct Bootloader<SRL, CRC, MCUF, MEM, ID, CPU>
where
    CRC: CrcUnit,
    MCUF: FlashInterface,
{
    pub(crate) decision: BootDecision,
    pub(crate) dispatcher: CommandDispatcher<SRL, CRC, MCUF, MEM, ID>,
    pub(crate) launcher: ApplicationLauncher<CPU, MEM>,
}

impl<SRL, CRC, MCUF, MEM, ID, CPU> Bootloader<SRL, CRC, MCUF, MEM, ID, CPU>
where
    SRL: Serial,
    CRC: CrcUnit,
    MCUF: FlashInterface,
    MEM: ReadMemory,
    ID: ChipId,
    CPU: Cpu,
{
    /// Main bootloader routine.
    ///
    /// Boots the resident application unless command mode was requested at
    /// start-up. An application whose vector table fails validation is never
    /// jumped to: the bootloader falls back to command mode instead, and
    /// serves frames until a GO_TO_ADDR command hands control elsewhere.
    pub fn run(&mut self) -> ! {
        if self.decision == BootDecision::RunApplication {
            let Err(failure) = self.launcher.launch();
            error!("{}", Error::from(failure).description());
        }
        info!("Entering command mode");
        self.dispatcher.run(&mut self.launcher)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        devices::{
            dispatcher::test::dispatcher,
            frame::{test::frame, ACK},
            memory_map::test::BLUE_PILL,
        },
        hal::doubles::{cpu::FakeCpu, memory::FakeMemory},
    };
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn launcher(stack_pointer: u32, reset_vector: u32) -> ApplicationLauncher<FakeCpu, FakeMemory> {
        let memory = FakeMemory::default()
            .with_word(0x0800_8000, stack_pointer)
            .with_word(0x0800_8004, reset_vector);
        ApplicationLauncher::new(FakeCpu::default(), memory, BLUE_PILL)
    }

    #[test]
    fn valid_application_boots_silently() {
        // Given
        let mut bootloader = Bootloader {
            decision: BootDecision::RunApplication,
            dispatcher: dispatcher(&frame(0x51, &[])),
            launcher: launcher(0x2000_5000, 0x0800_8201),
        };

        // When
        let result = catch_unwind(AssertUnwindSafe(|| bootloader.run()));

        // Then
        assert!(result.is_err());
        assert_eq!(bootloader.launcher.cpu().entry, Some(0x0800_8201));
        assert_eq!(bootloader.launcher.cpu().vector_table, Some(0x0800_8000));
        assert!(bootloader.dispatcher.serial().sent.is_empty());
    }

    #[test]
    fn invalid_application_falls_back_to_command_mode() {
        // Given
        let mut bootloader = Bootloader {
            decision: BootDecision::RunApplication,
            dispatcher: dispatcher(&frame(0x51, &[])),
            launcher: launcher(0xFFFF_FFFF, 0xFFFF_FFFF),
        };

        // When
        let result = catch_unwind(AssertUnwindSafe(|| bootloader.run()));

        // Then
        assert!(result.is_err());
        assert_eq!(bootloader.launcher.cpu().entry, None);
        assert!(!bootloader.launcher.cpu().quiesced);
        assert_eq!(bootloader.dispatcher.serial().sent, [ACK, 0x01, 0x10]);
    }

    #[test]
    fn command_mode_request_never_boots() {
        // Given
        let mut bootloader = Bootloader {
            decision: BootDecision::EnterCommandMode,
            dispatcher: dispatcher(&frame(0x51, &[])),
            launcher: launcher(0x2000_5000, 0x0800_8201),
        };

        // When
        let result = catch_unwind(AssertUnwindSafe(|| bootloader.run()));

        // Then
        assert!(result.is_err());
        assert_eq!(bootloader.launcher.cpu().entry, None);
        assert_eq!(bootloader.dispatcher.serial().sent, [ACK, 0x01, 0x10]);
    }
}
