//! Bootloader construction for the STM32F103 ("blue pill" class boards).
//!
//! USART2 on PA2/PA3 at 115200 8N1 from the 8MHz HSI, entry trigger on
//! PB12 with the internal pull-up.
use crate::{
    configuration::{
        DRAIN_TIMEOUT, INTER_BYTE_TIMEOUT, MEMORY_MAP, TRIGGER_ACTIVE_LOW, TRIGGER_SETTLE_DELAY,
    },
    devices::{
        boot_decision::BootDecisionSource, bootloader::Bootloader, checksum::ChecksumVerifier,
        dispatcher::CommandDispatcher, flash_controller::FlashController, frame::FrameCodec,
        launcher::ApplicationLauncher,
    },
    drivers::{
        cortex_m::{AddressSpace, CortexM},
        stm32f1::{
            chip::DebugIdCode, crc::HardwareCrc, flash::McuFlash, gpio::PullUpInput, rcc::Clocks,
            serial,
        },
        systick::SysTick,
    },
    hal::time::Bps,
    log::info,
    stm32pac::{self, GPIOB},
};

const BAUD_RATE: Bps = Bps(115_200);
const TRIGGER_PIN: u8 = 12;

type Serial = serial::Serial<SysTick>;

impl Default for Bootloader<Serial, HardwareCrc, McuFlash, AddressSpace, DebugIdCode, CortexM> {
    fn default() -> Self { Self::new() }
}

impl Bootloader<Serial, HardwareCrc, McuFlash, AddressSpace, DebugIdCode, CortexM> {
    pub fn new() -> Self {
        let peripherals = stm32pac::Peripherals::take().unwrap();
        let cortex_peripherals = cortex_m::Peripherals::take().unwrap();

        let clocks = Clocks::hardcoded(&peripherals.FLASH, peripherals.RCC);
        let _ = SysTick::start(cortex_peripherals.SYST, clocks.sysclk());

        // NOTE(Safety): Port B is not used by any other driver, and only
        // this pin's configuration bits are written.
        let trigger = PullUpInput::new(unsafe { &*GPIOB::ptr() }, TRIGGER_PIN);
        SysTick::wait(TRIGGER_SETTLE_DELAY);
        let decision = BootDecisionSource::new(trigger, TRIGGER_ACTIVE_LOW).decide();
        info!("Boot decision: {:?}", decision);

        let serial = Serial::usart2(peripherals.USART2, &peripherals.GPIOA, BAUD_RATE, clocks);
        let codec = FrameCodec::new(serial, INTER_BYTE_TIMEOUT, DRAIN_TIMEOUT);
        let checksum = ChecksumVerifier::new(HardwareCrc::new(peripherals.CRC));
        let flash = FlashController::new(McuFlash::new(peripherals.FLASH), MEMORY_MAP);
        let chip = DebugIdCode::new(peripherals.DBGMCU);

        // NOTE(Safety): Both readers only serve addresses vetted against
        // MEMORY_MAP, and this is the only place they are created.
        let (dispatcher_memory, launcher_memory, cpu) =
            unsafe { (AddressSpace::new(), AddressSpace::new(), CortexM::new()) };

        info!(
            "Serial command bootloader on {}kB of flash, application at {:x}",
            MEMORY_MAP.flash.size / kb!(1),
            MEMORY_MAP.application_start
        );

        Bootloader {
            decision,
            dispatcher: CommandDispatcher::new(codec, checksum, flash, dispatcher_memory, chip),
            launcher: ApplicationLauncher::new(cpu, launcher_memory, MEMORY_MAP),
        }
    }
}
