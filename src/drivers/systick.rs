//! Millisecond time keeping on top of the Cortex-M SysTick timer.
use crate::hal::time::{self, Instant, Now};
use core::sync::atomic::{AtomicU32, Ordering};

/// Rate at which the SysTick exception fires.
pub const TICK_FREQUENCY: time::Hertz = time::Hertz(1000);

static TICKS: AtomicU32 = AtomicU32::new(0);

/// Opaque wrapper around a system tick at certain point in time
#[derive(Copy, Clone, Debug)]
pub struct Tick {
    counter: u32,
    tick_frequency: time::Hertz,
}

/// Tick subtraction to obtain a time period
impl core::ops::Sub for Tick {
    type Output = time::Milliseconds;

    fn sub(self, rhs: Self) -> Self::Output {
        assert!(self.tick_frequency == rhs.tick_frequency);
        let difference = self.counter.wrapping_sub(rhs.counter) as u64;
        time::Milliseconds(((difference * 1000) / self.tick_frequency.0 as u64) as u32)
    }
}

/// Addition between any Millisecond-convertible type and the current tick.
impl<T: Into<time::Milliseconds>> core::ops::Add<T> for Tick {
    type Output = Self;

    fn add(self, rhs: T) -> Self {
        let ticks = (rhs.into().0 as u64 * self.tick_frequency.0 as u64) / 1000;
        Self { counter: self.counter.wrapping_add(ticks as u32), tick_frequency: self.tick_frequency }
    }
}

impl Instant for Tick {}

/// Free running millisecond clock. Counts only once started by
/// [`SysTick::start`]; the counter wraps after roughly 49 days.
pub struct SysTick;

impl Now for SysTick {
    type I = Tick;

    fn now() -> Tick {
        Tick { counter: TICKS.load(Ordering::Relaxed), tick_frequency: TICK_FREQUENCY }
    }
}

impl SysTick {
    /// Configures the SysTick exception at [`TICK_FREQUENCY`] given the
    /// frequency the core runs at.
    #[cfg(target_arch = "arm")]
    pub fn start(mut syst: cortex_m::peripheral::SYST, core_clock: time::Hertz) -> Self {
        use cortex_m::peripheral::syst::SystClkSource;
        syst.set_clock_source(SystClkSource::Core);
        syst.set_reload(core_clock.0 / TICK_FREQUENCY.0 - 1);
        syst.clear_current();
        syst.enable_interrupt();
        syst.enable_counter();
        SysTick
    }

    /// Busy waits for `delay`.
    pub fn wait(delay: time::Milliseconds) {
        let start = Self::now();
        while Self::now() - start < delay {}
    }
}

#[cfg(target_arch = "arm")]
mod handler {
    use super::TICKS;
    use core::sync::atomic::Ordering;
    use cortex_m_rt::exception;

    #[exception]
    fn SysTick() { TICKS.fetch_add(1, Ordering::Relaxed); }
}
