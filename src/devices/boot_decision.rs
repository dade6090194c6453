//! Start-up choice between command mode and the resident application.
use crate::hal::gpio::InputPin;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootDecision {
    EnterCommandMode,
    RunApplication,
}

/// Samples the entry trigger. The pin must have settled (pull resistor
/// charged) before [`BootDecisionSource::decide`] is called.
pub struct BootDecisionSource<PIN: InputPin> {
    pin: PIN,
    active_low: bool,
}

impl<PIN: InputPin> BootDecisionSource<PIN> {
    pub fn new(pin: PIN, active_low: bool) -> Self { Self { pin, active_low } }

    pub fn decide(&self) -> BootDecision {
        let asserted = if self.active_low { self.pin.is_low() } else { self.pin.is_high() };
        if asserted {
            BootDecision::EnterCommandMode
        } else {
            BootDecision::RunApplication
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::doubles::gpio::MockPin;

    #[test]
    fn pressed_active_low_button_enters_command_mode() {
        assert_eq!(BootDecisionSource::new(MockPin::low(), true).decide(), BootDecision::EnterCommandMode);
        assert_eq!(BootDecisionSource::new(MockPin::high(), true).decide(), BootDecision::RunApplication);
    }

    #[test]
    fn active_high_trigger() {
        assert_eq!(BootDecisionSource::new(MockPin::high(), false).decide(), BootDecision::EnterCommandMode);
        assert_eq!(BootDecisionSource::new(MockPin::low(), false).decide(), BootDecision::RunApplication);
    }
}
