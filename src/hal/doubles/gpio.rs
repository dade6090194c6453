use crate::hal::gpio::InputPin;

#[derive(Clone, Debug, Default)]
pub struct MockPin {
    pub state: bool,
}

impl MockPin {
    pub fn high() -> Self { Self { state: true } }
    pub fn low() -> Self { Self { state: false } }
}

impl InputPin for MockPin {
    fn is_high(&self) -> bool { self.state }
}
