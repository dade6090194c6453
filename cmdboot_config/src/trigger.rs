use serde::{Deserialize, Serialize};

/// Entry trigger sampled once at start-up to choose between
/// command mode and the resident application.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TriggerConfiguration {
    /// A low level on the trigger pin requests command mode.
    pub active_low: bool,
    /// Time given to the pull resistor before the pin is sampled.
    pub settle_delay_ms: u32,
}

impl Default for TriggerConfiguration {
    fn default() -> Self { Self { active_low: true, settle_delay_ms: 200 } }
}
