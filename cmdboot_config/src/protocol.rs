use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfiguration {
    /// Byte reported by GET_VERSION.
    pub version: u8,
    /// Capacity of the per-frame receive buffer, length byte included.
    pub receive_buffer_size: usize,
    /// Maximum silence between two bytes of the same frame.
    pub inter_byte_timeout_ms: u32,
    /// Silence that marks the end of a rejected frame's leftover bytes.
    pub drain_timeout_ms: u32,
    /// Serve all twelve commands instead of the default eight.
    pub extended_commands: bool,
}

impl Default for ProtocolConfiguration {
    fn default() -> Self {
        Self {
            version: 0x10,
            receive_buffer_size: 200,
            inter_byte_timeout_ms: 1000,
            drain_timeout_ms: 50,
            extended_commands: false,
        }
    }
}
