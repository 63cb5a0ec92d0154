// src/config.rs
//
// Engine configuration and defaults.

use serde::{Deserialize, Serialize};

/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: f64 = 48_000.0;

/// Default processing block size in frames.
pub const DEFAULT_BLOCK_SIZE: usize = 128;

const DEFAULT_EVENT_CAPACITY: u32 = 1024;
const DEFAULT_COMMAND_CAPACITY: u32 = 256;
const DEFAULT_PENDING_EVENT_CAPACITY: u32 = 1024;
const DEFAULT_MAX_EXTERNAL_DATA: u32 = 32;

/// Capacities of the queues between control threads and the audio thread.
///
/// All storage is allocated when the object is created; nothing here
/// grows while processing.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scheduled events (MIDI and timed parameter changes) in flight.
    pub event_capacity: u32,
    /// Immediate parameter changes, presets and buffer updates in flight.
    pub command_capacity: u32,
    /// Events the audio thread holds sorted while waiting for their time.
    pub pending_event_capacity: u32,
    /// External data registrations alive at once.
    pub max_external_data: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            pending_event_capacity: DEFAULT_PENDING_EVENT_CAPACITY,
            max_external_data: DEFAULT_MAX_EXTERNAL_DATA,
        }
    }
}

impl EngineConfig {
    /// Replace zero capacities with defaults.
    pub(crate) fn sanitized(self) -> Self {
        let defaults = Self::default();
        let pick = |value: u32, default: u32| if value == 0 { default } else { value };
        Self {
            event_capacity: pick(self.event_capacity, defaults.event_capacity),
            command_capacity: pick(self.command_capacity, defaults.command_capacity),
            pending_event_capacity: pick(
                self.pending_event_capacity,
                defaults.pending_event_capacity,
            ),
            max_external_data: pick(self.max_external_data, defaults.max_external_data),
        }
    }
}
