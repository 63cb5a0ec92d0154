// src/event.rs

use crate::error::{EngineError, EngineResult};

/// Largest MIDI payload an event can carry, in bytes.
///
/// Payloads are stored inline so events cross to the audio thread
/// without heap allocation.
pub const MAX_EVENT_PAYLOAD: usize = 16;

/// A MIDI-like message: port plus opaque bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    port: usize,
    len: u8,
    data: [u8; MAX_EVENT_PAYLOAD],
}

impl MidiEvent {
    pub fn new(port: usize, payload: &[u8]) -> EngineResult<Self> {
        if payload.len() > MAX_EVENT_PAYLOAD {
            return Err(EngineError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_EVENT_PAYLOAD,
            });
        }
        let mut data = [0; MAX_EVENT_PAYLOAD];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            port,
            len: payload.len() as u8,
            data,
        })
    }

    #[inline]
    pub fn port(&self) -> usize {
        self.port
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }
}

/// What a scheduled event does when it comes due.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    Midi(MidiEvent),

    ParameterChange { index: usize, value: f64 },
}

/// An event expressed in engine time.
///
/// These events:
/// - are RT-safe (plain data, no heap)
/// - are ordered by `time_ms`, then by `seq`
/// - are dispatched by the engine exactly once
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledEvent {
    /// Milliseconds on the engine clock
    pub time_ms: f64,

    /// Submission order, assigned by the control side
    pub seq: u64,

    pub kind: EventKind,
}

impl ScheduledEvent {
    /// Ordering key: time first, ties by submission order.
    #[inline]
    pub(crate) fn precedes(&self, other: &ScheduledEvent) -> bool {
        self.time_ms < other.time_ms || (self.time_ms == other.time_ms && self.seq < other.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midi_payload_bounds() {
        let event = MidiEvent::new(1, &[0x90, 60, 100]).unwrap();
        assert_eq!(event.port(), 1);
        assert_eq!(event.data(), &[0x90, 60, 100]);

        let too_long = [0u8; MAX_EVENT_PAYLOAD + 1];
        assert_eq!(
            MidiEvent::new(0, &too_long),
            Err(EngineError::PayloadTooLarge {
                len: MAX_EVENT_PAYLOAD + 1,
                max: MAX_EVENT_PAYLOAD
            })
        );

        let exact = [0xF0u8; MAX_EVENT_PAYLOAD];
        assert!(MidiEvent::new(0, &exact).is_ok());
    }

    #[test]
    fn test_ordering_breaks_ties_by_seq() {
        let kind = EventKind::ParameterChange { index: 0, value: 1.0 };
        let a = ScheduledEvent { time_ms: 5.0, seq: 2, kind };
        let b = ScheduledEvent { time_ms: 5.0, seq: 3, kind };
        let c = ScheduledEvent { time_ms: 1.0, seq: 9, kind };

        assert!(a.precedes(&b));
        assert!(!b.precedes(&a));
        assert!(c.precedes(&a));
    }
}
