// src/scheduler.rs

use std::collections::VecDeque;

use rtrb::Consumer;

use crate::event::ScheduledEvent;

/// Audio-side view of the event timeline.
///
/// Pulls events from the control queue into a pre-allocated list kept
/// sorted by time, then hands them out block by block.
///
/// This struct runs exclusively on the audio thread.
/// It never allocates after construction.
pub struct EventScheduler {
    incoming: Consumer<ScheduledEvent>,

    /// Sorted by (time, seq), capacity fixed at construction
    pending: VecDeque<ScheduledEvent>,

    capacity: usize,
}

impl EventScheduler {
    pub fn new(incoming: Consumer<ScheduledEvent>, capacity: usize) -> Self {
        Self {
            incoming,
            pending: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Move queued events into the sorted pending list.
    ///
    /// The controller admits no more events than the list holds, so every
    /// queued event fits. The bound is kept here as well: events stay in
    /// the queue while the list is full rather than being dropped.
    pub fn collect(&mut self) {
        while self.pending.len() < self.capacity {
            let Ok(event) = self.incoming.pop() else {
                break;
            };
            let at = self.pending.partition_point(|queued| !event.precedes(queued));
            self.pending.insert(at, event);
        }
    }

    /// Earliest pending event.
    #[inline]
    pub fn peek(&self) -> Option<&ScheduledEvent> {
        self.pending.front()
    }

    /// Remove and return the earliest pending event if `due` accepts it.
    #[inline]
    pub fn pop_if(&mut self, due: impl FnOnce(&ScheduledEvent) -> bool) -> Option<ScheduledEvent> {
        match self.pending.front() {
            Some(event) if due(event) => self.pending.pop_front(),
            _ => None,
        }
    }

    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Frame offset of `time_ms` inside a block starting at `block_start_ms`.
///
/// Late events clamp to the block start.
#[inline]
pub(crate) fn frame_offset(time_ms: f64, block_start_ms: f64, sample_rate: f64) -> usize {
    if time_ms <= block_start_ms {
        0
    } else {
        ((time_ms - block_start_ms) * sample_rate / 1000.0).floor() as usize
    }
}
