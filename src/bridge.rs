//! Thread-safe bridge between control threads and the audio thread.
//!
//! # Architecture
//!
//! - **Control threads** share a [`Controller`]; every call locks a
//!   control-side mutex that the audio thread never touches
//! - **Audio thread** owns the [`Processor`] with the patcher
//! - Data travels over lock-free SPSC ring buffers (`rtrb`); heap objects
//!   that reach the audio thread come back through a retire queue so they
//!   are freed on the control side
//! - Applied parameter values and the engine clock travel back through atomics
//!
//! # Usage
//!
//! ```ignore
//! let (controller, mut processor) = create_bridge(patcher, EngineConfig::default());
//!
//! // Control thread: queue changes
//! controller.set_parameter_value(0, 0.8)?;
//!
//! // Audio thread: apply them at the next block and render
//! processor.process(&inputs, &mut outputs, frames);
//! ```

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};

use crate::config::EngineConfig;
use crate::engine::Processor;
use crate::error::{EngineError, EngineResult};
use crate::event::{EventKind, MidiEvent, ScheduledEvent};
use crate::external_data::{ExternalData, SlotAllocator};
use crate::parameter::{ParameterInfo, ParameterTable, ParameterValues};
use crate::patcher::Patcher;
use crate::preset::Preset;
use crate::sample::Sample;

/// A change applied by the audio thread at the start of the next block.
pub(crate) enum Command {
    SetParameter { index: usize, value: f64 },

    ApplyPreset(Box<PresetUpdate>),

    InstallData { slot: usize, data: Box<ExternalData> },

    ReleaseData { slot: usize },
}

/// A command stamped with the sequence number it shares with scheduled
/// events, so both kinds keep call order at the block start.
pub(crate) struct QueuedCommand {
    pub seq: u64,
    pub command: Command,
}

/// A preset resolved to parameter indices on the control side.
pub(crate) struct PresetUpdate {
    pub values: Vec<(usize, f64)>,
    pub preset: Preset,
}

/// Heap objects the audio thread is done with, freed on the control side.
pub(crate) type Retired = Box<dyn Send>;

/// Lock-free state written by the audio thread and read by control threads.
pub(crate) struct SharedState {
    pub values: ParameterValues,

    /// Engine time at the start of the next block, as f64 bits
    time_ms_bits: AtomicU64,

    /// Events accepted by the control side and not yet dispatched
    events_in_flight: AtomicUsize,
}

impl SharedState {
    fn new(parameters: &ParameterTable) -> Self {
        Self {
            values: ParameterValues::new(parameters),
            time_ms_bits: AtomicU64::new(0.0_f64.to_bits()),
            events_in_flight: AtomicUsize::new(0),
        }
    }

    /// Claim room for one more event, or fail if `capacity` are in flight.
    ///
    /// Only called under the control lock; the audio thread only decrements.
    fn try_reserve_event(&self, capacity: usize) -> bool {
        if self.events_in_flight.load(Ordering::Acquire) >= capacity {
            return false;
        }
        self.events_in_flight.fetch_add(1, Ordering::AcqRel);
        true
    }

    /// Give back the room held by a dispatched (or unsent) event.
    #[inline]
    pub fn release_event(&self) {
        self.events_in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    #[inline]
    pub fn time_ms(&self) -> f64 {
        f64::from_bits(self.time_ms_bits.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_time_ms(&self, time_ms: f64) {
        self.time_ms_bits.store(time_ms.to_bits(), Ordering::Release);
    }
}

/// Producer ends of the queues, guarded by the control mutex.
struct ControlQueues {
    events: Producer<ScheduledEvent>,
    commands: Producer<QueuedCommand>,

    /// Shared by events and commands
    next_seq: u64,

    /// Events the audio thread can hold sorted at once
    event_limit: usize,

    retired: Consumer<Retired>,
    slots: SlotAllocator,

    /// Opaque state entries of the presets applied so far, by id
    applied_state: BTreeMap<String, serde_json::Value>,
}

impl ControlQueues {
    /// Free everything the audio thread has handed back.
    fn collect_retired(&mut self) {
        while self.retired.pop().is_ok() {}
    }

    fn push_command(&mut self, command: Command) -> Result<(), Command> {
        self.collect_retired();
        let queued = QueuedCommand {
            seq: self.next_seq,
            command,
        };
        self.commands
            .push(queued)
            .map_err(|rtrb::PushError::Full(queued)| queued.command)?;
        self.next_seq += 1;
        Ok(())
    }

    /// Queue an event if the audio thread will have room to sort it.
    fn push_event(&mut self, shared: &SharedState, time_ms: f64, kind: EventKind) -> EngineResult<()> {
        if !shared.try_reserve_event(self.event_limit) {
            log::warn!("event limit of {} reached, rejecting event", self.event_limit);
            return Err(EngineError::QueueFull("event"));
        }
        let event = ScheduledEvent {
            time_ms,
            seq: self.next_seq,
            kind,
        };
        if self.events.push(event).is_err() {
            shared.release_event();
            return Err(EngineError::QueueFull("event"));
        }
        self.next_seq += 1;
        Ok(())
    }
}

/// Handle for control threads.
///
/// All methods take `&self` and may be called from any number of
/// non-real-time threads. None of them wait on the audio thread.
pub struct Controller<S> {
    parameters: Arc<ParameterTable>,
    shared: Arc<SharedState>,
    queues: Mutex<ControlQueues>,
    _sample: PhantomData<fn() -> S>,
}

/// Create a linked controller/processor pair around `patcher`.
pub fn create_bridge<S: Sample>(
    patcher: Box<dyn Patcher<S>>,
    config: EngineConfig,
) -> (Controller<S>, Processor<S>) {
    let config = config.sanitized();
    let parameters = Arc::new(ParameterTable::new(patcher.parameters()));
    let shared = Arc::new(SharedState::new(&parameters));

    let (event_tx, event_rx) = RingBuffer::new(config.event_capacity as usize);
    let (command_tx, command_rx) = RingBuffer::new(config.command_capacity as usize);
    let (retired_tx, retired_rx) =
        RingBuffer::new((config.command_capacity + config.max_external_data) as usize);

    let controller = Controller {
        parameters: Arc::clone(&parameters),
        shared: Arc::clone(&shared),
        queues: Mutex::new(ControlQueues {
            events: event_tx,
            commands: command_tx,
            next_seq: 0,
            event_limit: config.pending_event_capacity as usize,
            retired: retired_rx,
            slots: SlotAllocator::new(config.max_external_data as usize),
            applied_state: BTreeMap::new(),
        }),
        _sample: PhantomData,
    };

    let processor = Processor::new(
        patcher,
        parameters,
        shared,
        event_rx,
        command_rx,
        retired_tx,
        &config,
    );

    (controller, processor)
}

impl<S: Sample> Controller<S> {
    // ═══════════════════════════════════════════
    // Parameters
    // ═══════════════════════════════════════════

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameter_info(&self, index: usize) -> Option<&ParameterInfo> {
        self.parameters.info(index)
    }

    pub(crate) fn parameters(&self) -> &ParameterTable {
        &self.parameters
    }

    /// Index of the parameter called `id`. Pure and allocation-free.
    #[inline]
    pub fn parameter_index_for_id(&self, id: &str) -> Option<usize> {
        self.parameters.index_for_id(id)
    }

    /// The most recently applied value; zero for an unknown index.
    ///
    /// Pending scheduled changes are not reflected until the audio thread
    /// reaches their time.
    #[inline]
    pub fn parameter_value(&self, index: usize) -> S {
        S::from_f64(self.shared.values.get(index).unwrap_or(0.0))
    }

    /// Set a value at the start of the next processed block.
    ///
    /// Ordered with scheduled changes that fall due at the same block start
    /// by call order.
    pub fn set_parameter_value(&self, index: usize, value: S) -> EngineResult<()> {
        let value = self.constrain(index, value)?;
        let mut queues = self.queues.lock();
        queues
            .push_command(Command::SetParameter { index, value })
            .map_err(|_| EngineError::QueueFull("command"))
    }

    /// Set a value `offset_ms` after the current engine time.
    ///
    /// Changes step at their time. Changes to the same parameter at the same
    /// time are applied in call order, so the last one wins.
    pub fn set_parameter_value_at(&self, index: usize, value: S, offset_ms: f64) -> EngineResult<()> {
        if !offset_ms.is_finite() {
            return Err(EngineError::InvalidTime(offset_ms));
        }
        let value = self.constrain(index, value)?;
        let time_ms = self.shared.time_ms() + offset_ms.max(0.0);
        self.queues.lock().push_event(
            &self.shared,
            time_ms,
            EventKind::ParameterChange { index, value },
        )
    }

    fn constrain(&self, index: usize, value: S) -> EngineResult<f64> {
        let info = self.parameters.info(index).ok_or_else(|| {
            log::warn!("rejecting change to unknown parameter index {}", index);
            EngineError::InvalidParameter {
                index,
                count: self.parameters.len(),
            }
        })?;
        let value = value.to_f64();
        if !value.is_finite() {
            return Err(EngineError::InvalidValue(value));
        }
        Ok(info.constrain(value))
    }

    // ═══════════════════════════════════════════
    // Events
    // ═══════════════════════════════════════════

    /// Engine time, in milliseconds, at which the next block starts.
    #[inline]
    pub fn current_time_ms(&self) -> f64 {
        self.shared.time_ms()
    }

    /// Queue a MIDI message for delivery at `time_ms` on the engine clock.
    ///
    /// Messages in the past are delivered at the start of the next block.
    /// At most `pending_event_capacity` events may wait at once; beyond that
    /// this returns `QueueFull`.
    pub fn schedule_midi_event(&self, time_ms: f64, port: usize, payload: &[u8]) -> EngineResult<()> {
        if !time_ms.is_finite() {
            return Err(EngineError::InvalidTime(time_ms));
        }
        let event = MidiEvent::new(port, payload).inspect_err(|err| {
            log::warn!("rejecting midi event: {}", err);
        })?;
        self.queues
            .lock()
            .push_event(&self.shared, time_ms, EventKind::Midi(event))
    }

    // ═══════════════════════════════════════════
    // External data
    // ═══════════════════════════════════════════

    /// Install or replace host memory under `data.id()`.
    ///
    /// A replaced buffer is released, with its own address, at the next
    /// block boundary before the patcher sees the new data. A rejected
    /// buffer is released before this call returns.
    pub fn set_external_data(&self, data: ExternalData) -> EngineResult<()> {
        let id = data.id().to_owned();
        let mut queues = self.queues.lock();

        let was_registered = queues.slots.contains(&id);
        let Some(slot) = queues.slots.assign(&id) else {
            drop(queues);
            log::warn!("no free external data slot for '{}'", id);
            drop(data);
            return Err(EngineError::TooManyExternalData(id));
        };

        let command = Command::InstallData {
            slot,
            data: Box::new(data),
        };
        match queues.push_command(command) {
            Ok(()) => {
                log::debug!("queued external data '{}' in slot {}", id, slot);
                Ok(())
            }
            Err(rejected) => {
                queues.slots.unassign(&id, was_registered);
                drop(queues);
                drop(rejected);
                Err(EngineError::QueueFull("command"))
            }
        }
    }

    /// Release the buffer registered under `id` at the next block boundary.
    pub fn release_external_data(&self, id: &str) -> EngineResult<()> {
        let mut queues = self.queues.lock();
        if queues.commands.slots() == 0 {
            return Err(EngineError::QueueFull("command"));
        }
        let Some(slot) = queues.slots.remove(id) else {
            return Err(EngineError::UnknownExternalData(id.to_owned()));
        };
        log::debug!("releasing external data '{}' from slot {}", id, slot);
        queues
            .push_command(Command::ReleaseData { slot })
            .map_err(|_| EngineError::QueueFull("command"))
    }

    // ═══════════════════════════════════════════
    // Presets
    // ═══════════════════════════════════════════

    /// Apply every parameter captured by `preset` in a single block-start
    /// step. Ids the patcher does not know are skipped.
    pub fn apply_preset(&self, preset: Preset) -> EngineResult<()> {
        let mut values = Vec::with_capacity(preset.len());
        for (id, value) in preset.values() {
            match self.parameters.index_for_id(id) {
                Some(index) if value.is_finite() => {
                    let value = self
                        .parameters
                        .info(index)
                        .map_or(value, |info| info.constrain(value));
                    values.push((index, value));
                }
                Some(_) => log::warn!("preset value for '{}' is not finite, skipping", id),
                None => log::warn!("preset references unknown parameter '{}', skipping", id),
            }
        }
        log::debug!("applying preset with {} parameter values", values.len());

        let states: Vec<(String, serde_json::Value)> = preset
            .states()
            .map(|(id, state)| (id.to_owned(), state.clone()))
            .collect();
        let update = Box::new(PresetUpdate { values, preset });
        let mut queues = self.queues.lock();
        match queues.push_command(Command::ApplyPreset(update)) {
            Ok(()) => {
                queues.applied_state.extend(states);
                Ok(())
            }
            Err(rejected) => {
                drop(queues);
                drop(rejected);
                Err(EngineError::QueueFull("command"))
            }
        }
    }

    /// Snapshot of the currently applied parameter values, plus the opaque
    /// state entries of every preset applied so far (the latest per id).
    ///
    /// State the patcher changes on its own is not captured.
    pub fn preset(&self) -> Preset {
        let mut preset = Preset::new();
        for (id, state) in &self.queues.lock().applied_state {
            preset.set_state(id.clone(), state.clone());
        }
        for (index, info) in self.parameters.iter().enumerate() {
            if let Some(value) = self.shared.values.get(index) {
                preset.set_value(info.id.clone(), value);
            }
        }
        preset
    }

    /// Free objects the audio thread has finished with.
    ///
    /// Every control call does this; hosts that go quiet for long periods
    /// can call it from a timer.
    pub fn collect_garbage(&self) {
        self.queues.lock().collect_retired();
    }
}
