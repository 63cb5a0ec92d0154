// src/patcher.rs
//
// The black-box DSP graph behind an engine instance.

use crate::audio_buffer::{AudioInputs, AudioOutputs};
use crate::event::MidiEvent;
use crate::external_data::{ExternalData, ExternalDataRegistry};
use crate::parameter::ParameterInfo;
use crate::preset::Preset;
use crate::sample::Sample;

/// Context passed to the patcher for one slice of a block.
#[derive(Clone, Copy)]
pub struct ProcessContext<'a> {
    /// Number of frames to process
    pub frames: usize,

    /// Sample rate
    pub sample_rate: f64,

    /// Absolute sample position of the slice start
    pub sample_pos: u64,

    /// Engine time of the slice start, in milliseconds
    pub time_ms: f64,

    external: &'a ExternalDataRegistry,
}

impl<'a> ProcessContext<'a> {
    pub(crate) fn new(
        frames: usize,
        sample_rate: f64,
        sample_pos: u64,
        external: &'a ExternalDataRegistry,
    ) -> Self {
        Self {
            frames,
            sample_rate,
            sample_pos,
            time_ms: sample_pos as f64 * 1000.0 / sample_rate,
            external,
        }
    }

    /// Host memory registered under `id`, if any.
    #[inline]
    pub fn external_data(&self, id: &str) -> Option<&'a ExternalData> {
        self.external.get(id)
    }
}

/// Core DSP graph trait.
///
/// Patchers:
/// - do NOT know about threads or queues
/// - do NOT allocate in `process`, `set_parameter` or `handle_midi`
/// - ONLY see events once they are due
pub trait Patcher<S: Sample>: Send {
    /// Parameters exposed by this graph, in index order.
    ///
    /// Called once when the engine instance is created.
    fn parameters(&self) -> Vec<ParameterInfo>;

    fn num_inputs(&self) -> usize;

    fn num_outputs(&self) -> usize;

    /// One-time setup before the first `prepare`.
    fn initialize(&mut self) {}

    /// Called before processing starts and whenever rate or block size change.
    fn prepare(&mut self, sample_rate: f64, max_block: usize);

    /// Apply an already constrained parameter value.
    fn set_parameter(&mut self, index: usize, value: f64);

    /// Handle a MIDI message that is due at the start of the next slice.
    fn handle_midi(&mut self, _event: &MidiEvent) {}

    /// External data under `id` was installed, replaced or released.
    fn external_data_changed(&mut self, _id: &str) {}

    /// Restore state beyond parameter values from a preset.
    ///
    /// Parameter values have already been applied through `set_parameter`.
    fn apply_state(&mut self, _preset: &Preset) {}

    /// Process one slice.
    ///
    /// The engine guarantees:
    /// - all events due at the slice start have been dispatched
    /// - `outputs` is zeroed
    fn process(
        &mut self,
        ctx: &ProcessContext<'_>,
        inputs: &AudioInputs<'_, S>,
        outputs: &mut AudioOutputs<'_, '_, S>,
    );
}

/// A factory capable of creating fresh patcher instances.
///
/// This binds an engine instance to a fixed graph topology.
pub trait PatcherFactory<S: Sample>: Send + Sync {
    fn create(&self) -> Box<dyn Patcher<S>>;

    fn name(&self) -> &str;
}

/// Convenience factory wrapping a constructor function.
pub struct SimplePatcherFactory<F> {
    name: String,
    create_fn: F,
}

impl<F> SimplePatcherFactory<F> {
    pub fn new(name: impl Into<String>, create_fn: F) -> Self {
        Self {
            name: name.into(),
            create_fn,
        }
    }
}

impl<S, F> PatcherFactory<S> for SimplePatcherFactory<F>
where
    S: Sample,
    F: Fn() -> Box<dyn Patcher<S>> + Send + Sync,
{
    fn create(&self) -> Box<dyn Patcher<S>> {
        (self.create_fn)()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
