// src/engine.rs

use std::sync::Arc;

use rtrb::{Consumer, Producer};

use crate::audio_buffer::{self, AudioInputs, AudioOutputs};
use crate::bridge::{Command, QueuedCommand, Retired, SharedState};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::event::{EventKind, ScheduledEvent};
use crate::external_data::ExternalDataRegistry;
use crate::parameter::ParameterTable;
use crate::patcher::{Patcher, ProcessContext};
use crate::sample::Sample;
use crate::scheduler::{EventScheduler, frame_offset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Initialized,
    Prepared,
}

/// Real-time half of an engine instance.
///
/// `process` and `process_interleaved` run on the audio thread.
/// They must be deterministic, allocation-free, and lock-free.
/// `initialize` and `prepare` may allocate and must not overlap `process`.
pub struct Processor<S: Sample> {
    patcher: Box<dyn Patcher<S>>,
    parameters: Arc<ParameterTable>,
    shared: Arc<SharedState>,

    scheduler: EventScheduler,
    commands: Consumer<QueuedCommand>,
    retired: Producer<Retired>,
    external: ExternalDataRegistry,

    lifecycle: Lifecycle,
    sample_rate: f64,
    block_size: usize,

    /// Absolute sample position of the next block
    sample_pos: u64,

    /// Planar scratch for the interleaved path, sized in `prepare`
    scratch_in: Vec<S>,
    scratch_out: Vec<S>,
}

impl<S: Sample> Processor<S> {
    pub(crate) fn new(
        patcher: Box<dyn Patcher<S>>,
        parameters: Arc<ParameterTable>,
        shared: Arc<SharedState>,
        events: Consumer<ScheduledEvent>,
        commands: Consumer<QueuedCommand>,
        retired: Producer<Retired>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            patcher,
            parameters,
            shared,
            scheduler: EventScheduler::new(events, config.pending_event_capacity as usize),
            commands,
            retired,
            external: ExternalDataRegistry::new(config.max_external_data as usize),
            lifecycle: Lifecycle::Created,
            sample_rate: 0.0,
            block_size: 0,
            sample_pos: 0,
            scratch_in: Vec::new(),
            scratch_out: Vec::new(),
        }
    }

    // ═══════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════

    /// One-time setup: patcher initialization and default parameter values.
    pub fn initialize(&mut self) -> EngineResult<()> {
        if self.lifecycle != Lifecycle::Created {
            log::error!("initialize called twice");
            return Err(EngineError::AlreadyInitialized);
        }
        self.patcher.initialize();
        for index in 0..self.parameters.len() {
            if let Some(value) = self.parameters.info(index).map(|info| info.constrain(info.default)) {
                self.set_parameter(index, value);
            }
        }
        self.lifecycle = Lifecycle::Initialized;
        log::info!("engine initialized with {} parameters", self.parameters.len());
        Ok(())
    }

    /// Size internal buffers for `block_size` frames at `sample_rate`.
    ///
    /// May be called again whenever either changes; the engine clock keeps
    /// running across calls.
    pub fn prepare(&mut self, sample_rate: f64, block_size: usize) -> EngineResult<()> {
        if self.lifecycle == Lifecycle::Created {
            return Err(EngineError::NotInitialized("prepare"));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) || block_size == 0 {
            log::error!(
                "invalid configuration: sample rate {}, block size {}",
                sample_rate,
                block_size
            );
            return Err(EngineError::InvalidConfiguration {
                sample_rate,
                block_size,
            });
        }

        if self.lifecycle == Lifecycle::Prepared && self.sample_rate != sample_rate {
            let time_ms = self.shared.time_ms();
            self.sample_pos = (time_ms * sample_rate / 1000.0).round() as u64;
        }

        self.sample_rate = sample_rate;
        self.block_size = block_size;
        self.scratch_in = vec![S::ZERO; self.patcher.num_inputs() * block_size];
        self.scratch_out = vec![S::ZERO; self.patcher.num_outputs() * block_size];
        self.patcher.prepare(sample_rate, block_size);
        self.lifecycle = Lifecycle::Prepared;

        log::info!("engine prepared: {} Hz, {} frames", sample_rate, block_size);
        Ok(())
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.lifecycle != Lifecycle::Created
    }

    #[inline]
    pub fn is_prepared(&self) -> bool {
        self.lifecycle == Lifecycle::Prepared
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    // ═══════════════════════════════════════════
    // Processing
    // ═══════════════════════════════════════════

    /// Render `frames` frames from per-channel buffers.
    ///
    /// Every output channel receives exactly `frames` samples (fewer only if
    /// the host passed a shorter buffer). Before `prepare` this writes silence.
    pub fn process(&mut self, inputs: &[&[S]], outputs: &mut [&mut [S]], frames: usize) {
        let frames = outputs.iter().fold(frames, |frames, out| frames.min(out.len()));

        if self.lifecycle != Lifecycle::Prepared {
            for out in outputs.iter_mut() {
                out[..frames].fill(S::ZERO);
            }
            return;
        }

        let mut done = 0;
        while done < frames {
            let chunk = (frames - done).min(self.block_size);
            self.render_block(chunk, |patcher, ctx, offset, len| {
                let inputs = AudioInputs::split(inputs, done + offset, len);
                let mut outputs = AudioOutputs::split(&mut *outputs, done + offset, len);
                outputs.clear();
                patcher.process(ctx, &inputs, &mut outputs);
            });
            done += chunk;
        }
    }

    /// Render `frames` frames from interleaved buffers.
    pub fn process_interleaved(
        &mut self,
        input: &[S],
        input_channels: usize,
        output: &mut [S],
        output_channels: usize,
        frames: usize,
    ) {
        let frames = match output_channels {
            0 => frames,
            channels => frames.min(output.len() / channels),
        };

        if self.lifecycle != Lifecycle::Prepared {
            let samples = (frames * output_channels).min(output.len());
            output[..samples].fill(S::ZERO);
            return;
        }

        let num_inputs = self.patcher.num_inputs();
        let num_outputs = self.patcher.num_outputs();
        let stride = self.block_size;

        // Moved out for the duration of the call so the render closure can
        // borrow them next to `self`; no allocation happens.
        let mut scratch_in = std::mem::take(&mut self.scratch_in);
        let mut scratch_out = std::mem::take(&mut self.scratch_out);

        let mut done = 0;
        while done < frames {
            let chunk = (frames - done).min(stride);

            let source = input.get(done * input_channels..).unwrap_or(&[]);
            audio_buffer::deinterleave(
                source,
                input_channels,
                &mut scratch_in,
                num_inputs,
                stride,
                chunk,
            );

            self.render_block(chunk, |patcher, ctx, offset, len| {
                let inputs = AudioInputs::planar(&scratch_in, num_inputs, stride, offset, len);
                let mut outputs =
                    AudioOutputs::planar(&mut scratch_out, num_outputs, stride, offset, len);
                outputs.clear();
                patcher.process(ctx, &inputs, &mut outputs);
            });

            if let Some(dest) = output.get_mut(done * output_channels..) {
                audio_buffer::interleave(
                    &scratch_out,
                    num_outputs,
                    stride,
                    dest,
                    output_channels,
                    chunk,
                );
            }
            done += chunk;
        }

        self.scratch_in = scratch_in;
        self.scratch_out = scratch_out;
    }

    /// Run one block of at most `block_size` frames.
    ///
    /// Applies queued commands, then splits the block at every due event
    /// and calls `run(patcher, ctx, offset, len)` per slice.
    fn render_block<F>(&mut self, frames: usize, mut run: F)
    where
        F: FnMut(&mut dyn Patcher<S>, &ProcessContext<'_>, usize, usize),
    {
        self.scheduler.collect();

        let sample_rate = self.sample_rate;
        let block_start_ms = self.shared.time_ms();
        self.apply_commands(block_start_ms);

        let mut cursor = 0;
        while cursor < frames {
            self.dispatch_due(block_start_ms, cursor, u64::MAX);

            let next = self
                .scheduler
                .peek()
                .map(|event| frame_offset(event.time_ms, block_start_ms, sample_rate))
                .unwrap_or(frames)
                .clamp(cursor + 1, frames);

            let ctx = ProcessContext::new(
                next - cursor,
                sample_rate,
                self.sample_pos + cursor as u64,
                &self.external,
            );
            run(self.patcher.as_mut(), &ctx, cursor, next - cursor);
            cursor = next;
        }

        self.sample_pos += frames as u64;
        self.shared
            .set_time_ms(self.sample_pos as f64 * 1000.0 / sample_rate);
    }

    /// Apply control-side changes in call order.
    ///
    /// Events due at the block start that were issued before a command are
    /// dispatched ahead of it.
    fn apply_commands(&mut self, block_start_ms: f64) {
        while let Ok(QueuedCommand { seq, command }) = self.commands.pop() {
            self.dispatch_due(block_start_ms, 0, seq);
            self.apply_command(command);
        }
    }

    fn apply_command(&mut self, command: Command) {
        match command {
            Command::SetParameter { index, value } => self.set_parameter(index, value),

            Command::ApplyPreset(update) => {
                for &(index, value) in &update.values {
                    self.set_parameter(index, value);
                }
                self.patcher.apply_state(&update.preset);
                self.retire(update);
            }

            Command::InstallData { slot, data } => match self.external.install(slot, data) {
                Ok(previous) => {
                    if let Some(mut previous) = previous {
                        previous.release();
                        self.retire(previous);
                    }
                    if let Some(id) = self.external.id_at(slot) {
                        self.patcher.external_data_changed(id);
                    }
                }
                Err(mut rejected) => {
                    rejected.release();
                    self.retire(rejected);
                }
            },

            Command::ReleaseData { slot } => {
                if let Some(mut data) = self.external.remove(slot) {
                    data.release();
                    self.patcher.external_data_changed(data.id());
                    self.retire(data);
                }
            }
        }
    }

    /// Dispatch pending events that fall on or before frame `cursor` and
    /// were issued before `before_seq`.
    fn dispatch_due(&mut self, block_start_ms: f64, cursor: usize, before_seq: u64) {
        let sample_rate = self.sample_rate;
        while let Some(event) = self.scheduler.pop_if(|event| {
            event.seq < before_seq
                && frame_offset(event.time_ms, block_start_ms, sample_rate) <= cursor
        }) {
            self.dispatch(&event);
        }
    }

    #[inline]
    fn dispatch(&mut self, event: &ScheduledEvent) {
        self.shared.release_event();
        match event.kind {
            EventKind::Midi(ref midi) => self.patcher.handle_midi(midi),
            EventKind::ParameterChange { index, value } => self.set_parameter(index, value),
        }
    }

    #[inline]
    fn set_parameter(&mut self, index: usize, value: f64) {
        if index < self.parameters.len() {
            self.patcher.set_parameter(index, value);
            self.shared.values.store(index, value);
        }
    }

    /// Hand a heap object back to the control side.
    ///
    /// If the retire queue is full the object is dropped here instead.
    #[inline]
    fn retire(&mut self, item: Retired) {
        let _ = self.retired.push(item);
    }
}
