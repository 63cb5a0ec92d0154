// src/synth/mod.rs
//
// The bundled topology: a mono, last-note-priority synthesizer with input
// pass-through and one-shot sample playback.

mod envelope;
mod oscillator;
mod sampler;

pub use envelope::Envelope;
pub use oscillator::{Oscillator, Waveform, note_to_freq};
pub use sampler::SamplePlayer;

use crate::audio_buffer::{AudioInputs, AudioOutputs};
use crate::event::MidiEvent;
use crate::parameter::ParameterInfo;
use crate::patcher::{Patcher, PatcherFactory, ProcessContext, SimplePatcherFactory};
use crate::sample::Sample;

/// Parameter indices, in declaration order.
pub mod params {
    pub const GAIN: usize = 0;
    pub const ATTACK: usize = 1;
    pub const RELEASE: usize = 2;
    pub const WAVEFORM: usize = 3;
    pub const THRU: usize = 4;
    pub const SAMPLE_GAIN: usize = 5;
}

/// Id of the external buffer played on note-on.
pub const SAMPLE_DATA_ID: &str = "sample";

const MAX_HELD_NOTES: usize = 16;

const NOTE_ON: u8 = 0x90;
const NOTE_OFF: u8 = 0x80;

pub struct SimpleSynth<S> {
    osc: Oscillator,
    env: Envelope,
    player: SamplePlayer,

    gain: f64,
    waveform: Waveform,
    thru: f64,
    sample_gain: f64,

    /// Held notes, most recent last
    held: [u8; MAX_HELD_NOTES],
    held_len: usize,

    sample_rate: f64,

    /// Mono voice scratch, sized in `prepare`
    voice: Vec<S>,
}

impl<S: Sample> SimpleSynth<S> {
    pub fn new() -> Self {
        Self {
            osc: Oscillator::new(),
            env: Envelope::new(),
            player: SamplePlayer::new(),
            gain: 0.5,
            waveform: Waveform::Sine,
            thru: 0.0,
            sample_gain: 1.0,
            held: [0; MAX_HELD_NOTES],
            held_len: 0,
            sample_rate: 48_000.0,
            voice: Vec::new(),
        }
    }

    /// Note currently sounding, if any key is held.
    pub fn current_note(&self) -> Option<u8> {
        self.held[..self.held_len].last().copied()
    }

    fn note_on(&mut self, note: u8) {
        self.remove_held(note);
        if self.held_len == MAX_HELD_NOTES {
            self.held.copy_within(1.., 0);
            self.held_len -= 1;
        }
        self.held[self.held_len] = note;
        self.held_len += 1;

        if self.env.is_idle() {
            self.osc.reset();
        }
        self.osc.set_freq(note_to_freq(note));
        self.env.gate_on();
        self.player.trigger();
    }

    fn note_off(&mut self, note: u8) {
        let was_current = self.current_note() == Some(note);
        self.remove_held(note);
        if !was_current {
            return;
        }
        match self.current_note() {
            Some(previous) => self.osc.set_freq(note_to_freq(previous)),
            None => self.env.gate_off(),
        }
    }

    fn remove_held(&mut self, note: u8) {
        if let Some(pos) = self.held[..self.held_len].iter().position(|&n| n == note) {
            self.held.copy_within(pos + 1..self.held_len, pos);
            self.held_len -= 1;
        }
    }
}

impl<S: Sample> Default for SimpleSynth<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Sample> Patcher<S> for SimpleSynth<S> {
    fn parameters(&self) -> Vec<ParameterInfo> {
        vec![
            ParameterInfo::new("gain").name("Gain").range(0.0, 1.0).default(0.5),
            ParameterInfo::new("attack")
                .name("Attack")
                .range(0.0, 5000.0)
                .default(10.0)
                .unit("ms"),
            ParameterInfo::new("release")
                .name("Release")
                .range(0.0, 5000.0)
                .default(200.0)
                .unit("ms"),
            ParameterInfo::new("waveform")
                .name("Waveform")
                .range(0.0, 2.0)
                .default(0.0)
                .steps(3),
            ParameterInfo::new("thru").name("Input Level").range(0.0, 1.0).default(0.0),
            ParameterInfo::new("sample_gain")
                .name("Sample Level")
                .range(0.0, 1.0)
                .default(1.0),
        ]
    }

    fn num_inputs(&self) -> usize {
        2
    }

    fn num_outputs(&self) -> usize {
        2
    }

    fn prepare(&mut self, sample_rate: f64, max_block: usize) {
        self.sample_rate = sample_rate;
        self.osc.set_sample_rate(sample_rate);
        self.env.set_sample_rate(sample_rate);
        self.voice = vec![S::ZERO; max_block];
    }

    fn set_parameter(&mut self, index: usize, value: f64) {
        match index {
            params::GAIN => self.gain = value,
            params::ATTACK => self.env.set_attack_ms(value),
            params::RELEASE => self.env.set_release_ms(value),
            params::WAVEFORM => self.waveform = Waveform::from_value(value),
            params::THRU => self.thru = value,
            params::SAMPLE_GAIN => self.sample_gain = value,
            _ => {}
        }
    }

    fn handle_midi(&mut self, event: &MidiEvent) {
        let &[status, note, velocity, ..] = event.data() else {
            return;
        };
        match status & 0xF0 {
            NOTE_ON if velocity > 0 => self.note_on(note),
            NOTE_ON | NOTE_OFF => self.note_off(note),
            _ => {}
        }
    }

    fn external_data_changed(&mut self, id: &str) {
        if id == SAMPLE_DATA_ID {
            self.player.stop();
        }
    }

    fn process(
        &mut self,
        ctx: &ProcessContext<'_>,
        inputs: &AudioInputs<'_, S>,
        outputs: &mut AudioOutputs<'_, '_, S>,
    ) {
        let frames = outputs.frames().min(self.voice.len());

        let idle = self.env.is_idle();
        for sample in self.voice[..frames].iter_mut() {
            *sample = if idle {
                S::ZERO
            } else {
                S::from_f64(self.osc.next(self.waveform) * self.env.next() * self.gain)
            };
        }

        for ch in 0..outputs.channels() {
            let input = inputs.channel(ch);
            let Some(out) = outputs.channel_mut(ch) else {
                continue;
            };
            for (i, sample) in out[..frames].iter_mut().enumerate() {
                let thru = input.map_or(0.0, |input| input[i].to_f64() * self.thru);
                *sample = self.voice[i] + S::from_f64(thru);
            }
        }

        self.player.process(
            ctx.external_data(SAMPLE_DATA_ID),
            ctx.sample_rate,
            self.sample_gain,
            outputs,
        );
    }
}

/// Factory for the bundled topology.
pub fn simple_synth_factory<S: Sample>() -> impl PatcherFactory<S> {
    SimplePatcherFactory::new("simple-synth", || {
        Box::new(SimpleSynth::<S>::new()) as Box<dyn Patcher<S>>
    })
}
