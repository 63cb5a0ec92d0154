// src/synth/oscillator.rs
//
// Naive (non-bandlimited) oscillators.

use std::f64::consts::TAU;

const PHASE_START: f64 = 0.25;

/// Oscillator shape, selected by the `waveform` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Saw,
    Square,
}

impl Waveform {
    /// Map a quantized parameter value (0, 1, 2) to a shape.
    pub fn from_value(value: f64) -> Self {
        match value.round() as i64 {
            1 => Waveform::Saw,
            2 => Waveform::Square,
            _ => Waveform::Sine,
        }
    }
}

/// Equal-tempered frequency of a MIDI note, A4 = 440 Hz.
#[inline]
pub fn note_to_freq(note: u8) -> f64 {
    440.0 * 2.0_f64.powf((note as f64 - 69.0) / 12.0)
}

pub struct Oscillator {
    phase: f64,
    freq: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new() -> Self {
        Self {
            phase: PHASE_START,
            freq: 440.0,
            sample_rate: 48_000.0,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    pub fn set_freq(&mut self, freq: f64) {
        self.freq = freq;
    }

    pub fn reset(&mut self) {
        self.phase = PHASE_START;
    }

    #[inline]
    pub fn next(&mut self, waveform: Waveform) -> f64 {
        let value = match waveform {
            Waveform::Sine => (self.phase * TAU).sin(),
            Waveform::Saw => 2.0 * self.phase - 1.0,
            Waveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        };
        self.phase = (self.phase + self.freq / self.sample_rate).fract();
        value
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new()
    }
}
