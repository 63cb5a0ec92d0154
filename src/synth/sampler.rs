// src/synth/sampler.rs
//
// One-shot playback of a host buffer registered as external data.

use crate::audio_buffer::AudioOutputs;
use crate::external_data::{DataType, ExternalData};
use crate::sample::Sample;

/// Read position into an external buffer.
///
/// The buffer itself is looked up per slice, so a replaced or released
/// buffer is never read after the engine drops it.
pub struct SamplePlayer {
    /// Position in source frames
    position: f64,
    active: bool,
}

impl SamplePlayer {
    pub fn new() -> Self {
        Self {
            position: 0.0,
            active: false,
        }
    }

    /// Restart playback from the first frame.
    pub fn trigger(&mut self) {
        self.position = 0.0;
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Mix `frames` frames of `data` into `outputs`, scaled by `gain`.
    ///
    /// Source channels wrap around the output channels (mono feeds every
    /// output). Playback runs at the buffer's own rate relative to the
    /// engine's and stops at the last frame.
    pub fn process<S: Sample>(
        &mut self,
        data: Option<&ExternalData>,
        sample_rate: f64,
        gain: f64,
        outputs: &mut AudioOutputs<'_, '_, S>,
    ) {
        if !self.active {
            return;
        }
        let Some(data) = data else {
            self.active = false;
            return;
        };
        let Some(source_rate) = data.data_type().sample_rate() else {
            self.active = false;
            return;
        };

        let source_channels = data.data_type().channels();
        let source_frames = data.frames();
        if source_channels == 0 || source_frames == 0 {
            self.active = false;
            return;
        }

        let step = source_rate / sample_rate;
        let frames = outputs.frames();

        for ch in 0..outputs.channels() {
            let source_ch = ch % source_channels;
            let Some(out) = outputs.channel_mut(ch) else {
                continue;
            };
            let mut position = self.position;
            for sample in out.iter_mut() {
                let frame = position as usize;
                if frame >= source_frames {
                    break;
                }
                if let Some(value) = read(data, frame * source_channels + source_ch) {
                    *sample += S::from_f64(value * gain);
                }
                position += step;
            }
        }

        self.position += step * frames as f64;
        if self.position as usize >= source_frames {
            self.active = false;
        }
    }
}

impl Default for SamplePlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn read(data: &ExternalData, index: usize) -> Option<f64> {
    match data.data_type() {
        DataType::Float32 { .. } => data.samples_f32()?.get(index).map(|&v| v as f64),
        DataType::Float64 { .. } => data.samples_f64()?.get(index).copied(),
        DataType::Untyped => None,
    }
}
