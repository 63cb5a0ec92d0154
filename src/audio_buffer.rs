// src/audio_buffer.rs
//
// Channel views handed to the patcher for one slice of a block.

use crate::sample::Sample;

#[derive(Clone, Copy)]
enum InputLayout<'a, S> {
    /// One slice per channel, owned by the host.
    Split(&'a [&'a [S]]),
    /// Planar scratch: channel `ch` starts at `ch * stride`.
    Planar { data: &'a [S], channels: usize, stride: usize },
}

/// Read-only input channels for one slice.
///
/// Channel slices are already offset to the slice start and have exactly
/// `frames` samples.
#[derive(Clone, Copy)]
pub struct AudioInputs<'a, S> {
    layout: InputLayout<'a, S>,
    offset: usize,
    frames: usize,
}

impl<'a, S: Sample> AudioInputs<'a, S> {
    #[inline]
    pub(crate) fn split(channels: &'a [&'a [S]], offset: usize, frames: usize) -> Self {
        Self {
            layout: InputLayout::Split(channels),
            offset,
            frames,
        }
    }

    #[inline]
    pub(crate) fn planar(
        data: &'a [S],
        channels: usize,
        stride: usize,
        offset: usize,
        frames: usize,
    ) -> Self {
        Self {
            layout: InputLayout::Planar { data, channels, stride },
            offset,
            frames,
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        match self.layout {
            InputLayout::Split(channels) => channels.len(),
            InputLayout::Planar { channels, .. } => channels,
        }
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Samples of channel `ch`, or `None` if the host did not connect it.
    #[inline]
    pub fn channel(&self, ch: usize) -> Option<&'a [S]> {
        let range = self.offset..self.offset + self.frames;
        match self.layout {
            InputLayout::Split(channels) => channels.get(ch).and_then(|c| c.get(range)),
            InputLayout::Planar { data, channels, stride } => {
                if ch >= channels {
                    return None;
                }
                let start = ch * stride;
                data.get(start + range.start..start + range.end)
            }
        }
    }
}

enum OutputLayout<'a, 'b, S> {
    Split(&'a mut [&'b mut [S]]),
    Planar { data: &'a mut [S], channels: usize, stride: usize },
}

/// Writable output channels for one slice.
pub struct AudioOutputs<'a, 'b, S> {
    layout: OutputLayout<'a, 'b, S>,
    offset: usize,
    frames: usize,
}

impl<'a, 'b, S: Sample> AudioOutputs<'a, 'b, S> {
    #[inline]
    pub(crate) fn split(channels: &'a mut [&'b mut [S]], offset: usize, frames: usize) -> Self {
        Self {
            layout: OutputLayout::Split(channels),
            offset,
            frames,
        }
    }

    #[inline]
    pub(crate) fn planar(
        data: &'a mut [S],
        channels: usize,
        stride: usize,
        offset: usize,
        frames: usize,
    ) -> Self {
        Self {
            layout: OutputLayout::Planar { data, channels, stride },
            offset,
            frames,
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        match &self.layout {
            OutputLayout::Split(channels) => channels.len(),
            OutputLayout::Planar { channels, .. } => *channels,
        }
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Mutable samples of channel `ch`, or `None` if it does not exist.
    #[inline]
    pub fn channel_mut(&mut self, ch: usize) -> Option<&mut [S]> {
        let range = self.offset..self.offset + self.frames;
        match &mut self.layout {
            OutputLayout::Split(channels) => {
                channels.get_mut(ch).and_then(|c| c.get_mut(range))
            }
            OutputLayout::Planar { data, channels, stride } => {
                if ch >= *channels {
                    return None;
                }
                let start = ch * *stride;
                data.get_mut(start + range.start..start + range.end)
            }
        }
    }

    /// Zero every channel of the slice.
    #[inline]
    pub fn clear(&mut self) {
        for ch in 0..self.channels() {
            if let Some(buf) = self.channel_mut(ch) {
                buf.fill(S::ZERO);
            }
        }
    }
}

/// Copy interleaved frames into planar channels of `stride` samples.
///
/// Planar channels the interleaved source does not have are zeroed.
pub(crate) fn deinterleave<S: Sample>(
    input: &[S],
    input_channels: usize,
    planar: &mut [S],
    planar_channels: usize,
    stride: usize,
    frames: usize,
) {
    for ch in 0..planar_channels {
        let dest = &mut planar[ch * stride..ch * stride + frames];
        if ch < input_channels {
            for (frame, sample) in dest.iter_mut().enumerate() {
                *sample = input
                    .get(frame * input_channels + ch)
                    .copied()
                    .unwrap_or(S::ZERO);
            }
        } else {
            dest.fill(S::ZERO);
        }
    }
}

/// Copy planar channels into interleaved frames.
///
/// Interleaved channels the planar source does not have are zeroed.
pub(crate) fn interleave<S: Sample>(
    planar: &[S],
    planar_channels: usize,
    stride: usize,
    output: &mut [S],
    output_channels: usize,
    frames: usize,
) {
    for frame in 0..frames {
        for ch in 0..output_channels {
            let Some(dest) = output.get_mut(frame * output_channels + ch) else {
                return;
            };
            *dest = if ch < planar_channels {
                planar[ch * stride + frame]
            } else {
                S::ZERO
            };
        }
    }
}
