//! Fixed-capacity rolling buffer of raw multichannel samples

use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::stages::filter::NotchBank;

/// Holds the newest `frames` frames of a `channels`-wide stream.
///
/// Storage is frame-major: frame `i` occupies `data[i * channels..(i + 1) * channels]`
/// and the newest frame is last. The buffer starts zero-filled.
pub struct StreamBuffer {
    frames: usize,
    channels: usize,
    data: Vec<f32>,
    notch: Option<NotchBank>,
    scratch: Vec<f32>,
}

impl StreamBuffer {
    pub fn new(frames: usize, channels: usize) -> PipelineResult<Self> {
        if frames == 0 || channels == 0 {
            return Err(PipelineError::InvalidInput {
                message: format!(
                    "stream buffer needs a non-zero size, got {} frames x {} channels",
                    frames, channels
                ),
            });
        }
        Ok(Self {
            frames,
            channels,
            data: vec![0.0; frames * channels],
            notch: None,
            scratch: Vec::new(),
        })
    }

    /// Same as [`StreamBuffer::new`], with a per-channel notch applied to
    /// incoming blocks.
    pub fn with_notch(
        frames: usize,
        channels: usize,
        sample_rate: f32,
        notch_hz: f32,
    ) -> PipelineResult<Self> {
        let mut buffer = Self::new(frames, channels)?;
        buffer.notch = Some(NotchBank::new(channels, sample_rate, notch_hz)?);
        debug!(frames, channels, notch_hz, "stream buffer notch enabled");
        Ok(buffer)
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn is_filtered(&self) -> bool {
        self.notch.is_some()
    }

    /// Whole buffer, oldest frame first.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Append a frame-major block, discarding the oldest frames.
    pub fn update(&mut self, block: &[f32]) -> PipelineResult<()> {
        if block.len() % self.channels != 0 {
            return Err(PipelineError::RaggedBlock {
                len: block.len(),
                channels: self.channels,
            });
        }
        if block.is_empty() {
            return Ok(());
        }

        let incoming = match self.notch.as_mut() {
            Some(notch) => {
                self.scratch.clear();
                notch.process(block, &mut self.scratch)?;
                &self.scratch[..]
            }
            None => block,
        };

        let n = incoming.len();
        let cap = self.data.len();
        if n >= cap {
            self.data.copy_from_slice(&incoming[n - cap..]);
        } else {
            self.data.copy_within(n.., 0);
            self.data[cap - n..].copy_from_slice(incoming);
        }
        Ok(())
    }

    /// The newest `n` frames, oldest first.
    pub fn last(&self, n: usize) -> PipelineResult<&[f32]> {
        if n > self.frames {
            return Err(PipelineError::WindowTooLarge {
                requested: n,
                capacity: self.frames,
            });
        }
        Ok(&self.data[(self.frames - n) * self.channels..])
    }
}
