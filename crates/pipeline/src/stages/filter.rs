use biquad::{Biquad, Coefficients, DirectForm2Transposed as DF2T, ToHertz, Type};

use crate::error::{PipelineError, PipelineResult};

/// Q of the powerline notch. High Q keeps the stop band narrow.
pub const NOTCH_Q: f32 = 30.0;

/// One powerline notch per channel.
///
/// The filters keep their delay lines between calls, so a stream cut into
/// arbitrary blocks is filtered exactly as if it arrived in one piece.
pub struct NotchBank {
    channels: usize,
    filters: Vec<DF2T<f32>>,
}

impl NotchBank {
    pub fn new(channels: usize, sample_rate: f32, notch_hz: f32) -> PipelineResult<Self> {
        if channels == 0 {
            return Err(PipelineError::InvalidInput {
                message: "notch needs at least one channel".into(),
            });
        }
        if !(sample_rate > 0.0) {
            return Err(PipelineError::Filter("sample_rate must be > 0".into()));
        }
        if !(notch_hz > 0.0 && notch_hz < sample_rate * 0.5) {
            return Err(PipelineError::Filter(format!(
                "notch {} Hz must lie below Nyquist ({} Hz)",
                notch_hz,
                sample_rate * 0.5
            )));
        }

        let coeffs =
            Coefficients::<f32>::from_params(Type::Notch, sample_rate.hz(), notch_hz.hz(), NOTCH_Q)
                .map_err(|e| PipelineError::Filter(format!("Notch coeffs: {:?}", e)))?;

        Ok(Self {
            channels,
            filters: (0..channels).map(|_| DF2T::<f32>::new(coeffs)).collect(),
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Filter a frame-major block, appending the result to `out`.
    pub fn process(&mut self, block: &[f32], out: &mut Vec<f32>) -> PipelineResult<()> {
        if block.len() % self.channels != 0 {
            return Err(PipelineError::RaggedBlock {
                len: block.len(),
                channels: self.channels,
            });
        }
        out.reserve(block.len());
        for frame in block.chunks_exact(self.channels) {
            for (x, filter) in frame.iter().zip(self.filters.iter_mut()) {
                out.push(filter.run(*x));
            }
        }
        Ok(())
    }
}
