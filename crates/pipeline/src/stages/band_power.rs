use std::ops::Range;
use std::sync::Arc;

use apodize::hamming_iter;
use eeg_types::{Band, BandPowers, NUM_BANDS};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use tracing::trace;

use crate::error::{PipelineError, PipelineResult};

/// Floor applied before taking log10 so silent input stays finite.
const LOG_FLOOR: f32 = 1e-12;

/// Whether a spectral bin at `freq` Hz belongs to `band`.
pub fn band_contains(band: Band, freq: f32) -> bool {
    match band {
        Band::Delta => freq < 4.0,
        Band::Theta => (4.0..=8.0).contains(&freq),
        Band::Alpha => (8.0..=12.0).contains(&freq),
        Band::Beta => (12.0..30.0).contains(&freq),
        Band::Gamma => (30.0..45.0).contains(&freq),
    }
}

/// Computes log band powers from fixed-size multichannel windows.
///
/// The FFT plan, analysis window and band-to-bin mapping are built once for a
/// given window length and reused for every call.
pub struct BandPowerEstimator {
    channels: usize,
    frames: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    band_bins: [Range<usize>; NUM_BANDS],
    buffer: Vec<Complex<f32>>,
}

impl BandPowerEstimator {
    pub fn new(frames: usize, channels: usize, sample_rate: f64) -> PipelineResult<Self> {
        if channels == 0 {
            return Err(PipelineError::InvalidInput {
                message: "band powers need at least one channel".into(),
            });
        }
        if frames < 2 {
            return Err(PipelineError::InvalidInput {
                message: format!("window of {} frames is too short", frames),
            });
        }
        if !(sample_rate > 0.0) {
            return Err(PipelineError::InvalidInput {
                message: format!("sample rate must be positive, got {}", sample_rate),
            });
        }

        let nfft = frames.next_power_of_two();
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(nfft);

        // Only the first half of the spectrum is kept
        let half = nfft / 2;
        let resolution = sample_rate as f32 / nfft as f32;
        let mut band_bins: [Range<usize>; NUM_BANDS] = Default::default();
        for band in Band::ALL {
            let bins: Vec<usize> = (0..half)
                .filter(|&k| band_contains(band, k as f32 * resolution))
                .collect();
            match (bins.first(), bins.last()) {
                (Some(&lo), Some(&hi)) => band_bins[band.index()] = lo..hi + 1,
                _ => return Err(PipelineError::EmptyBand(band)),
            }
        }

        Ok(Self {
            channels,
            frames,
            fft,
            window: hamming_iter(frames).map(|w| w as f32).collect(),
            band_bins,
            buffer: vec![Complex::new(0.0, 0.0); nfft],
        })
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Band powers of a frame-major window of exactly `frames` frames.
    pub fn estimate(&mut self, window: &[f32]) -> PipelineResult<BandPowers> {
        if window.len() != self.frames * self.channels {
            return Err(PipelineError::InvalidInput {
                message: format!(
                    "expected {} values ({} frames x {} channels), got {}",
                    self.frames * self.channels,
                    self.frames,
                    self.channels,
                    window.len()
                ),
            });
        }

        let mut totals = [0.0f32; NUM_BANDS];
        let scale = 2.0 / self.frames as f32;

        for ch in 0..self.channels {
            let mean = window
                .iter()
                .skip(ch)
                .step_by(self.channels)
                .sum::<f32>()
                / self.frames as f32;

            // Remove the offset, apply the window, zero-pad the rest
            for (i, slot) in self.buffer.iter_mut().enumerate() {
                *slot = match window.get(i * self.channels + ch) {
                    Some(&x) if i < self.frames => Complex::new((x - mean) * self.window[i], 0.0),
                    _ => Complex::new(0.0, 0.0),
                };
            }
            self.fft.process(&mut self.buffer);

            for band in Band::ALL {
                let bins = self.band_bins[band.index()].clone();
                let count = bins.len() as f32;
                let amplitude: f32 = self.buffer[bins].iter().map(|c| c.norm() * scale).sum();
                totals[band.index()] += amplitude / count;
            }
        }

        let mut powers = [0.0f32; NUM_BANDS];
        for (power, total) in powers.iter_mut().zip(totals) {
            *power = (total / self.channels as f32).max(LOG_FLOOR).log10();
        }
        trace!(?powers, "band powers");
        Ok(BandPowers(powers))
    }
}

/// One-shot convenience wrapper around [`BandPowerEstimator`].
pub fn compute_band_powers(
    window: &[f32],
    channels: usize,
    sample_rate: f64,
) -> PipelineResult<BandPowers> {
    if channels == 0 || window.is_empty() {
        return Err(PipelineError::InvalidInput {
            message: "window cannot be empty".into(),
        });
    }
    if window.len() % channels != 0 {
        return Err(PipelineError::RaggedBlock {
            len: window.len(),
            channels,
        });
    }
    BandPowerEstimator::new(window.len() / channels, channels, sample_rate)?.estimate(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tone(freq: f32, fs: f32, n: usize, channels: usize) -> Vec<f32> {
        (0..n)
            .flat_map(|i| {
                let v = 20.0 * (2.0 * PI * freq * i as f32 / fs).sin();
                std::iter::repeat(v).take(channels)
            })
            .collect()
    }

    #[test]
    fn pure_tones_peak_in_their_band() {
        let fs = 256.0;
        for (freq, band) in [
            (2.0, Band::Delta),
            (6.0, Band::Theta),
            (10.0, Band::Alpha),
            (20.0, Band::Beta),
            (38.0, Band::Gamma),
        ] {
            let powers = compute_band_powers(&tone(freq, fs, 256, 4), 4, fs as f64).unwrap();
            assert_eq!(powers.dominant(), band, "{} Hz gave {:?}", freq, powers);
        }
    }

    #[test]
    fn dc_offset_is_removed() {
        let fs = 256.0;
        let clean = compute_band_powers(&tone(10.0, fs, 256, 1), 1, fs as f64).unwrap();
        let offset: Vec<f32> = tone(10.0, fs, 256, 1).iter().map(|v| v + 500.0).collect();
        let shifted = compute_band_powers(&offset, 1, fs as f64).unwrap();
        for band in Band::ALL {
            assert!((clean.get(band) - shifted.get(band)).abs() < 1e-2);
        }
    }

    #[test]
    fn silence_hits_the_log_floor() {
        let powers = compute_band_powers(&[0.0; 512], 2, 256.0).unwrap();
        assert!(powers.0.iter().all(|&p| (p - LOG_FLOOR.log10()).abs() < 1e-3));
    }

    #[test]
    fn non_power_of_two_windows_are_padded() {
        let mut estimator = BandPowerEstimator::new(220, 1, 220.0).unwrap();
        let powers = estimator.estimate(&tone(10.0, 220.0, 220, 1)).unwrap();
        assert_eq!(powers.dominant(), Band::Alpha);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(compute_band_powers(&[], 4, 256.0).is_err());
        assert!(compute_band_powers(&[0.0; 10], 4, 256.0).is_err());
        assert!(compute_band_powers(&[0.0; 8], 4, 0.0).is_err());
    }

    #[test]
    fn low_rate_without_gamma_bins_is_an_error() {
        assert_eq!(
            BandPowerEstimator::new(64, 1, 50.0).err(),
            Some(PipelineError::EmptyBand(Band::Gamma))
        );
    }

    #[test]
    fn wrong_window_length_is_rejected() {
        let mut estimator = BandPowerEstimator::new(256, 4, 256.0).unwrap();
        assert!(estimator.estimate(&[0.0; 256]).is_err());
    }
}
