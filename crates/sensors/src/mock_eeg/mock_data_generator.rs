use std::f32::consts::PI;

use eeg_types::{Band, NUM_BANDS};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Microvolts produced per unit of band weight.
const MICROVOLTS_PER_WEIGHT: f32 = 10.0;

/// Gain applied to the emphasised band, see [`EegGenerator::set_emphasis`].
const EMPHASIS_GAIN: f32 = 4.0;

/// Standard deviation of the broadband background, in band-weight units.
const BACKGROUND_SD: f32 = 0.1;

/// Centre frequency used for each band oscillator, in Hz.
const BAND_FREQS: [f32; NUM_BANDS] = [2.5, 6.0, 10.0, 20.0, 38.0];

/// A generator for realistic EEG-like data with multiple frequency bands.
///
/// Output is in microvolts, laid out like a Muse headset stream:
/// TP9, AF7, AF8, TP10 and a floating AUX channel.
#[derive(Debug, Clone)]
pub struct EegGenerator {
    pub sample_rate: f64,
    pub num_channels: usize,
    pub line_noise_hz: f32,
    pub line_noise_amplitude: Vec<f32>,
    // Phase accumulators, [channel][band]
    band_phase: Vec<[f32; NUM_BANDS]>,
    line_noise_phase: Vec<f32>,
    // Band amplitudes vary by channel
    channel_weights: Vec<[f32; NUM_BANDS]>,
    emphasis: Option<Band>,
    rng: StdRng,
}

impl EegGenerator {
    pub fn new(sample_rate: f64, num_channels: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        debug!("Initializing EEG generator with {} Hz sample rate", sample_rate);

        // Format: [delta, theta, alpha, beta, gamma]
        let base_channel_weights = [
            [1.5, 1.0, 2.5, 0.7, 0.1], // TP9 - temporal, stronger alpha
            [3.0, 1.5, 0.8, 0.4, 0.1], // AF7 - frontal, more delta/theta
            [3.0, 1.5, 0.8, 0.4, 0.1], // AF8 - similar to AF7
            [1.5, 1.0, 2.5, 0.7, 0.1], // TP10 - similar to TP9
            [0.2, 0.2, 0.2, 0.2, 0.2], // AUX - floating
        ];

        let channel_weights = (0..num_channels)
            .map(|i| base_channel_weights[i % base_channel_weights.len()])
            .collect();

        let band_phase = (0..num_channels)
            .map(|_| std::array::from_fn(|_| rng.gen::<f32>() * 2.0 * PI))
            .collect();
        let line_noise_phase = (0..num_channels)
            .map(|_| rng.gen::<f32>() * 2.0 * PI)
            .collect();
        // Different channels pick up different amounts of line noise
        let line_noise_amplitude = (0..num_channels).map(|_| rng.gen_range(0.2..0.7)).collect();

        Self {
            sample_rate,
            num_channels,
            line_noise_hz: 60.0,
            line_noise_amplitude,
            band_phase,
            line_noise_phase,
            channel_weights,
            emphasis: None,
            rng,
        }
    }

    /// Boost one band on every channel, e.g. to imitate an operator
    /// concentrating on a particular action while recording with the mock.
    pub fn set_emphasis(&mut self, band: Option<Band>) {
        self.emphasis = band;
    }

    pub fn emphasis(&self) -> Option<Band> {
        self.emphasis
    }

    /// Advance all oscillators by one sample period and write one frame.
    pub fn next_frame(&mut self, frame: &mut [f32]) {
        let two_pi = 2.0 * PI;
        let line_inc = two_pi * self.line_noise_hz / self.sample_rate as f32;

        for (channel, out) in frame.iter_mut().enumerate().take(self.num_channels) {
            let mut signal = 0.0;
            for band in Band::ALL {
                let b = band.index();
                let inc = two_pi * BAND_FREQS[b] / self.sample_rate as f32;
                let phase = &mut self.band_phase[channel][b];
                *phase += inc;
                // Wrap phases to avoid floating point precision issues
                if *phase > two_pi {
                    *phase -= two_pi;
                }
                let mut weight = self.channel_weights[channel][b];
                if self.emphasis == Some(band) {
                    weight *= EMPHASIS_GAIN;
                }
                signal += phase.sin() * weight;
            }

            let line_phase = &mut self.line_noise_phase[channel];
            *line_phase += line_inc;
            if *line_phase > two_pi {
                *line_phase -= two_pi;
            }
            signal += line_phase.sin() * self.line_noise_amplitude[channel];

            let background: f32 = self.rng.sample(StandardNormal);
            signal += background * BACKGROUND_SD;

            *out = signal * MICROVOLTS_PER_WEIGHT;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_generators_agree() {
        let mut a = EegGenerator::new(256.0, 5, Some(7));
        let mut b = EegGenerator::new(256.0, 5, Some(7));
        let mut fa = [0.0; 5];
        let mut fb = [0.0; 5];
        for _ in 0..100 {
            a.next_frame(&mut fa);
            b.next_frame(&mut fb);
            assert_eq!(fa, fb);
        }
    }

    #[test]
    fn output_stays_in_eeg_range() {
        let mut generator = EegGenerator::new(256.0, 5, Some(1));
        let mut frame = [0.0; 5];
        for _ in 0..1024 {
            generator.next_frame(&mut frame);
            for v in frame {
                assert!(v.abs() < 500.0, "sample {} out of range", v);
            }
        }
    }

    #[test]
    fn emphasis_raises_signal_energy() {
        let energy = |emphasis: Option<Band>| {
            let mut generator = EegGenerator::new(256.0, 4, Some(3));
            generator.set_emphasis(emphasis);
            let mut frame = [0.0; 4];
            let mut total = 0.0;
            for _ in 0..2048 {
                generator.next_frame(&mut frame);
                total += frame.iter().map(|v| v * v).sum::<f32>();
            }
            total
        };
        assert!(energy(Some(Band::Beta)) > energy(None));
    }
}
