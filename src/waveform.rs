//! Baseband waveform generation
//!
//! A [`Waveform`] describes *what* to transmit, a [`WaveformGenerator`] holds
//! the running oscillator state and fills [`IqSample`] buffers on demand.
//! The generator only produces baseband content; placing it on an RF
//! frequency is the job of the [planner] and the hardware mixer.
//!
//! [planner]: crate::planner

use crate::error::ConfigError;
use crate::math::*;
use crate::numbers::*;
use crate::planner::SweepConfig;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rustfft::{Fft, FftPlanner};

use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

/// Number of samples after which the rotator of a
/// [`Waveform::Tone`] is pulled back to unit magnitude
pub const RENORMALIZE_INTERVAL: u64 = 1024;

/// Ratio of the envelope limit to the RMS amplitude of a [`Waveform::Ofdm`]
/// signal (about 9.5 dB)
pub const OFDM_CLIP_RATIO: f64 = 3.0;

/// Suggested amplitude (RMS as fraction of full scale) for
/// [`Waveform::Ofdm`], leaving room for its high peak to average ratio
pub const OFDM_DEFAULT_SCALE: f64 = 0.30;

/// 16-QAM levels per axis, normalized to unit average symbol power
const QAM16_LEVELS: [f64; 4] = [
    -3.0 / 3.1622776601683795,
    -1.0 / 3.1622776601683795,
    1.0 / 3.1622776601683795,
    3.0 / 3.1622776601683795,
];

/// Mapping of the rotator `u = cos θ + j sin θ` onto I and Q
///
/// The hardware and the various ways of wiring I/Q to sine and cosine do not
/// agree on a single convention, so both are selectable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RotationConvention {
    /// `I = cos θ`, `Q = sin θ`: tone appears *above* the center frequency
    #[default]
    Positive,
    /// `I = sin θ`, `Q = cos θ`: tone appears *below* the center frequency
    Negative,
}

impl RotationConvention {
    /// Sign of the resulting frequency offset
    pub fn sign(self) -> f64 {
        match self {
            RotationConvention::Positive => 1.0,
            RotationConvention::Negative => -1.0,
        }
    }
}

/// Kind of baseband signal
#[derive(Clone, Debug, PartialEq)]
pub enum Waveform {
    /// Constant `I = A`, `Q = 0`, i.e. a carrier exactly at the center
    /// frequency
    Constant,
    /// Single complex tone at `frequency` hertz off the center
    Tone {
        /// Baseband frequency in hertz
        frequency: f64,
        /// I/Q mapping
        convention: RotationConvention,
    },
    /// Two tones at `±delta` hertz around the center (for intermodulation
    /// measurements)
    TwoTone {
        /// Distance of each tone from the center in hertz
        delta: f64,
    },
    /// Uniform pseudo-random noise on I and Q
    Noise {
        /// Seed for the pseudo-random generators
        seed: u64,
    },
    /// Constant carrier, retuned through the mixer in steps
    Sweep(SweepConfig),
    /// Continuous OFDM with random 16-QAM on every used subcarrier
    ///
    /// The used subcarriers are split evenly above and below DC; DC itself
    /// stays empty. There are no pilots or preambles. The amplitude is the
    /// RMS level, peaks are limited to [`OFDM_CLIP_RATIO`] times that.
    Ofdm {
        /// IFFT size
        fft_len: usize,
        /// Length of the cyclic prefix in samples
        cp_len: usize,
        /// Number of occupied subcarriers (even)
        used_tones: usize,
        /// Seed for the data generator
        seed: u64,
    },
}

impl Waveform {
    /// Short name used in status output
    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Constant => "constant",
            Waveform::Tone { .. } => "tone",
            Waveform::TwoTone { .. } => "two-tone",
            Waveform::Noise { .. } => "noise",
            Waveform::Sweep(_) => "sweep",
            Waveform::Ofdm { .. } => "OFDM",
        }
    }
    /// Offset of the emitted tone from the center frequency in hertz
    pub fn tone_offset(&self) -> f64 {
        match self {
            Waveform::Tone {
                frequency,
                convention,
            } => convention.sign() * frequency,
            _ => 0.0,
        }
    }
    /// Check parameters against the host side Nyquist frequency and, for a
    /// sweep, against the mixer range
    pub fn validate(
        &self,
        host_sample_rate: f64,
        lo_hz: f64,
        mixer_ceiling: f64,
    ) -> Result<(), ConfigError> {
        let nyquist = host_sample_rate / 2.0;
        let check_baseband = |name: &'static str, value: f64| {
            if value > 0.0 && value < nyquist {
                Ok(())
            } else {
                Err(ConfigError::OutOfRange {
                    name,
                    value,
                    allowed: format!("0 < f < {nyquist} Hz"),
                })
            }
        };
        match self {
            Waveform::Constant | Waveform::Noise { .. } => Ok(()),
            Waveform::Tone { frequency, .. } => check_baseband("baseband frequency", *frequency),
            Waveform::TwoTone { delta } => check_baseband("tone delta", *delta),
            Waveform::Sweep(sweep) => sweep.validate(lo_hz, mixer_ceiling),
            Waveform::Ofdm {
                fft_len,
                cp_len,
                used_tones,
                ..
            } => {
                if *fft_len < 4 {
                    return Err(ConfigError::OutOfRange {
                        name: "FFT length",
                        value: *fft_len as f64,
                        allowed: "at least 4".to_string(),
                    });
                }
                if *used_tones == 0 || used_tones % 2 != 0 || *used_tones > fft_len - 2 {
                    return Err(ConfigError::OutOfRange {
                        name: "used tones",
                        value: *used_tones as f64,
                        allowed: format!("even, 2 to {}", fft_len - 2),
                    });
                }
                if cp_len > fft_len {
                    return Err(ConfigError::OutOfRange {
                        name: "cyclic prefix length",
                        value: *cp_len as f64,
                        allowed: format!("at most {fft_len}"),
                    });
                }
                Ok(())
            }
        }
    }
}

enum State {
    Constant(IqSample),
    Rotator {
        u: Complex<f64>,
        w: Complex<f64>,
        convention: RotationConvention,
        counter: u64,
    },
    TwoTone {
        phase1: f64,
        phase2: f64,
        step: f64,
    },
    Noise {
        rng_i: SmallRng,
        rng_q: SmallRng,
    },
    Ofdm(OfdmState),
}

struct OfdmState {
    ifft: Arc<dyn Fft<f64>>,
    bins: Vec<Complex<f64>>,
    symbol: Vec<IqSample>,
    pos: usize,
    cp_len: usize,
    used_tones: usize,
    gain: f64,
    limit: f64,
    rng: SmallRng,
}

impl OfdmState {
    fn new(fft_len: usize, cp_len: usize, used_tones: usize, seed: u64, amplitude: f64) -> Self {
        let symbol = vec![IqSample::default(); fft_len + cp_len];
        Self {
            ifft: FftPlanner::new().plan_fft_inverse(fft_len),
            bins: vec![Complex::default(); fft_len],
            pos: symbol.len(),
            symbol,
            cp_len,
            used_tones,
            // unnormalized IFFT of unit power symbols has power `used_tones`
            gain: amplitude / (used_tones as f64).sqrt(),
            limit: (OFDM_CLIP_RATIO * amplitude).min(1.0),
            rng: SmallRng::seed_from_u64(seed),
        }
    }
    fn qam16(&mut self) -> Complex<f64> {
        Complex::new(
            QAM16_LEVELS[self.rng.gen_range(0..4)],
            QAM16_LEVELS[self.rng.gen_range(0..4)],
        )
    }
    fn next_symbol(&mut self) {
        let fft_len = self.bins.len();
        self.bins.fill(Complex::default());
        for k in 1..=self.used_tones / 2 {
            let (upper, lower) = (self.qam16(), self.qam16());
            self.bins[k] = upper;
            self.bins[fft_len - k] = lower;
        }
        self.ifft.process(&mut self.bins);
        for (dst, &x) in self.symbol[self.cp_len..].iter_mut().zip(&self.bins) {
            let x = x * self.gain;
            let magnitude = x.norm();
            let x = if magnitude > self.limit {
                x * (self.limit / magnitude)
            } else {
                x
            };
            *dst = quantize_iq(x.re, x.im);
        }
        self.symbol.copy_within(fft_len.., 0);
        self.pos = 0;
    }
    fn fill(&mut self, buffer: &mut [IqSample]) {
        let mut filled = 0;
        while filled < buffer.len() {
            if self.pos == self.symbol.len() {
                self.next_symbol();
            }
            let count = (self.symbol.len() - self.pos).min(buffer.len() - filled);
            buffer[filled..filled + count]
                .copy_from_slice(&self.symbol[self.pos..self.pos + count]);
            self.pos += count;
            filled += count;
        }
    }
}

/// Running state of a [`Waveform`]
///
/// All computation is done in [`f64`]; values are converted with
/// [`quantize`] (rounding and saturation) when written to the buffer.
pub struct WaveformGenerator {
    amplitude: f64,
    state: State,
}

impl WaveformGenerator {
    /// Create generator for `waveform` with `amplitude` (fraction of full
    /// scale) at the given host `sample_rate`
    pub fn new(waveform: &Waveform, amplitude: f64, sample_rate: f64) -> Self {
        let state = match waveform {
            Waveform::Constant | Waveform::Sweep(_) => {
                State::Constant(quantize_iq(amplitude, 0.0))
            }
            Waveform::Tone {
                frequency,
                convention,
            } => {
                let (sin, cos) = phase_step(*frequency, sample_rate).sin_cos();
                State::Rotator {
                    u: Complex::new(1.0, 0.0),
                    w: Complex::new(cos, sin),
                    convention: *convention,
                    counter: 0,
                }
            }
            // Both accumulators start at the crest; starting at zero would
            // make the sines at +delta and -delta cancel each other.
            Waveform::TwoTone { delta } => State::TwoTone {
                phase1: FRAC_PI_2,
                phase2: FRAC_PI_2,
                step: phase_step(*delta, sample_rate),
            },
            Waveform::Noise { seed } => State::Noise {
                rng_i: SmallRng::seed_from_u64(*seed),
                rng_q: SmallRng::seed_from_u64(seed.rotate_left(32) ^ 0x9e37_79b9_7f4a_7c15),
            },
            Waveform::Ofdm {
                fft_len,
                cp_len,
                used_tones,
                seed,
            } => State::Ofdm(OfdmState::new(
                *fft_len,
                *cp_len,
                *used_tones,
                *seed,
                amplitude,
            )),
        };
        Self { amplitude, state }
    }
    /// Bound of every generated I and Q value as fraction of full scale
    ///
    /// This is the amplitude, except for [`Waveform::Ofdm`] where the
    /// amplitude is an RMS level and peaks go up to the envelope limit.
    pub fn peak(&self) -> f64 {
        match &self.state {
            State::Ofdm(ofdm) => ofdm.limit,
            _ => self.amplitude,
        }
    }
    /// True if every generated buffer is identical
    ///
    /// The streaming engine uses this to fill the buffer only once.
    pub fn is_static(&self) -> bool {
        matches!(self.state, State::Constant(_))
    }
    /// Overwrite `buffer` with the next samples
    pub fn fill(&mut self, buffer: &mut [IqSample]) {
        let amplitude = self.amplitude;
        match &mut self.state {
            State::Constant(sample) => buffer.fill(*sample),
            State::Rotator {
                u,
                w,
                convention,
                counter,
            } => {
                for sample in buffer.iter_mut() {
                    *sample = match convention {
                        RotationConvention::Positive => {
                            quantize_iq(amplitude * u.re, amplitude * u.im)
                        }
                        RotationConvention::Negative => {
                            quantize_iq(amplitude * u.im, amplitude * u.re)
                        }
                    };
                    *u *= *w;
                    *counter += 1;
                    if *counter % RENORMALIZE_INTERVAL == 0 {
                        *u = renormalize(*u);
                    }
                }
            }
            State::TwoTone {
                phase1,
                phase2,
                step,
            } => {
                let a = amplitude * 0.5;
                for sample in buffer.iter_mut() {
                    *sample = quantize_iq(a * phase1.sin() + a * phase2.sin(), 0.0);
                    *phase1 = wrap_phase(*phase1 + *step);
                    *phase2 = wrap_phase(*phase2 - *step);
                }
            }
            State::Noise { rng_i, rng_q } => {
                for sample in buffer.iter_mut() {
                    let i: f64 = rng_i.gen_range(-1.0..1.0);
                    let q: f64 = rng_q.gen_range(-1.0..1.0);
                    *sample = quantize_iq(amplitude * i, amplitude * q);
                }
            }
            State::Ofdm(ofdm) => ofdm.fill(buffer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::assert_approx;
    use rustfft::FftPlanner;
    use std::time::Duration;

    const SAMPLE_RATE: f64 = 1.024e6;
    const N: usize = 1024;

    fn spectrum(samples: &[IqSample]) -> Vec<f64> {
        let mut bins: Vec<Complex<f64>> = samples
            .iter()
            .map(|s| Complex::new(s.re as f64, s.im as f64))
            .collect();
        FftPlanner::<f64>::new()
            .plan_fft_forward(bins.len())
            .process(&mut bins);
        bins.iter().map(|b| b.norm()).collect()
    }

    fn rotator(gen: &WaveformGenerator) -> Option<Complex<f64>> {
        match gen.state {
            State::Rotator { u, .. } => Some(u),
            _ => None,
        }
    }

    fn strongest_bin(spectrum: &[f64]) -> usize {
        let mut best = 0;
        for (idx, &value) in spectrum.iter().enumerate() {
            if value > spectrum[best] {
                best = idx;
            }
        }
        best
    }

    fn all_waveforms() -> Vec<Waveform> {
        vec![
            Waveform::Constant,
            Waveform::Tone {
                frequency: 100e3,
                convention: RotationConvention::Positive,
            },
            Waveform::Tone {
                frequency: 37e3,
                convention: RotationConvention::Negative,
            },
            Waveform::TwoTone { delta: 50e3 },
            Waveform::Noise { seed: 1 },
            Waveform::Sweep(SweepConfig {
                start: 10e6,
                stop: 20e6,
                step: 1e6,
                dwell: Duration::from_millis(30),
            }),
            ofdm(),
        ]
    }

    fn ofdm() -> Waveform {
        Waveform::Ofdm {
            fft_len: 512,
            cp_len: 128,
            used_tones: 300,
            seed: 12345,
        }
    }

    #[test]
    fn test_constant() {
        let mut gen = WaveformGenerator::new(&Waveform::Constant, 0.70, SAMPLE_RATE);
        assert!(gen.is_static());
        let mut buf = vec![IqSample::default(); N];
        gen.fill(&mut buf);
        assert!(buf.iter().all(|&s| s == Complex::new(22937, 0)));
    }
    #[test]
    fn test_amplitude_bound() {
        for scale in [0.1, 0.5, 0.70, 1.0] {
            for waveform in all_waveforms() {
                let mut gen = WaveformGenerator::new(&waveform, scale, SAMPLE_RATE);
                let ceiling = amplitude_ceiling(gen.peak());
                let mut buf = vec![IqSample::default(); N];
                for _ in 0..4 {
                    gen.fill(&mut buf);
                    for s in buf.iter() {
                        assert!(
                            (s.re as i32).abs() <= ceiling && (s.im as i32).abs() <= ceiling,
                            "{waveform:?} at scale {scale}: {s:?}"
                        );
                    }
                }
            }
        }
    }
    #[test]
    fn test_tone_positive_rotation() {
        let waveform = Waveform::Tone {
            frequency: 100e3,
            convention: RotationConvention::Positive,
        };
        assert_eq!(waveform.tone_offset(), 100e3);
        let mut gen = WaveformGenerator::new(&waveform, 0.5, SAMPLE_RATE);
        let mut buf = vec![IqSample::default(); N];
        gen.fill(&mut buf);
        assert_eq!(buf[0], Complex::new(16384, 0));
        assert_eq!(strongest_bin(&spectrum(&buf)), 100);
    }
    #[test]
    fn test_tone_negative_rotation() {
        let waveform = Waveform::Tone {
            frequency: 100e3,
            convention: RotationConvention::Negative,
        };
        assert_eq!(waveform.tone_offset(), -100e3);
        let mut gen = WaveformGenerator::new(&waveform, 0.5, SAMPLE_RATE);
        let mut buf = vec![IqSample::default(); N];
        gen.fill(&mut buf);
        assert_eq!(buf[0], Complex::new(0, 16384));
        assert_eq!(strongest_bin(&spectrum(&buf)), N - 100);
    }
    #[test]
    fn test_tone_continuous_across_buffers() {
        let waveform = Waveform::Tone {
            frequency: 1e3,
            convention: RotationConvention::Positive,
        };
        let mut gen1 = WaveformGenerator::new(&waveform, 0.7, SAMPLE_RATE);
        let mut gen2 = WaveformGenerator::new(&waveform, 0.7, SAMPLE_RATE);
        let mut long = vec![IqSample::default(); 2 * N];
        let mut short = vec![IqSample::default(); N];
        gen1.fill(&mut long);
        gen2.fill(&mut short);
        assert_eq!(&long[..N], &short[..]);
        gen2.fill(&mut short);
        assert_eq!(&long[N..], &short[..]);
    }
    #[test]
    fn test_rotator_stability() {
        let waveform = Waveform::Tone {
            frequency: 123_456.7,
            convention: RotationConvention::Positive,
        };
        let mut gen = WaveformGenerator::new(&waveform, 0.7, 5e6);
        let mut buf = vec![IqSample::default(); 8192];
        for _ in 0..123 {
            gen.fill(&mut buf);
            let norm = rotator(&gen).unwrap().norm();
            assert!((0.999..=1.001).contains(&norm), "|u| = {norm}");
        }
    }
    #[test]
    fn test_two_tone_spectrum() {
        let mut gen = WaveformGenerator::new(&Waveform::TwoTone { delta: 50e3 }, 0.8, SAMPLE_RATE);
        let mut buf = vec![IqSample::default(); N];
        gen.fill(&mut buf);
        assert!(buf.iter().all(|s| s.im == 0));
        assert_eq!(buf[0].re, quantize(0.8));
        let spec = spectrum(&buf);
        let upper = spec[50];
        let lower = spec[N - 50];
        assert_approx(upper / lower, 1.0);
        let total: f64 = spec.iter().map(|x| x * x).sum();
        assert!((upper * upper + lower * lower) / total > 0.99);
    }
    #[test]
    fn test_two_tone_full_scale_does_not_wrap() {
        let mut gen = WaveformGenerator::new(&Waveform::TwoTone { delta: 1e3 }, 1.0, SAMPLE_RATE);
        let mut buf = vec![IqSample::default(); 4 * N];
        gen.fill(&mut buf);
        assert!(buf.iter().all(|s| s.re >= -32767 && s.im == 0));
        assert_eq!(buf.iter().map(|s| s.re).max(), Some(i16::MAX));
    }
    #[test]
    fn test_noise_deterministic() {
        let waveform = Waveform::Noise { seed: 42 };
        let mut gen1 = WaveformGenerator::new(&waveform, 0.7, SAMPLE_RATE);
        let mut gen2 = WaveformGenerator::new(&waveform, 0.7, SAMPLE_RATE);
        let mut buf1 = vec![IqSample::default(); N];
        let mut buf2 = vec![IqSample::default(); N];
        gen1.fill(&mut buf1);
        gen2.fill(&mut buf2);
        assert_eq!(buf1, buf2);
        assert!(buf1.iter().any(|s| s.re != s.im));
        let mut other = WaveformGenerator::new(&Waveform::Noise { seed: 43 }, 0.7, SAMPLE_RATE);
        other.fill(&mut buf2);
        assert_ne!(buf1, buf2);
    }
    #[test]
    fn test_noise_statistics() {
        let mut gen = WaveformGenerator::new(&Waveform::Noise { seed: 7 }, 1.0, SAMPLE_RATE);
        let mut buf = vec![IqSample::default(); 16 * N];
        gen.fill(&mut buf);
        let mean_i: f64 = buf.iter().map(|s| s.re as f64).sum::<f64>() / buf.len() as f64;
        let mean_q: f64 = buf.iter().map(|s| s.im as f64).sum::<f64>() / buf.len() as f64;
        assert!(mean_i.abs() < 1000.0);
        assert!(mean_q.abs() < 1000.0);
        // uniform distribution on [-1, 1) has variance 1/3
        let var_i: f64 = buf
            .iter()
            .map(|s| (s.re as f64 / FULL_SCALE).powi(2))
            .sum::<f64>()
            / buf.len() as f64;
        assert!((var_i - 1.0 / 3.0).abs() < 0.02);
    }
    #[test]
    fn test_ofdm_peak_and_level() {
        let mut gen = WaveformGenerator::new(&ofdm(), OFDM_DEFAULT_SCALE, 5e6);
        assert_approx(gen.peak(), 0.9);
        assert!(!gen.is_static());
        let mut buf = vec![IqSample::default(); 16 * 640];
        gen.fill(&mut buf);
        let limit = 0.9 * FULL_SCALE + 1.0;
        assert!(buf
            .iter()
            .all(|s| ((s.re as f64).powi(2) + (s.im as f64).powi(2)).sqrt() <= limit));
        let power: f64 = buf
            .iter()
            .map(|s| (s.re as f64).powi(2) + (s.im as f64).powi(2))
            .sum::<f64>()
            / buf.len() as f64;
        let rms = power.sqrt() / FULL_SCALE;
        assert!((rms - OFDM_DEFAULT_SCALE).abs() < 0.03, "RMS {rms}");
    }
    #[test]
    fn test_ofdm_cyclic_prefix() {
        let mut gen = WaveformGenerator::new(&ofdm(), 0.3, 5e6);
        // chunks not aligned to the symbol length
        let mut buf = vec![IqSample::default(); 2 * 640];
        for chunk in buf.chunks_mut(100) {
            gen.fill(chunk);
        }
        for symbol in buf.chunks(640) {
            assert_eq!(&symbol[..128], &symbol[512..]);
        }
        assert_ne!(&buf[..640], &buf[640..]);
    }
    #[test]
    fn test_ofdm_occupied_bins() {
        let mut gen = WaveformGenerator::new(&ofdm(), 0.1, 5e6);
        let mut buf = vec![IqSample::default(); 640];
        gen.fill(&mut buf);
        let magnitudes = spectrum(&buf[128..]);
        let used: Vec<usize> = (1..=150).chain(512 - 150..512).collect();
        let used_power: f64 = used.iter().map(|&k| magnitudes[k] * magnitudes[k]).sum();
        let total: f64 = magnitudes.iter().map(|x| x * x).sum();
        assert!(used_power / total > 0.99);
        let mean_used = used.iter().map(|&k| magnitudes[k]).sum::<f64>() / used.len() as f64;
        assert!(magnitudes[0] < 0.1 * mean_used);
        assert!(magnitudes[256] < 0.1 * mean_used);
    }
    #[test]
    fn test_ofdm_deterministic() {
        let mut gen1 = WaveformGenerator::new(&ofdm(), 0.3, 5e6);
        let mut gen2 = WaveformGenerator::new(&ofdm(), 0.3, 5e6);
        let mut buf1 = vec![IqSample::default(); 1000];
        let mut buf2 = vec![IqSample::default(); 1000];
        gen1.fill(&mut buf1);
        gen2.fill(&mut buf2);
        assert_eq!(buf1, buf2);
    }
    #[test]
    fn test_validate_ofdm() {
        let ofdm = |fft_len, cp_len, used_tones| Waveform::Ofdm {
            fft_len,
            cp_len,
            used_tones,
            seed: 0,
        };
        assert!(ofdm(512, 128, 300).validate(5e6, 30e6, 20e6).is_ok());
        assert!(ofdm(512, 128, 510).validate(5e6, 30e6, 20e6).is_ok());
        assert!(ofdm(512, 128, 512).validate(5e6, 30e6, 20e6).is_err());
        assert!(ofdm(512, 128, 301).validate(5e6, 30e6, 20e6).is_err());
        assert!(ofdm(512, 128, 0).validate(5e6, 30e6, 20e6).is_err());
        assert!(ofdm(512, 513, 300).validate(5e6, 30e6, 20e6).is_err());
        assert!(ofdm(2, 0, 2).validate(5e6, 30e6, 20e6).is_err());
    }
    #[test]
    fn test_validate_baseband() {
        let tone = |frequency| Waveform::Tone {
            frequency,
            convention: RotationConvention::Positive,
        };
        assert!(tone(1e6).validate(5e6, 30e6, 20e6).is_ok());
        assert!(tone(0.0).validate(5e6, 30e6, 20e6).is_err());
        assert!(tone(-1e3).validate(5e6, 30e6, 20e6).is_err());
        assert!(tone(2.5e6).validate(5e6, 30e6, 20e6).is_err());
        assert!(Waveform::TwoTone { delta: 3e6 }
            .validate(5e6, 30e6, 20e6)
            .is_err());
        assert!(Waveform::Constant.validate(5e6, 30e6, 20e6).is_ok());
    }
}
