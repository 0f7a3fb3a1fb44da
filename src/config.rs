//! Static transmit chain configuration
//!
//! A [`TxConfig`] is built once (e.g. from command line arguments) and
//! checked with [`TxConfig::validate`] before any device is touched. It is
//! not modified afterwards; only the gain may change at runtime through a
//! [gain ramp].
//!
//! [gain ramp]: crate::ramp::GainRamp

use crate::device::correctors::CorrectorOverrides;
use crate::error::ConfigError;
use crate::planner::*;
use crate::samples::DEFAULT_BUFFER_LEN;
use crate::waveform::Waveform;

use std::time::Duration;

/// Lowest gain supported by the hardware
pub const GAIN_MIN_DB: u32 = 0;
/// Highest gain supported by the hardware
pub const GAIN_MAX_DB: u32 = 73;
/// Default amplitude as fraction of full scale, leaving headroom against
/// clipping in the DAC
pub const DEFAULT_TONE_SCALE: f64 = 0.70;
/// Default capacity of the device's sample queue
pub const DEFAULT_FIFO_LEN: usize = 1 << 17;
/// Default timeout for handing one buffer to the device
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(1000);

/// Parse a frequency in hertz with optional `k`, `M`, or `G` suffix
///
/// The suffix is case-insensitive and may be preceded or followed by
/// whitespace.
///
/// # Example
///
/// ```
/// use radiotx::config::parse_hz;
///
/// assert_eq!(parse_hz("5M").unwrap(), 5e6);
/// assert_eq!(parse_hz("433.92 m").unwrap(), 433.92e6);
/// assert_eq!(parse_hz("2.5e3").unwrap(), 2500.0);
/// assert!(parse_hz("5x").is_err());
/// ```
pub fn parse_hz(s: &str) -> Result<f64, ConfigError> {
    let bad = || ConfigError::BadFrequency(s.to_string());
    let trimmed = s.trim();
    let (number, multiplier) = match trimmed.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => {
            let multiplier = match c.to_ascii_lowercase() {
                'k' => 1e3,
                'm' => 1e6,
                'g' => 1e9,
                _ => return Err(bad()),
            };
            (trimmed[..idx].trim_end(), multiplier)
        }
        Some(_) => (trimmed, 1.0),
        None => return Err(bad()),
    };
    let value: f64 = number.parse().map_err(|_| bad())?;
    if !value.is_finite() {
        return Err(bad());
    }
    Ok(value * multiplier)
}

/// Parse a boolean token (`1`/`true`/`yes`/`on` or `0`/`false`/`no`/`off`)
pub fn parse_bool(s: &str) -> Result<bool, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::BadBool(s.to_string())),
    }
}

/// Check that `gain_db` is supported by the hardware and convert it
pub fn checked_gain(gain_db: i64) -> Result<u32, ConfigError> {
    if gain_db < GAIN_MIN_DB as i64 || gain_db > GAIN_MAX_DB as i64 {
        return Err(ConfigError::GainOutOfRange(gain_db));
    }
    Ok(gain_db as u32)
}

/// Smooth transition from a start gain to [`TxConfig::gain_db`]
#[derive(Clone, Debug, PartialEq)]
pub struct GainRampConfig {
    /// Gain applied before streaming starts
    pub start_db: u32,
    /// Total ramp duration
    pub duration: Duration,
    /// Time between two ramp steps
    pub interval: Duration,
}

/// Static plan of the transmit chain
#[derive(Clone, Debug)]
pub struct TxConfig {
    /// Transmit channel index
    pub channel: usize,
    /// Sample rate on the host side in hertz
    pub host_sample_rate: f64,
    /// Oversampling factor between host and RF side
    pub oversample: u32,
    /// Analog filter bandwidth in hertz
    pub filter_bandwidth: f64,
    /// Local oscillator frequency in hertz
    pub lo_frequency: f64,
    /// Mixer (NCO) setting
    pub mixer: MixerPlan,
    /// Target gain in dB
    pub gain_db: u32,
    /// Optional gain ramp towards `gain_db`
    pub gain_ramp: Option<GainRampConfig>,
    /// Run the built-in self-calibration
    pub calibrate: bool,
    /// Bandwidth used for calibration (defaults to `filter_bandwidth`)
    pub calibration_bandwidth: Option<f64>,
    /// Manual overrides of the correction coefficients
    pub correctors: CorrectorOverrides,
    /// Amplitude as fraction of full scale
    pub tone_scale: f64,
    /// Baseband content
    pub waveform: Waveform,
    /// Capacity of the device queue in samples
    pub fifo_len: usize,
    /// Samples per buffer
    pub buffer_len: usize,
    /// Timeout for each buffer send
    pub send_timeout: Duration,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            host_sample_rate: 5e6,
            oversample: 32,
            filter_bandwidth: 20e6,
            lo_frequency: 30e6,
            mixer: MixerPlan::new(15e6, true),
            gain_db: 40,
            gain_ramp: None,
            calibrate: false,
            calibration_bandwidth: None,
            correctors: CorrectorOverrides::default(),
            tone_scale: DEFAULT_TONE_SCALE,
            waveform: Waveform::Constant,
            fifo_len: DEFAULT_FIFO_LEN,
            buffer_len: DEFAULT_BUFFER_LEN,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            allowed: "positive".to_string(),
        })
    }
}

impl TxConfig {
    /// Requested sample rate at the RF side (where the mixer operates)
    pub fn rf_sample_rate(&self) -> f64 {
        self.host_sample_rate * self.oversample as f64
    }
    /// Largest mixer frequency at the requested sample rate
    pub fn mixer_ceiling(&self) -> f64 {
        mixer_ceiling(self.rf_sample_rate())
    }
    /// Bandwidth passed to the calibration routine
    pub fn calibration_bandwidth(&self) -> f64 {
        self.calibration_bandwidth.unwrap_or(self.filter_bandwidth)
    }
    /// RF center frequency (LO shifted by mixer)
    pub fn center_frequency(&self) -> f64 {
        effective_rf(self.lo_frequency, self.mixer)
    }
    /// Gain applied during setup (start of ramp if any)
    pub fn initial_gain_db(&self) -> u32 {
        match &self.gain_ramp {
            Some(ramp) => ramp.start_db,
            None => self.gain_db,
        }
    }
    /// Retune the mixer such that the center frequency is `rf_target_hz`
    pub fn tune_to(&mut self, rf_target_hz: f64) -> Result<(), ConfigError> {
        self.mixer = plan_mixer(rf_target_hz, self.lo_frequency, self.mixer_ceiling())?;
        Ok(())
    }
    /// Check all parameters
    ///
    /// This must succeed before any device call is made.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("host sample rate", self.host_sample_rate)?;
        if self.oversample < 1 {
            return Err(ConfigError::OutOfRange {
                name: "oversample",
                value: self.oversample as f64,
                allowed: ">= 1".to_string(),
            });
        }
        positive("filter bandwidth", self.filter_bandwidth)?;
        positive("LO frequency", self.lo_frequency)?;
        if let Some(bw) = self.calibration_bandwidth {
            positive("calibration bandwidth", bw)?;
        }
        let ceiling = self.mixer_ceiling();
        if !(self.mixer.frequency >= 0.0) || self.mixer.frequency > ceiling {
            return Err(ConfigError::MixerOutOfRange {
                mixer_hz: self.mixer.frequency,
                ceiling_hz: ceiling,
            });
        }
        checked_gain(self.gain_db as i64)?;
        if let Some(ramp) = &self.gain_ramp {
            checked_gain(ramp.start_db as i64)?;
            if ramp.interval < Duration::from_millis(1) {
                return Err(ConfigError::OutOfRange {
                    name: "gain ramp interval",
                    value: ramp.interval.as_secs_f64() * 1e3,
                    allowed: "at least 1 ms".to_string(),
                });
            }
        }
        if !(self.tone_scale > 0.0 && self.tone_scale <= 1.0) {
            return Err(ConfigError::OutOfRange {
                name: "tone scale",
                value: self.tone_scale,
                allowed: "0 < scale <= 1".to_string(),
            });
        }
        if self.fifo_len == 0 || self.buffer_len == 0 {
            return Err(ConfigError::OutOfRange {
                name: "buffer length",
                value: self.buffer_len.min(self.fifo_len) as f64,
                allowed: "positive".to_string(),
            });
        }
        self.waveform
            .validate(self.host_sample_rate, self.lo_frequency, ceiling)?;
        Ok(())
    }
}
