//! Frequency planning
//!
//! The transmitted tone is placed by the hardware: the local oscillator (LO)
//! provides a coarse frequency, and a numerically-controlled oscillator (NCO)
//! shifts baseband up or down by a fine mixer frequency. The functions in this
//! module map a desired RF frequency onto a [`MixerPlan`] and back.
//!
//! ```
//! use radiotx::planner::{effective_rf, plan_mixer};
//!
//! let plan = plan_mixer(15e6, 30e6, 20e6).unwrap();
//! assert_eq!(plan.frequency, 15e6);
//! assert!(plan.direction.is_downconvert());
//! assert_eq!(effective_rf(30e6, plan), 15e6);
//! ```

use crate::error::ConfigError;

use std::time::Duration;

/// Margin kept between the mixer ceiling and the Nyquist frequency of the NCO
pub const MIXER_GUARD_HZ: f64 = 1.0;

/// Direction in which the mixer shifts baseband relative to the LO
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MixerDirection {
    /// RF is LO plus mixer frequency
    Up,
    /// RF is LO minus mixer frequency
    Down,
}

impl MixerDirection {
    /// Direction from a "downconvert" flag
    pub fn from_downconvert(downconvert: bool) -> Self {
        if downconvert {
            MixerDirection::Down
        } else {
            MixerDirection::Up
        }
    }
    /// True for [`MixerDirection::Down`]
    pub fn is_downconvert(self) -> bool {
        self == MixerDirection::Down
    }
    /// Sign applied to the mixer frequency (`-1.0` for downconversion)
    pub fn sign(self) -> f64 {
        match self {
            MixerDirection::Up => 1.0,
            MixerDirection::Down => -1.0,
        }
    }
    /// "up" or "down"
    pub fn name(self) -> &'static str {
        match self {
            MixerDirection::Up => "up",
            MixerDirection::Down => "down",
        }
    }
}

/// Mixer (NCO) setting: non-negative frequency plus direction
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MixerPlan {
    /// Mixer frequency magnitude in hertz
    pub frequency: f64,
    /// Whether the mixer frequency is added to or subtracted from the LO
    pub direction: MixerDirection,
}

impl MixerPlan {
    /// Create plan from magnitude and "downconvert" flag
    pub fn new(frequency: f64, downconvert: bool) -> Self {
        Self {
            frequency,
            direction: MixerDirection::from_downconvert(downconvert),
        }
    }
    /// Signed frequency offset relative to the LO
    pub fn offset(&self) -> f64 {
        self.direction.sign() * self.frequency
    }
}

/// Largest usable mixer frequency when the NCO runs at `rf_sample_rate`
pub fn mixer_ceiling(rf_sample_rate: f64) -> f64 {
    rf_sample_rate / 2.0 - MIXER_GUARD_HZ
}

/// Plan mixer such that the LO at `lo_hz` is shifted to `rf_target_hz`
///
/// The mixer frequency is `|lo_hz - rf_target_hz|`, the direction is
/// downconversion if `lo_hz >= rf_target_hz`. Fails if the mixer frequency
/// exceeds `ceiling_hz`.
pub fn plan_mixer(rf_target_hz: f64, lo_hz: f64, ceiling_hz: f64) -> Result<MixerPlan, ConfigError> {
    let frequency = (lo_hz - rf_target_hz).abs();
    if !frequency.is_finite() || frequency > ceiling_hz {
        return Err(ConfigError::MixerOutOfRange {
            mixer_hz: frequency,
            ceiling_hz,
        });
    }
    Ok(MixerPlan::new(frequency, lo_hz >= rf_target_hz))
}

/// RF frequency produced by the LO at `lo_hz` and the given mixer setting
pub fn effective_rf(lo_hz: f64, plan: MixerPlan) -> f64 {
    match plan.direction {
        MixerDirection::Down => lo_hz - plan.frequency,
        MixerDirection::Up => lo_hz + plan.frequency,
    }
}

/// Frequency sweep parameters
#[derive(Clone, Debug, PartialEq)]
pub struct SweepConfig {
    /// First RF frequency in hertz
    pub start: f64,
    /// Last RF frequency in hertz (inclusive if hit by a step)
    pub stop: f64,
    /// Step size in hertz
    pub step: f64,
    /// Time spent transmitting on each frequency
    pub dwell: Duration,
}

impl SweepConfig {
    /// Number of frequencies in one pass
    pub fn len(&self) -> usize {
        ((self.stop - self.start) / self.step + 1e-9).floor() as usize + 1
    }
    /// RF frequency of step `index` in a pass
    pub fn frequency(&self, index: usize) -> f64 {
        self.start + index as f64 * self.step
    }
    /// Endless iterator over the RF frequencies, restarting at `start` after
    /// `stop` has been passed
    pub fn frequencies(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).cycle().map(move |idx| self.frequency(idx))
    }
    /// Check parameters and that every frequency can be reached from `lo_hz`
    /// with a mixer frequency not exceeding `ceiling_hz`
    pub fn validate(&self, lo_hz: f64, ceiling_hz: f64) -> Result<(), ConfigError> {
        for (name, value) in [("sweep start", self.start), ("sweep stop", self.stop)] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::OutOfRange {
                    name,
                    value,
                    allowed: "positive".to_string(),
                });
            }
        }
        if self.stop < self.start {
            return Err(ConfigError::OutOfRange {
                name: "sweep stop",
                value: self.stop,
                allowed: format!(">= sweep start {}", self.start),
            });
        }
        if !(self.step > 0.0 && self.step.is_finite()) {
            return Err(ConfigError::OutOfRange {
                name: "sweep step",
                value: self.step,
                allowed: "positive".to_string(),
            });
        }
        if self.dwell.is_zero() {
            return Err(ConfigError::OutOfRange {
                name: "dwell",
                value: 0.0,
                allowed: "at least 1 ms".to_string(),
            });
        }
        // |lo - rf| is largest at either end of the range
        plan_mixer(self.start, lo_hz, ceiling_hz)?;
        plan_mixer(self.frequency(self.len() - 1), lo_hz, ceiling_hz)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::assert_approx;
    #[test]
    fn test_plan_downconvert() {
        let plan = plan_mixer(15e6, 30e6, 20e6).unwrap();
        assert_eq!(plan, MixerPlan::new(15e6, true));
        assert_eq!(effective_rf(30e6, plan), 15e6);
    }
    #[test]
    fn test_plan_upconvert() {
        let plan = plan_mixer(42.5e6, 30e6, 20e6).unwrap();
        assert_eq!(plan.direction, MixerDirection::Up);
        assert_approx(plan.frequency, 12.5e6);
        assert_approx(plan.offset(), 12.5e6);
    }
    #[test]
    fn test_plan_on_lo() {
        let plan = plan_mixer(30e6, 30e6, 20e6).unwrap();
        assert_eq!(plan.frequency, 0.0);
        assert!(plan.direction.is_downconvert());
    }
    #[test]
    fn test_plan_out_of_range() {
        assert_eq!(
            plan_mixer(5e6, 30e6, 20e6),
            Err(ConfigError::MixerOutOfRange {
                mixer_hz: 25e6,
                ceiling_hz: 20e6
            })
        );
        assert!(plan_mixer(f64::NAN, 30e6, 20e6).is_err());
    }
    #[test]
    fn test_round_trip() {
        let ceiling = mixer_ceiling(40e6);
        for lo in [1e6, 30e6, 433.92e6, 2.4e9] {
            let mut offset = -ceiling;
            while offset <= ceiling {
                let target = lo + offset;
                offset += 1234567.0;
                if target <= 0.0 {
                    continue;
                }
                let plan = plan_mixer(target, lo, ceiling).unwrap();
                let rf = effective_rf(lo, plan);
                assert!(((rf - target) / target).abs() <= 1e-6, "lo={lo} target={target}");
            }
        }
    }
    #[test]
    fn test_mixer_ceiling() {
        assert_eq!(mixer_ceiling(40e6), 20e6 - 1.0);
        assert_eq!(mixer_ceiling(160e6), 80e6 - 1.0);
    }
    #[test]
    fn test_sweep_frequencies_wrap() {
        let sweep = SweepConfig {
            start: 10e6,
            stop: 10.3e6,
            step: 100e3,
            dwell: Duration::from_millis(30),
        };
        assert_eq!(sweep.len(), 4);
        let freqs: Vec<f64> = sweep.frequencies().take(6).collect();
        assert_eq!(freqs.len(), 6);
        assert_approx(freqs[3], 10.3e6);
        assert_approx(freqs[4], 10e6);
        assert_approx(freqs[5], 10.1e6);
    }
    #[test]
    fn test_sweep_validate() {
        let mut sweep = SweepConfig {
            start: 10.5e6,
            stop: 30e6,
            step: 0.5e6,
            dwell: Duration::from_millis(30),
        };
        assert_eq!(sweep.validate(30e6, mixer_ceiling(40e6)), Ok(()));
        sweep.start = 5e6;
        assert!(matches!(
            sweep.validate(30e6, mixer_ceiling(40e6)),
            Err(ConfigError::MixerOutOfRange { .. })
        ));
        sweep.start = 20e6;
        sweep.stop = 10e6;
        assert!(sweep.validate(30e6, mixer_ceiling(40e6)).is_err());
        sweep.stop = 25e6;
        sweep.step = 0.0;
        assert!(sweep.validate(30e6, mixer_ceiling(40e6)).is_err());
    }
}
