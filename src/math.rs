//! Mathematic functions helpful for signal generation

use crate::numbers::*;

use std::f64::consts::{PI, TAU};

/// Pull a complex number back towards unit magnitude
///
/// Performs one Newton-Raphson step towards `1/|u|`, i.e. multiplies `u` with
/// `(3 - |u|²) / 2`. For `|u|` close to one, the magnitude error after the
/// step is approximately the square of the error before the step.
pub fn renormalize(u: Complex<f64>) -> Complex<f64> {
    let k = 1.5 - 0.5 * u.norm_sqr();
    u * k
}

/// Phase increment per sample (in radians) for frequency `frequency` at
/// sample rate `sample_rate`
pub fn phase_step(frequency: f64, sample_rate: f64) -> f64 {
    TAU * frequency / sample_rate
}

/// Wrap phase into the interval from `-π` to `π`
pub fn wrap_phase(mut phase: f64) -> f64 {
    if phase > PI || phase < -PI {
        phase = (phase + PI).rem_euclid(TAU) - PI;
    }
    phase
}

/// Convert amplitude ratio to decibels
pub fn ratio_to_db(ratio: f64) -> f64 {
    20.0 * ratio.max(1e-9).log10()
}
