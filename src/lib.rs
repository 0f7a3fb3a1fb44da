//! Continuous-wave and test-signal transmitter for software defined radios
//!
//! **Note:** This crate is in an early alpha stage.
//!
//! The crate places a baseband signal on an RF frequency by combining the
//! radio's local oscillator (LO) with its numerically-controlled mixer (NCO):
//!
//! * [`planner`] maps a target RF frequency onto LO and mixer settings,
//! * [`waveform`] generates baseband content (constant carrier, tone,
//!   two-tone, noise, or a swept carrier),
//! * [`transmit`] configures a [device] and keeps its sample queue fed until
//!   cancelled, then mutes and releases it.
//!
//! For getting started, have a look at the [`transmit`] module.
//!
//! [device]: device::TxDevice

#![warn(missing_docs)]

pub mod config;
pub mod device;
pub mod error;
pub mod math;
pub mod metering;
pub mod numbers;
pub mod planner;
pub mod prelude;
pub mod ramp;
pub mod samples;
pub mod sync;
pub mod transmit;
pub mod waveform;

pub use config::TxConfig;
pub use error::{Error, Result};
pub use transmit::Transmitter;

#[cfg(test)]
mod tests {
    pub fn assert_approx(a: f64, b: f64) {
        assert!((a - b).abs() <= 1e-9 * b.abs().max(1.0), "{a} != {b}");
    }
}
