//! Error types

use crate::device::DeviceError;

/// Invalid parameter detected before any device resource is touched
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// Frequency string could not be parsed
    #[error("invalid frequency {0:?} (expected number with optional k/M/G suffix)")]
    BadFrequency(String),
    /// Boolean string could not be parsed
    #[error("invalid boolean {0:?} (expected 1/true/yes/on or 0/false/no/off)")]
    BadBool(String),
    /// Parameter outside its allowed range
    #[error("{name} = {value} is out of range ({allowed})")]
    OutOfRange {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f64,
        /// Human readable description of the allowed range
        allowed: String,
    },
    /// Mixer frequency required for a target exceeds what the NCO can do
    #[error("mixer frequency {mixer_hz:.0} Hz exceeds ceiling {ceiling_hz:.0} Hz")]
    MixerOutOfRange {
        /// Required mixer frequency
        mixer_hz: f64,
        /// Largest mixer frequency supported at the current sample rate
        ceiling_hz: f64,
    },
    /// Gain outside of what the hardware supports
    #[error("gain {0} dB is outside 0..=73 dB")]
    GainOutOfRange(i64),
}

/// Error returned by the transmitter
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A setup call to the device failed
    #[error("{op} failed: {source}")]
    Device {
        /// Operation which failed
        op: &'static str,
        /// Error reported by the device
        #[source]
        source: DeviceError,
    },
    /// Handing samples to the device failed (including timeout)
    #[error("sending samples failed: {0}")]
    Stream(#[source] DeviceError),
    /// No device available
    #[error("no device found")]
    NoDevice,
}

impl Error {
    /// True if the error was detected before streaming started and stems from
    /// the configuration
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Result type with [`Error`] as default error
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Attach the failing operation's name to a [`DeviceError`]
pub(crate) trait DeviceContext<T> {
    fn op(self, op: &'static str) -> Result<T>;
}

impl<T> DeviceContext<T> for Result<T, DeviceError> {
    fn op(self, op: &'static str) -> Result<T> {
        self.map_err(|source| Error::Device { op, source })
    }
}
