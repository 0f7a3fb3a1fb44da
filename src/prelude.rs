//! Re-export of certain important items

pub use super::config::{parse_bool, parse_hz, GainRampConfig, TxConfig};
pub use super::device::{TxDevice, TxQueue};
pub use super::error::{ConfigError, Error};
pub use super::numbers::{Complex, IqSample};
pub use super::planner::{effective_rf, plan_mixer, MixerPlan, SweepConfig};
pub use super::samples::SampleBuffer;
pub use super::sync::{Cancellation, Canceller};
pub use super::transmit::{Stats, Transmitter};
pub use super::waveform::{RotationConvention, Waveform, WaveformGenerator};
