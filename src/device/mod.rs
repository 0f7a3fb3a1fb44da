//! Interface to transmitting hardware
//!
//! The streaming engine talks to the radio exclusively through the
//! [`TxDevice`] and [`TxQueue`] traits. Backends:
//!
//! * [`sim`]: in-process simulation which records every call
//! * [`soapysdr`]: real hardware through SoapySDR (feature "`soapysdr`")
//!
//! The [`correctors`] module provides the register map of the hardware's TX
//! I/Q correction stage on top of [`TxDevice::read_register`] and
//! [`TxDevice::write_register`].

use crate::numbers::IqSample;
use crate::planner::MixerPlan;

use std::time::Duration;

pub mod correctors;
pub mod sim;
#[cfg(feature = "soapysdr")]
pub mod soapysdr;

/// Error reported by a device backend
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum DeviceError {
    /// Operation did not complete in time
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    /// Backend does not provide the operation
    #[error("not supported by this backend: {0}")]
    Unsupported(&'static str),
    /// Error message from the driver
    #[error("{0}")]
    Driver(String),
}

/// Sample rates at host and RF side
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleRates {
    /// Rate of samples exchanged with the host
    pub host: f64,
    /// Rate at which the converters and the mixer operate
    pub rf: f64,
}

/// Counters of a device queue
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStatus {
    /// Samples currently queued
    pub fifo_filled: usize,
    /// Capacity of the queue
    pub fifo_size: usize,
    /// Number of underruns (queue ran empty)
    pub underrun: u32,
    /// Number of overruns
    pub overrun: u32,
    /// Number of dropped packets
    pub dropped: u32,
}

/// Transmitting radio device
///
/// Dropping the device closes it.
pub trait TxDevice: Send {
    /// Human readable device description
    fn description(&self) -> String;
    /// Reset device to its defaults
    fn reset(&mut self) -> Result<(), DeviceError>;
    /// Enable or disable a TX channel
    fn enable_channel(&mut self, channel: usize, enabled: bool) -> Result<(), DeviceError>;
    /// Set host sample rate and oversampling factor
    fn set_sample_rate(&mut self, host_hz: f64, oversample: u32) -> Result<(), DeviceError>;
    /// Get actual sample rates
    fn sample_rate(&mut self, channel: usize) -> Result<SampleRates, DeviceError>;
    /// Set analog filter bandwidth
    fn set_filter_bandwidth(&mut self, channel: usize, hz: f64) -> Result<(), DeviceError>;
    /// Set gain in dB
    fn set_gain_db(&mut self, channel: usize, db: u32) -> Result<(), DeviceError>;
    /// Get gain in dB
    fn gain_db(&mut self, channel: usize) -> Result<u32, DeviceError>;
    /// Set local oscillator frequency
    fn set_lo_frequency(&mut self, channel: usize, hz: f64) -> Result<(), DeviceError>;
    /// Get local oscillator frequency
    fn lo_frequency(&mut self, channel: usize) -> Result<f64, DeviceError>;
    /// Program the mixer (NCO) frequency and select it with the given
    /// direction
    fn set_mixer(&mut self, channel: usize, plan: MixerPlan) -> Result<(), DeviceError>;
    /// Run the built-in self-calibration
    fn calibrate(&mut self, channel: usize, bandwidth_hz: f64) -> Result<(), DeviceError>;
    /// Read a 16-bit register of the RF chip
    fn read_register(&mut self, address: u16) -> Result<u16, DeviceError>;
    /// Write a 16-bit register of the RF chip
    fn write_register(&mut self, address: u16, value: u16) -> Result<(), DeviceError>;
    /// Create a (not yet started) sample queue for `channel` holding
    /// `fifo_len` samples
    fn setup_queue(
        &mut self,
        channel: usize,
        fifo_len: usize,
    ) -> Result<Box<dyn TxQueue>, DeviceError>;
}

/// Bounded FIFO of samples towards the device
///
/// Samples are transmitted in the order they were sent. Only a single thread
/// may send.
pub trait TxQueue: Send {
    /// Start streaming
    fn start(&mut self) -> Result<(), DeviceError>;
    /// Hand `samples` to the device, blocking at most `timeout`
    fn send(&mut self, samples: &[IqSample], timeout: Duration) -> Result<(), DeviceError>;
    /// Query queue counters
    fn status(&mut self) -> Result<QueueStatus, DeviceError> {
        Err(DeviceError::Unsupported("queue status"))
    }
    /// Stop streaming
    fn stop(&mut self) -> Result<(), DeviceError>;
    /// Release the queue
    fn destroy(self: Box<Self>) -> Result<(), DeviceError>;
}

/// Description of an available device
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Backend name
    pub backend: &'static str,
    /// Backend specific description
    pub description: String,
}

/// List devices of all compiled-in backends
pub fn list() -> Result<Vec<DeviceInfo>, DeviceError> {
    #[allow(unused_mut)]
    let mut devices = sim::list();
    #[cfg(feature = "soapysdr")]
    devices.extend(soapysdr::list()?);
    Ok(devices)
}

/// Open device by name
///
/// `name` is either `sim` or `soapy`, optionally followed by `:` and
/// backend arguments: fault injection for the simulator (see
/// [`SimDevice::from_args`]) or SoapySDR device arguments (e.g.
/// `soapy:driver=lime`). Returns `Ok(None)` if the backend found no device.
///
/// [`SimDevice::from_args`]: sim::SimDevice::from_args
pub fn open(name: &str) -> Result<Option<Box<dyn TxDevice>>, DeviceError> {
    let (backend, args) = match name.split_once(':') {
        Some((backend, args)) => (backend, args),
        None => (name, ""),
    };
    match backend {
        "sim" => Ok(Some(Box::new(sim::SimDevice::from_args(args)?))),
        #[cfg(feature = "soapysdr")]
        "soapy" => Ok(soapysdr::SoapySdrDevice::open(args)?
            .map(|dev| Box::new(dev) as Box<dyn TxDevice>)),
        _ => Err(DeviceError::Driver(format!(
            "unknown or disabled backend {backend:?}"
        ))),
    }
}
