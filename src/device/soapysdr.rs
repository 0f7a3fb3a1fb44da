//! Interface to RF hardware through SoapySDR (using the [`soapysdr`] crate)
//!
//! SoapySDR provides no access to the RF chip's registers and no generic
//! calibration call, so [`TxDevice::read_register`],
//! [`TxDevice::write_register`], and [`TxDevice::calibrate`] report
//! [`DeviceError::Unsupported`]. The oversampling factor is not exposed
//! either; the driver picks it. [`TxDevice::sample_rate`] derives the RF
//! rate from the tuning range of the NCO (the `"BB"` component), which spans
//! half the RF rate in each direction. Drivers which report no such range
//! are assumed to run the NCO at the host rate.

use super::*;
use crate::numbers::Complex;

use log::debug;
use soapysdr::Direction::Tx;

impl From<soapysdr::Error> for DeviceError {
    fn from(err: soapysdr::Error) -> Self {
        DeviceError::Driver(err.to_string())
    }
}

fn describe(args: &soapysdr::Args) -> String {
    let driver = args.get("driver").unwrap_or("unknown driver");
    match args.get("label") {
        Some(label) => format!("{label} ({driver})"),
        None => driver.to_string(),
    }
}

/// Devices found by SoapySDR
pub fn list() -> Result<Vec<DeviceInfo>, DeviceError> {
    Ok(soapysdr::enumerate("")?
        .iter()
        .map(|args| DeviceInfo {
            backend: "soapy",
            description: describe(args),
        })
        .collect())
}

/// [`TxDevice`] wrapping a [`soapysdr::Device`]
pub struct SoapySdrDevice {
    device: soapysdr::Device,
    description: String,
}

impl SoapySdrDevice {
    /// Open first device matching `args` (SoapySDR argument string)
    ///
    /// Returns `Ok(None)` if no device matches.
    pub fn open(args: &str) -> Result<Option<Self>, DeviceError> {
        let Some(found) = soapysdr::enumerate(args)?.into_iter().next() else {
            return Ok(None);
        };
        let description = describe(&found);
        debug!("opening SoapySDR device {description}");
        let device = soapysdr::Device::new(found)?;
        if device.num_channels(Tx)? == 0 {
            return Err(DeviceError::Driver(format!(
                "{description} has no TX channel"
            )));
        }
        Ok(Some(Self {
            device,
            description,
        }))
    }
}

impl TxDevice for SoapySdrDevice {
    fn description(&self) -> String {
        self.description.clone()
    }
    fn reset(&mut self) -> Result<(), DeviceError> {
        debug!("SoapySDR has no device reset, keeping driver defaults");
        Ok(())
    }
    fn enable_channel(&mut self, channel: usize, enabled: bool) -> Result<(), DeviceError> {
        // channels are enabled by activating a stream
        debug!("channel {channel} enabled={enabled} (implicit in SoapySDR)");
        Ok(())
    }
    fn set_sample_rate(&mut self, host_hz: f64, oversample: u32) -> Result<(), DeviceError> {
        for channel in 0..self.device.num_channels(Tx)? {
            self.device.set_sample_rate(Tx, channel, host_hz)?;
        }
        debug!("oversampling {oversample} requested, chosen by driver");
        Ok(())
    }
    fn sample_rate(&mut self, channel: usize) -> Result<SampleRates, DeviceError> {
        let host = self.device.sample_rate(Tx, channel)?;
        let nco_max = self
            .device
            .component_frequency_range(Tx, channel, "BB")?
            .iter()
            .map(|range| range.maximum)
            .fold(0.0, f64::max);
        let rf = if nco_max > 0.0 { 2.0 * nco_max } else { host };
        Ok(SampleRates { host, rf })
    }
    fn set_filter_bandwidth(&mut self, channel: usize, hz: f64) -> Result<(), DeviceError> {
        Ok(self.device.set_bandwidth(Tx, channel, hz)?)
    }
    fn set_gain_db(&mut self, channel: usize, db: u32) -> Result<(), DeviceError> {
        Ok(self.device.set_gain(Tx, channel, db as f64)?)
    }
    fn gain_db(&mut self, channel: usize) -> Result<u32, DeviceError> {
        Ok(self.device.gain(Tx, channel)?.round().max(0.0) as u32)
    }
    fn set_lo_frequency(&mut self, channel: usize, hz: f64) -> Result<(), DeviceError> {
        Ok(self
            .device
            .set_component_frequency(Tx, channel, "RF", hz, "")?)
    }
    fn lo_frequency(&mut self, channel: usize) -> Result<f64, DeviceError> {
        Ok(self.device.component_frequency(Tx, channel, "RF")?)
    }
    fn set_mixer(&mut self, channel: usize, plan: MixerPlan) -> Result<(), DeviceError> {
        // the "BB" component is the NCO, the sign selects the direction
        Ok(self
            .device
            .set_component_frequency(Tx, channel, "BB", plan.offset(), "")?)
    }
    fn calibrate(&mut self, _channel: usize, _bandwidth_hz: f64) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("calibration"))
    }
    fn read_register(&mut self, _address: u16) -> Result<u16, DeviceError> {
        Err(DeviceError::Unsupported("register access"))
    }
    fn write_register(&mut self, _address: u16, _value: u16) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("register access"))
    }
    fn setup_queue(
        &mut self,
        channel: usize,
        _fifo_len: usize,
    ) -> Result<Box<dyn TxQueue>, DeviceError> {
        let stream = self.device.tx_stream::<Complex<i16>>(&[channel])?;
        Ok(Box::new(SoapySdrQueue {
            stream,
            active: false,
        }))
    }
}

/// [`TxQueue`] wrapping a [`soapysdr::TxStream`]
pub struct SoapySdrQueue {
    stream: soapysdr::TxStream<Complex<i16>>,
    active: bool,
}

impl TxQueue for SoapySdrQueue {
    fn start(&mut self) -> Result<(), DeviceError> {
        self.stream.activate(None)?;
        self.active = true;
        Ok(())
    }
    fn send(&mut self, samples: &[IqSample], timeout: Duration) -> Result<(), DeviceError> {
        let timeout_us = i64::try_from(timeout.as_micros()).unwrap_or(i64::MAX);
        Ok(self.stream.write_all(&[samples], None, false, timeout_us)?)
    }
    fn stop(&mut self) -> Result<(), DeviceError> {
        if self.active {
            self.stream.deactivate(None)?;
            self.active = false;
        }
        Ok(())
    }
    fn destroy(self: Box<Self>) -> Result<(), DeviceError> {
        Ok(())
    }
}
