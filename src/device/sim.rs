//! Simulated transmitter
//!
//! [`SimDevice`] behaves like an ideal radio: every setting is stored and
//! read back exactly, registers are plain memory, and sending never blocks.
//! All calls are recorded in a shared [`Journal`], which remains accessible
//! after the device has been moved into (and dropped by) the streaming
//! engine.
//!
//! Failures can be injected per operation.

use super::*;
use crate::sync::Canceller;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Recorded device operation
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    /// [`TxDevice::reset`]
    Reset,
    /// [`TxDevice::enable_channel`]
    EnableChannel(bool),
    /// [`TxDevice::set_sample_rate`]
    SetSampleRate {
        /// Host rate
        host: f64,
        /// Oversampling factor
        oversample: u32,
    },
    /// [`TxDevice::set_filter_bandwidth`]
    SetFilterBandwidth(f64),
    /// [`TxDevice::set_gain_db`]
    SetGain(u32),
    /// [`TxDevice::set_lo_frequency`]
    SetLo(f64),
    /// [`TxDevice::set_mixer`]
    SetMixer(MixerPlan),
    /// [`TxDevice::calibrate`]
    Calibrate(f64),
    /// [`TxDevice::write_register`]
    WriteRegister {
        /// Register address
        address: u16,
        /// Written value
        value: u16,
    },
    /// [`TxDevice::setup_queue`]
    SetupQueue(usize),
    /// [`TxQueue::start`]
    StartQueue,
    /// [`TxQueue::send`] (index into [`Journal::sent`])
    Send(usize),
    /// [`TxQueue::stop`]
    StopQueue,
    /// [`TxQueue::destroy`]
    DestroyQueue,
    /// Device has been dropped
    Close,
}

/// Record of all operations on a [`SimDevice`] and its queue
#[derive(Clone, Debug, Default)]
pub struct Journal {
    /// Operations in the order they were made (failed ones included)
    pub calls: Vec<Call>,
    /// Contents of each sent buffer
    pub sent: Vec<Vec<IqSample>>,
}

impl Journal {
    /// Number of recorded calls matching `pred`
    pub fn count<P: FnMut(&Call) -> bool>(&self, mut pred: P) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }
    /// Position of first call matching `pred`
    pub fn position<P: FnMut(&Call) -> bool>(&self, pred: P) -> Option<usize> {
        self.calls.iter().position(pred)
    }
}

/// Shared handle to a [`Journal`]
#[derive(Clone, Debug, Default)]
pub struct JournalHandle(Arc<Mutex<Journal>>);

impl JournalHandle {
    /// Snapshot of the journal
    pub fn get(&self) -> Journal {
        self.0.lock().unwrap().clone()
    }
    fn record(&self, call: Call) {
        self.0.lock().unwrap().calls.push(call);
    }
    fn record_send(&self, samples: &[IqSample]) {
        let mut journal = self.0.lock().unwrap();
        let idx = journal.sent.len();
        journal.sent.push(samples.to_vec());
        journal.calls.push(Call::Send(idx));
    }
}

/// Error injection for [`SimDevice`]
#[derive(Debug, Default)]
struct Faults {
    failing: HashSet<&'static str>,
    fail_send_after: Option<usize>,
    timeout_send_after: Option<usize>,
    cancel_after: Option<(usize, Canceller)>,
}

impl Faults {
    fn check(&self, op: &'static str) -> Result<(), DeviceError> {
        if self.failing.contains(op) {
            Err(DeviceError::Driver(format!("simulated failure of {op}")))
        } else {
            Ok(())
        }
    }
}

/// Simulated transmitter
#[derive(Debug)]
pub struct SimDevice {
    journal: JournalHandle,
    faults: Faults,
    host_rate: f64,
    oversample: u32,
    rf_rate_override: Option<f64>,
    gain_db: u32,
    gain_after_calibration: Option<u32>,
    lo_frequency: f64,
    lo_offset: f64,
    registers: HashMap<u16, u16>,
}

/// Operations which can be made to fail with [`SimDevice::fail`]
pub const OPERATIONS: &[&str] = &[
    "reset",
    "enable_channel",
    "set_sample_rate",
    "sample_rate",
    "set_filter_bandwidth",
    "set_gain_db",
    "gain_db",
    "set_lo_frequency",
    "lo_frequency",
    "set_mixer",
    "calibrate",
    "read_register",
    "write_register",
    "setup_queue",
    "start",
    "send",
    "stop",
    "destroy",
];

/// Devices provided by this backend
pub fn list() -> Vec<DeviceInfo> {
    vec![DeviceInfo {
        backend: "sim",
        description: "simulated transmitter".to_string(),
    }]
}

impl SimDevice {
    /// Create device with all settings zeroed
    pub fn new() -> Self {
        Self {
            journal: JournalHandle::default(),
            faults: Faults::default(),
            host_rate: 0.0,
            oversample: 1,
            rf_rate_override: None,
            gain_db: 0,
            gain_after_calibration: None,
            lo_frequency: 0.0,
            lo_offset: 0.0,
            registers: HashMap::new(),
        }
    }
    /// Handle to the journal of this device
    pub fn journal(&self) -> JournalHandle {
        self.journal.clone()
    }
    /// Let operation `op` fail
    ///
    /// `op` is the name of the trait method, e.g. `"set_mixer"` or
    /// `"send"`.
    pub fn fail(mut self, op: &'static str) -> Self {
        self.faults.failing.insert(op);
        self
    }
    /// Let every send after the first `count` sends fail
    pub fn fail_send_after(mut self, count: usize) -> Self {
        self.faults.fail_send_after = Some(count);
        self
    }
    /// Let every send after the first `count` sends time out
    pub fn timeout_send_after(mut self, count: usize) -> Self {
        self.faults.timeout_send_after = Some(count);
        self
    }
    /// Create device with faults given as comma separated `key=value`
    /// pairs
    ///
    /// Keys are `fail` (one of [`OPERATIONS`]), `fail_send_after`, and
    /// `timeout_send_after`, e.g. `fail=set_mixer,timeout_send_after=10`.
    pub fn from_args(args: &str) -> Result<Self, DeviceError> {
        let mut dev = Self::new();
        for pair in args.split(',').filter(|pair| !pair.is_empty()) {
            let invalid = || DeviceError::Driver(format!("invalid simulator argument {pair:?}"));
            let (key, value) = pair.split_once('=').ok_or_else(invalid)?;
            let count = || value.parse::<usize>().map_err(|_| invalid());
            dev = match key {
                "fail" => {
                    let op = OPERATIONS
                        .iter()
                        .copied()
                        .find(|op| *op == value)
                        .ok_or_else(invalid)?;
                    dev.fail(op)
                }
                "fail_send_after" => dev.fail_send_after(count()?),
                "timeout_send_after" => dev.timeout_send_after(count()?),
                _ => return Err(invalid()),
            };
        }
        Ok(dev)
    }
    /// Drop `canceller` once `count` sends have succeeded
    pub fn cancel_after(mut self, count: usize, canceller: Canceller) -> Self {
        self.faults.cancel_after = Some((count, canceller));
        self
    }
    /// Report `hz` as RF sample rate regardless of the requested rate
    pub fn with_rf_rate(mut self, hz: f64) -> Self {
        self.rf_rate_override = Some(hz);
        self
    }
    /// Let the synthesizer settle `hz` off every requested LO frequency
    pub fn with_lo_offset(mut self, hz: f64) -> Self {
        self.lo_offset = hz;
        self
    }
    /// Let calibration change the gain to `db`
    pub fn with_calibration_gain(mut self, db: u32) -> Self {
        self.gain_after_calibration = Some(db);
        self
    }
}

impl Default for SimDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SimDevice {
    fn drop(&mut self) {
        self.journal.record(Call::Close);
    }
}

impl TxDevice for SimDevice {
    fn description(&self) -> String {
        "simulated transmitter".to_string()
    }
    fn reset(&mut self) -> Result<(), DeviceError> {
        self.journal.record(Call::Reset);
        self.faults.check("reset")?;
        self.registers.clear();
        self.gain_db = 0;
        Ok(())
    }
    fn enable_channel(&mut self, _channel: usize, enabled: bool) -> Result<(), DeviceError> {
        self.journal.record(Call::EnableChannel(enabled));
        self.faults.check("enable_channel")
    }
    fn set_sample_rate(&mut self, host_hz: f64, oversample: u32) -> Result<(), DeviceError> {
        self.journal.record(Call::SetSampleRate {
            host: host_hz,
            oversample,
        });
        self.faults.check("set_sample_rate")?;
        self.host_rate = host_hz;
        self.oversample = oversample;
        Ok(())
    }
    fn sample_rate(&mut self, _channel: usize) -> Result<SampleRates, DeviceError> {
        self.faults.check("sample_rate")?;
        Ok(SampleRates {
            host: self.host_rate,
            rf: self
                .rf_rate_override
                .unwrap_or(self.host_rate * self.oversample as f64),
        })
    }
    fn set_filter_bandwidth(&mut self, _channel: usize, hz: f64) -> Result<(), DeviceError> {
        self.journal.record(Call::SetFilterBandwidth(hz));
        self.faults.check("set_filter_bandwidth")
    }
    fn set_gain_db(&mut self, _channel: usize, db: u32) -> Result<(), DeviceError> {
        self.journal.record(Call::SetGain(db));
        self.faults.check("set_gain_db")?;
        self.gain_db = db;
        Ok(())
    }
    fn gain_db(&mut self, _channel: usize) -> Result<u32, DeviceError> {
        self.faults.check("gain_db")?;
        Ok(self.gain_db)
    }
    fn set_lo_frequency(&mut self, _channel: usize, hz: f64) -> Result<(), DeviceError> {
        self.journal.record(Call::SetLo(hz));
        self.faults.check("set_lo_frequency")?;
        self.lo_frequency = hz + self.lo_offset;
        Ok(())
    }
    fn lo_frequency(&mut self, _channel: usize) -> Result<f64, DeviceError> {
        self.faults.check("lo_frequency")?;
        Ok(self.lo_frequency)
    }
    fn set_mixer(&mut self, _channel: usize, plan: MixerPlan) -> Result<(), DeviceError> {
        self.journal.record(Call::SetMixer(plan));
        self.faults.check("set_mixer")
    }
    fn calibrate(&mut self, _channel: usize, bandwidth_hz: f64) -> Result<(), DeviceError> {
        self.journal.record(Call::Calibrate(bandwidth_hz));
        if let Some(db) = self.gain_after_calibration {
            self.gain_db = db;
        }
        self.faults.check("calibrate")
    }
    fn read_register(&mut self, address: u16) -> Result<u16, DeviceError> {
        self.faults.check("read_register")?;
        Ok(self.registers.get(&address).copied().unwrap_or(0))
    }
    fn write_register(&mut self, address: u16, value: u16) -> Result<(), DeviceError> {
        self.journal.record(Call::WriteRegister { address, value });
        self.faults.check("write_register")?;
        self.registers.insert(address, value);
        Ok(())
    }
    fn setup_queue(
        &mut self,
        _channel: usize,
        fifo_len: usize,
    ) -> Result<Box<dyn TxQueue>, DeviceError> {
        self.journal.record(Call::SetupQueue(fifo_len));
        self.faults.check("setup_queue")?;
        Ok(Box::new(SimQueue {
            journal: self.journal.clone(),
            faults: Faults {
                failing: self.faults.failing.clone(),
                fail_send_after: self.faults.fail_send_after,
                timeout_send_after: self.faults.timeout_send_after,
                cancel_after: self.faults.cancel_after.take(),
            },
            fifo_len,
            started: false,
            sends: 0,
            status: QueueStatus {
                fifo_size: fifo_len,
                ..Default::default()
            },
        }))
    }
}

/// Queue of a [`SimDevice`]
#[derive(Debug)]
pub struct SimQueue {
    journal: JournalHandle,
    faults: Faults,
    fifo_len: usize,
    started: bool,
    sends: usize,
    status: QueueStatus,
}

impl TxQueue for SimQueue {
    fn start(&mut self) -> Result<(), DeviceError> {
        self.journal.record(Call::StartQueue);
        self.faults.check("start")?;
        self.started = true;
        Ok(())
    }
    fn send(&mut self, samples: &[IqSample], timeout: Duration) -> Result<(), DeviceError> {
        if !self.started {
            return Err(DeviceError::Driver("queue not started".to_string()));
        }
        self.faults.check("send")?;
        if let Some(limit) = self.faults.fail_send_after {
            if self.sends >= limit {
                return Err(DeviceError::Driver("simulated send failure".to_string()));
            }
        }
        if let Some(limit) = self.faults.timeout_send_after {
            if self.sends >= limit {
                return Err(DeviceError::Timeout(timeout));
            }
        }
        self.journal.record_send(samples);
        self.sends += 1;
        self.status.fifo_filled = samples.len().min(self.fifo_len);
        if let Some((count, _)) = &self.faults.cancel_after {
            if self.sends >= *count {
                self.faults.cancel_after = None;
            }
        }
        Ok(())
    }
    fn status(&mut self) -> Result<QueueStatus, DeviceError> {
        Ok(self.status)
    }
    fn stop(&mut self) -> Result<(), DeviceError> {
        self.journal.record(Call::StopQueue);
        self.faults.check("stop")?;
        self.started = false;
        Ok(())
    }
    fn destroy(self: Box<Self>) -> Result<(), DeviceError> {
        self.journal.record(Call::DestroyQueue);
        self.faults.check("destroy")
    }
}
