//! Streaming engine
//!
//! A [`Transmitter`] owns a [`TxDevice`] and, once configured, its
//! [`TxQueue`]. [`Transmitter::configure`] applies a [`TxConfig`] to the
//! device, [`Transmitter::run`] keeps the queue fed until cancelled, and
//! [`Transmitter::shutdown`] (or dropping the transmitter) mutes the output
//! and releases all resources.
//!
//! Releasing happens on every exit path, including failures in the middle of
//! configuration: one buffer of silence is sent (if streaming was started),
//! then the queue is stopped and destroyed, the channel is disabled, and the
//! device is closed. A failing step is logged and does not keep the
//! following steps from running.
//!
//! ```
//! use radiotx::device::sim::SimDevice;
//! use radiotx::sync;
//! use radiotx::{Transmitter, TxConfig};
//!
//! let (canceller, cancellation) = sync::channel();
//! let device = SimDevice::new().cancel_after(3, canceller);
//! let mut tx = Transmitter::configure(Box::new(device), TxConfig::default()).unwrap();
//! tx.run(&cancellation).unwrap();
//! let stats = tx.shutdown();
//! assert_eq!(stats.buffers, 4);
//! ```

use crate::config::TxConfig;
use crate::device::correctors::TxCorrectors;
use crate::device::{DeviceError, SampleRates, TxDevice, TxQueue};
use crate::error::{ConfigError, DeviceContext, Error, Result};
use crate::metering::{level_dbfs, peak};
use crate::planner::*;
use crate::ramp::GainRamp;
use crate::samples::SampleBuffer;
use crate::sync::Cancellation;
use crate::waveform::{Waveform, WaveformGenerator};

use log::{debug, error, info, warn};

use std::fmt;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// Pause between two sends while dwelling on a sweep step
pub const SWEEP_PAUSE: Duration = Duration::from_millis(1);

/// Counters of sent data
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Number of buffers handed to the device (including the final silence)
    pub buffers: u64,
    /// Number of samples handed to the device
    pub samples: u64,
}

/// State of the transmit chain as reported by the device
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// Sample rates
    pub rates: SampleRates,
    /// LO frequency
    pub lo_frequency: f64,
    /// Current gain
    pub gain_db: u32,
    /// Requested mixer setting
    pub mixer: MixerPlan,
    /// Carrier frequency (read-back LO shifted by the mixer)
    pub center_frequency: f64,
    /// Frequency of a single tone ([`Waveform::Tone`]), else the carrier
    pub tone_frequency: f64,
    /// Amplitude as fraction of full scale
    pub tone_scale: f64,
    /// Correctors, if the backend provides register access
    pub correctors: Option<TxCorrectors>,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "host {:.6} Msps, RF {:.6} Msps, LO {:.6} MHz, mixer {:.6} MHz {}, \
             center {:.6} MHz, tone {:.6} MHz, gain {} dB, scale {:.2}",
            self.rates.host / 1e6,
            self.rates.rf / 1e6,
            self.lo_frequency / 1e6,
            self.mixer.frequency / 1e6,
            self.mixer.direction.name(),
            self.center_frequency / 1e6,
            self.tone_frequency / 1e6,
            self.gain_db,
            self.tone_scale,
        )?;
        if let Some(correctors) = &self.correctors {
            write!(f, "; correctors {correctors}")?;
        }
        Ok(())
    }
}

/// Transmit streaming engine
pub struct Transmitter {
    device: Box<dyn TxDevice>,
    queue: Option<Box<dyn TxQueue>>,
    config: TxConfig,
    rates: SampleRates,
    lo_frequency: f64,
    gain_db: u32,
    channel_enabled: bool,
    streaming: bool,
    drained: bool,
    stats: Stats,
}

impl Transmitter {
    /// Validate `config`, apply it to `device`, and start the sample queue
    ///
    /// Nothing is sent to the device if validation fails. If a device call
    /// fails, everything acquired so far is released before the error is
    /// returned. A failing calibration is logged only.
    pub fn configure(device: Box<dyn TxDevice>, config: TxConfig) -> Result<Self> {
        config.validate()?;
        info!("configuring {}", device.description());
        let mut tx = Self {
            device,
            queue: None,
            rates: SampleRates {
                host: config.host_sample_rate,
                rf: config.rf_sample_rate(),
            },
            lo_frequency: config.lo_frequency,
            gain_db: config.initial_gain_db(),
            config,
            channel_enabled: false,
            streaming: false,
            drained: false,
            stats: Stats::default(),
        };
        tx.setup()?;
        Ok(tx)
    }
    fn setup(&mut self) -> Result<()> {
        let ch = self.config.channel;
        self.device.reset().op("device reset")?;
        self.device.enable_channel(ch, true).op("enable channel")?;
        self.channel_enabled = true;
        self.device
            .set_sample_rate(self.config.host_sample_rate, self.config.oversample)
            .op("set sample rate")?;
        self.rates = self.device.sample_rate(ch).op("get sample rate")?;
        info!(
            "sample rate: host {:.6} Msps, RF {:.6} Msps",
            self.rates.host / 1e6,
            self.rates.rf / 1e6
        );
        // actual RF rate may differ from the requested one
        let ceiling = mixer_ceiling(self.rates.rf);
        if self.config.mixer.frequency > ceiling {
            return Err(ConfigError::MixerOutOfRange {
                mixer_hz: self.config.mixer.frequency,
                ceiling_hz: ceiling,
            }
            .into());
        }
        self.device
            .set_filter_bandwidth(ch, self.config.filter_bandwidth)
            .op("set filter bandwidth")?;
        info!(
            "filter bandwidth: {:.3} MHz (requested)",
            self.config.filter_bandwidth / 1e6
        );
        self.device
            .set_gain_db(ch, self.config.initial_gain_db())
            .op("set gain")?;
        self.gain_db = self.device.gain_db(ch).op("get gain")?;
        info!("gain: {} dB", self.gain_db);
        self.device
            .set_lo_frequency(ch, self.config.lo_frequency)
            .op("set LO frequency")?;
        self.lo_frequency = self.device.lo_frequency(ch).op("get LO frequency")?;
        info!("LO: {:.6} MHz", self.lo_frequency / 1e6);
        // sweep steps are planned against the actual LO
        if let Waveform::Sweep(sweep) = &self.config.waveform {
            sweep.validate(self.lo_frequency, ceiling)?;
        }
        self.device
            .set_mixer(ch, self.config.mixer)
            .op("set mixer")?;
        info!(
            "mixer: {:.6} MHz {}, RF {:.6} MHz",
            self.config.mixer.frequency / 1e6,
            self.config.mixer.direction.name(),
            effective_rf(self.lo_frequency, self.config.mixer) / 1e6
        );
        info!("configured: {}", self.snapshot());
        if self.config.calibrate {
            self.calibrate()?;
        }
        let overrides = self.config.correctors;
        if !overrides.is_empty() {
            overrides
                .apply(self.device.as_mut(), ch)
                .op("override correctors")?;
            info!("after corrector override: {}", self.snapshot());
        }
        let mut queue = self
            .device
            .setup_queue(ch, self.config.fifo_len)
            .op("setup queue")?;
        let started = queue.start();
        self.queue = Some(queue);
        started.op("start queue")?;
        self.streaming = true;
        info!(
            "streaming {} waveform, {} samples per buffer",
            self.config.waveform.name(),
            self.config.buffer_len
        );
        Ok(())
    }
    fn calibrate(&mut self) -> Result<()> {
        let ch = self.config.channel;
        let bandwidth = self.config.calibration_bandwidth();
        match self.device.calibrate(ch, bandwidth) {
            Ok(()) => info!("calibration at {:.3} MHz succeeded", bandwidth / 1e6),
            Err(err) => warn!(
                "calibration at {:.3} MHz failed, continuing: {}",
                bandwidth / 1e6,
                err
            ),
        }
        // calibration may leave gain and LO changed
        let gain_db = self.device.gain_db(ch).op("get gain")?;
        if gain_db != self.gain_db {
            warn!("gain changed by calibration: {} dB -> {} dB", self.gain_db, gain_db);
        }
        self.gain_db = gain_db;
        self.lo_frequency = self.device.lo_frequency(ch).op("get LO frequency")?;
        info!("after calibration: {}", self.snapshot());
        Ok(())
    }
    /// Query current state of the transmit chain
    pub fn snapshot(&mut self) -> Snapshot {
        let correctors = match TxCorrectors::read(self.device.as_mut(), self.config.channel) {
            Ok(correctors) => Some(correctors),
            Err(err) => {
                debug!("correctors not readable: {err}");
                None
            }
        };
        let center_frequency = effective_rf(self.lo_frequency, self.config.mixer);
        Snapshot {
            rates: self.rates,
            lo_frequency: self.lo_frequency,
            gain_db: self.gain_db,
            mixer: self.config.mixer,
            center_frequency,
            tone_frequency: center_frequency + self.config.waveform.tone_offset(),
            tone_scale: self.config.tone_scale,
            correctors,
        }
    }
    /// Configuration in use
    pub fn config(&self) -> &TxConfig {
        &self.config
    }
    /// Sample rates read back from the device
    pub fn sample_rates(&self) -> SampleRates {
        self.rates
    }
    /// LO frequency read back from the device
    pub fn lo_frequency(&self) -> f64 {
        self.lo_frequency
    }
    /// Gain most recently read back or applied
    pub fn gain_db(&self) -> u32 {
        self.gain_db
    }
    /// Carrier frequency (read-back LO shifted by the configured mixer)
    pub fn center_frequency(&self) -> f64 {
        effective_rf(self.lo_frequency, self.config.mixer)
    }
    /// Stream until `cancellation` is raised
    ///
    /// Cancellation is checked once per buffer. A failing send ends
    /// streaming with [`Error::Stream`]; it is not retried. In either case
    /// the transmitter should be [shut down] afterwards (dropping it has the
    /// same effect).
    ///
    /// [shut down]: Transmitter::shutdown
    pub fn run(&mut self, cancellation: &Cancellation) -> Result<Stats> {
        if !self.streaming {
            return Err(Error::Stream(DeviceError::Driver(
                "queue not started".to_string(),
            )));
        }
        let mut buffer = SampleBuffer::silence(self.config.buffer_len, self.rates.host);
        let mut generator = WaveformGenerator::new(
            &self.config.waveform,
            self.config.tone_scale,
            self.rates.host,
        );
        if generator.is_static() {
            generator.fill(&mut buffer);
            if buffer.is_silent() {
                warn!("amplitude {} rounds to silence", self.config.tone_scale);
            }
        }
        info!(
            "buffer level: peak {}, {:.2} dBFS, bound {:.2} of full scale",
            peak(&buffer),
            level_dbfs(&buffer),
            generator.peak()
        );
        let mut ramp = self
            .config
            .gain_ramp
            .as_ref()
            .map(|ramp| GainRamp::new(ramp, self.config.gain_db, Instant::now()));
        if let Some(ramp) = ramp.as_ref().filter(|ramp| ramp.is_active()) {
            info!(
                "ramping gain from {} dB to {} dB in {} steps",
                ramp.last_applied(),
                ramp.target(),
                ramp.steps()
            );
        }
        let result = match self.config.waveform.clone() {
            Waveform::Sweep(sweep) => self.sweep(&sweep, &buffer, &mut ramp, cancellation),
            _ => self.stream(&mut generator, &mut buffer, &mut ramp, cancellation),
        };
        match &result {
            Ok(()) => info!("cancelled after {} buffers", self.stats.buffers),
            Err(err) => error!("streaming stopped: {err}"),
        }
        result.map(|()| self.stats)
    }
    fn stream(
        &mut self,
        generator: &mut WaveformGenerator,
        buffer: &mut SampleBuffer,
        ramp: &mut Option<GainRamp>,
        cancellation: &Cancellation,
    ) -> Result<()> {
        while !cancellation.is_cancelled() {
            if !generator.is_static() {
                generator.fill(buffer);
            }
            self.send(buffer)?;
            self.tick_ramp(ramp);
        }
        Ok(())
    }
    fn sweep(
        &mut self,
        sweep: &SweepConfig,
        buffer: &SampleBuffer,
        ramp: &mut Option<GainRamp>,
        cancellation: &Cancellation,
    ) -> Result<()> {
        let ch = self.config.channel;
        let ceiling = mixer_ceiling(self.rates.rf);
        // calibration may have moved the LO since setup
        sweep.validate(self.lo_frequency, ceiling)?;
        let sends_per_step = (sweep.dwell.as_secs_f64() / buffer.duration().as_secs_f64()
            - 1e-9)
            .ceil()
            .max(1.0) as u64;
        info!(
            "sweeping {:.6} to {:.6} MHz in {} steps of {:.6} MHz, {} buffers per step",
            sweep.start / 1e6,
            sweep.stop / 1e6,
            sweep.len(),
            sweep.step / 1e6,
            sends_per_step
        );
        for (step, rf) in sweep.frequencies().enumerate() {
            if cancellation.is_cancelled() {
                break;
            }
            let plan = plan_mixer(rf, self.lo_frequency, ceiling)?;
            self.device.set_mixer(ch, plan).op("set mixer")?;
            self.config.mixer = plan;
            info!(
                "sweep step {}: RF {:.6} MHz (mixer {:.6} MHz {})",
                step % sweep.len(),
                effective_rf(self.lo_frequency, plan) / 1e6,
                plan.frequency / 1e6,
                plan.direction.name()
            );
            for _ in 0..sends_per_step {
                if cancellation.is_cancelled() {
                    break;
                }
                self.send(buffer)?;
                self.tick_ramp(ramp);
                sleep(SWEEP_PAUSE);
            }
        }
        Ok(())
    }
    fn send(&mut self, buffer: &SampleBuffer) -> Result<()> {
        let queue = self
            .queue
            .as_mut()
            .ok_or_else(|| Error::Stream(DeviceError::Driver("queue closed".to_string())))?;
        queue
            .send(buffer, self.config.send_timeout)
            .map_err(Error::Stream)?;
        self.stats.buffers += 1;
        self.stats.samples += buffer.len() as u64;
        Ok(())
    }
    fn tick_ramp(&mut self, ramp: &mut Option<GainRamp>) {
        let Some(active) = ramp.as_mut() else {
            return;
        };
        let ch = self.config.channel;
        let device = &mut self.device;
        active.poll(Instant::now(), |db| device.set_gain_db(ch, db));
        self.gain_db = active.last_applied();
        if !active.is_active() {
            *ramp = None;
        }
    }
    /// Mute, release the queue, and disable the channel
    ///
    /// The device itself is closed when the transmitter is dropped. Returns
    /// the final counters.
    pub fn shutdown(mut self) -> Stats {
        self.drain();
        self.stats
    }
    fn drain(&mut self) {
        if self.drained {
            return;
        }
        self.drained = true;
        let ch = self.config.channel;
        if let Some(mut queue) = self.queue.take() {
            if self.streaming {
                let silence = SampleBuffer::silence(self.config.buffer_len, self.rates.host);
                match queue.send(&silence, self.config.send_timeout) {
                    Ok(()) => {
                        self.stats.buffers += 1;
                        self.stats.samples += silence.len() as u64;
                        info!("sent silence");
                    }
                    Err(err) => warn!("sending silence failed: {err}"),
                }
                match queue.status() {
                    Ok(status) => info!(
                        "queue: {}/{} samples filled, {} underruns, {} overruns, {} dropped",
                        status.fifo_filled,
                        status.fifo_size,
                        status.underrun,
                        status.overrun,
                        status.dropped
                    ),
                    Err(err) => debug!("queue status unavailable: {err}"),
                }
            }
            self.streaming = false;
            match queue.stop() {
                Ok(()) => info!("queue stopped"),
                Err(err) => warn!("stopping queue failed: {err}"),
            }
            match queue.destroy() {
                Ok(()) => info!("queue destroyed"),
                Err(err) => warn!("destroying queue failed: {err}"),
            }
        }
        if self.channel_enabled {
            self.channel_enabled = false;
            match self.device.enable_channel(ch, false) {
                Ok(()) => info!("channel {ch} disabled"),
                Err(err) => warn!("disabling channel {ch} failed: {err}"),
            }
        }
        info!(
            "sent {} buffers ({} samples)",
            self.stats.buffers, self.stats.samples
        );
    }
}

impl Drop for Transmitter {
    fn drop(&mut self) {
        self.drain();
        info!("closing device");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GainRampConfig;
    use crate::device::correctors::{CorrectorOverrides, REG_BYPASS};
    use crate::device::sim::{Call, SimDevice};
    use crate::numbers::IqSample;
    use crate::sync;
    use crate::waveform::RotationConvention;

    fn small(config: TxConfig) -> TxConfig {
        TxConfig {
            buffer_len: 256,
            ..config
        }
    }

    #[test]
    fn test_constant_tone() {
        let (canceller, cancellation) = sync::channel();
        let dev = SimDevice::new().cancel_after(2, canceller);
        let journal = dev.journal();
        let mut tx = Transmitter::configure(Box::new(dev), small(TxConfig::default())).unwrap();
        assert_eq!(tx.center_frequency(), 15e6);
        assert_eq!(tx.snapshot().center_frequency, 15e6);
        tx.run(&cancellation).unwrap();
        drop(tx);
        let journal = journal.get();
        assert_eq!(journal.sent.len(), 3);
        for buf in &journal.sent[0..2] {
            assert_eq!(buf.len(), 256);
            assert!(buf.iter().all(|&s| s == IqSample::new(22937, 0)));
        }
    }
    #[test]
    fn test_cancellation_drains() {
        const N: usize = 5;
        let (canceller, cancellation) = sync::channel();
        let dev = SimDevice::new().cancel_after(N, canceller);
        let journal = dev.journal();
        let config = small(TxConfig {
            waveform: Waveform::Tone {
                frequency: 100e3,
                convention: RotationConvention::Positive,
            },
            ..Default::default()
        });
        let mut tx = Transmitter::configure(Box::new(dev), config).unwrap();
        let stats = tx.run(&cancellation).unwrap();
        assert_eq!(stats.buffers, N as u64);
        let stats = tx.shutdown();
        assert_eq!(stats.buffers, N as u64 + 1);
        let journal = journal.get();
        assert_eq!(journal.sent.len(), N + 1);
        assert!(journal.sent[..N]
            .iter()
            .all(|buf| buf.iter().any(|s| s.re != 0 || s.im != 0)));
        assert!(journal.sent[N].iter().all(|s| s.re == 0 && s.im == 0));
        let last_send = journal
            .calls
            .iter()
            .rposition(|c| matches!(c, Call::Send(_)))
            .unwrap();
        let tail: Vec<&Call> = journal.calls[last_send + 1..].iter().collect();
        assert_eq!(
            tail,
            vec![
                &Call::StopQueue,
                &Call::DestroyQueue,
                &Call::EnableChannel(false),
                &Call::Close
            ]
        );
    }
    #[test]
    fn test_mixer_out_of_range_touches_nothing() {
        let dev = SimDevice::new();
        let journal = dev.journal();
        let mut config = TxConfig {
            oversample: 8,
            ..Default::default()
        };
        assert!(config.tune_to(5e6).is_err());
        config.mixer = MixerPlan::new(25e6, true);
        let err = Transmitter::configure(Box::new(dev), config).err().unwrap();
        assert!(err.is_config());
        assert_eq!(journal.get().calls, vec![Call::Close]);
    }
    #[test]
    fn test_mixer_ceiling_from_read_back_rate() {
        let dev = SimDevice::new().with_rf_rate(20e6);
        let journal = dev.journal();
        let err = Transmitter::configure(Box::new(dev), TxConfig::default())
            .err()
            .unwrap();
        assert!(err.is_config());
        let journal = journal.get();
        assert_eq!(journal.count(|c| matches!(c, Call::SetMixer(_))), 0);
        assert_eq!(journal.count(|c| matches!(c, Call::SetupQueue(_))), 0);
        assert_eq!(journal.count(|c| *c == Call::EnableChannel(false)), 1);
    }
    #[test]
    fn test_send_failure_drains() {
        let dev = SimDevice::new().fail_send_after(3);
        let journal = dev.journal();
        let mut tx = Transmitter::configure(Box::new(dev), small(TxConfig::default())).unwrap();
        let err = tx.run(&Cancellation::never()).err().unwrap();
        assert!(matches!(err, Error::Stream(_)));
        drop(tx);
        let journal = journal.get();
        assert_eq!(journal.sent.len(), 3);
        assert_eq!(journal.count(|c| *c == Call::StopQueue), 1);
        assert_eq!(journal.count(|c| *c == Call::DestroyQueue), 1);
        assert_eq!(journal.count(|c| *c == Call::EnableChannel(false)), 1);
        assert_eq!(journal.calls.last(), Some(&Call::Close));
    }
    #[test]
    fn test_calibration_failure_is_not_fatal() {
        let dev = SimDevice::new().fail("calibrate").with_calibration_gain(31);
        let journal = dev.journal();
        let config = TxConfig {
            calibrate: true,
            calibration_bandwidth: Some(10e6),
            ..Default::default()
        };
        let tx = Transmitter::configure(Box::new(dev), config).unwrap();
        assert_eq!(tx.gain_db(), 31);
        drop(tx);
        assert_eq!(
            journal.get().count(|c| *c == Call::Calibrate(10e6)),
            1
        );
    }
    #[test]
    fn test_setup_failure_releases() {
        let dev = SimDevice::new().fail("set_lo_frequency");
        let journal = dev.journal();
        let err = Transmitter::configure(Box::new(dev), TxConfig::default())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::Device {
                op: "set LO frequency",
                ..
            }
        ));
        let journal = journal.get();
        assert_eq!(journal.count(|c| matches!(c, Call::SetupQueue(_))), 0);
        let tail = &journal.calls[journal.calls.len() - 2..];
        assert_eq!(tail, &[Call::EnableChannel(false), Call::Close]);
    }
    #[test]
    fn test_start_failure_destroys_queue() {
        let dev = SimDevice::new().fail("start");
        let journal = dev.journal();
        assert!(Transmitter::configure(Box::new(dev), TxConfig::default()).is_err());
        let journal = journal.get();
        assert!(journal.sent.is_empty());
        assert_eq!(journal.count(|c| *c == Call::DestroyQueue), 1);
        assert_eq!(journal.calls.last(), Some(&Call::Close));
    }
    #[test]
    fn test_setup_order() {
        let dev = SimDevice::new();
        let journal = dev.journal();
        let config = TxConfig {
            gain_ramp: Some(GainRampConfig {
                start_db: 3,
                duration: Duration::from_millis(2000),
                interval: Duration::from_millis(20),
            }),
            ..Default::default()
        };
        drop(Transmitter::configure(Box::new(dev), config).unwrap());
        let journal = journal.get();
        let pos = |call: Call| journal.position(|c| *c == call).unwrap();
        assert_eq!(pos(Call::Reset), 0);
        assert!(pos(Call::EnableChannel(true)) < pos(Call::SetSampleRate {
            host: 5e6,
            oversample: 32
        }));
        assert!(pos(Call::SetGain(3)) < pos(Call::SetLo(30e6)));
        assert!(pos(Call::SetLo(30e6)) < pos(Call::SetMixer(MixerPlan::new(15e6, true))));
        assert!(pos(Call::SetMixer(MixerPlan::new(15e6, true))) < pos(Call::StartQueue));
        assert_eq!(journal.count(|c| matches!(c, Call::Calibrate(_))), 0);
    }
    #[test]
    fn test_corrector_override() {
        let dev = SimDevice::new();
        let journal = dev.journal();
        let config = TxConfig {
            correctors: CorrectorOverrides::default().with_phase(12),
            ..Default::default()
        };
        let mut tx = Transmitter::configure(Box::new(dev), config).unwrap();
        let correctors = tx.snapshot().correctors.unwrap();
        assert_eq!(correctors.phase, 12);
        drop(tx);
        let journal = journal.get();
        assert_eq!(
            journal.count(|c| matches!(c, Call::WriteRegister { address, .. } if *address == REG_BYPASS)),
            1
        );
    }
    #[test]
    fn test_sweep_wraps_around() {
        let (canceller, cancellation) = sync::channel();
        let dev = SimDevice::new().cancel_after(20, canceller);
        let journal = dev.journal();
        let config = TxConfig {
            oversample: 8,
            buffer_len: 1000,
            waveform: Waveform::Sweep(SweepConfig {
                start: 10.5e6,
                stop: 11.5e6,
                step: 0.5e6,
                dwell: Duration::from_millis(1),
            }),
            ..Default::default()
        };
        let mut tx = Transmitter::configure(Box::new(dev), config).unwrap();
        tx.run(&cancellation).unwrap();
        drop(tx);
        let journal = journal.get();
        let mixers: Vec<f64> = journal
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::SetMixer(plan) => Some(plan.frequency),
                _ => None,
            })
            .skip(1)
            .collect();
        assert_eq!(mixers, vec![19.5e6, 19e6, 18.5e6, 19.5e6]);
        assert_eq!(journal.sent.len(), 21);
        assert!(journal.sent[0].iter().all(|&s| s == IqSample::new(22937, 0)));
    }
    #[test]
    fn test_sweep_planned_against_read_back_lo() {
        let (canceller, cancellation) = sync::channel();
        let dev = SimDevice::new()
            .with_lo_offset(-0.5e6)
            .cancel_after(3, canceller);
        let journal = dev.journal();
        let config = TxConfig {
            oversample: 8,
            buffer_len: 1000,
            waveform: Waveform::Sweep(SweepConfig {
                start: 10.5e6,
                stop: 11.5e6,
                step: 0.5e6,
                dwell: Duration::from_micros(200),
            }),
            ..Default::default()
        };
        let mut tx = Transmitter::configure(Box::new(dev), config).unwrap();
        assert_eq!(tx.lo_frequency(), 29.5e6);
        tx.run(&cancellation).unwrap();
        drop(tx);
        let mixers: Vec<f64> = journal
            .get()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::SetMixer(plan) => Some(plan.frequency),
                _ => None,
            })
            .skip(1)
            .collect();
        assert_eq!(mixers, vec![19e6, 18.5e6, 18e6]);
    }
    #[test]
    fn test_sweep_out_of_range_after_lo_read_back() {
        let dev = SimDevice::new().with_lo_offset(0.5e6);
        let journal = dev.journal();
        let config = TxConfig {
            oversample: 8,
            waveform: Waveform::Sweep(SweepConfig {
                start: 10.5e6,
                stop: 11.5e6,
                step: 0.5e6,
                dwell: Duration::from_millis(1),
            }),
            ..Default::default()
        };
        let err = Transmitter::configure(Box::new(dev), config).err().unwrap();
        assert!(err.is_config());
        let journal = journal.get();
        assert_eq!(journal.count(|c| matches!(c, Call::SetupQueue(_))), 0);
        assert_eq!(journal.count(|c| *c == Call::EnableChannel(false)), 1);
    }
    #[test]
    fn test_send_timeout() {
        let dev = SimDevice::new().timeout_send_after(2);
        let journal = dev.journal();
        let config = small(TxConfig {
            send_timeout: Duration::from_millis(250),
            ..Default::default()
        });
        let mut tx = Transmitter::configure(Box::new(dev), config).unwrap();
        let err = tx.run(&Cancellation::never()).err().unwrap();
        assert!(matches!(
            err,
            Error::Stream(DeviceError::Timeout(t)) if t == Duration::from_millis(250)
        ));
        let stats = tx.shutdown();
        assert_eq!(stats.buffers, 2);
        assert_eq!(journal.get().sent.len(), 2);
    }
    #[test]
    fn test_sweep_out_of_range() {
        let dev = SimDevice::new();
        let config = TxConfig {
            oversample: 8,
            waveform: Waveform::Sweep(SweepConfig {
                start: 5e6,
                stop: 15e6,
                step: 1e6,
                dwell: Duration::from_millis(1),
            }),
            ..Default::default()
        };
        let err = Transmitter::configure(Box::new(dev), config).err().unwrap();
        assert!(err.is_config());
    }
}
