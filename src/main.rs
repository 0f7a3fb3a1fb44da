use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use log::{error, info};
use radiotx::config::*;
use radiotx::device::{self, correctors::CorrectorOverrides};
use radiotx::error::{ConfigError, Error};
use radiotx::planner::{MixerPlan, SweepConfig};
use radiotx::sync;
use radiotx::transmit::{Stats, Transmitter};
use radiotx::waveform::{RotationConvention, Waveform, OFDM_DEFAULT_SCALE};

use tokio::task::spawn_blocking;

use std::future::Future;
use std::io;
use std::process::ExitCode;
use std::time::Duration;

const DEFAULT_DEVICE: &str = if cfg!(feature = "soapysdr") {
    "soapy"
} else {
    "sim"
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Carrier at LO ± NCO
    Constant,
    /// Single baseband tone
    Tone,
    /// Two tones at ± delta
    Twotone,
    /// Uniform noise
    Noise,
    /// Carrier swept through the mixer
    Sweep,
    /// 16-QAM OFDM
    Ofdm,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Convention {
    /// I = cos, Q = sin (tone above the carrier)
    Positive,
    /// I = sin, Q = cos (tone below the carrier)
    Negative,
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Continuous-wave and test-signal transmitter",
    long_about = None,
)]
struct Args {
    /// Device ("sim" or "soapy[:ARGS]", e.g. "soapy:driver=lime")
    #[arg(short = 'd', long, default_value = DEFAULT_DEVICE)]
    device: String,
    /// List available devices and exit
    #[arg(long)]
    list: bool,
    /// TX channel
    #[arg(long, default_value_t = 0)]
    channel: usize,
    /// Host sample rate in Hz (k/M/G suffix allowed)
    #[arg(long, value_parser = parse_hz, default_value = "5M")]
    host_sr: f64,
    /// Oversampling factor
    #[arg(long, default_value_t = 32)]
    oversample: u32,
    /// TX low-pass filter bandwidth in Hz
    #[arg(long, value_parser = parse_hz, default_value = "20M")]
    tx_lpf_bw: f64,
    /// LO frequency in Hz
    #[arg(long, value_parser = parse_hz, default_value = "30M")]
    lo: f64,
    /// NCO frequency (magnitude) in Hz
    #[arg(long, value_parser = parse_hz, default_value = "15M")]
    nco: f64,
    /// RF = LO - NCO if true, RF = LO + NCO otherwise
    #[arg(long, value_parser = parse_bool, action = ArgAction::Set, default_value = "true")]
    nco_downconvert: bool,
    /// Target RF frequency in Hz (overrides --nco and --nco-downconvert)
    #[arg(long, value_parser = parse_hz)]
    rf: Option<f64>,
    /// Target TX gain in dB
    #[arg(long, default_value_t = 40, allow_negative_numbers = true)]
    tx_gain: i64,
    /// Starting TX gain in dB (enables a gain ramp)
    #[arg(long, allow_negative_numbers = true)]
    tx_gain_start: Option<i64>,
    /// Total gain ramp duration in milliseconds
    #[arg(long, default_value_t = 2000)]
    gain_ramp_ms: u64,
    /// Gain ramp step interval in milliseconds
    #[arg(long, default_value_t = 20)]
    gain_ramp_interval_ms: u64,
    /// Amplitude as fraction of full scale (RMS for mode "ofdm"; default
    /// 0.7, or 0.3 for mode "ofdm")
    #[arg(long)]
    tone_scale: Option<f64>,
    /// Run TX self-calibration
    #[arg(long, value_parser = parse_bool, action = ArgAction::Set, default_value = "false")]
    calibrate: bool,
    /// Calibration bandwidth in Hz (defaults to --tx-lpf-bw)
    #[arg(long, value_parser = parse_hz)]
    cal_bw: Option<f64>,
    /// Manually set I gain corrector (0..2047)
    #[arg(long, allow_negative_numbers = true)]
    set_gain_i: Option<i64>,
    /// Manually set Q gain corrector (0..2047)
    #[arg(long, allow_negative_numbers = true)]
    set_gain_q: Option<i64>,
    /// Manually set phase corrector (-2047..2047)
    #[arg(long, allow_negative_numbers = true)]
    set_phase: Option<i64>,
    /// Manually set I DC corrector (-128..127)
    #[arg(long, allow_negative_numbers = true)]
    set_dc_i: Option<i64>,
    /// Manually set Q DC corrector (-128..127)
    #[arg(long, allow_negative_numbers = true)]
    set_dc_q: Option<i64>,
    /// Waveform
    #[arg(long, value_enum, default_value_t = Mode::Constant)]
    mode: Mode,
    /// Baseband tone frequency in Hz (mode "tone")
    #[arg(long, value_parser = parse_hz, default_value = "100k")]
    bb: f64,
    /// Mapping of the rotator onto I and Q (mode "tone")
    #[arg(long, value_enum, default_value_t = Convention::Positive)]
    convention: Convention,
    /// Distance of each tone from the carrier in Hz (mode "twotone")
    #[arg(long, value_parser = parse_hz, default_value = "100k")]
    tone_delta: f64,
    /// Seed of the noise generator (mode "noise")
    #[arg(long, default_value_t = 1)]
    noise_seed: u64,
    /// First RF frequency in Hz (mode "sweep")
    #[arg(long, value_parser = parse_hz, default_value = "10M")]
    sweep_start: f64,
    /// Last RF frequency in Hz (mode "sweep")
    #[arg(long, value_parser = parse_hz, default_value = "30M")]
    sweep_stop: f64,
    /// RF step in Hz (mode "sweep")
    #[arg(long, value_parser = parse_hz, default_value = "1M")]
    sweep_step: f64,
    /// Time per sweep step in milliseconds (mode "sweep")
    #[arg(long, default_value_t = 2000)]
    dwell_ms: u64,
    /// IFFT size (mode "ofdm")
    #[arg(long, default_value_t = 512)]
    fft_len: usize,
    /// Cyclic prefix length in samples (mode "ofdm")
    #[arg(long, default_value_t = 128)]
    cp_len: usize,
    /// Number of occupied subcarriers, DC excluded (mode "ofdm")
    #[arg(long, default_value_t = 300)]
    used_tones: usize,
    /// Seed of the data generator (mode "ofdm")
    #[arg(long, default_value_t = 12345)]
    ofdm_seed: u64,
    /// Capacity of the device queue in samples
    #[arg(long, default_value_t = DEFAULT_FIFO_LEN)]
    fifo: usize,
    /// Samples per buffer
    #[arg(long, default_value_t = radiotx::samples::DEFAULT_BUFFER_LEN)]
    buffer: usize,
    /// Timeout for sending one buffer in milliseconds
    #[arg(long, default_value_t = DEFAULT_SEND_TIMEOUT.as_millis() as u64)]
    send_timeout_ms: u64,
    /// More verbose logging
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn tx_config(&self) -> Result<TxConfig, ConfigError> {
        let gain_db = checked_gain(self.tx_gain)?;
        let gain_ramp = match self.tx_gain_start {
            Some(start_db) => Some(GainRampConfig {
                start_db: checked_gain(start_db)?,
                duration: Duration::from_millis(self.gain_ramp_ms),
                interval: Duration::from_millis(self.gain_ramp_interval_ms),
            }),
            None => None,
        };
        if self.rf.is_none() && !(self.nco > 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "NCO frequency",
                value: self.nco,
                allowed: "positive".to_string(),
            });
        }
        let waveform = match self.mode {
            Mode::Constant => Waveform::Constant,
            Mode::Tone => Waveform::Tone {
                frequency: self.bb,
                convention: match self.convention {
                    Convention::Positive => RotationConvention::Positive,
                    Convention::Negative => RotationConvention::Negative,
                },
            },
            Mode::Twotone => Waveform::TwoTone {
                delta: self.tone_delta,
            },
            Mode::Noise => Waveform::Noise {
                seed: self.noise_seed,
            },
            Mode::Sweep => Waveform::Sweep(SweepConfig {
                start: self.sweep_start,
                stop: self.sweep_stop,
                step: self.sweep_step,
                dwell: Duration::from_millis(self.dwell_ms),
            }),
            Mode::Ofdm => Waveform::Ofdm {
                fft_len: self.fft_len,
                cp_len: self.cp_len,
                used_tones: self.used_tones,
                seed: self.ofdm_seed,
            },
        };
        let tone_scale = self.tone_scale.unwrap_or(match self.mode {
            Mode::Ofdm => OFDM_DEFAULT_SCALE,
            _ => DEFAULT_TONE_SCALE,
        });
        let mut correctors = CorrectorOverrides::default();
        if let Some(value) = self.set_gain_i {
            correctors = correctors.with_gain_i(value);
        }
        if let Some(value) = self.set_gain_q {
            correctors = correctors.with_gain_q(value);
        }
        if let Some(value) = self.set_phase {
            correctors = correctors.with_phase(value);
        }
        if let Some(value) = self.set_dc_i {
            correctors = correctors.with_dc_i(value);
        }
        if let Some(value) = self.set_dc_q {
            correctors = correctors.with_dc_q(value);
        }
        let mut config = TxConfig {
            channel: self.channel,
            host_sample_rate: self.host_sr,
            oversample: self.oversample,
            filter_bandwidth: self.tx_lpf_bw,
            lo_frequency: self.lo,
            mixer: MixerPlan::new(self.nco, self.nco_downconvert),
            gain_db,
            gain_ramp,
            calibrate: self.calibrate,
            calibration_bandwidth: self.cal_bw,
            correctors,
            tone_scale,
            waveform,
            fifo_len: self.fifo,
            buffer_len: self.buffer,
            send_timeout: Duration::from_millis(self.send_timeout_ms),
        };
        if let Some(rf) = self.rf {
            config.tune_to(rf)?;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Run transmitter until it fails or `interrupt` completes
async fn run<I>(args: Args, interrupt: I) -> anyhow::Result<()>
where
    I: Future<Output = io::Result<()>>,
{
    if args.list {
        for info in device::list().context("listing devices")? {
            println!("{}: {}", info.backend, info.description);
        }
        return Ok(());
    }
    let config = args.tx_config().context("invalid configuration")?;
    let device = device::open(&args.device)
        .with_context(|| format!("opening device {:?}", args.device))?
        .ok_or(Error::NoDevice)?;
    let (canceller, cancellation) = sync::channel();
    let mut task = spawn_blocking(move || -> radiotx::Result<Stats> {
        let mut tx = Transmitter::configure(device, config)?;
        info!(
            "transmitting {} at {:.6} MHz ({:.3} Msps), press Ctrl+C to stop",
            tx.config().waveform.name(),
            tx.center_frequency() / 1e6,
            tx.sample_rates().host / 1e6
        );
        let result = tx.run(&cancellation);
        let stats = tx.shutdown();
        result.map(|_| stats)
    });
    let joined = tokio::select! {
        joined = &mut task => joined,
        signal = interrupt => {
            signal.context("waiting for Ctrl+C")?;
            info!("interrupted, shutting down");
            canceller.cancel();
            task.await
        }
    };
    let stats = joined.context("transmitter task failed")??;
    info!("done, {} buffers sent", stats.buffers);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let level = match args.verbose {
        0 => "info",
        1 => "radiotx=debug,info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    ExitCode::from(exit_status(&run(args, tokio::signal::ctrl_c()).await))
}

fn exit_status(result: &anyhow::Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            error!("{err:#}");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("radiotx").chain(args.iter().copied())).unwrap()
    }
    #[test]
    fn test_defaults() {
        let config = parse(&[]).tx_config().unwrap();
        assert_eq!(config.host_sample_rate, 5e6);
        assert_eq!(config.oversample, 32);
        assert_eq!(config.center_frequency(), 15e6);
        assert_eq!(config.gain_db, 40);
        assert!(config.gain_ramp.is_none());
        assert!(!config.calibrate);
        assert!(config.correctors.is_empty());
    }
    #[test]
    fn test_rf_target() {
        let config = parse(&["--rf", "42.5M", "--nco-downconvert", "yes"])
            .tx_config()
            .unwrap();
        assert_eq!(config.mixer, MixerPlan::new(12.5e6, false));
    }
    #[test]
    fn test_gain_ramp_and_overrides() {
        let config = parse(&[
            "--tx-gain-start",
            "0",
            "--set-phase",
            "-3000",
            "--set-dc-q",
            "-5",
            "--calibrate",
            "on",
        ])
        .tx_config()
        .unwrap();
        assert_eq!(config.initial_gain_db(), 0);
        assert_eq!(config.correctors.phase, Some(-2047));
        assert_eq!(config.correctors.dc_q, Some(-5));
        assert!(config.calibrate);
    }
    #[test]
    fn test_ofdm_defaults() {
        let config = parse(&["--mode", "ofdm"]).tx_config().unwrap();
        assert_eq!(config.tone_scale, OFDM_DEFAULT_SCALE);
        assert_eq!(
            config.waveform,
            Waveform::Ofdm {
                fft_len: 512,
                cp_len: 128,
                used_tones: 300,
                seed: 12345
            }
        );
        let config = parse(&["--mode", "ofdm", "--tone-scale", "0.2"])
            .tx_config()
            .unwrap();
        assert_eq!(config.tone_scale, 0.2);
        assert_eq!(parse(&[]).tx_config().unwrap().tone_scale, DEFAULT_TONE_SCALE);
        assert!(parse(&["--mode", "ofdm", "--used-tones", "511"])
            .tx_config()
            .is_err());
    }
    #[tokio::test]
    async fn test_interrupt_exits_successfully() {
        let args = parse(&["--device", "sim", "--mode", "sweep", "--dwell-ms", "1"]);
        let interrupt = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        };
        assert_eq!(exit_status(&run(args, interrupt).await), 0);
    }
    #[tokio::test]
    async fn test_failures_exit_with_error() {
        for device in ["sim:fail=set_mixer", "sim:fail_send_after=3", "nonexistent"] {
            let args = parse(&["--device", device, "--buffer", "256"]);
            let result = run(args, std::future::pending()).await;
            assert_eq!(exit_status(&result), 1, "{device}");
        }
        let args = parse(&["--tx-gain", "80"]);
        assert_eq!(exit_status(&run(args, std::future::pending()).await), 1);
    }
    #[tokio::test]
    async fn test_send_timeout_is_reported() {
        let args = parse(&["--device", "sim:timeout_send_after=2", "--buffer", "256"]);
        let err = run(args, std::future::pending()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Stream(device::DeviceError::Timeout(_)))
        ));
    }
    #[test]
    fn test_rejected() {
        assert!(parse(&["--tx-gain", "74"]).tx_config().is_err());
        assert!(parse(&["--nco", "0"]).tx_config().is_err());
        assert!(parse(&["--rf", "5M", "--oversample", "8"]).tx_config().is_err());
        assert!(Args::try_parse_from(["radiotx", "--lo", "30 MHz"]).is_err());
        assert!(Args::try_parse_from(["radiotx", "--calibrate", "maybe"]).is_err());
    }
}
