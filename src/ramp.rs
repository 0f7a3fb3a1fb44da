//! Gradual gain transitions
//!
//! See [`GainRamp`].

use crate::config::{GainRampConfig, GAIN_MAX_DB, GAIN_MIN_DB};

use log::{debug, info, warn};

use std::fmt::Display;
use std::time::{Duration, Instant};

/// Linear gain ramp in dB, ticking on a monotonic clock
///
/// The ramp is divided into `ceil(duration / interval)` steps. On each tick
/// the accumulated gain `start + elapsed_steps × step` is rounded to whole
/// dB, and the hardware is only written when the rounded value changed. The
/// last tick snaps exactly to the target, after which the ramp is finished.
///
/// The clock is passed in explicitly with every [`poll`], so the ramp can be
/// driven by [`Instant::now`] as well as by simulated time.
///
/// [`poll`]: GainRamp::poll
#[derive(Clone, Debug)]
pub struct GainRamp {
    start_db: u32,
    target_db: u32,
    step_db: f64,
    steps: u32,
    interval: Duration,
    elapsed_steps: u32,
    last_applied: u32,
    next_tick: Option<Instant>,
}

impl GainRamp {
    /// Create ramp from `config.start_db` to `target_db`, starting at `now`
    ///
    /// The start gain is assumed to be applied already. If duration is zero
    /// or start and target are equal, the ramp is finished right away.
    pub fn new(config: &GainRampConfig, target_db: u32, now: Instant) -> Self {
        let interval = config.interval.max(Duration::from_millis(1));
        let active = !config.duration.is_zero() && config.start_db != target_db;
        let steps = if active {
            let ratio = config.duration.as_nanos().div_ceil(interval.as_nanos());
            u32::try_from(ratio).unwrap_or(u32::MAX).max(1)
        } else {
            1
        };
        let step_db = if active {
            (target_db as f64 - config.start_db as f64) / steps as f64
        } else {
            0.0
        };
        Self {
            start_db: config.start_db,
            target_db,
            step_db,
            steps,
            interval,
            elapsed_steps: 0,
            last_applied: config.start_db,
            next_tick: active.then(|| now + interval),
        }
    }
    /// True until the target has been reached
    pub fn is_active(&self) -> bool {
        self.next_tick.is_some()
    }
    /// Gain which has been successfully applied most recently
    pub fn last_applied(&self) -> u32 {
        self.last_applied
    }
    /// Target gain
    pub fn target(&self) -> u32 {
        self.target_db
    }
    /// Number of steps of the complete ramp
    pub fn steps(&self) -> u32 {
        self.steps
    }
    /// Process all ticks due at `now`
    ///
    /// `set_gain` is invoked for every tick where the rounded gain differs
    /// from the last applied value. If the caller fell behind schedule,
    /// several ticks are processed in one call. A failing `set_gain` is
    /// logged and retried on the next tick; this includes the final snap to
    /// the target, so the ramp stays active until the target was applied.
    /// Returns the number of processed ticks.
    pub fn poll<F, E>(&mut self, now: Instant, mut set_gain: F) -> u32
    where
        F: FnMut(u32) -> Result<(), E>,
        E: Display,
    {
        let mut ticks = 0;
        while let Some(deadline) = self.next_tick {
            if now < deadline {
                break;
            }
            ticks += 1;
            self.elapsed_steps += 1;
            let accumulated = self.start_db as f64 + self.elapsed_steps as f64 * self.step_db;
            let mut wanted = (accumulated.round() as i64)
                .clamp(GAIN_MIN_DB as i64, GAIN_MAX_DB as i64) as u32;
            let finished = self.elapsed_steps >= self.steps || wanted == self.target_db;
            if finished {
                wanted = self.target_db;
            }
            if wanted != self.last_applied {
                match set_gain(wanted) {
                    Ok(()) => {
                        debug!("gain ramp: {} dB", wanted);
                        self.last_applied = wanted;
                    }
                    Err(err) => warn!("gain ramp: setting {} dB failed: {}", wanted, err),
                }
            }
            if finished && self.last_applied == self.target_db {
                info!(
                    "gain ramp finished at {} dB after {} steps",
                    self.last_applied, self.elapsed_steps
                );
                self.next_tick = None;
            } else {
                self.next_tick = Some(deadline + self.interval);
            }
        }
        ticks
    }
}
