//! TX I/Q correction stage (gain, phase, and DC correctors)
//!
//! The correctors sit in the digital transmit path of the RF chip. They are
//! accessed through the raw register interface of a [`TxDevice`]. Both
//! channels share the same register addresses; which channel is addressed is
//! selected through the [`REG_MAC`] register beforehand.

use super::{DeviceError, TxDevice};
use crate::math::ratio_to_db;

use std::f64::consts::PI;
use std::fmt;

/// Channel selection register (bits 1..0: 1 = channel A, 2 = channel B)
pub const REG_MAC: u16 = 0x0020;
/// Q gain corrector (11 bits, unsigned)
pub const REG_GAIN_Q: u16 = 0x0201;
/// I gain corrector (11 bits, unsigned)
pub const REG_GAIN_I: u16 = 0x0202;
/// Phase corrector (12 bits, two's complement)
pub const REG_PHASE: u16 = 0x0203;
/// DC correctors (I in bits 15..8, Q in bits 7..0, both signed)
pub const REG_DC: u16 = 0x0204;
/// Bypass flags of the correctors
pub const REG_BYPASS: u16 = 0x0208;

/// Phase corrector bypass flag in [`REG_BYPASS`]
pub const BYPASS_PHASE: u16 = 1 << 0;
/// Gain corrector bypass flag in [`REG_BYPASS`]
pub const BYPASS_GAIN: u16 = 1 << 1;
/// DC corrector bypass flag in [`REG_BYPASS`]
pub const BYPASS_DC: u16 = 1 << 3;

/// Largest gain corrector value
pub const GAIN_MAX: u16 = 0x07FF;
/// Largest magnitude of phase corrector value
pub const PHASE_MAX: i16 = 2047;

const GAIN_UNITY: f64 = 2048.0;
const DC_FULL_SCALE: f64 = 128.0;

fn select_channel(device: &mut dyn TxDevice, channel: usize) -> Result<(), DeviceError> {
    let mac = device.read_register(REG_MAC)?;
    let select = if channel == 0 { 0x1 } else { 0x2 };
    device.write_register(REG_MAC, (mac & !0x3) | select)
}

fn sign_extend_12(raw: u16) -> i16 {
    let value = (raw & 0x0FFF) as i16;
    if value & 0x0800 != 0 {
        value | !0x0FFF
    } else {
        value
    }
}

/// Decoded corrector registers of one channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxCorrectors {
    /// Channel the values were read from
    pub channel: usize,
    /// Raw I gain (2048 corresponds to unity)
    pub gain_i: u16,
    /// Raw Q gain (2048 corresponds to unity)
    pub gain_q: u16,
    /// Raw phase correction (`tan(α/2)·2048`)
    pub phase: i16,
    /// Raw I DC offset (128 corresponds to full scale)
    pub dc_i: i8,
    /// Raw Q DC offset (128 corresponds to full scale)
    pub dc_q: i8,
    /// Phase corrector bypassed
    pub phase_bypassed: bool,
    /// Gain corrector bypassed
    pub gain_bypassed: bool,
    /// DC corrector bypassed
    pub dc_bypassed: bool,
}

impl TxCorrectors {
    /// Decode raw register contents
    pub fn from_registers(
        channel: usize,
        gain_q: u16,
        gain_i: u16,
        phase: u16,
        dc: u16,
        bypass: u16,
    ) -> Self {
        Self {
            channel,
            gain_i: gain_i & GAIN_MAX,
            gain_q: gain_q & GAIN_MAX,
            phase: sign_extend_12(phase),
            dc_i: (dc >> 8) as u8 as i8,
            dc_q: dc as u8 as i8,
            phase_bypassed: bypass & BYPASS_PHASE != 0,
            gain_bypassed: bypass & BYPASS_GAIN != 0,
            dc_bypassed: bypass & BYPASS_DC != 0,
        }
    }
    /// Select `channel` and read its correctors
    pub fn read(device: &mut dyn TxDevice, channel: usize) -> Result<Self, DeviceError> {
        select_channel(device, channel)?;
        Ok(Self::from_registers(
            channel,
            device.read_register(REG_GAIN_Q)?,
            device.read_register(REG_GAIN_I)?,
            device.read_register(REG_PHASE)?,
            device.read_register(REG_DC)?,
            device.read_register(REG_BYPASS)?,
        ))
    }
    /// I gain as linear factor
    pub fn gain_i_ratio(&self) -> f64 {
        self.gain_i as f64 / GAIN_UNITY
    }
    /// Q gain as linear factor
    pub fn gain_q_ratio(&self) -> f64 {
        self.gain_q as f64 / GAIN_UNITY
    }
    /// Phase correction in degrees
    pub fn phase_degrees(&self) -> f64 {
        2.0 * (self.phase as f64 / GAIN_UNITY).atan() * 180.0 / PI
    }
    /// I DC offset as fraction of full scale
    pub fn dc_i_fraction(&self) -> f64 {
        self.dc_i as f64 / DC_FULL_SCALE
    }
    /// Q DC offset as fraction of full scale
    pub fn dc_q_fraction(&self) -> f64 {
        self.dc_q as f64 / DC_FULL_SCALE
    }
}

impl fmt::Display for TxCorrectors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bypassed = |flag: bool| if flag { " [bypassed]" } else { "" };
        write!(
            f,
            "channel {}: gain I={} ({:.6}, {:+.2} dB) Q={} ({:.6}, {:+.2} dB){}, \
             phase={} ({:+.4} deg){}, DC I={} ({:.5} FS) Q={} ({:.5} FS){}",
            if self.channel == 0 { 'A' } else { 'B' },
            self.gain_i,
            self.gain_i_ratio(),
            ratio_to_db(self.gain_i_ratio()),
            self.gain_q,
            self.gain_q_ratio(),
            ratio_to_db(self.gain_q_ratio()),
            bypassed(self.gain_bypassed),
            self.phase,
            self.phase_degrees(),
            bypassed(self.phase_bypassed),
            self.dc_i,
            self.dc_i_fraction(),
            self.dc_q,
            self.dc_q_fraction(),
            bypassed(self.dc_bypassed),
        )
    }
}

/// Manual corrector values which replace the calibrated ones
///
/// Values passed to the `with_` methods are clamped to the register ranges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CorrectorOverrides {
    /// I gain (0..=2047)
    pub gain_i: Option<u16>,
    /// Q gain (0..=2047)
    pub gain_q: Option<u16>,
    /// Phase (-2047..=2047)
    pub phase: Option<i16>,
    /// I DC offset
    pub dc_i: Option<i8>,
    /// Q DC offset
    pub dc_q: Option<i8>,
}

impl CorrectorOverrides {
    /// True if no value is overridden
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
    /// Override I gain
    pub fn with_gain_i(mut self, value: i64) -> Self {
        self.gain_i = Some(value.clamp(0, GAIN_MAX as i64) as u16);
        self
    }
    /// Override Q gain
    pub fn with_gain_q(mut self, value: i64) -> Self {
        self.gain_q = Some(value.clamp(0, GAIN_MAX as i64) as u16);
        self
    }
    /// Override phase
    pub fn with_phase(mut self, value: i64) -> Self {
        self.phase = Some(value.clamp(-PHASE_MAX as i64, PHASE_MAX as i64) as i16);
        self
    }
    /// Override I DC offset
    pub fn with_dc_i(mut self, value: i64) -> Self {
        self.dc_i = Some(value.clamp(i8::MIN as i64, i8::MAX as i64) as i8);
        self
    }
    /// Override Q DC offset
    pub fn with_dc_q(mut self, value: i64) -> Self {
        self.dc_q = Some(value.clamp(i8::MIN as i64, i8::MAX as i64) as i8);
        self
    }
    /// Write overridden values of `channel` and enable all correctors
    ///
    /// The DC register is read, modified, and written back, so overriding
    /// only one DC component keeps the other one.
    pub fn apply(&self, device: &mut dyn TxDevice, channel: usize) -> Result<(), DeviceError> {
        select_channel(device, channel)?;
        if let Some(gain_i) = self.gain_i {
            device.write_register(REG_GAIN_I, gain_i & GAIN_MAX)?;
        }
        if let Some(gain_q) = self.gain_q {
            device.write_register(REG_GAIN_Q, gain_q & GAIN_MAX)?;
        }
        if let Some(phase) = self.phase {
            device.write_register(REG_PHASE, phase as u16 & 0x0FFF)?;
        }
        if self.dc_i.is_some() || self.dc_q.is_some() {
            let mut dc = device.read_register(REG_DC)?;
            if let Some(dc_i) = self.dc_i {
                dc = (dc & 0x00FF) | ((dc_i as u8 as u16) << 8);
            }
            if let Some(dc_q) = self.dc_q {
                dc = (dc & 0xFF00) | dc_q as u8 as u16;
            }
            device.write_register(REG_DC, dc)?;
        }
        let bypass = device.read_register(REG_BYPASS)?;
        device.write_register(REG_BYPASS, bypass & !(BYPASS_PHASE | BYPASS_GAIN | BYPASS_DC))
    }
}
