//! Complex numbers and the 16-bit I/Q wire format
//!
//! This module re-exports [`num::Complex`] as [`Complex`] and defines
//! [`IqSample`], the signed 16-bit interleaved I/Q sample type which is handed
//! to the hardware. All signal generation happens in [`f64`] and is converted
//! with [`quantize`] or [`quantize_iq`] as the very last step.

pub use num::Complex;

/// One interleaved I/Q sample as sent to the device
///
/// The real part is the in-phase (I) component, the imaginary part is the
/// quadrature (Q) component. [`Complex`] is `#[repr(C)]`, so a slice of
/// `IqSample`s has the memory layout `I0, Q0, I1, Q1, …` expected by the
/// hardware.
pub type IqSample = Complex<i16>;

/// Full scale (FS) of a signed 16-bit sample
pub const FULL_SCALE: f64 = 32767.0;

/// Convert a value relative to full scale into a 16-bit sample
///
/// The value is multiplied with [`FULL_SCALE`], rounded to the nearest
/// integer (ties away from zero), and saturated to the range of [`i16`].
/// Values exceeding full scale never wrap around. `NaN` maps to zero.
///
/// # Example
///
/// ```
/// use radiotx::numbers::quantize;
///
/// assert_eq!(quantize(0.70), 22937);
/// assert_eq!(quantize(2.0), i16::MAX);
/// assert_eq!(quantize(-2.0), i16::MIN);
/// ```
pub fn quantize(value: f64) -> i16 {
    let scaled = (value * FULL_SCALE).round();
    if scaled.is_nan() {
        0
    } else if scaled >= i16::MAX as f64 {
        i16::MAX
    } else if scaled <= i16::MIN as f64 {
        i16::MIN
    } else {
        scaled as i16
    }
}

/// Convert I and Q values relative to full scale into an [`IqSample`]
pub fn quantize_iq(i: f64, q: f64) -> IqSample {
    Complex::new(quantize(i), quantize(q))
}

/// Largest sample magnitude allowed for a given amplitude fraction
///
/// Every I or Q value produced with amplitude `scale` stays within
/// `±ceil(scale × 32767)`.
pub fn amplitude_ceiling(scale: f64) -> i32 {
    (scale * FULL_SCALE).ceil() as i32
}
