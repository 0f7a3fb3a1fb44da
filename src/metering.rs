//! Metering (peak and level measurement of generated buffers)

use crate::math::ratio_to_db;
use crate::numbers::*;

/// Largest absolute I or Q value in `chunk`
///
/// # Example
///
/// ```
/// use radiotx::metering::peak;
/// use radiotx::numbers::Complex;
///
/// let chunk = vec![Complex::new(3, -7), Complex::new(i16::MIN, 0)];
/// assert_eq!(peak(&chunk), 32768);
/// ```
pub fn peak(chunk: &[IqSample]) -> i32 {
    chunk
        .iter()
        .map(|s| (s.re as i32).abs().max((s.im as i32).abs()))
        .max()
        .unwrap_or(0)
}

/// Mean square norm relative to full scale
pub fn level(chunk: &[IqSample]) -> f64 {
    if chunk.is_empty() {
        return 0.0;
    }
    let mut square_average: f64 = 0.0;
    for sample in chunk.iter() {
        let re = sample.re as f64 / FULL_SCALE;
        let im = sample.im as f64 / FULL_SCALE;
        square_average += re * re + im * im;
    }
    square_average / chunk.len() as f64
}

/// Level in dB relative to full scale (dBFS)
pub fn level_dbfs(chunk: &[IqSample]) -> f64 {
    ratio_to_db(level(chunk).sqrt())
}
