//! Sample buffer type
//!
//! See [`SampleBuffer`].

use crate::numbers::*;

use std::ops::{Deref, DerefMut};
use std::time::Duration;

/// Default number of samples per buffer handed to the device
pub const DEFAULT_BUFFER_LEN: usize = 8192;

/// A fixed-length chunk of [`IqSample`]s with a specified sample rate
///
/// The buffer is allocated once and overwritten on every iteration of the
/// streaming loop, so no allocation happens in the real-time path.
/// `SampleBuffer` implements [`Deref`] and [`DerefMut`] with
/// [`Target`][Deref::Target] being [`[IqSample]`][prim@slice]; the length
/// cannot change after creation.
#[derive(Clone, Debug)]
pub struct SampleBuffer {
    sample_rate: f64,
    samples: Vec<IqSample>,
}

impl SampleBuffer {
    /// Create buffer holding `len` samples of silence
    pub fn silence(len: usize, sample_rate: f64) -> Self {
        assert!(len > 0, "buffer length must be positive");
        Self {
            sample_rate,
            samples: vec![IqSample::default(); len],
        }
    }
    /// Time it takes the device to transmit the buffer
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate)
    }
    /// True if every sample is zero
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|s| s.re == 0 && s.im == 0)
    }
}

impl Deref for SampleBuffer {
    type Target = [IqSample];
    fn deref(&self) -> &Self::Target {
        &self.samples
    }
}

impl DerefMut for SampleBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_silence() {
        let buf = SampleBuffer::silence(16, 1e6);
        assert_eq!(buf.len(), 16);
        assert!(buf.is_silent());
    }
    #[test]
    fn test_fill() {
        let mut buf = SampleBuffer::silence(4, 1e6);
        buf.fill(Complex::new(22937, 0));
        assert!(!buf.is_silent());
        assert!(buf.iter().all(|&s| s == Complex::new(22937, 0)));
        buf[2] = Complex::new(0, 0);
        assert!(!buf.is_silent());
        buf.fill(Complex::new(0, 0));
        assert!(buf.is_silent());
    }
    #[test]
    fn test_duration() {
        let buf = SampleBuffer::silence(DEFAULT_BUFFER_LEN, 5e6);
        assert!((buf.duration().as_secs_f64() - 1638.4e-6).abs() < 1e-9);
    }
}
