use serde::{Deserialize, Serialize};

/// The fixed-duration window every clip is forced into before batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipWindow {
    pub sample_rate: u32,
    pub duration_secs: u32,
}

impl ClipWindow {
    pub const fn new(sample_rate: u32, duration_secs: u32) -> Self {
        Self {
            sample_rate,
            duration_secs,
        }
    }

    /// Number of samples in one clip.
    pub fn num_samples(&self) -> usize {
        self.sample_rate as usize * self.duration_secs as usize
    }
}

impl Default for ClipWindow {
    fn default() -> Self {
        Self::new(24_000, 30)
    }
}

/// Force `samples` to exactly `len` samples.
///
/// Short clips are zero-padded at the end, long clips keep their leading
/// `len` samples.
pub fn fix_length(mut samples: Vec<f32>, len: usize) -> Vec<f32> {
    samples.resize(len, 0.0);
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_thirty_seconds_at_24k() {
        assert_eq!(ClipWindow::default().num_samples(), 24_000 * 30);
    }

    #[test]
    fn short_input_is_zero_padded_at_the_end() {
        let out = fix_length(vec![1.0, 2.0], 5);
        assert_eq!(out, vec![1.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn long_input_keeps_the_leading_samples() {
        let out = fix_length(vec![1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(out, vec![1.0, 2.0]);
    }

    #[test]
    fn empty_input_becomes_silence() {
        assert_eq!(fix_length(Vec::new(), 3), vec![0.0; 3]);
    }
}
