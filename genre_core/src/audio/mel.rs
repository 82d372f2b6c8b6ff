use mel_spec::prelude::Spectrogram;
use ndarray::{Array1, Array2, Array3, s};
use serde::{Deserialize, Serialize};

/// Short-time transform and mel filterbank parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MelConfig {
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    /// Divide the power spectrum by the analysis window's energy.
    pub normalized: bool,
}

impl Default for MelConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            n_fft: 2048,
            hop_length: 240,
            n_mels: 128,
            normalized: true,
        }
    }
}

impl MelConfig {
    /// Number of one-sided frequency bins of the STFT.
    pub fn n_freqs(&self) -> usize {
        self.n_fft / 2 + 1
    }
}

/// Converts waveforms into power mel spectrograms.
///
/// Stateless between calls: every clip gets a fresh STFT.
#[derive(Debug, Clone)]
pub struct MelExtractor {
    config: MelConfig,
    /// Triangular filters, shape (n_mels, n_freqs).
    filters: Array2<f32>,
    power_scale: f64,
}

impl MelExtractor {
    pub fn new(config: MelConfig) -> Self {
        let filters = mel_filterbank(config.sample_rate, config.n_fft, config.n_mels);

        // Periodic Hann window energy: sum(w^2) = 3N/8.
        let power_scale = if config.normalized {
            1.0 / (3.0 * config.n_fft as f64 / 8.0)
        } else {
            1.0
        };

        Self {
            config,
            filters,
            power_scale,
        }
    }

    /// Mel spectrogram of one mono clip, shape (n_mels, frames).
    pub fn extract(&self, pcm: &[f32]) -> Array2<f32> {
        let hop_size = self.config.hop_length;
        let n_freqs = self.config.n_freqs();
        let mut stft = Spectrogram::new(self.config.n_fft, hop_size);

        let mut frames: Vec<Array1<f32>> = Vec::with_capacity(pcm.len() / hop_size + 1);

        for chunk in pcm.chunks(hop_size) {
            // pad last hop
            let mut hop = vec![0.0f32; hop_size];
            hop[..chunk.len()].copy_from_slice(chunk);

            if let Some(fft_frame) = stft.add(&hop) {
                let mut power = Array1::<f32>::zeros(n_freqs);
                for (bin, value) in power.iter_mut().zip(fft_frame.iter()) {
                    *bin = (value.norm_sqr() * self.power_scale) as f32;
                }

                let mel = self.filters.dot(&power).mapv(|v| v.max(0.0));
                frames.push(mel);
            }
        }

        let mut out = Array2::<f32>::zeros((self.config.n_mels, frames.len()));
        for (t, frame) in frames.iter().enumerate() {
            out.column_mut(t).assign(frame);
        }
        out
    }

    /// Mel spectrograms of a row-major batch of equal-length clips.
    ///
    /// `waveforms` holds `batch * num_samples` values; the result has shape
    /// (batch, n_mels, frames).
    pub fn extract_batch(&self, waveforms: &[f32], num_samples: usize) -> Array3<f32> {
        let per_clip: Vec<Array2<f32>> = waveforms
            .chunks_exact(num_samples.max(1))
            .map(|clip| self.extract(clip))
            .collect();

        let frames = per_clip.first().map(|m| m.ncols()).unwrap_or(0);
        let mut out = Array3::<f32>::zeros((per_clip.len(), self.config.n_mels, frames));
        for (i, mel) in per_clip.iter().enumerate() {
            let width = mel.ncols().min(frames);
            out.slice_mut(s![i, .., ..width])
                .assign(&mel.slice(s![.., ..width]));
        }
        out
    }
}

/// Natural log with a floor so silent bins stay finite.
pub fn log_compress(features: &Array2<f32>, floor: f32) -> Array2<f32> {
    features.mapv(|v| v.max(floor).ln())
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

/// HTK-scale triangular filterbank over 0..sample_rate/2, unnormalised.
///
/// Shape is (n_mels, n_fft / 2 + 1).
pub fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Array2<f32> {
    let n_freqs = n_fft / 2 + 1;
    let nyquist = sample_rate as f64 / 2.0;

    let bin_hz: Vec<f64> = (0..n_freqs)
        .map(|k| {
            if n_freqs > 1 {
                nyquist * k as f64 / (n_freqs - 1) as f64
            } else {
                0.0
            }
        })
        .collect();

    let mel_max = hz_to_mel(nyquist);
    let edges: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
        .collect();

    let mut filters = Array2::<f32>::zeros((n_mels, n_freqs));
    for m in 0..n_mels {
        let (lower, center, upper) = (edges[m], edges[m + 1], edges[m + 2]);
        for (k, &f) in bin_hz.iter().enumerate() {
            let rising = (f - lower) / (center - lower);
            let falling = (upper - f) / (upper - center);
            filters[[m, k]] = rising.min(falling).max(0.0) as f32;
        }
    }
    filters
}
