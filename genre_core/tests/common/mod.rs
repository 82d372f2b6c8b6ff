#![allow(dead_code)]

use std::{fs, path::Path};

/// Create `<root>/genres/<label>/<label>.NNNNN.wav` placeholders.
pub fn touch_dataset(root: &Path, labels: &[&str], files_per_label: usize) {
    for label in labels {
        let dir = root.join("genres").join(label);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..files_per_label {
            fs::write(dir.join(format!("{label}.{i:05}.wav")), b"").unwrap();
        }
    }
}

/// Write a 16-bit mono or stereo WAV.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer
            .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .unwrap();
    }
    writer.finalize().unwrap();
}

pub fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| 0.5 * (2.0 * std::f32::consts::PI * freq * n as f32 / sample_rate as f32).sin())
        .collect()
}
