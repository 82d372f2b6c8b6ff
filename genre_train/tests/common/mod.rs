#![allow(dead_code)]

use std::{fs, path::Path};

use genre_core::{ClipWindow, MelConfig, SplitLayout};
use genre_train::TrainConfig;

pub const SAMPLE_RATE: u32 = 2_000;
pub const LABELS: [&str; 2] = ["blues", "rock"];
pub const FILES_PER_LABEL: usize = 4;

/// Two labels, four one-second tones each; each label has its own pitch range.
///
/// Clips are kept tiny: 2000 samples give about 30 frames of 16 mels.
pub fn write_dataset(root: &Path) {
    for (l, label) in LABELS.iter().enumerate() {
        let dir = root.join("genres").join(label);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..FILES_PER_LABEL {
            let freq = 100.0 + 400.0 * l as f32 + 25.0 * i as f32;
            write_tone(&dir.join(format!("{label}.{i:05}.wav")), freq);
        }
    }
}

fn write_tone(path: &Path, freq: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for n in 0..SAMPLE_RATE as usize {
        let t = n as f32 / SAMPLE_RATE as f32;
        let s = 0.5 * (2.0 * std::f32::consts::PI * freq * t).sin();
        writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Small, single-threaded configuration over `write_dataset`'s tree.
pub fn small_config(root: &Path, scratch: &Path) -> TrainConfig {
    TrainConfig {
        root: root.to_path_buf(),
        window: ClipWindow::new(SAMPLE_RATE, 1),
        features: MelConfig {
            sample_rate: SAMPLE_RATE,
            n_fft: 128,
            hop_length: 64,
            n_mels: 16,
            normalized: true,
        },
        layout: SplitLayout {
            train: 0..FILES_PER_LABEL,
            valid: 0..FILES_PER_LABEL,
            test: 0..FILES_PER_LABEL,
        },
        epochs: 1,
        batch_size: 4,
        lr: 1e-3,
        seed: 42,
        num_workers: 0,
        checkpoint_dir: scratch.join("checkpoints"),
        checkpoint_every: 10,
        run_dir: scratch.join("runs"),
        project: "test_run".to_string(),
    }
}
