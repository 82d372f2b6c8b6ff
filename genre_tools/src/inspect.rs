use anyhow::Result;
use genre_core::{
    ClipWindow, MelConfig, MelExtractor,
    audio::{decoder::decode_to_mono, mel::log_compress},
    fix_length,
};
use std::path::Path;

const LOG_FLOOR: f32 = 1e-10;

/// Print log-mel statistics for one audio file.
pub fn inspect(path: &Path, window: ClipWindow) -> Result<()> {
    let pcm = decode_to_mono(path, window.sample_rate)?;
    let decoded_len = pcm.len();
    let pcm = fix_length(pcm, window.num_samples());

    let config = MelConfig {
        sample_rate: window.sample_rate,
        ..MelConfig::default()
    };
    let mel = log_compress(&MelExtractor::new(config).extract(&pcm), LOG_FLOOR);

    let min = mel.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = mel.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let nan_count = mel.iter().filter(|x| x.is_nan()).count();

    println!(
        "{}: {decoded_len} samples decoded, {} kept",
        path.display(),
        pcm.len()
    );
    println!("mel shape: {} mels x {} frames", mel.nrows(), mel.ncols());
    println!("mel stats: min={min}, max={max}, nan_count={nan_count}");
    if mel.ncols() > 0 {
        println!("frame 0: {:?}", mel.column(0).to_vec());
    }
    Ok(())
}
