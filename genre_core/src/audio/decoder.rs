use anyhow::{Context, Result, anyhow};
use std::path::Path;

use symphonia::core::{
    audio::SampleBuffer,
    codecs::{CODEC_TYPE_NULL, DecoderOptions},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{Fft, FixedSync, Resampler};

/// Decoded mono audio together with the rate it was decoded at.
#[derive(Debug, Clone)]
pub struct MonoAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Decode an audio file to mono f32 samples at `sample_rate` Hz.
///
/// Channels are averaged into one. Any decode failure, including a single
/// corrupt packet, is an error.
pub fn decode_to_mono<P: AsRef<Path>>(path: P, sample_rate: u32) -> Result<Vec<f32>> {
    let path = path.as_ref();
    let decoded = decode_native(path)?;

    if decoded.sample_rate == sample_rate {
        return Ok(decoded.samples);
    }

    resample_mono(&decoded.samples, decoded.sample_rate, sample_rate)
        .with_context(|| format!("failed to resample {}", path.display()))
}

/// Decode an audio file to mono f32 samples at its native rate.
pub fn decode_native(path: &Path) -> Result<MonoAudio> {
    // -------------------------
    // 1) Decode with Symphonia
    // -------------------------
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open audio file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("unsupported format: {}", path.display()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| anyhow!("no supported audio tracks in {}", path.display()))?;

    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("failed to create decoder for selected track")?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut input_sample_rate: Option<u32> = track.codec_params.sample_rate;
    let mut input_channels: Option<usize> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            // symphonia reports end of stream as an unexpected EOF
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                return Err(anyhow!(
                    "chained streams are not supported: {}",
                    path.display()
                ));
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("error reading packet from {}", path.display()));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .with_context(|| format!("failed to decode packet in {}", path.display()))?;

        input_sample_rate.get_or_insert(decoded.spec().rate);
        input_channels.get_or_insert(decoded.spec().channels.count());

        let mut sbuf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        sbuf.copy_interleaved_ref(decoded);

        interleaved.extend_from_slice(sbuf.samples());
    }

    let sample_rate =
        input_sample_rate.ok_or_else(|| anyhow!("could not determine input sample rate"))?;
    let channels = input_channels.ok_or_else(|| anyhow!("could not determine channel count"))?;

    if interleaved.is_empty() {
        return Err(anyhow!("decoded audio was empty: {}", path.display()));
    }

    // -------------------------
    // 2) Downmix to mono
    // -------------------------
    let samples = downmix(interleaved, channels);

    tracing::trace!(
        path = %path.display(),
        sample_rate,
        channels,
        frames = samples.len(),
        "decoded audio"
    );

    Ok(MonoAudio {
        samples,
        sample_rate,
    })
}

/// Average interleaved channels into one.
pub fn downmix(interleaved: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved;
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Resample a whole mono clip with rubato's FFT resampler.
pub fn resample_mono(mono: &[f32], sr_in: u32, sr_out: u32) -> Result<Vec<f32>> {
    if sr_in == sr_out {
        return Ok(mono.to_vec());
    }

    let chunk_size: usize = 1024;
    let sub_chunks: usize = 1;

    let mut resampler = Fft::<f32>::new(
        sr_in as usize,
        sr_out as usize,
        chunk_size,
        sub_chunks,
        1,
        FixedSync::Input,
    )
    .context("failed to construct FFT resampler")?;

    let input_len_frames = mono.len();
    let out_len_frames = resampler.process_all_needed_output_len(input_len_frames);
    let mut out = vec![0.0f32; out_len_frames];

    let input_adapter =
        InterleavedSlice::new(mono, 1, input_len_frames).context("bad input adapter")?;
    let mut output_adapter =
        InterleavedSlice::new_mut(&mut out, 1, out_len_frames).context("bad output adapter")?;

    let (_frames_read, frames_written) = resampler.process_all_into_buffer(
        &input_adapter,
        &mut output_adapter,
        input_len_frames,
        None,
    )?;

    out.truncate(frames_written);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_stereo_frames() {
        let mono = downmix(vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn downmix_passes_mono_through() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix(samples.clone(), 1), samples);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = decode_to_mono("does/not/exist.wav", 16_000).unwrap_err();
        assert!(format!("{err:#}").contains("failed to open audio file"));
    }
}
