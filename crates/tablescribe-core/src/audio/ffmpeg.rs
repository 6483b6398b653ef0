//! ffmpeg/ffprobe subprocess helpers.
//!
//! Each invocation runs as an isolated subprocess; WAV files take a direct
//! hound path so tests and probe-heavy callers avoid the process spawn.

use crate::error::{CoreError, Result};
use std::path::Path;
use tokio::process::Command;

pub(crate) use crate::subprocess::run;

/// Duration of an audio file in milliseconds.
///
/// WAV headers are read directly; other containers go through ffprobe.
pub async fn probe_duration_ms(path: &Path) -> Result<u64> {
    if has_extension(path, "wav") {
        return wav_duration_ms(path);
    }

    let mut cmd = Command::new("ffprobe");
    cmd.args([
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
    ])
    .arg(path);

    let stdout = run("ffprobe", &mut cmd).await?;
    let text = String::from_utf8_lossy(&stdout);
    let secs: f64 = text.trim().parse().map_err(|_| {
        CoreError::backend(format!(
            "ffprobe returned unparseable duration: {:?}",
            text.trim()
        ))
    })?;

    Ok((secs * 1000.0).round() as u64)
}

/// Extract `[start_secs, end_secs)` from `source` into `dest` without
/// re-encoding.
pub async fn extract_slice(
    source: &Path,
    start_secs: f64,
    end_secs: f64,
    dest: &Path,
) -> Result<()> {
    if has_extension(source, "wav") {
        return wav_slice(source, start_secs, end_secs, dest);
    }

    let duration = (end_secs - start_secs).max(0.0);
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y")
        .args(["-ss", &format!("{start_secs:.3}")])
        .arg("-i")
        .arg(source)
        .args(["-t", &format!("{duration:.3}")])
        .args(["-c", "copy"])
        .arg(dest);

    run("ffmpeg slice", &mut cmd).await?;
    Ok(())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn wav_duration_ms(path: &Path) -> Result<u64> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| CoreError::backend(format!("failed to read WAV header: {e}")))?;
    let spec = reader.spec();
    Ok(reader.duration() as u64 * 1000 / spec.sample_rate as u64)
}

/// Sample-accurate WAV copy of one span.
fn wav_slice(source: &Path, start_secs: f64, end_secs: f64, dest: &Path) -> Result<()> {
    let mut reader = hound::WavReader::open(source)
        .map_err(|e| CoreError::backend(format!("failed to open WAV: {e}")))?;
    let spec = reader.spec();
    let rate = spec.sample_rate as f64;

    let total_frames = reader.duration();
    let start_frame = ((start_secs * rate).round() as u32).min(total_frames);
    let end_frame = ((end_secs * rate).round() as u32).min(total_frames);
    let frames = end_frame.saturating_sub(start_frame);

    reader
        .seek(start_frame)
        .map_err(|e| CoreError::backend(format!("failed to seek WAV: {e}")))?;

    let mut writer = hound::WavWriter::create(dest, spec)
        .map_err(|e| CoreError::backend(format!("failed to create WAV: {e}")))?;
    let sample_count = frames as usize * spec.channels as usize;

    match spec.sample_format {
        hound::SampleFormat::Float => {
            for sample in reader.samples::<f32>().take(sample_count) {
                let sample =
                    sample.map_err(|e| CoreError::backend(format!("failed to read WAV: {e}")))?;
                writer
                    .write_sample(sample)
                    .map_err(|e| CoreError::backend(format!("failed to write WAV: {e}")))?;
            }
        }
        hound::SampleFormat::Int => {
            for sample in reader.samples::<i32>().take(sample_count) {
                let sample =
                    sample.map_err(|e| CoreError::backend(format!("failed to read WAV: {e}")))?;
                writer
                    .write_sample(sample)
                    .map_err(|e| CoreError::backend(format!("failed to write WAV: {e}")))?;
            }
        }
    }

    writer
        .finalize()
        .map_err(|e| CoreError::backend(format!("failed to finalize WAV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_test_wav(dir: &Path, name: &str, seconds: f64, rate: u32) -> PathBuf {
        let path = dir.join(name);
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        let frames = (seconds * rate as f64) as u32;
        for i in 0..frames {
            writer.write_sample((i % 128) as i16).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[tokio::test]
    async fn wav_duration_is_read_from_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_wav(dir.path(), "probe.wav", 2.0, 16_000);

        let ms = probe_duration_ms(&path).await.unwrap();
        assert_eq!(ms, 2000);
    }

    #[tokio::test]
    async fn wav_slice_extracts_the_requested_span() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_test_wav(dir.path(), "full.wav", 3.0, 8_000);
        let dest = dir.path().join("slice.wav");

        extract_slice(&source, 1.0, 2.5, &dest).await.unwrap();

        let reader = hound::WavReader::open(&dest).unwrap();
        assert_eq!(reader.spec().sample_rate, 8_000);
        assert_eq!(reader.duration(), 12_000); // 1.5s at 8kHz
    }

    #[tokio::test]
    async fn wav_slice_clamps_past_the_end() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_test_wav(dir.path(), "short.wav", 1.0, 8_000);
        let dest = dir.path().join("slice.wav");

        extract_slice(&source, 0.5, 9.0, &dest).await.unwrap();

        let reader = hound::WavReader::open(&dest).unwrap();
        assert_eq!(reader.duration(), 4_000); // clamped to the final 0.5s
    }
}
