use std::path::Path;
use std::process::{Command, Stdio};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::debug;

use crate::error::{Result, SplitError};

use super::AudioBuffer;

/// Reads source files into memory and writes finished segments.
pub trait AudioCodec: Send + Sync {
    fn decode(&self, path: &Path) -> Result<AudioBuffer>;
    fn encode(&self, buffer: &AudioBuffer, path: &Path) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Pick the codec able to handle `extension`.
pub fn codec_for_extension(extension: &str) -> Result<Box<dyn AudioCodec>> {
    let extension = extension.trim_start_matches('.').to_lowercase();
    if extension == "wav" {
        return Ok(Box::new(WavCodec));
    }

    check_ffmpeg()?;
    Ok(Box::new(FfmpegCodec))
}

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|e| {
            SplitError::Config(format!(
                "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(SplitError::Config("FFmpeg check failed".to_string()));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// 16-bit PCM WAV via `hound`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavCodec;

impl AudioCodec for WavCodec {
    fn decode(&self, path: &Path) -> Result<AudioBuffer> {
        if !path.exists() {
            return Err(SplitError::FileNotFound(path.display().to_string()));
        }

        let decode_err =
            |e: hound::Error| SplitError::Decode(format!("{}: {e}", path.display()));

        let reader = WavReader::open(path).map_err(decode_err)?;
        let spec = reader.spec();

        let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 16) => reader
                .into_samples::<i16>()
                .collect::<std::result::Result<_, _>>()
                .map_err(decode_err)?,
            (SampleFormat::Int, bits) if bits <= 32 => {
                let shift = bits as i32 - 16;
                reader
                    .into_samples::<i32>()
                    .map(|s| {
                        s.map(|v| {
                            if shift >= 0 {
                                (v >> shift) as i16
                            } else {
                                (v << -shift) as i16
                            }
                        })
                    })
                    .collect::<std::result::Result<_, _>>()
                    .map_err(decode_err)?
            }
            (SampleFormat::Float, 32) => reader
                .into_samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect::<std::result::Result<_, _>>()
                .map_err(decode_err)?,
            (format, bits) => {
                return Err(SplitError::Decode(format!(
                    "{}: unsupported sample format {format:?} with {bits} bits",
                    path.display()
                )))
            }
        };

        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(SplitError::Decode(format!(
                "{}: invalid stream ({} Hz, {} channels)",
                path.display(),
                spec.sample_rate,
                spec.channels
            )));
        }

        // drop a trailing partial frame
        let mut samples = samples;
        samples.truncate(samples.len() - samples.len() % spec.channels as usize);

        debug!(
            "Decoded {}: {} Hz, {} channels, {} samples",
            path.display(),
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(AudioBuffer::new(samples, spec.sample_rate, spec.channels))
    }

    fn encode(&self, buffer: &AudioBuffer, path: &Path) -> Result<()> {
        let export_err = |e: hound::Error| SplitError::Export(format!("{}: {e}", path.display()));

        let spec = WavSpec {
            channels: buffer.channels(),
            sample_rate: buffer.sample_rate(),
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut writer = WavWriter::create(path, spec).map_err(export_err)?;
        for &sample in buffer.samples() {
            writer.write_sample(sample).map_err(export_err)?;
        }
        writer.finalize().map_err(export_err)?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "wav"
    }
}

/// Any container FFmpeg understands, transcoded through a temporary WAV.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegCodec;

impl AudioCodec for FfmpegCodec {
    fn decode(&self, path: &Path) -> Result<AudioBuffer> {
        if !path.exists() {
            return Err(SplitError::FileNotFound(path.display().to_string()));
        }

        let temp = tempfile::Builder::new()
            .prefix("speechsplit_")
            .suffix(".wav")
            .tempfile()?;

        let output = Command::new("ffmpeg")
            .args(["-y", "-v", "error", "-i"])
            .arg(path)
            .args(["-vn", "-acodec", "pcm_s16le"])
            .arg(temp.path())
            .stdout(Stdio::null())
            .output()
            .map_err(|e| SplitError::Decode(format!("Failed to run FFmpeg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SplitError::Decode(format!(
                "{}: FFmpeg failed: {}",
                path.display(),
                stderr.trim()
            )));
        }

        WavCodec.decode(temp.path())
    }

    fn encode(&self, buffer: &AudioBuffer, path: &Path) -> Result<()> {
        let temp = tempfile::Builder::new()
            .prefix("speechsplit_")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| SplitError::Export(format!("Failed to create temp file: {e}")))?;

        WavCodec.encode(buffer, temp.path())?;

        let output = Command::new("ffmpeg")
            .args(["-y", "-v", "error", "-i"])
            .arg(temp.path())
            .arg("-vn")
            .arg(path)
            .stdout(Stdio::null())
            .output()
            .map_err(|e| SplitError::Export(format!("Failed to run FFmpeg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SplitError::Export(format!(
                "{}: FFmpeg failed: {}",
                path.display(),
                stderr.trim()
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
