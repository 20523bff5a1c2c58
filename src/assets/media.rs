use std::path::Path;
use std::process::{Command, Stdio};

use crate::foundation::error::{ReelError, ReelResult};

/// Internal audio sample rate used across decode/mix/encode.
pub const MIX_SAMPLE_RATE: u32 = 48_000;
/// Internal audio channel count (stereo).
pub const MIX_CHANNELS: u16 = 2;

#[derive(Clone, Debug)]
/// Decoded interleaved floating-point PCM.
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` PCM samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Duration of the PCM in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        let frames = self.interleaved_f32.len() / usize::from(self.channels);
        frames as f64 / f64::from(self.sample_rate)
    }
}

/// Measure a media file's duration in seconds through `ffprobe`.
pub fn probe_duration_secs(path: &Path) -> ReelResult<f64> {
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        format: ProbeFormat,
    }

    let out = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_format"])
        .arg(path)
        .output()
        .map_err(|e| ReelError::media(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ReelError::media(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| ReelError::media(format!("ffprobe json parse failed: {e}")))?;
    let raw = parsed.format.duration.ok_or_else(|| {
        ReelError::media(format!(
            "ffprobe reported no duration for '{}'",
            path.display()
        ))
    })?;
    raw.parse::<f64>().map_err(|e| {
        ReelError::media(format!(
            "ffprobe duration '{raw}' for '{}' is not a number: {e}",
            path.display()
        ))
    })
}

/// Decode a media file's audio to stereo interleaved `f32` PCM at
/// `sample_rate`.
///
/// A source without any audio stream decodes to empty PCM rather than an
/// error.
pub fn decode_audio_f32_stereo(path: &Path, sample_rate: u32) -> ReelResult<AudioPcm> {
    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            &MIX_CHANNELS.to_string(),
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| ReelError::media(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        // ffmpeg reports the absence of an audio stream with an error; treat
        // that as empty PCM.
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("does not contain any stream")
        {
            return Ok(AudioPcm {
                sample_rate,
                channels: MIX_CHANNELS,
                interleaved_f32: Vec::new(),
            });
        }
        return Err(ReelError::media(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            msg.trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(ReelError::media(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let mut pcm = Vec::<f32>::with_capacity(out.stdout.len() / 4);
    for chunk in out.stdout.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(AudioPcm {
        sample_rate,
        channels: MIX_CHANNELS,
        interleaved_f32: pcm,
    })
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    tool_on_path("ffmpeg")
}

/// Return `true` when `ffprobe` can be invoked from `PATH`.
pub fn is_ffprobe_on_path() -> bool {
    tool_on_path("ffprobe")
}

fn tool_on_path(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

// The probe/decode functions shell out to `ffprobe`/`ffmpeg` and are
// exercised by the gated integration test.
