use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::ReelConfig;
use crate::foundation::error::{ReelError, ReelResult};

/// Speech-synthesis collaborator boundary.
///
/// Implementations turn dialogue text into an audio file and report failure
/// explicitly; the orchestrator answers failure with a silent track, never by
/// propagating.
pub trait NarrationEngine {
    fn synthesize(&self, text: &str, out_path: &Path) -> ReelResult<PathBuf>;
}

/// Narration through the system `espeak-ng` binary.
#[derive(Debug, Clone)]
pub struct CommandNarrator {
    voice: String,
    words_per_minute: u32,
}

impl CommandNarrator {
    pub fn new(voice: impl Into<String>, words_per_minute: u32) -> Self {
        Self {
            voice: voice.into(),
            words_per_minute,
        }
    }

    pub fn from_config(config: &ReelConfig) -> Self {
        Self::new(config.narration_voice.clone(), config.narration_wpm)
    }
}

impl NarrationEngine for CommandNarrator {
    fn synthesize(&self, text: &str, out_path: &Path) -> ReelResult<PathBuf> {
        if text.trim().is_empty() {
            return Err(ReelError::media("narration text is empty"));
        }

        let out = Command::new("espeak-ng")
            .args(["-v", &self.voice, "-s", &self.words_per_minute.to_string(), "-w"])
            .arg(out_path)
            .arg(text)
            .output()
            .map_err(|e| {
                ReelError::media(format!(
                    "failed to run espeak-ng (is it installed and on PATH?): {e}"
                ))
            })?;

        if !out.status.success() {
            return Err(ReelError::media(format!(
                "espeak-ng failed for '{}': {}",
                out_path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        tracing::debug!(chars = text.len(), out = %out_path.display(), "synthesized narration");
        Ok(out_path.to_path_buf())
    }
}

/// Write a short silent WAV, used as the substitute when synthesis fails.
pub fn write_silent_track(out_path: &Path, duration_secs: f64) -> ReelResult<PathBuf> {
    let out = Command::new("ffmpeg")
        .args([
            "-v",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "anullsrc=r=48000:cl=stereo",
            "-t",
            &format!("{duration_secs:.3}"),
            "-c:a",
            "pcm_s16le",
        ])
        .arg(out_path)
        .output()
        .map_err(|e| ReelError::media(format!("failed to run ffmpeg for silent track: {e}")))?;

    if !out.status.success() {
        return Err(ReelError::media(format!(
            "silent track render failed for '{}': {}",
            out_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(out_path.to_path_buf())
}
