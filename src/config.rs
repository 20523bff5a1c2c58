use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::foundation::error::{ReelError, ReelResult};

/// Generation settings, populated once at startup.
///
/// Every field has a default so a config file only needs to name the values
/// it overrides; a run without a config file uses [`ReelConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelConfig {
    /// Output width in pixels. Must be even for yuv420p MP4 output.
    pub width: u32,
    /// Output height in pixels. Must be even for yuv420p MP4 output.
    pub height: u32,
    /// Output frames per second.
    pub fps: u32,
    /// Video codec handed to ffmpeg.
    pub video_codec: String,
    /// Maximum aggregate output duration in seconds. Scenes that would push
    /// the total past this are truncated, never compressed.
    pub max_duration_secs: f64,
    /// Hold duration per frame when a scene has no narration audio.
    pub image_duration_secs: f64,
    /// Gain applied to the background music bed before mixing (0..=1).
    pub music_gain: f32,
    /// Narration voice identifier passed to the synthesis engine.
    pub narration_voice: String,
    /// Narration speed in words per minute.
    pub narration_wpm: u32,
    /// Root directory for per-run temporary artifacts.
    pub temp_dir: PathBuf,
}

impl Default for ReelConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 24,
            video_codec: "libx264".to_owned(),
            max_duration_secs: 300.0,
            image_duration_secs: 5.0,
            music_gain: 0.3,
            narration_voice: "en".to_owned(),
            narration_wpm: 175,
            temp_dir: std::env::temp_dir().join("cinereel"),
        }
    }
}

impl ReelConfig {
    /// Load a config from a JSON file, validating the result.
    pub fn from_path(path: &Path) -> ReelResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            ReelError::input(format!("failed to read config '{}': {e}", path.display()))
        })?;
        let cfg: Self = serde_json::from_slice(&bytes).map_err(|e| {
            ReelError::input(format!("failed to parse config '{}': {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> ReelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ReelError::input("width/height must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(ReelError::input(
                "width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if self.fps == 0 {
            return Err(ReelError::input("fps must be non-zero"));
        }
        if !self.max_duration_secs.is_finite() || self.max_duration_secs <= 0.0 {
            return Err(ReelError::input("max_duration_secs must be > 0"));
        }
        if !self.image_duration_secs.is_finite() || self.image_duration_secs <= 0.0 {
            return Err(ReelError::input("image_duration_secs must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.music_gain) {
            return Err(ReelError::input("music_gain must be within 0..=1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ReelConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_config_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reel.json");
        std::fs::write(&path, r#"{"fps": 30, "music_gain": 0.1}"#).unwrap();

        let cfg = ReelConfig::from_path(&path).unwrap();
        assert_eq!(cfg.fps, 30);
        assert_eq!(cfg.music_gain, 0.1);
        assert_eq!(cfg.width, 1920);
        assert_eq!(cfg.video_codec, "libx264");
    }

    #[test]
    fn odd_dimensions_are_rejected() {
        let cfg = ReelConfig {
            width: 1921,
            ..ReelConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ReelError::Input(_))));
    }

    #[test]
    fn zero_budget_is_rejected() {
        let cfg = ReelConfig {
            max_duration_secs: 0.0,
            ..ReelConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
