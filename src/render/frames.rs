use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context as _;
use image::imageops::FilterType;

use crate::assets::locations::LocationPool;
use crate::foundation::error::{ReelError, ReelResult};
use crate::script::scene::Scene;

/// Produces one scene's ordered frame set, normalized to the output
/// resolution.
#[derive(Debug, Clone, Copy)]
pub struct FrameComposer {
    width: u32,
    height: u32,
}

impl FrameComposer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Compose the frame list for a scene: every resolved character image in
    /// the scene's character order, then exactly one location image.
    ///
    /// Returns at least one frame: when there are no sources at all, a
    /// placeholder frame carrying the scene number, location, and time is
    /// synthesized. A source that fails to decode is replaced by a
    /// placeholder naming the failed file rather than aborting the scene.
    pub fn compose_scene_frames(
        &self,
        scene: &Scene,
        character_images: &[PathBuf],
        pool: &LocationPool,
        out_dir: &Path,
    ) -> ReelResult<Vec<PathBuf>> {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("failed to create frame directory '{}'", out_dir.display()))?;

        let mut sources: Vec<PathBuf> = character_images.to_vec();
        if let Some(location) = pool.best_match(&scene.location) {
            sources.push(location.to_path_buf());
        }

        if sources.is_empty() {
            let path = out_dir.join(format!("scene_{}_frame_1.png", scene.number));
            let text = format!(
                "Scene {}\n{} - {}",
                scene.number, scene.location, scene.time_of_day
            );
            self.render_text_frame(&text, &path)?;
            return Ok(vec![path]);
        }

        let mut frames = Vec::with_capacity(sources.len());
        for (i, source) in sources.iter().enumerate() {
            let path = out_dir.join(format!("scene_{}_frame_{}.png", scene.number, i + 1));
            if let Err(err) = self.normalize_frame(source, &path) {
                tracing::warn!(
                    scene = scene.number,
                    source = %source.display(),
                    %err,
                    "frame decode failed, substituting placeholder"
                );
                let name = source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| source.display().to_string());
                self.render_text_frame(&format!("Image unavailable\n{name}"), &path)?;
            }
            frames.push(path);
        }

        tracing::debug!(scene = scene.number, frames = frames.len(), "composed scene frames");
        Ok(frames)
    }

    /// Decode a source image and write it as a PNG at the output resolution,
    /// using an aspect-preserving resize followed by a centered crop.
    fn normalize_frame(&self, source: &Path, out_path: &Path) -> ReelResult<()> {
        let img = image::open(source)
            .map_err(|e| ReelError::media(format!("failed to decode '{}': {e}", source.display())))?;
        let filled = img.resize_to_fill(self.width, self.height, FilterType::Lanczos3);
        filled
            .to_rgb8()
            .save(out_path)
            .map_err(|e| ReelError::media(format!("failed to write '{}': {e}", out_path.display())))?;
        Ok(())
    }

    /// Rasterize a centered-text frame through ffmpeg's `drawtext` filter.
    fn render_text_frame(&self, text: &str, out_path: &Path) -> ReelResult<()> {
        let filter = format!(
            "drawtext=text='{}':fontcolor=white:fontsize={}:x=(w-text_w)/2:y=(h-text_h)/2",
            escape_drawtext(text),
            (self.height / 14).max(16),
        );
        let out = Command::new("ffmpeg")
            .args([
                "-v",
                "error",
                "-y",
                "-f",
                "lavfi",
                "-i",
                &format!("color=c=black:s={}x{}", self.width, self.height),
                "-vf",
                &filter,
                "-frames:v",
                "1",
            ])
            .arg(out_path)
            .output()
            .map_err(|e| {
                ReelError::media(format!("failed to run ffmpeg for placeholder frame: {e}"))
            })?;

        if !out.status.success() {
            return Err(ReelError::media(format!(
                "placeholder frame render failed for '{}': {}",
                out_path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Escape text for interpolation into a single-quoted drawtext argument.
fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
        .replace(',', "\\,")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn scene(number: u32) -> Scene {
        Scene {
            number,
            location: "PARK".to_owned(),
            time_of_day: "DAY".to_owned(),
            dialogue: String::new(),
            characters: BTreeSet::new(),
        }
    }

    fn write_test_png(path: &Path, width: u32, height: u32) {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([64, 128, 192]));
        img.save(path).unwrap();
    }

    #[test]
    fn frames_are_normalized_to_output_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("park.png");
        write_test_png(&source, 64, 128);

        let composer = FrameComposer::new(32, 32);
        let pool = LocationPool::from_paths(vec![source]);
        let frames = composer
            .compose_scene_frames(&scene(1), &[], &pool, dir.path())
            .unwrap();
        assert_eq!(frames.len(), 1);

        let out = image::open(&frames[0]).unwrap().to_rgb8();
        assert_eq!(out.dimensions(), (32, 32));
    }

    #[test]
    fn character_images_precede_the_location_image() {
        let dir = tempfile::tempdir().unwrap();
        let char_a = dir.path().join("sarah.png");
        let char_b = dir.path().join("miguel.png");
        let loc = dir.path().join("park.png");
        for p in [&char_a, &char_b, &loc] {
            write_test_png(p, 16, 16);
        }

        let composer = FrameComposer::new(16, 16);
        let pool = LocationPool::from_paths(vec![loc]);
        let frames = composer
            .compose_scene_frames(
                &scene(3),
                &[char_a, char_b],
                &pool,
                dir.path(),
            )
            .unwrap();

        assert_eq!(frames.len(), 3);
        assert!(frames[0].ends_with("scene_3_frame_1.png"));
        assert!(frames[2].ends_with("scene_3_frame_3.png"));
    }

    #[test]
    fn drawtext_escaping_covers_filter_metacharacters() {
        assert_eq!(escape_drawtext("a:b"), "a\\:b");
        assert_eq!(escape_drawtext("a,b"), "a\\,b");
        assert_eq!(escape_drawtext("it's"), "it'\\''s");
        assert_eq!(escape_drawtext("a\\b"), "a\\\\b");
    }
}
