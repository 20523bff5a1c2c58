use std::path::{Path, PathBuf};

use crate::assets::characters::CharacterLibrary;
use crate::assets::locations::LocationPool;
use crate::assets::media::{is_ffmpeg_on_path, is_ffprobe_on_path};
use crate::audio::narration::{CommandNarrator, NarrationEngine, write_silent_track};
use crate::config::ReelConfig;
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::frames::FrameComposer;
use crate::script::scene::Scene;
use crate::script::segment::parse_script;
use crate::timeline::{AssemblyReport, SceneMediaBundle, assemble};

/// Duration of the silent track substituted when narration synthesis fails.
const SILENT_FALLBACK_SECS: f64 = 1.0;

/// The generation session: one configuration plus a narration engine,
/// reusable across runs.
pub struct Generator {
    config: ReelConfig,
    narrator: Box<dyn NarrationEngine>,
}

impl Generator {
    /// Build a generator with the default `espeak-ng` narration engine.
    pub fn new(config: ReelConfig) -> ReelResult<Self> {
        let narrator = Box::new(CommandNarrator::from_config(&config));
        Self::with_narrator(config, narrator)
    }

    /// Build a generator with a custom narration engine.
    pub fn with_narrator(
        config: ReelConfig,
        narrator: Box<dyn NarrationEngine>,
    ) -> ReelResult<Self> {
        config.validate()?;
        Ok(Self { config, narrator })
    }

    pub fn config(&self) -> &ReelConfig {
        &self.config
    }

    /// Generate a narrated video from a script and asset directories.
    ///
    /// Fatal failures (unreadable inputs, empty script, zero surviving
    /// scenes, encoder faults) abort with a single cause; per-scene failures
    /// are absorbed with fallbacks and recorded in the returned report.
    #[tracing::instrument(skip(self), fields(script = %script_path.display()))]
    pub fn generate(
        &self,
        script_path: &Path,
        characters_dir: &Path,
        locations_dir: &Path,
        out_path: &Path,
        music: Option<&Path>,
    ) -> ReelResult<AssemblyReport> {
        if !is_ffmpeg_on_path() || !is_ffprobe_on_path() {
            return Err(ReelError::input(
                "ffmpeg and ffprobe are required on PATH",
            ));
        }

        let text = std::fs::read_to_string(script_path).map_err(|e| {
            ReelError::input(format!(
                "failed to read script '{}': {e}",
                script_path.display()
            ))
        })?;
        let scenes = parse_script(&text)?;

        let library = CharacterLibrary::load(characters_dir)?;
        tracing::info!(
            characters = library.len(),
            names = %library.names().collect::<Vec<_>>().join(", "),
            "loaded character library"
        );
        let pool = LocationPool::load(locations_dir)?;

        if let Some(path) = music
            && !path.is_file()
        {
            return Err(ReelError::input(format!(
                "background music not found: '{}'",
                path.display()
            )));
        }

        let run = RunDir::create(&self.config.temp_dir)?;
        let composer = FrameComposer::new(self.config.width, self.config.height);

        let mut bundles = Vec::with_capacity(scenes.len());
        for scene in &scenes {
            let character_images: Vec<PathBuf> = scene
                .characters
                .iter()
                .filter_map(|name| library.image_for(name, 0))
                .map(Path::to_path_buf)
                .collect();
            tracing::info!(
                scene = scene.number,
                location = %scene.location,
                characters = character_images.len(),
                "processing scene"
            );

            let frames =
                match composer.compose_scene_frames(scene, &character_images, &pool, run.path()) {
                    Ok(frames) => frames,
                    Err(err) => {
                        tracing::warn!(
                            scene = scene.number,
                            %err,
                            "frame composition failed, skipping scene"
                        );
                        continue;
                    }
                };
            let audio = self.narrate_scene(scene, run.path());
            bundles.push(SceneMediaBundle {
                scene: scene.clone(),
                frames,
                audio,
            });
        }

        assemble(&bundles, &self.config, music, run.path(), out_path)
    }

    /// Synthesize one scene's narration, substituting a short silent track
    /// when the engine fails. Scenes without dialogue carry no audio and fall
    /// back to frame-count timing.
    fn narrate_scene(&self, scene: &Scene, run_dir: &Path) -> Option<PathBuf> {
        let dialogue = scene.dialogue.trim();
        if dialogue.is_empty() {
            return None;
        }

        let out = run_dir.join(format!("scene_{}_narration.wav", scene.number));
        match self.narrator.synthesize(dialogue, &out) {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!(
                    scene = scene.number,
                    %err,
                    "narration synthesis failed, substituting silence"
                );
                let silent = run_dir.join(format!("scene_{}_silence.wav", scene.number));
                match write_silent_track(&silent, SILENT_FALLBACK_SECS) {
                    Ok(path) => Some(path),
                    Err(err) => {
                        tracing::warn!(
                            scene = scene.number,
                            %err,
                            "silent fallback failed, scene will use frame timing"
                        );
                        None
                    }
                }
            }
        }
    }
}

/// Run-scoped temp directory, removed on drop so per-run artifacts are
/// released on every exit path.
struct RunDir {
    path: PathBuf,
}

impl RunDir {
    fn create(root: &Path) -> ReelResult<Self> {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let path = root.join(format!("run_{}_{}", std::process::id(), nanos));
        std::fs::create_dir_all(&path).map_err(|e| {
            ReelError::input(format!(
                "failed to create temp directory '{}': {e}",
                path.display()
            ))
        })?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunDir {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_dir_all(&self.path) {
            tracing::debug!(dir = %self.path.display(), %err, "temp cleanup failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_dir_is_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let kept;
        {
            let run = RunDir::create(root.path()).unwrap();
            kept = run.path().to_path_buf();
            assert!(kept.is_dir());
        }
        assert!(!kept.exists());
    }

    #[test]
    fn invalid_config_fails_construction() {
        let config = ReelConfig {
            fps: 0,
            ..ReelConfig::default()
        };
        assert!(Generator::new(config).is_err());
    }
}
