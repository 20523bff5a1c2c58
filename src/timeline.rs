use std::path::{Path, PathBuf};

use crate::assets::media::{MIX_CHANNELS, MIX_SAMPLE_RATE, decode_audio_f32_stereo, probe_duration_secs};
use crate::audio::mix::{NarrationSegment, frames_to_samples, mix_timeline, write_mix_to_f32le_file};
use crate::config::ReelConfig;
use crate::encode::ffmpeg::{AudioInput, EncodeOpts, FrameRgb, VideoEncoder};
use crate::foundation::error::{ReelError, ReelResult};
use crate::script::scene::Scene;

/// One scene's media, ready for timing assembly.
#[derive(Debug, Clone)]
pub struct SceneMediaBundle {
    pub scene: Scene,
    /// Ordered normalized frame paths, at least one per scene.
    pub frames: Vec<PathBuf>,
    /// Narration audio, when synthesis produced one.
    pub audio: Option<PathBuf>,
}

/// The duration budget for one generation run.
///
/// Admission is checked before committing so a rejected scene never perturbs
/// the accumulated total.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyBudget {
    max_secs: f64,
    accumulated: f64,
    truncated: bool,
}

impl AssemblyBudget {
    pub fn new(max_secs: f64) -> Self {
        Self {
            max_secs,
            accumulated: 0.0,
            truncated: false,
        }
    }

    /// Whether a scene of `duration` still fits.
    pub fn admits(&self, duration: f64) -> bool {
        self.accumulated + duration <= self.max_secs
    }

    /// Commit an admitted scene's duration.
    pub fn commit(&mut self, duration: f64) {
        self.accumulated += duration;
    }

    pub fn mark_truncated(&mut self) {
        self.truncated = true;
    }

    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

/// A scene skipped during assembly, with the cause.
#[derive(Debug, Clone)]
pub struct SceneSkip {
    pub scene: u32,
    pub reason: String,
}

/// Outcome of a successful assembly.
#[derive(Debug)]
pub struct AssemblyReport {
    pub out_path: PathBuf,
    /// Scene numbers whose clips made it into the artifact, in order.
    pub included: Vec<u32>,
    /// Scenes dropped by per-scene failures.
    pub skipped: Vec<SceneSkip>,
    /// First scene number excluded by the duration budget, if any.
    pub truncated_at: Option<u32>,
    pub total_duration_secs: f64,
}

/// An admitted scene's render plan: validated frames plus per-frame holds.
struct SceneClip {
    scene_number: u32,
    frames: Vec<PathBuf>,
    /// Output frames each entry of `frames` is held for; same length as
    /// `frames`, sums to `total_frames`.
    holds: Vec<u64>,
    total_frames: u64,
    audio: Option<PathBuf>,
}

/// Assemble ordered scene bundles into the final video.
///
/// Scenes are evaluated strictly in order: measure duration, check the
/// budget (truncating the tail once exceeded), build the clip (skipping just
/// that scene on failure), then stream all surviving clips into one encode
/// with the mixed audio timeline.
#[tracing::instrument(skip_all, fields(scenes = bundles.len(), out = %out_path.display()))]
pub fn assemble(
    bundles: &[SceneMediaBundle],
    config: &ReelConfig,
    music: Option<&Path>,
    temp_dir: &Path,
    out_path: &Path,
) -> ReelResult<AssemblyReport> {
    let mut budget = AssemblyBudget::new(config.max_duration_secs);
    let mut clips = Vec::<SceneClip>::new();
    let mut skipped = Vec::<SceneSkip>::new();
    let mut truncated_at = None;

    for bundle in bundles {
        let scene_number = bundle.scene.number;
        if bundle.frames.is_empty() {
            tracing::warn!(scene = scene_number, "no frames for scene, skipping");
            skipped.push(SceneSkip {
                scene: scene_number,
                reason: "no frames".to_owned(),
            });
            continue;
        }

        let duration = scene_duration_secs(bundle, config);
        if !budget.admits(duration) {
            budget.mark_truncated();
            truncated_at = Some(scene_number);
            tracing::info!(
                scene = scene_number,
                accumulated = budget.accumulated(),
                max = config.max_duration_secs,
                "duration budget reached, truncating remaining scenes"
            );
            break;
        }

        match build_clip(bundle, duration, config) {
            Ok(clip) => {
                budget.commit(duration);
                tracing::info!(
                    scene = scene_number,
                    duration,
                    accumulated = budget.accumulated(),
                    "scene admitted"
                );
                clips.push(clip);
            }
            Err(err) => {
                tracing::warn!(scene = scene_number, %err, "clip build failed, skipping scene");
                skipped.push(SceneSkip {
                    scene: scene_number,
                    reason: err.to_string(),
                });
            }
        }
    }

    if clips.is_empty() {
        return Err(ReelError::NoValidScenes);
    }

    let total_frames: u64 = clips.iter().map(|c| c.total_frames).sum();
    let audio = prepare_audio_timeline(&clips, total_frames, config, music, temp_dir)?;

    let mut encoder = VideoEncoder::start(EncodeOpts {
        out_path: out_path.to_path_buf(),
        width: config.width,
        height: config.height,
        fps: config.fps,
        video_codec: config.video_codec.clone(),
        audio,
    })?;
    for clip in &clips {
        for (path, &hold) in clip.frames.iter().zip(&clip.holds) {
            // Frames were validated during clip build; a failure here is a
            // real I/O fault mid-encode and is fatal.
            let frame = load_frame_rgb(path, config.width, config.height)?;
            encoder.push_held_frame(&frame, hold)?;
        }
    }
    let frames_pushed = encoder.finish()?;

    tracing::info!(
        frames = frames_pushed,
        duration = budget.accumulated(),
        "wrote video artifact"
    );
    Ok(AssemblyReport {
        out_path: out_path.to_path_buf(),
        included: clips.iter().map(|c| c.scene_number).collect(),
        skipped,
        truncated_at,
        total_duration_secs: budget.accumulated(),
    })
}

/// A scene's duration: the measured narration length when audio is present,
/// otherwise the per-image default times the frame count. Probe failures
/// degrade to the frame-count default.
fn scene_duration_secs(bundle: &SceneMediaBundle, config: &ReelConfig) -> f64 {
    if let Some(audio) = &bundle.audio {
        match probe_duration_secs(audio) {
            Ok(d) if d > 0.0 => return d,
            Ok(_) => tracing::warn!(
                scene = bundle.scene.number,
                "audio probed as zero-length, using per-image default"
            ),
            Err(err) => tracing::warn!(
                scene = bundle.scene.number,
                %err,
                "audio probe failed, using per-image default"
            ),
        }
    }
    bundle.frames.len() as f64 * config.image_duration_secs
}

fn build_clip(
    bundle: &SceneMediaBundle,
    duration_secs: f64,
    config: &ReelConfig,
) -> ReelResult<SceneClip> {
    // Validate every frame up front so a broken frame can never fail the
    // encode mid-stream; the pixels are reloaded at push time to keep one
    // scene's worth of memory in flight.
    for path in &bundle.frames {
        load_frame_rgb(path, config.width, config.height)?;
    }

    let holds = hold_schedule(bundle.frames.len(), duration_secs, config.fps);
    let total_frames = holds.iter().sum();
    Ok(SceneClip {
        scene_number: bundle.scene.number,
        frames: bundle.frames.clone(),
        holds,
        total_frames,
        audio: bundle.audio.clone(),
    })
}

fn load_frame_rgb(path: &Path, width: u32, height: u32) -> ReelResult<FrameRgb> {
    let img = image::open(path)
        .map_err(|e| ReelError::media(format!("failed to decode frame '{}': {e}", path.display())))?;
    let rgb = img.to_rgb8();
    if rgb.width() != width || rgb.height() != height {
        return Err(ReelError::media(format!(
            "frame '{}' is {}x{}, expected {width}x{height}",
            path.display(),
            rgb.width(),
            rgb.height()
        )));
    }
    Ok(FrameRgb {
        width,
        height,
        data: rgb.into_raw(),
    })
}

/// Split a scene duration across its frames: `n` equal holds with the
/// integer remainder given to the earliest frames, so the scene's total
/// output frame count is exact.
fn hold_schedule(frame_count: usize, duration_secs: f64, fps: u32) -> Vec<u64> {
    let total = (duration_secs * f64::from(fps)).round().max(1.0) as u64;
    let n = frame_count.max(1) as u64;
    let base = total / n;
    let remainder = total % n;
    (0..n).map(|i| base + u64::from(i < remainder)).collect()
}

fn prepare_audio_timeline(
    clips: &[SceneClip],
    total_frames: u64,
    config: &ReelConfig,
    music: Option<&Path>,
    temp_dir: &Path,
) -> ReelResult<Option<AudioInput>> {
    let mut narration = Vec::<NarrationSegment>::new();
    let mut frame_cursor = 0u64;
    for clip in clips {
        if let Some(audio) = &clip.audio {
            match decode_audio_f32_stereo(audio, MIX_SAMPLE_RATE) {
                Ok(pcm) if !pcm.interleaved_f32.is_empty() => narration.push(NarrationSegment {
                    start_sample: frames_to_samples(frame_cursor, config.fps, MIX_SAMPLE_RATE),
                    pcm,
                }),
                Ok(_) => {}
                Err(err) => tracing::warn!(
                    scene = clip.scene_number,
                    %err,
                    "narration decode failed, scene will be silent"
                ),
            }
        }
        frame_cursor += clip.total_frames;
    }

    let background = match music {
        Some(path) => match decode_audio_f32_stereo(path, MIX_SAMPLE_RATE) {
            Ok(pcm) if !pcm.interleaved_f32.is_empty() => Some(pcm),
            Ok(_) => {
                tracing::warn!(music = %path.display(), "background track has no audio stream");
                None
            }
            Err(err) => {
                tracing::warn!(%err, "background music decode failed, continuing without music");
                None
            }
        },
        None => None,
    };

    if narration.is_empty() && background.is_none() {
        return Ok(None);
    }

    let total_samples = frames_to_samples(total_frames, config.fps, MIX_SAMPLE_RATE);
    let mix = mix_timeline(
        total_samples,
        &narration,
        background.as_ref(),
        config.music_gain,
    );
    let mix_path = temp_dir.join("timeline_mix.f32le");
    write_mix_to_f32le_file(&mix, &mix_path)?;
    Ok(Some(AudioInput {
        path: mix_path,
        sample_rate: MIX_SAMPLE_RATE,
        channels: MIX_CHANNELS,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_admits_longest_prefix() {
        let durations = [2.0, 2.0, 1.5, 4.0];
        let mut budget = AssemblyBudget::new(5.0);
        let mut included = Vec::new();
        for (i, d) in durations.iter().enumerate() {
            if !budget.admits(*d) {
                budget.mark_truncated();
                break;
            }
            budget.commit(*d);
            included.push(i + 1);
        }
        assert_eq!(included, vec![1, 2]);
        assert!(budget.truncated());
        assert!((budget.accumulated() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn budget_exactly_at_limit_is_admitted() {
        let mut budget = AssemblyBudget::new(3.0);
        assert!(budget.admits(3.0));
        budget.commit(3.0);
        assert!(!budget.admits(0.1));
    }

    #[test]
    fn spec_two_scene_truncation_case() {
        // budget=3s, scene1 audio=2s, scene2 audio=2s: scene1 included,
        // scene2 excluded (2 + 2 > 3).
        let mut budget = AssemblyBudget::new(3.0);
        assert!(budget.admits(2.0));
        budget.commit(2.0);
        assert!(!budget.admits(2.0));
    }

    #[test]
    fn hold_schedule_distributes_remainder_to_earliest_frames() {
        // 5 seconds at 24 fps over 7 frames: 120 output frames, 120 = 7*17+1.
        let holds = hold_schedule(7, 5.0, 24);
        assert_eq!(holds.len(), 7);
        assert_eq!(holds.iter().sum::<u64>(), 120);
        assert_eq!(holds[0], 18);
        assert!(holds[1..].iter().all(|&h| h == 17));
    }

    #[test]
    fn hold_schedule_single_frame_is_a_static_hold() {
        let holds = hold_schedule(1, 2.0, 24);
        assert_eq!(holds, vec![48]);
    }

    #[test]
    fn hold_schedule_never_yields_zero_total() {
        let holds = hold_schedule(1, 0.001, 24);
        assert_eq!(holds.iter().sum::<u64>(), 1);
    }
}
