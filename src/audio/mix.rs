use std::path::Path;

use crate::assets::media::{AudioPcm, MIX_CHANNELS};
use crate::foundation::error::{ReelError, ReelResult};

/// One scene's narration PCM scheduled at its timeline offset.
#[derive(Clone, Debug)]
pub struct NarrationSegment {
    /// Timeline position of the scene start, in samples per channel.
    pub start_sample: u64,
    /// Stereo PCM at the mix sample rate.
    pub pcm: AudioPcm,
}

/// Mix the full audio timeline: narration segments placed additively at
/// their scene offsets, with an optional attenuated background bed looped
/// under everything. The result is clamped to `[-1, 1]`.
pub fn mix_timeline(
    total_samples: u64,
    narration: &[NarrationSegment],
    background: Option<&AudioPcm>,
    background_gain: f32,
) -> Vec<f32> {
    let channels = usize::from(MIX_CHANNELS);
    let mut out = vec![0.0f32; total_samples as usize * channels];

    for segment in narration {
        add_narration(&mut out, segment);
    }
    if let Some(bed) = background {
        add_background(&mut out, bed, background_gain);
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    out
}

fn add_narration(out: &mut [f32], segment: &NarrationSegment) {
    let channels = usize::from(MIX_CHANNELS);
    let start = segment.start_sample as usize * channels;
    for (i, &v) in segment.pcm.interleaved_f32.iter().enumerate() {
        let Some(slot) = out.get_mut(start + i) else {
            break;
        };
        *slot += v;
    }
}

/// Loop the background source over the whole timeline and add it at
/// `gain`. Looping indexes the source modulo a whole number of sample
/// frames so channel alignment is preserved.
fn add_background(out: &mut [f32], bed: &AudioPcm, gain: f32) {
    if gain <= 0.0 {
        return;
    }
    let channels = usize::from(MIX_CHANNELS);
    let src = &bed.interleaved_f32;
    let usable = src.len() - (src.len() % channels);
    if usable == 0 {
        return;
    }

    for (i, slot) in out.iter_mut().enumerate() {
        *slot += src[i % usable] * gain;
    }
}

/// Write interleaved `f32` PCM samples to a raw little-endian `.f32le` file.
pub fn write_mix_to_f32le_file(samples_interleaved: &[f32], out_path: &Path) -> ReelResult<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ReelError::media(format!(
                "failed to create audio mix directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        ReelError::media(format!(
            "failed to write mixed audio file '{}': {e}",
            out_path.display()
        ))
    })
}

/// Convert a frame count to the nearest sample index at `sample_rate`.
pub fn frames_to_samples(frames: u64, fps: u32, sample_rate: u32) -> u64 {
    let num = u128::from(frames) * u128::from(sample_rate);
    let den = u128::from(fps.max(1));
    ((num + den / 2) / den) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::media::MIX_SAMPLE_RATE;

    fn stereo(samples: Vec<f32>) -> AudioPcm {
        AudioPcm {
            sample_rate: MIX_SAMPLE_RATE,
            channels: MIX_CHANNELS,
            interleaved_f32: samples,
        }
    }

    #[test]
    fn narration_lands_at_its_scene_offset() {
        let segment = NarrationSegment {
            start_sample: 2,
            pcm: stereo(vec![0.5, 0.5]),
        };
        let out = mix_timeline(4, &[segment], None, 0.0);
        assert_eq!(out.len(), 8);
        assert_eq!(&out[0..4], &[0.0, 0.0, 0.0, 0.0]);
        assert_eq!(&out[4..6], &[0.5, 0.5]);
    }

    #[test]
    fn background_loops_and_is_attenuated() {
        let bed = stereo(vec![1.0, -1.0]);
        let out = mix_timeline(3, &[], Some(&bed), 0.25);
        assert_eq!(out, vec![0.25, -0.25, 0.25, -0.25, 0.25, -0.25]);
    }

    #[test]
    fn background_sits_under_narration_without_replacing_it() {
        let segment = NarrationSegment {
            start_sample: 0,
            pcm: stereo(vec![0.5, 0.5]),
        };
        let bed = stereo(vec![0.2, 0.2]);
        let out = mix_timeline(2, &[segment], Some(&bed), 0.5);
        // Narration sample gets the bed added, the trailing bed-only sample
        // keeps playing.
        assert_eq!(&out[0..2], &[0.6, 0.6]);
        assert_eq!(&out[2..4], &[0.1, 0.1]);
    }

    #[test]
    fn mix_is_clamped() {
        let segment = NarrationSegment {
            start_sample: 0,
            pcm: stereo(vec![0.9, -0.9]),
        };
        let bed = stereo(vec![0.9, -0.9]);
        let out = mix_timeline(1, &[segment], Some(&bed), 1.0);
        assert_eq!(out, vec![1.0, -1.0]);
    }

    #[test]
    fn narration_past_the_timeline_end_is_dropped() {
        let segment = NarrationSegment {
            start_sample: 1,
            pcm: stereo(vec![0.5; 8]),
        };
        let out = mix_timeline(2, &[segment], None, 0.0);
        assert_eq!(out.len(), 4);
        assert_eq!(&out[2..4], &[0.5, 0.5]);
    }

    #[test]
    fn frames_to_samples_rounds_to_nearest() {
        assert_eq!(frames_to_samples(0, 24, 48_000), 0);
        assert_eq!(frames_to_samples(24, 24, 48_000), 48_000);
        // 1 frame at 30 fps and 48 kHz is exactly 1600 samples.
        assert_eq!(frames_to_samples(1, 30, 48_000), 1600);
        // Non-integral results round to nearest.
        assert_eq!(frames_to_samples(1, 7, 10), 1);
    }
}
