use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::assets::media::is_ffmpeg_on_path;
use crate::foundation::error::{ReelError, ReelResult};

/// Raw audio input attached to an encode: interleaved little-endian `f32`
/// PCM in a file.
#[derive(Clone, Debug)]
pub struct AudioInput {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Settings for one encode run.
#[derive(Clone, Debug)]
pub struct EncodeOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Frame width in pixels, must be even.
    pub width: u32,
    /// Frame height in pixels, must be even.
    pub height: u32,
    /// Output frames per second.
    pub fps: u32,
    /// Video codec handed to ffmpeg (`libx264` by default upstream).
    pub video_codec: String,
    /// Optional mixed audio track.
    pub audio: Option<AudioInput>,
}

/// One opaque RGB8 frame at the output resolution.
#[derive(Clone, Debug)]
pub struct FrameRgb {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB8 bytes, `width * height * 3` long.
    pub data: Vec<u8>,
}

/// Streams raw RGB24 frames into a spawned `ffmpeg`, which encodes them with
/// the mixed audio track into the final MP4.
pub struct VideoEncoder {
    opts: EncodeOpts,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    frames_pushed: u64,
}

impl VideoEncoder {
    /// Validate the settings and spawn ffmpeg.
    pub fn start(opts: EncodeOpts) -> ReelResult<Self> {
        if opts.fps == 0 {
            return Err(ReelError::encode("fps must be non-zero"));
        }
        if opts.width == 0 || opts.height == 0 {
            return Err(ReelError::encode("encoder width/height must be non-zero"));
        }
        if !opts.width.is_multiple_of(2) || !opts.height.is_multiple_of(2) {
            return Err(ReelError::encode(
                "encoder width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if !is_ffmpeg_on_path() {
            return Err(ReelError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }
        ensure_parent_dir(&opts.out_path)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // Input 0: raw RGB24 frames on stdin.
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{}x{}", opts.width, opts.height),
            "-r",
            &opts.fps.to_string(),
            "-i",
            "pipe:0",
        ]);

        if let Some(audio) = opts.audio.as_ref() {
            if audio.sample_rate == 0 || audio.channels == 0 {
                return Err(ReelError::encode(
                    "audio sample_rate/channels must be non-zero when audio is attached",
                ));
            }
            cmd.args([
                "-f",
                "f32le",
                "-ar",
                &audio.sample_rate.to_string(),
                "-ac",
                &audio.channels.to_string(),
                "-i",
            ])
            .arg(&audio.path)
            .args(["-c:v", &opts.video_codec])
            .args(["-pix_fmt", "yuv420p", "-c:a", "aac", "-shortest"]);
        } else {
            cmd.args(["-an", "-c:v", &opts.video_codec])
                .args(["-pix_fmt", "yuv420p"]);
        }
        cmd.args(["-movflags", "+faststart"]).arg(&opts.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            ReelError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        Ok(Self {
            opts,
            child: Some(child),
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
            frames_pushed: 0,
        })
    }

    /// Write one frame to the encoder.
    pub fn push_frame(&mut self, frame: &FrameRgb) -> ReelResult<()> {
        if frame.width != self.opts.width || frame.height != self.opts.height {
            return Err(ReelError::encode(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.opts.width, self.opts.height
            )));
        }
        let expected = frame.width as usize * frame.height as usize * 3;
        if frame.data.len() != expected {
            return Err(ReelError::encode(
                "frame.data size mismatch with width*height*3",
            ));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ReelError::encode("encoder is already finalized"));
        };
        use std::io::Write as _;
        stdin.write_all(&frame.data).map_err(|e| {
            ReelError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.frames_pushed += 1;
        Ok(())
    }

    /// Write one frame `hold` times (a static hold of `hold / fps` seconds).
    pub fn push_held_frame(&mut self, frame: &FrameRgb, hold: u64) -> ReelResult<()> {
        for _ in 0..hold {
            self.push_frame(frame)?;
        }
        Ok(())
    }

    /// Close stdin, wait for ffmpeg, and surface its exit status. Returns the
    /// number of frames pushed.
    pub fn finish(mut self) -> ReelResult<u64> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| ReelError::encode("encoder not started"))?;

        let status = child
            .wait()
            .map_err(|e| ReelError::encode(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ReelError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| ReelError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(ReelError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(self.frames_pushed)
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_dimensions_are_rejected_before_spawning() {
        let opts = EncodeOpts {
            out_path: PathBuf::from("out.mp4"),
            width: 31,
            height: 32,
            fps: 24,
            video_codec: "libx264".to_owned(),
            audio: None,
        };
        assert!(matches!(VideoEncoder::start(opts), Err(ReelError::Encode(_))));
    }

    #[test]
    fn zero_fps_is_rejected_before_spawning() {
        let opts = EncodeOpts {
            out_path: PathBuf::from("out.mp4"),
            width: 32,
            height: 32,
            fps: 0,
            video_codec: "libx264".to_owned(),
            audio: None,
        };
        assert!(matches!(VideoEncoder::start(opts), Err(ReelError::Encode(_))));
    }
}
