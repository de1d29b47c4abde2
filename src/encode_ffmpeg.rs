use std::{
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::{
    foundation::error::{MediaError, MediaResult},
    picture::Picture,
};

/// Every video is encoded at this rate, whatever rate the caller asked for.
pub const VIDEO_FPS: u32 = 15;
/// MPEG-4 Part 2 tagged as DivX, so AVI players recognise it.
pub const VIDEO_CODEC: &str = "mpeg4";
pub const VIDEO_FOURCC: &str = "DIVX";

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub out_path: PathBuf,
}

impl EncodeConfig {
    pub fn validate(&self) -> MediaResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MediaError::invalid_argument(
                "encode width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(MediaError::invalid_argument("encode fps must be non-zero"));
        }
        Ok(())
    }
}

pub fn default_avi_config(out_path: impl Into<PathBuf>, width: u32, height: u32) -> EncodeConfig {
    EncodeConfig {
        width,
        height,
        fps: VIDEO_FPS,
        out_path: out_path.into(),
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> MediaResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Streams RGB frames into a system `ffmpeg` process writing a DivX AVI.
///
/// Dropping an encoder without [`FfmpegEncoder::finish`] kills and reaps
/// the process.
pub struct FfmpegEncoder {
    cfg: EncodeConfig,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl FfmpegEncoder {
    pub fn new(cfg: EncodeConfig) -> MediaResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !is_ffmpeg_on_path() {
            return Err(MediaError::encode(
                "ffmpeg is required for video export, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // yuv420p needs even dimensions; pad odd ones by a single edge row/column.
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-vf",
            "pad=ceil(iw/2)*2:ceil(ih/2)*2",
            "-c:v",
            VIDEO_CODEC,
            "-vtag",
            VIDEO_FOURCC,
            "-q:v",
            "5",
            "-pix_fmt",
            "yuv420p",
        ])
        .arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            MediaError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::encode("failed to open ffmpeg stdin (unexpected)"))?;

        Ok(Self {
            cfg,
            child: Some(child),
            stdin: Some(stdin),
        })
    }

    pub fn encode_frame(&mut self, frame: &Picture) -> MediaResult<()> {
        if frame.width() != self.cfg.width || frame.height() != self.cfg.height {
            return Err(MediaError::invalid_argument(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                self.cfg.width,
                self.cfg.height
            )));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(MediaError::encode("ffmpeg encoder is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(frame.as_rgb_image().as_raw()).map_err(|e| {
            MediaError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;

        Ok(())
    }

    pub fn finish(mut self) -> MediaResult<()> {
        drop(self.stdin.take());

        let Some(child) = self.child.take() else {
            return Err(MediaError::encode("ffmpeg encoder is already finalized"));
        };
        let output = child.wait_with_output().map_err(|e| {
            MediaError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::encode(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Write `frames` as a DivX AVI.
///
/// `frame_rate` is validated but the file is always encoded at
/// [`VIDEO_FPS`]. The first frame fixes the canvas size and every other
/// frame must match it; sizes are checked before `ffmpeg` is started, so a
/// mismatch leaves no output file behind.
#[tracing::instrument(
    skip_all,
    fields(frames = frames.len(), path = %path.as_ref().display(), frame_rate = frame_rate)
)]
pub fn write_video(
    frames: &[Picture],
    path: impl AsRef<Path>,
    frame_rate: f64,
) -> MediaResult<()> {
    let path = path.as_ref();
    if frame_rate.is_nan() || frame_rate <= 0.0 {
        return Err(MediaError::invalid_argument(format!(
            "video frame rate must be greater than zero, got {frame_rate}"
        )));
    }
    let Some(first) = frames.first() else {
        return Err(MediaError::invalid_argument(
            "video must consist of at least one frame",
        ));
    };
    if let Some((i, bad)) = frames
        .iter()
        .enumerate()
        .find(|(_, f)| (f.width(), f.height()) != (first.width(), first.height()))
    {
        return Err(MediaError::invalid_argument(format!(
            "frame size mismatch: frame {i} is {}x{}, expected {}x{}",
            bad.width(),
            bad.height(),
            first.width(),
            first.height()
        )));
    }
    if frame_rate != f64::from(VIDEO_FPS) {
        tracing::warn!(
            requested = frame_rate,
            encoded = VIDEO_FPS,
            "video export ignores the requested frame rate"
        );
    }

    let cfg = default_avi_config(path, first.width(), first.height());
    let mut encoder = FfmpegEncoder::new(cfg)?;
    for frame in frames {
        encoder.encode_frame(frame)?;
    }
    encoder.finish()?;
    tracing::debug!("video written");
    Ok(())
}
