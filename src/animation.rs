//! Frame sequences: discovering ordered frame files on disk and writing them
//! out as animated GIFs.
//!
//! Frame discovery is purely name based. Files are sorted lexicographically,
//! so `frame2` sorts after `frame10`; zero-padded names keep their numeric
//! order.

use std::{
    fs::File,
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use image::{
    Delay, DynamicImage, Frame,
    codecs::gif::{GifEncoder, Repeat},
};

use crate::{
    encode_ffmpeg::ensure_parent_dir,
    foundation::error::{MediaError, MediaResult},
    picture::Picture,
};

/// Separates the directory from the leaf name in a first-frame argument.
pub const FRAME_SEPARATOR: &str = "//";
pub const MOVIE_FRAME_DELAY_MS: u32 = 40;
pub const SLIDE_PREFIX: &str = "slide";

/// Split `dir//leaf` at the last separator. Without one the leaf is looked
/// up in the current directory.
pub fn split_first_file(first_file: &str) -> (PathBuf, String) {
    match first_file.rfind(FRAME_SEPARATOR) {
        Some(at) => (
            PathBuf::from(&first_file[..at]),
            first_file[at + FRAME_SEPARATOR.len()..].to_string(),
        ),
        None => (PathBuf::from("."), first_file.to_string()),
    }
}

/// Paths of `first_file` and every file sorting after it in its directory.
pub fn order_frames_from(first_file: &str) -> MediaResult<Vec<PathBuf>> {
    let (dir, leaf) = split_first_file(first_file);
    let names = sorted_file_names(&dir)?;
    let start = names.iter().position(|n| *n == leaf).ok_or_else(|| {
        MediaError::not_found(format!(
            "no file named '{leaf}' in '{}'",
            dir.display()
        ))
    })?;
    Ok(names[start..].iter().map(|n| dir.join(n)).collect())
}

/// Decode every frame that [`order_frames_from`] finds.
#[tracing::instrument]
pub fn make_movie_from_initial_file(first_file: &str) -> MediaResult<Vec<Picture>> {
    let paths = order_frames_from(first_file)?;
    tracing::debug!(frames = paths.len(), "decoding frames");
    paths.iter().map(Picture::open).collect()
}

/// Looping GIF with `1000 / frame_rate` milliseconds between frames.
#[tracing::instrument(
    skip_all,
    fields(frames = frames.len(), path = %path.as_ref().display(), frame_rate = frame_rate)
)]
pub fn write_animated_gif(
    frames: &[Picture],
    path: impl AsRef<Path>,
    frame_rate: f64,
) -> MediaResult<()> {
    if frame_rate.is_nan() || frame_rate <= 0.0 {
        return Err(MediaError::invalid_argument(format!(
            "animated gif frame rate must be greater than zero, got {frame_rate}"
        )));
    }
    if frames.is_empty() {
        return Err(MediaError::invalid_argument(
            "animated gif must consist of at least one frame",
        ));
    }
    let per_frame = Duration::try_from_secs_f64(1.0 / frame_rate).unwrap_or(Duration::MAX);
    encode_gif(
        frames,
        path.as_ref(),
        Delay::from_saturating_duration(per_frame),
        Repeat::Infinite,
    )
}

/// GIF with a fixed 40 ms frame delay that plays once.
pub fn write_movie_to(frames: &[Picture], path: impl AsRef<Path>) -> MediaResult<()> {
    if frames.is_empty() {
        return Err(MediaError::invalid_argument(
            "movie must consist of at least one frame",
        ));
    }
    encode_gif(
        frames,
        path.as_ref(),
        Delay::from_numer_denom_ms(MOVIE_FRAME_DELAY_MS, 1),
        Repeat::Finite(0),
    )
}

/// Looping GIF of the `slide*.jpg` / `slide*.jpeg` files in `dir`, in name
/// order, each shown for `delay_secs` seconds.
#[tracing::instrument(skip_all, fields(dir = %dir.display(), delay_secs = delay_secs))]
pub fn write_slide_show_to(
    dir: &Path,
    path: impl AsRef<Path>,
    delay_secs: f64,
) -> MediaResult<()> {
    if delay_secs.is_nan() || delay_secs <= 0.0 {
        return Err(MediaError::invalid_argument(format!(
            "slide show delay must be greater than zero, got {delay_secs}"
        )));
    }
    let slides = sorted_file_names(dir)?
        .into_iter()
        .filter(|n| is_slide(n))
        .map(|n| Picture::open(dir.join(n)))
        .collect::<MediaResult<Vec<_>>>()?;
    tracing::debug!(slides = slides.len(), "collected slides");
    write_animated_gif(&slides, path, 1.0 / delay_secs)
}

fn is_slide(name: &str) -> bool {
    name.starts_with(SLIDE_PREFIX) && (name.ends_with(".jpg") || name.ends_with(".jpeg"))
}

/// Names of the regular files directly inside `dir`, sorted.
fn sorted_file_names(dir: &Path) -> MediaResult<Vec<String>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("list directory '{}'", dir.display()))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("list directory '{}'", dir.display()))?;
        if entry.path().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn encode_gif(frames: &[Picture], path: &Path, delay: Delay, repeat: Repeat) -> MediaResult<()> {
    ensure_parent_dir(path)?;
    let file =
        File::create(path).with_context(|| format!("create gif '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    {
        let mut encoder = GifEncoder::new(&mut writer);
        encoder
            .set_repeat(repeat)
            .with_context(|| format!("write gif header '{}'", path.display()))?;
        for (i, picture) in frames.iter().enumerate() {
            let rgba = DynamicImage::ImageRgb8(picture.as_rgb_image().clone()).to_rgba8();
            encoder
                .encode_frame(Frame::from_parts(rgba, 0, 0, delay))
                .with_context(|| format!("encode gif frame {i} into '{}'", path.display()))?;
        }
    }
    writer
        .flush()
        .with_context(|| format!("flush gif '{}'", path.display()))?;
    Ok(())
}
