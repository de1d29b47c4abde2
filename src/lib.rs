//! Media computation with a small vocabulary: pictures made of pixels and
//! sounds made of samples.
//!
//! - Open, create, or duplicate a [`Picture`], then read and write colors
//!   through [`Pixel`] handles or draw shapes and text on it.
//! - Open or create a [`Sound`], then read and write amplitudes through
//!   [`Sample`] handles, or cut it up with [`Sound::clip`] and
//!   [`Sound::copy_into`].
//! - Assemble frame files into animated GIFs ([`animation`]) or AVI video
//!   ([`encode_ffmpeg`], requires `ffmpeg` on PATH).
//!
//! Color writes take an explicit [`ColorMode`], normally read from a
//! [`MediaConfig`], instead of consulting process-wide state.
#![forbid(unsafe_code)]

mod foundation;

pub mod animation;
pub mod color;
pub mod draw;
pub mod encode_ffmpeg;
pub mod picture;
pub mod pixel;
pub mod sample;
pub mod sound;

pub use crate::animation::{
    make_movie_from_initial_file, order_frames_from, write_animated_gif, write_movie_to,
    write_slide_show_to,
};
pub use crate::color::{Color, ColorMode, make_color, normalize};
pub use crate::draw::{TextStyle, make_style};
pub use crate::encode_ffmpeg::write_video;
pub use crate::foundation::config::{DEFAULT_SAMPLE_RATE, MediaConfig};
pub use crate::foundation::error::{MediaError, MediaResult};
pub use crate::picture::Picture;
pub use crate::pixel::Pixel;
pub use crate::sample::Sample;
pub use crate::sound::{MAX_BLANK_SECONDS, Sound};
