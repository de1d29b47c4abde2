use std::path::Path;

use anyhow::Context as _;
use image::{ImageFormat, RgbImage};

use crate::{
    color::Color,
    foundation::error::{MediaError, MediaResult},
    pixel::Pixel,
};

pub const NO_FILE_NAME: &str = "noFileName";

/// An RGB raster with fixed dimensions and the name of the file it came from.
#[derive(Clone, Debug)]
pub struct Picture {
    image: RgbImage,
    filename: String,
}

impl Picture {
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let dyn_img =
            image::open(path).with_context(|| format!("decode image '{}'", path.display()))?;
        let image = dyn_img.to_rgb8();
        tracing::debug!(width = image.width(), height = image.height(), "opened picture");
        Ok(Self {
            image,
            filename: path.display().to_string(),
        })
    }

    /// A `width` x `height` canvas filled with `color`.
    pub fn blank(width: u32, height: u32, color: Color) -> MediaResult<Self> {
        if width == 0 || height == 0 {
            return Err(MediaError::invalid_argument(format!(
                "blank picture needs a non-zero width and height, got {width}x{height}"
            )));
        }
        Ok(Self {
            image: RgbImage::from_pixel(width, height, color.to_rgb()),
            filename: NO_FILE_NAME.to_string(),
        })
    }

    pub fn blank_white(width: u32, height: u32) -> MediaResult<Self> {
        Self::blank(width, height, Color::WHITE)
    }

    pub fn from_rgb_image(image: RgbImage, filename: impl Into<String>) -> Self {
        Self {
            image,
            filename: filename.into(),
        }
    }

    /// Independent copy of the bitmap. The copy carries no filename.
    pub fn duplicate(&self) -> Self {
        Self {
            image: self.image.clone(),
            filename: NO_FILE_NAME.to_string(),
        }
    }

    /// Paste `self` into `target` with its top-left corner at `(x, y)`.
    /// Parts falling outside `target` are dropped.
    pub fn copy_into(&self, target: &mut Picture, x: i64, y: i64) {
        image::imageops::replace(&mut target.image, &self.image, x, y);
    }

    pub fn set_all_pixels_to_a_color(&mut self, color: Color) {
        let rgb = color.to_rgb();
        for px in self.image.pixels_mut() {
            *px = rgb;
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn as_rgb_image(&self) -> &RgbImage {
        &self.image
    }

    pub(crate) fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    pub fn into_rgb_image(self) -> RgbImage {
        self.image
    }

    pub fn pixel(&self, x: i64, y: i64) -> MediaResult<Pixel> {
        if x < 0 || x >= i64::from(self.width()) {
            return Err(MediaError::out_of_range(format!(
                "pixel x={x} is outside 0..{}, it must be at most width - 1 and at least 0",
                self.width()
            )));
        }
        if y < 0 || y >= i64::from(self.height()) {
            return Err(MediaError::out_of_range(format!(
                "pixel y={y} is outside 0..{}, it must be at most height - 1 and at least 0",
                self.height()
            )));
        }
        Ok(Pixel::new(x as u32, y as u32))
    }

    /// Every pixel, column by column: `x` is the outer loop, `y` the inner.
    pub fn all_pixels(&self) -> Vec<Pixel> {
        let (w, h) = (self.width(), self.height());
        let mut out = Vec::with_capacity(w as usize * h as usize);
        for x in 0..w {
            for y in 0..h {
                out.push(Pixel::new(x, y));
            }
        }
        out
    }

    /// Write as JPEG or PNG, chosen by the exact (case-sensitive) extension.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> MediaResult<()> {
        let path = path.as_ref();
        let format = format_for_path(path)?;
        self.image
            .save_with_format(path, format)
            .with_context(|| format!("write picture '{}'", path.display()))?;
        Ok(())
    }
}

impl std::fmt::Display for Picture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Picture, filename {}\n   height {} width {}",
            self.filename,
            self.height(),
            self.width()
        )
    }
}

fn format_for_path(path: &Path) -> MediaResult<ImageFormat> {
    let name = path.to_string_lossy();
    let Some(dot) = name.rfind('.') else {
        return Err(MediaError::unsupported_format(format!(
            "'{name}' has no extension; expected .jpg, .jpeg, or .png"
        )));
    };
    match &name[dot..] {
        ".jpg" | ".jpeg" => Ok(ImageFormat::Jpeg),
        ".png" => Ok(ImageFormat::Png),
        other => Err(MediaError::unsupported_format(format!(
            "extension '{other}' on '{name}'; expected .jpg, .jpeg, or .png"
        ))),
    }
}
