use crate::{
    color::{Color, ColorMode},
    foundation::error::{MediaError, MediaResult},
    picture::Picture,
};

/// A position inside a picture.
///
/// The handle holds no color data; reads and writes go through the picture
/// passed in, which keeps handles `Copy` and free of borrows. Coordinates are
/// validated when the handle is created by [`Picture::pixel`]; accessors still
/// reject a handle used against a picture too small to contain it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pixel {
    x: u32,
    y: u32,
}

impl Pixel {
    pub(crate) fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn color(&self, picture: &Picture) -> MediaResult<Color> {
        self.check(picture)?;
        Ok(Color::from(*picture.as_rgb_image().get_pixel(self.x, self.y)))
    }

    pub fn red(&self, picture: &Picture) -> MediaResult<u8> {
        Ok(self.color(picture)?.r)
    }

    pub fn green(&self, picture: &Picture) -> MediaResult<u8> {
        Ok(self.color(picture)?.g)
    }

    pub fn blue(&self, picture: &Picture) -> MediaResult<u8> {
        Ok(self.color(picture)?.b)
    }

    pub fn set_color(&self, picture: &mut Picture, color: Color) -> MediaResult<()> {
        self.check(picture)?;
        picture
            .image_mut()
            .put_pixel(self.x, self.y, color.to_rgb());
        Ok(())
    }

    pub fn set_red(&self, picture: &mut Picture, value: i64, mode: ColorMode) -> MediaResult<()> {
        let mut c = self.color(picture)?;
        c.r = mode.normalize(value);
        self.set_color(picture, c)
    }

    pub fn set_green(&self, picture: &mut Picture, value: i64, mode: ColorMode) -> MediaResult<()> {
        let mut c = self.color(picture)?;
        c.g = mode.normalize(value);
        self.set_color(picture, c)
    }

    pub fn set_blue(&self, picture: &mut Picture, value: i64, mode: ColorMode) -> MediaResult<()> {
        let mut c = self.color(picture)?;
        c.b = mode.normalize(value);
        self.set_color(picture, c)
    }

    pub fn describe(&self, picture: &Picture) -> MediaResult<String> {
        let c = self.color(picture)?;
        Ok(format!(
            "Pixel at ({},{}) red={} green={} blue={}",
            self.x, self.y, c.r, c.g, c.b
        ))
    }

    fn check(&self, picture: &Picture) -> MediaResult<()> {
        if self.x >= picture.width() || self.y >= picture.height() {
            return Err(MediaError::out_of_range(format!(
                "pixel ({}, {}) lies outside this {}x{} picture",
                self.x,
                self.y,
                picture.width(),
                picture.height()
            )));
        }
        Ok(())
    }
}
