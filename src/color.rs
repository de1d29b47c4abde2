/// How out-of-range channel values are folded into `0..=255`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ColorMode {
    /// Saturate: below 0 becomes 0, above 255 becomes 255.
    #[default]
    Clamp,
    /// Modulo 256, always non-negative (`-1` becomes 255).
    WrapAround,
}

impl ColorMode {
    pub fn normalize(self, value: i64) -> u8 {
        match self {
            ColorMode::WrapAround => value.rem_euclid(256) as u8,
            ColorMode::Clamp => value.clamp(0, 255) as u8,
        }
    }

    /// Truncates toward zero before normalizing, so `12.9` behaves like `12`.
    pub fn normalize_f64(self, value: f64) -> u8 {
        // `as` saturates on overflow and maps NaN to 0.
        self.normalize(value.trunc() as i64)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);
    pub const YELLOW: Color = Color::new(255, 255, 0);
    pub const CYAN: Color = Color::new(0, 255, 255);
    pub const MAGENTA: Color = Color::new(255, 0, 255);
    pub const ORANGE: Color = Color::new(255, 165, 0);
    pub const PINK: Color = Color::new(255, 20, 147);
    pub const GRAY: Color = Color::new(165, 165, 165);
    pub const DARK_GRAY: Color = Color::new(120, 120, 120);
    pub const LIGHT_GRAY: Color = Color::new(210, 210, 210);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Each channel scaled by 0.8, truncated.
    pub fn darker(self) -> Self {
        let scale = |c: u8| (f64::from(c) * 0.80) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }

    /// Each channel scaled by 1.1, truncated, capped at 255.
    pub fn lighter(self) -> Self {
        let scale = |c: u8| (f64::from(c) * 1.10).min(255.0) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }

    pub fn brighter(self) -> Self {
        self.lighter()
    }

    /// Euclidean distance in RGB space.
    pub fn distance(self, other: Color) -> f64 {
        let d = |a: u8, b: u8| {
            let v = f64::from(a) - f64::from(b);
            v * v
        };
        (d(self.r, other.r) + d(self.g, other.g) + d(self.b, other.b)).sqrt()
    }

    pub fn to_rgb(self) -> image::Rgb<u8> {
        image::Rgb([self.r, self.g, self.b])
    }
}

impl From<image::Rgb<u8>> for Color {
    fn from(px: image::Rgb<u8>) -> Self {
        let [r, g, b] = px.0;
        Self::new(r, g, b)
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}

pub fn normalize(value: i64, mode: ColorMode) -> u8 {
    mode.normalize(value)
}

/// Build a color from arbitrary integers, normalizing each channel.
pub fn make_color(r: i64, g: i64, b: i64, mode: ColorMode) -> Color {
    Color::new(mode.normalize(r), mode.normalize(g), mode.normalize(b))
}
