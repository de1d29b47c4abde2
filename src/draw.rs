//! Shape and text drawing onto a [`Picture`].
//!
//! Geometry is built with `kurbo`, rasterized by `vello_cpu` into a
//! transparent premultiplied pixmap, then composited over the picture's RGB
//! bitmap. Outlines are turned into fill paths with `kurbo::stroke` so every
//! primitive goes through the same fill pipeline.
//!
//! Box arguments follow the textbook convention: `(x, y)` is the top-left
//! corner and the shape spans `x..=x + width`, `y..=y + height`.

use std::path::Path;

use anyhow::Context as _;
use kurbo::{BezPath, Ellipse, Line, PathEl, Point, Rect, Shape as _, Vec2};

use crate::{
    color::Color,
    foundation::{
        config::MediaConfig,
        error::{MediaError, MediaResult},
    },
    picture::Picture,
};

const TOLERANCE: f64 = 0.1;
const OUTLINE_WIDTH: f64 = 1.0;
const LINE_WIDTH: f64 = 2.0;
/// Coordinates are clamped to this magnitude before rasterizing.
const COORD_LIMIT: i64 = 1 << 20;

/// A font and size for [`Picture::add_text_with_style`].
#[derive(Clone, Debug)]
pub struct TextStyle {
    font_bytes: Vec<u8>,
    size: f32,
}

impl TextStyle {
    pub fn load(font_path: &Path, size: f32) -> MediaResult<Self> {
        if !size.is_finite() || size <= 0.0 {
            return Err(MediaError::invalid_argument(format!(
                "text size must be finite and > 0, got {size}"
            )));
        }
        let font_bytes = std::fs::read(font_path)
            .with_context(|| format!("read font '{}'", font_path.display()))?;
        Ok(Self { font_bytes, size })
    }

    pub fn size(&self) -> f32 {
        self.size
    }
}

/// Only the size is honoured; every style uses the configured monospace font.
pub fn make_style(
    cfg: &MediaConfig,
    _font_name: &str,
    _emphasis: &str,
    size: f32,
) -> MediaResult<TextStyle> {
    TextStyle::load(&cfg.font_path, size)
}

impl Picture {
    pub fn add_rect(
        &mut self,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        color: Color,
    ) -> MediaResult<()> {
        let rect = outline_box(x, y, width, height);
        let outline = stroke_outline(&rect.to_path(TOLERANCE), OUTLINE_WIDTH);
        fill_paths(self, &[outline], color)
    }

    pub fn add_rect_filled(
        &mut self,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        color: Color,
    ) -> MediaResult<()> {
        let rect = filled_box(x, y, width, height);
        fill_paths(self, &[rect.to_path(TOLERANCE)], color)
    }

    pub fn add_line(
        &mut self,
        x1: i64,
        y1: i64,
        x2: i64,
        y2: i64,
        color: Color,
    ) -> MediaResult<()> {
        let line = Line::new(pixel_center(x1, y1), pixel_center(x2, y2));
        let outline = stroke_outline(&line.to_path(TOLERANCE), LINE_WIDTH);
        fill_paths(self, &[outline], color)
    }

    pub fn add_oval(
        &mut self,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        color: Color,
    ) -> MediaResult<()> {
        let ellipse = Ellipse::from_rect(outline_box(x, y, width, height));
        let outline = stroke_outline(&ellipse.to_path(TOLERANCE), OUTLINE_WIDTH);
        fill_paths(self, &[outline], color)
    }

    pub fn add_oval_filled(
        &mut self,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        color: Color,
    ) -> MediaResult<()> {
        let ellipse = Ellipse::from_rect(filled_box(x, y, width, height));
        fill_paths(self, &[ellipse.to_path(TOLERANCE)], color)
    }

    /// Arc of the oval in the box, from `start` degrees spanning `sweep` degrees.
    #[allow(clippy::too_many_arguments)]
    pub fn add_arc(
        &mut self,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        start: f64,
        sweep: f64,
        color: Color,
    ) -> MediaResult<()> {
        let arc = box_arc(outline_box(x, y, width, height), start, sweep);
        let outline = stroke_outline(&arc.to_path(TOLERANCE), OUTLINE_WIDTH);
        fill_paths(self, &[outline], color)
    }

    /// Pie slice: the arc of [`Picture::add_arc`] closed through the center.
    #[allow(clippy::too_many_arguments)]
    pub fn add_arc_filled(
        &mut self,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        start: f64,
        sweep: f64,
        color: Color,
    ) -> MediaResult<()> {
        let arc = box_arc(filled_box(x, y, width, height), start, sweep);
        let from = arc.center
            + Vec2::new(
                arc.radii.x * arc.start_angle.cos(),
                arc.radii.y * arc.start_angle.sin(),
            );

        let mut pie = BezPath::new();
        pie.move_to(arc.center);
        pie.line_to(from);
        pie.extend(arc.append_iter(TOLERANCE));
        pie.close_path();
        fill_paths(self, &[pie], color)
    }

    /// Text in the configured monospace font with its top-left at `(x, y)`.
    pub fn add_text(
        &mut self,
        x: i64,
        y: i64,
        text: &str,
        size: f32,
        color: Color,
        cfg: &MediaConfig,
    ) -> MediaResult<()> {
        let style = TextStyle::load(&cfg.font_path, size)?;
        self.add_text_with_style(x, y, text, &style, color)
    }

    pub fn add_text_with_style(
        &mut self,
        x: i64,
        y: i64,
        text: &str,
        style: &TextStyle,
        color: Color,
    ) -> MediaResult<()> {
        let layout = layout_text(text, style, color)?;
        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(style.font_bytes.clone()),
            0,
        );

        render_onto(self, |ctx| {
            ctx.set_transform(vello_cpu::kurbo::Affine::translate((coord(x), coord(y))));
            for line in layout.lines() {
                for item in line.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                        continue;
                    };
                    let brush = run.style().brush;
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                        brush.r, brush.g, brush.b, 255,
                    ));
                    let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    ctx.glyph_run(&font)
                        .font_size(run.run().font_size())
                        .fill_glyphs(glyphs);
                }
            }
        })
    }
}

/// Maps the caller's `start` and `sweep` (degrees from the positive x-axis,
/// turning toward the top of the picture) onto the screen-space span
/// `(360 - start - sweep, 360 - start)` that the rasterizer sweeps through.
pub(crate) fn arc_span_degrees(start: f64, sweep: f64) -> (f64, f64) {
    (360.0 - start - sweep, 360.0 - start)
}

fn box_arc(bounds: Rect, start: f64, sweep: f64) -> kurbo::Arc {
    let (from, to) = arc_span_degrees(start, sweep);
    let mut span = to - from;
    if span.abs() < 360.0 && span < 0.0 {
        span += 360.0;
    }
    kurbo::Arc::new(
        bounds.center(),
        Vec2::new(bounds.width() / 2.0, bounds.height() / 2.0),
        from.to_radians(),
        span.clamp(-360.0, 360.0).to_radians(),
        0.0,
    )
}

fn coord(v: i64) -> f64 {
    v.clamp(-COORD_LIMIT, COORD_LIMIT) as f64
}

fn pixel_center(x: i64, y: i64) -> Point {
    Point::new(coord(x) + 0.5, coord(y) + 0.5)
}

/// Box through pixel centers, so a 1px outline lands on whole pixels.
fn outline_box(x: i64, y: i64, width: i64, height: i64) -> Rect {
    Rect::from_points(
        pixel_center(x, y),
        pixel_center(x.saturating_add(width), y.saturating_add(height)),
    )
}

/// Box covering every pixel in `x..=x + width`, `y..=y + height`.
fn filled_box(x: i64, y: i64, width: i64, height: i64) -> Rect {
    let r = Rect::from_points(
        Point::new(coord(x), coord(y)),
        Point::new(
            coord(x.saturating_add(width)),
            coord(y.saturating_add(height)),
        ),
    );
    Rect::new(r.x0, r.y0, r.x1 + 1.0, r.y1 + 1.0)
}

fn stroke_outline(path: &BezPath, width: f64) -> BezPath {
    kurbo::stroke(
        path.elements().iter().copied(),
        &kurbo::Stroke::new(width),
        &kurbo::StrokeOpts::default(),
        TOLERANCE,
    )
}

fn fill_paths(picture: &mut Picture, paths: &[BezPath], color: Color) -> MediaResult<()> {
    render_onto(picture, |ctx| {
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, 255,
        ));
        for path in paths {
            ctx.fill_path(&bezpath_to_cpu(path));
        }
    })
}

fn render_onto(
    picture: &mut Picture,
    draw: impl FnOnce(&mut vello_cpu::RenderContext),
) -> MediaResult<()> {
    let w: u16 = picture.width().try_into().map_err(|_| {
        MediaError::invalid_argument("picture width exceeds the drawable limit of 65535")
    })?;
    let h: u16 = picture.height().try_into().map_err(|_| {
        MediaError::invalid_argument("picture height exceeds the drawable limit of 65535")
    })?;

    let mut ctx = vello_cpu::RenderContext::new(w, h);
    draw(&mut ctx);
    ctx.flush();

    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    ctx.render_to_pixmap(&mut pixmap);
    let rgb: &mut [u8] = picture.image_mut();
    composite_premul_over_rgb(rgb, pixmap.data_as_u8_slice());
    Ok(())
}

/// `dst` is packed RGB8, `src` premultiplied RGBA8 of the same pixel count.
fn composite_premul_over_rgb(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.chunks_exact_mut(3).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 0 {
            continue;
        }
        if a == 255 {
            d.copy_from_slice(&s[..3]);
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            let v = u16::from(s[c]) + mul_div255(u16::from(d[c]), inv);
            d[c] = v.min(255) as u8;
        }
    }
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    let point = |p: Point| vello_cpu::kurbo::Point::new(p.x, p.y);

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point(p)),
            PathEl::LineTo(p) => out.line_to(point(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point(p1), point(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(point(p1), point(p2), point(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct TextBrush {
    r: u8,
    g: u8,
    b: u8,
}

fn layout_text(
    text: &str,
    style: &TextStyle,
    color: Color,
) -> MediaResult<parley::Layout<TextBrush>> {
    let mut font_ctx = parley::FontContext::default();
    let mut layout_ctx = parley::LayoutContext::<TextBrush>::new();

    let families = font_ctx
        .collection
        .register_fonts(parley::fontique::Blob::from(style.font_bytes.clone()), None);
    let family_id = families
        .first()
        .map(|(id, _)| *id)
        .ok_or_else(|| MediaError::invalid_argument("font file holds no font families"))?;
    let family_name = font_ctx
        .collection
        .family_name(family_id)
        .ok_or_else(|| MediaError::invalid_argument("registered font family has no name"))?
        .to_string();

    let mut builder = layout_ctx.ranged_builder(&mut font_ctx, text, 1.0, true);
    builder.push_default(parley::style::StyleProperty::FontStack(
        parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
    ));
    builder.push_default(parley::style::StyleProperty::FontSize(style.size));
    builder.push_default(parley::style::StyleProperty::Brush(TextBrush {
        r: color.r,
        g: color.g,
        b: color.b,
    }));

    let mut layout: parley::Layout<TextBrush> = builder.build(text);
    layout.break_all_lines(None);
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn at(p: &Picture, x: i64, y: i64) -> Color {
        p.pixel(x, y).unwrap().color(p).unwrap()
    }

    #[test]
    fn arc_span_converts_clockwise_angles() {
        assert_eq!(arc_span_degrees(0.0, 90.0), (270.0, 360.0));
        assert_eq!(arc_span_degrees(45.0, 180.0), (135.0, 315.0));
    }

    #[test]
    fn filled_rect_covers_inclusive_box() {
        let mut pic = Picture::blank(20, 20, Color::WHITE).unwrap();
        pic.add_rect_filled(5, 5, 4, 4, Color::RED).unwrap();

        assert_eq!(at(&pic, 7, 7), Color::RED);
        assert_ne!(at(&pic, 9, 9), Color::WHITE);
        assert_eq!(at(&pic, 4, 5), Color::WHITE);
        assert_eq!(at(&pic, 10, 9), Color::WHITE);
    }

    #[test]
    fn rect_outline_leaves_interior_untouched() {
        let mut pic = Picture::blank(20, 20, Color::WHITE).unwrap();
        pic.add_rect(2, 2, 10, 10, Color::BLUE).unwrap();

        assert_ne!(at(&pic, 2, 7), Color::WHITE);
        assert_ne!(at(&pic, 12, 7), Color::WHITE);
        assert_eq!(at(&pic, 7, 7), Color::WHITE);
    }

    #[test]
    fn filled_oval_paints_center_not_corners() {
        let mut pic = Picture::blank(40, 40, Color::WHITE).unwrap();
        pic.add_oval_filled(0, 0, 39, 39, Color::GREEN).unwrap();

        assert_eq!(at(&pic, 20, 20), Color::GREEN);
        assert_eq!(at(&pic, 0, 0), Color::WHITE);
        assert_eq!(at(&pic, 39, 39), Color::WHITE);
    }

    #[test]
    fn oval_outline_is_hollow() {
        let mut pic = Picture::blank(40, 40, Color::WHITE).unwrap();
        pic.add_oval(0, 0, 39, 39, Color::BLACK).unwrap();
        assert_eq!(at(&pic, 20, 20), Color::WHITE);
        assert_ne!(at(&pic, 20, 0), Color::WHITE);
    }

    #[test]
    fn filled_arc_covers_only_its_quadrant() {
        let mut pic = Picture::blank(100, 100, Color::WHITE).unwrap();
        pic.add_arc_filled(0, 0, 99, 99, 0.0, 90.0, Color::BLACK).unwrap();

        assert_eq!(at(&pic, 75, 25), Color::BLACK);
        assert_eq!(at(&pic, 25, 25), Color::WHITE);
        assert_eq!(at(&pic, 25, 75), Color::WHITE);
        assert_eq!(at(&pic, 75, 75), Color::WHITE);
    }

    #[test]
    fn arc_outline_is_hollow() {
        let mut pic = Picture::blank(100, 100, Color::WHITE).unwrap();
        pic.add_arc(0, 0, 99, 99, 0.0, 90.0, Color::BLACK).unwrap();
        assert_eq!(at(&pic, 75, 25), Color::WHITE);
        assert_ne!(at(&pic, 50, 0), Color::WHITE);
    }

    #[test]
    fn horizontal_line_is_drawn() {
        let mut pic = Picture::blank(20, 20, Color::WHITE).unwrap();
        pic.add_line(2, 10, 17, 10, Color::RED).unwrap();
        assert_ne!(at(&pic, 10, 10), Color::WHITE);
        assert_eq!(at(&pic, 10, 2), Color::WHITE);
    }

    #[test]
    fn shapes_past_the_edge_are_clipped() {
        let mut pic = Picture::blank(10, 10, Color::WHITE).unwrap();
        pic.add_rect_filled(-5, -5, 50, 50, Color::CYAN).unwrap();
        assert!(pic.as_rgb_image().pixels().all(|p| p.0 == [0, 255, 255]));
    }

    #[test]
    fn composite_blends_premultiplied_source() {
        let mut dst = vec![0u8, 0, 0, 200, 200, 200];
        let src = vec![128u8, 0, 0, 128, 0, 0, 0, 0];
        composite_premul_over_rgb(&mut dst, &src);
        assert_eq!(dst, vec![128, 0, 0, 200, 200, 200]);
    }

    #[test]
    fn text_needs_a_readable_font() {
        let mut pic = Picture::blank(20, 20, Color::WHITE).unwrap();
        let cfg = MediaConfig {
            font_path: PathBuf::from("/no/such/font.ttf"),
            ..MediaConfig::default()
        };
        let err = pic
            .add_text(0, 0, "hi", 12.0, Color::BLACK, &cfg)
            .unwrap_err();
        assert!(err.to_string().contains("read font"), "{err}");

        assert!(matches!(
            TextStyle::load(Path::new("/no/such/font.ttf"), 0.0),
            Err(MediaError::InvalidArgument(_))
        ));
    }

    fn bundled_font() -> MediaConfig {
        MediaConfig {
            font_path: PathBuf::from(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/tests/data/fonts/DejaVuSansMono.ttf"
            )),
            ..MediaConfig::default()
        }
    }

    fn ink_columns(pic: &Picture) -> Vec<u32> {
        let img = pic.as_rgb_image();
        (0..img.width())
            .filter(|&x| (0..img.height()).any(|y| img.get_pixel(x, y).0 != [255, 255, 255]))
            .collect()
    }

    #[test]
    fn text_is_drawn_in_the_requested_color_at_the_origin() {
        let cfg = bundled_font();
        let mut pic = Picture::blank(160, 48, Color::WHITE).unwrap();
        let style = make_style(&cfg, "Mono", "bold", 24.0).unwrap();
        assert_eq!(style.size(), 24.0);

        pic.add_text_with_style(40, 4, "Hello", &style, Color::RED)
            .unwrap();

        let cols = ink_columns(&pic);
        assert!(!cols.is_empty());
        assert!(cols[0] >= 40, "ink starts left of the origin at x={}", cols[0]);
        assert!(
            pic.as_rgb_image()
                .pixels()
                .any(|p| p.0[0] > 200 && p.0[1] < 80 && p.0[2] < 80),
            "no solid red glyph pixels"
        );
        let img = pic.as_rgb_image();
        assert!((0..img.width()).all(|x| img.get_pixel(x, 47).0 == [255, 255, 255]));
    }

    #[test]
    fn larger_text_covers_more_columns() {
        let cfg = bundled_font();
        let mut small = Picture::blank(300, 80, Color::WHITE).unwrap();
        let mut large = Picture::blank(300, 80, Color::WHITE).unwrap();

        small.add_text(0, 0, "MMMM", 12.0, Color::BLACK, &cfg).unwrap();
        large.add_text(0, 0, "MMMM", 36.0, Color::BLACK, &cfg).unwrap();

        let (s, l) = (ink_columns(&small), ink_columns(&large));
        assert!(!s.is_empty());
        assert!(l.last().unwrap() > s.last().unwrap());
    }

    #[test]
    fn extreme_coordinates_do_not_overflow() {
        let mut pic = Picture::blank(16, 16, Color::WHITE).unwrap();
        pic.add_rect(i64::MAX - 1, 0, 10, 10, Color::RED).unwrap();
        pic.add_rect_filled(0, i64::MAX, i64::MAX, 5, Color::RED).unwrap();
        pic.add_oval(i64::MIN, i64::MIN, -10, -10, Color::RED).unwrap();
        pic.add_arc(i64::MAX, 0, i64::MAX, 3, 0.0, 90.0, Color::RED)
            .unwrap();
        assert!(pic.as_rgb_image().pixels().all(|p| p.0 == [255, 255, 255]));

        pic.add_rect_filled(-(1 << 40), -(1 << 40), i64::MAX, i64::MAX, Color::BLUE)
            .unwrap();
        assert_eq!(at(&pic, 8, 8), Color::BLUE);
    }
}
