//! Software drawing context backed by a tiny-skia `Pixmap`.
//!
//! Implements the canvas-style [`DrawingContext`] so a [`ds_core::DrawSurface`]
//! can draw without a browser. The current transform applies at paint time,
//! as it does for the path builder in a canvas.

use crate::paint;
use crate::path::PathBuilder;
use ds_core::pixel;
use ds_core::{
    CompositeOp, DrawingContext, Fill, Gradient, GradientKind, ImageData, LineCap, LineJoin,
    PaintStyle, Region, Result, SurfaceError,
};
use kurbo::{Affine, Point};
use tiny_skia::{BlendMode, ColorU8, Mask, Paint, Pixmap, Rect};

#[derive(Clone)]
struct DrawState {
    transform: Affine,
    fill: PaintStyle,
    stroke: PaintStyle,
    line_width: f64,
    line_cap: LineCap,
    line_join: LineJoin,
    miter_limit: f64,
    line_dash: Vec<f64>,
    line_dash_offset: f64,
    font: String,
    global_alpha: f64,
    composite: CompositeOp,
    clip: Option<Mask>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            fill: PaintStyle::default(),
            stroke: PaintStyle::default(),
            line_width: 1.0,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            miter_limit: 10.0,
            line_dash: Vec::new(),
            line_dash_offset: 0.0,
            font: "10px sans-serif".to_string(),
            global_alpha: 1.0,
            composite: CompositeOp::SourceOver,
            clip: None,
        }
    }
}

pub struct SkiaContext {
    pixmap: Pixmap,
    path: PathBuilder,
    state: DrawState,
    stack: Vec<DrawState>,
}

impl SkiaContext {
    /// A transparent context of the given size.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap =
            Pixmap::new(width, height).ok_or(SurfaceError::InvalidDimensions { width, height })?;
        Ok(Self::from_pixmap(pixmap))
    }

    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self {
            pixmap,
            path: PathBuilder::new(),
            state: DrawState::default(),
            stack: Vec::new(),
        }
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    pub fn font(&self) -> &str {
        &self.state.font
    }

    pub fn state_depth(&self) -> usize {
        self.stack.len()
    }

    fn paint_for(&self, style: &PaintStyle) -> Option<Paint<'static>> {
        paint::paint(style, self.state.global_alpha, self.state.composite)
    }

    fn device_transform(&self) -> tiny_skia::Transform {
        paint::transform(self.state.transform)
    }

    fn paint_rect(&mut self, x: f64, y: f64, w: f64, h: f64, paint: &Paint<'_>) {
        let Some(rect) = normalized_rect(x, y, w, h) else {
            return;
        };
        let transform = self.device_transform();
        self.pixmap
            .fill_rect(rect, paint, transform, self.state.clip.as_ref());
    }
}

fn normalized_rect(x: f64, y: f64, w: f64, h: f64) -> Option<Rect> {
    if w == 0.0 || h == 0.0 {
        return None;
    }
    Rect::from_ltrb(
        x.min(x + w) as f32,
        y.min(y + h) as f32,
        x.max(x + w) as f32,
        y.max(y + h) as f32,
    )
}

fn check_gradient(style: &PaintStyle) -> Result<()> {
    if let PaintStyle::Gradient(Gradient {
        kind: GradientKind::Radial { r0, r1, .. },
        ..
    }) = style
    {
        if *r0 < 0.0 || *r1 < 0.0 {
            return Err(SurfaceError::Context(format!(
                "negative radial gradient radius ({r0}, {r1})"
            )));
        }
    }
    Ok(())
}

fn check_finite(values: &[f64]) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SurfaceError::Context(format!("non-finite transform argument in {values:?}")))
    }
}

impl DrawingContext for SkiaContext {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    // ─── Path construction ───────────────────────────────────────────────

    fn begin_path(&mut self) {
        self.path.clear();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.path.move_to(Point::new(x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.path.line_to(Point::new(x, y));
    }

    fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        self.path
            .curve_to(Point::new(cp1x, cp1y), Point::new(cp2x, cp2y), Point::new(x, y));
    }

    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        self.path.quad_to(Point::new(cpx, cpy), Point::new(x, y));
    }

    fn arc(
        &mut self,
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        anticlockwise: bool,
    ) -> Result<()> {
        self.path
            .arc(Point::new(x, y), radius, start_angle, end_angle, anticlockwise)
    }

    fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) -> Result<()> {
        self.path
            .arc_to(Point::new(x1, y1), Point::new(x2, y2), radius)
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.path.rect(x, y, w, h);
    }

    fn close_path(&mut self) {
        self.path.close();
    }

    fn clip(&mut self, rule: Fill) {
        let (w, h) = (self.pixmap.width(), self.pixmap.height());
        let transform = self.device_transform();
        let rule = paint::fill_rule(rule);

        let Some(path) = self.path.to_skia() else {
            // Clipping to an empty path hides everything.
            self.state.clip = Mask::new(w, h);
            return;
        };
        match self.state.clip.as_mut() {
            Some(mask) => mask.intersect_path(&path, rule, true, transform),
            None => {
                if let Some(mut mask) = Mask::new(w, h) {
                    mask.fill_path(&path, rule, true, transform);
                    self.state.clip = Some(mask);
                }
            }
        }
    }

    // ─── Painting ────────────────────────────────────────────────────────

    fn fill(&mut self, rule: Fill) {
        let Some(path) = self.path.to_skia() else {
            return;
        };
        let Some(paint) = self.paint_for(&self.state.fill) else {
            return;
        };
        let transform = self.device_transform();
        self.pixmap.fill_path(
            &path,
            &paint,
            paint::fill_rule(rule),
            transform,
            self.state.clip.as_ref(),
        );
    }

    fn stroke(&mut self) {
        let Some(path) = self.path.to_skia() else {
            return;
        };
        let Some(paint) = self.paint_for(&self.state.stroke) else {
            return;
        };
        let s = &self.state;
        let stroke = paint::stroke(
            s.line_width,
            s.line_cap,
            s.line_join,
            s.miter_limit,
            &s.line_dash,
            s.line_dash_offset,
        );
        let transform = self.device_transform();
        self.pixmap
            .stroke_path(&path, &paint, &stroke, transform, self.state.clip.as_ref());
    }

    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let mut paint = Paint::default();
        paint.blend_mode = BlendMode::Clear;
        self.paint_rect(x, y, w, h, &paint);
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        if let Some(paint) = self.paint_for(&self.state.fill) {
            self.paint_rect(x, y, w, h, &paint);
        }
    }

    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let Some(paint) = self.paint_for(&self.state.stroke) else {
            return;
        };
        let mut outline = PathBuilder::new();
        outline.rect(x, y, w, h);
        let Some(path) = outline.to_skia() else {
            return;
        };
        let s = &self.state;
        let stroke = paint::stroke(
            s.line_width,
            s.line_cap,
            s.line_join,
            s.miter_limit,
            &s.line_dash,
            s.line_dash_offset,
        );
        let transform = self.device_transform();
        self.pixmap
            .stroke_path(&path, &paint, &stroke, transform, self.state.clip.as_ref());
    }

    // ─── Style state ─────────────────────────────────────────────────────

    fn set_fill_style(&mut self, style: &PaintStyle) -> Result<()> {
        check_gradient(style)?;
        self.state.fill = style.clone();
        Ok(())
    }

    fn set_stroke_style(&mut self, style: &PaintStyle) -> Result<()> {
        check_gradient(style)?;
        self.state.stroke = style.clone();
        Ok(())
    }

    fn set_line_width(&mut self, width: f64) {
        // Canvas ignores zero, negative and non-finite widths.
        if width.is_finite() && width > 0.0 {
            self.state.line_width = width;
        }
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.state.line_cap = cap;
    }

    fn set_line_join(&mut self, join: LineJoin) {
        self.state.line_join = join;
    }

    fn set_miter_limit(&mut self, limit: f64) {
        if limit.is_finite() && limit > 0.0 {
            self.state.miter_limit = limit;
        }
    }

    fn set_line_dash(&mut self, segments: &[f64]) -> Result<()> {
        if segments.iter().any(|s| !s.is_finite() || *s < 0.0) {
            log::debug!("ignoring invalid line dash {segments:?}");
            return Ok(());
        }
        self.state.line_dash = segments.to_vec();
        Ok(())
    }

    fn set_line_dash_offset(&mut self, offset: f64) {
        if offset.is_finite() {
            self.state.line_dash_offset = offset;
        }
    }

    fn set_font(&mut self, font: &str) {
        // No text rendering here; keep the value for save/restore round-trips.
        log::debug!("font set to {font:?}");
        self.state.font = font.to_string();
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        if (0.0..=1.0).contains(&alpha) {
            self.state.global_alpha = alpha;
        }
    }

    fn set_global_composite_operation(&mut self, op: CompositeOp) -> Result<()> {
        self.state.composite = op;
        Ok(())
    }

    // ─── Transform & state stack ─────────────────────────────────────────

    fn scale(&mut self, x: f64, y: f64) -> Result<()> {
        check_finite(&[x, y])?;
        self.state.transform *= Affine::scale_non_uniform(x, y);
        Ok(())
    }

    fn rotate(&mut self, angle: f64) -> Result<()> {
        check_finite(&[angle])?;
        self.state.transform *= Affine::rotate(angle);
        Ok(())
    }

    fn translate(&mut self, x: f64, y: f64) -> Result<()> {
        check_finite(&[x, y])?;
        self.state.transform *= Affine::translate((x, y));
        Ok(())
    }

    fn transform(&mut self, m: Affine) -> Result<()> {
        check_finite(&m.as_coeffs())?;
        self.state.transform *= m;
        Ok(())
    }

    fn set_transform(&mut self, m: Affine) -> Result<()> {
        check_finite(&m.as_coeffs())?;
        self.state.transform = m;
        Ok(())
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    // ─── Raw pixels ──────────────────────────────────────────────────────

    fn get_image_data(&self, region: Region) -> Result<ImageData> {
        let (w, h) = (self.pixmap.width(), self.pixmap.height());
        let mut out = ImageData::new(region.width, region.height);
        let src = self.pixmap.pixels();
        let data = out.data_mut();
        for row in 0..region.height {
            let y = region.y.saturating_add(row);
            if y >= h {
                break;
            }
            for col in 0..region.width {
                let x = region.x.saturating_add(col);
                if x >= w {
                    break;
                }
                let c = src[(y * w + x) as usize].demultiply();
                data[(row * region.width + col) as usize] =
                    pixel::pack(c.red(), c.green(), c.blue(), c.alpha());
            }
        }
        Ok(out)
    }

    fn put_image_data(&mut self, data: &ImageData, x: u32, y: u32) -> Result<()> {
        let (w, h) = (self.pixmap.width(), self.pixmap.height());
        let dst = self.pixmap.pixels_mut();
        for row in 0..data.height() {
            let ty = y.saturating_add(row);
            if ty >= h {
                break;
            }
            for col in 0..data.width() {
                let tx = x.saturating_add(col);
                if tx >= w {
                    break;
                }
                let [r, g, b, a] = pixel::unpack(data.data()[(row * data.width() + col) as usize]);
                dst[(ty * w + tx) as usize] = ColorU8::from_rgba(r, g, b, a).premultiply();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ds_core::Color;
    use pretty_assertions::assert_eq;

    const RED: u32 = 0xFF00_00FF;
    const BLUE: u32 = 0xFFFF_0000;

    fn pixel_at(ctx: &SkiaContext, x: u32, y: u32) -> u32 {
        ctx.get_image_data(Region::new(x, y, 1, 1)).unwrap().data()[0]
    }

    fn ctx(w: u32, h: u32) -> SkiaContext {
        SkiaContext::new(w, h).unwrap()
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(SkiaContext::new(0, 4).is_err());
    }

    #[test]
    fn starts_transparent() {
        let c = ctx(2, 2);
        assert_eq!(c.get_image_data(Region::full(2, 2)).unwrap().data(), &[0; 4]);
    }

    #[test]
    fn put_then_get_preserves_opaque_pixels() {
        let mut c = ctx(3, 3);
        let patch = ImageData::from_packed(2, 1, vec![RED, BLUE]).unwrap();
        c.put_image_data(&patch, 1, 2).unwrap();
        assert_eq!(pixel_at(&c, 1, 2), RED);
        assert_eq!(pixel_at(&c, 2, 2), BLUE);
        assert_eq!(pixel_at(&c, 0, 2), 0);
    }

    #[test]
    fn put_clips_at_the_edge() {
        let mut c = ctx(2, 2);
        let patch = ImageData::from_packed(2, 2, vec![RED; 4]).unwrap();
        c.put_image_data(&patch, 1, 1).unwrap();
        assert_eq!(pixel_at(&c, 1, 1), RED);
        assert_eq!(pixel_at(&c, 0, 0), 0);
    }

    #[test]
    fn fill_rect_and_clear_rect() {
        let mut c = ctx(4, 4);
        c.set_fill_style(&Color::rgba(1.0, 0.0, 0.0, 1.0).into())
            .unwrap();
        c.fill_rect(0.0, 0.0, 4.0, 4.0);
        assert_eq!(pixel_at(&c, 3, 3), RED);
        c.clear_rect(0.0, 0.0, 2.0, 2.0);
        assert_eq!(pixel_at(&c, 1, 1), 0);
        assert_eq!(pixel_at(&c, 2, 2), RED);
    }

    #[test]
    fn negative_size_rect_is_normalized() {
        let mut c = ctx(4, 4);
        c.set_fill_style(&Color::rgba(1.0, 0.0, 0.0, 1.0).into())
            .unwrap();
        c.fill_rect(4.0, 4.0, -2.0, -2.0);
        assert_eq!(pixel_at(&c, 3, 3), RED);
        assert_eq!(pixel_at(&c, 0, 0), 0);
    }

    #[test]
    fn clip_restricts_painting() {
        let mut c = ctx(4, 4);
        c.rect(0.0, 0.0, 2.0, 4.0);
        c.clip(Fill::NonZero);
        c.set_fill_style(&Color::rgba(1.0, 0.0, 0.0, 1.0).into())
            .unwrap();
        c.fill_rect(0.0, 0.0, 4.0, 4.0);
        assert_eq!(pixel_at(&c, 1, 1), RED);
        assert_eq!(pixel_at(&c, 3, 1), 0);
    }

    #[test]
    fn restore_drops_clip_and_style() {
        let mut c = ctx(4, 4);
        c.save();
        c.set_fill_style(&Color::rgba(0.0, 0.0, 1.0, 1.0).into())
            .unwrap();
        c.begin_path();
        c.clip(Fill::NonZero);
        assert_eq!(c.state_depth(), 1);
        c.restore();
        assert_eq!(c.state_depth(), 0);
        c.fill_rect(0.0, 0.0, 4.0, 4.0);
        // Default fill is opaque black.
        assert_eq!(pixel_at(&c, 3, 3), 0xFF00_0000);
    }

    #[test]
    fn translate_moves_drawing() {
        let mut c = ctx(4, 4);
        c.set_fill_style(&Color::rgba(1.0, 0.0, 0.0, 1.0).into())
            .unwrap();
        c.translate(2.0, 2.0).unwrap();
        c.fill_rect(0.0, 0.0, 2.0, 2.0);
        assert_eq!(pixel_at(&c, 0, 0), 0);
        assert_eq!(pixel_at(&c, 3, 3), RED);
    }

    #[test]
    fn invalid_state_values_are_ignored() {
        let mut c = ctx(1, 1);
        c.set_global_alpha(2.0);
        c.set_line_width(-1.0);
        c.set_line_dash(&[1.0, -2.0]).unwrap();
        assert_eq!(c.state.global_alpha, 1.0);
        assert_eq!(c.state.line_width, 1.0);
        assert!(c.state.line_dash.is_empty());
    }

    #[test]
    fn non_finite_transforms_fail() {
        let mut c = ctx(1, 1);
        assert!(c.scale(f64::NAN, 1.0).is_err());
        assert!(c.rotate(f64::INFINITY).is_err());
        assert_eq!(c.state.transform, Affine::IDENTITY);
    }

    #[test]
    fn negative_radial_radius_is_rejected() {
        let mut c = ctx(1, 1);
        let g = Gradient::radial(0.0, 0.0, -1.0, 0.0, 0.0, 4.0);
        assert!(c.set_fill_style(&g.into()).is_err());
    }

    #[test]
    fn font_is_kept_across_save_restore() {
        let mut c = ctx(1, 1);
        c.save();
        c.set_font("bold 12px serif");
        assert_eq!(c.font(), "bold 12px serif");
        c.restore();
        assert_eq!(c.font(), "10px sans-serif");
    }
}
