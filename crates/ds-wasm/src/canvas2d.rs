//! Browser drawing context.
//!
//! Forwards every [`DrawingContext`] call to an HTML `<canvas>` through
//! `CanvasRenderingContext2d`. The canvas keeps its own pixels; the surface
//! reads them back with `getImageData` after each draw.

use ds_core::{
    Affine, CompositeOp, DrawingContext, Extend, Fill, Gradient, GradientKind, ImageData, LineCap,
    LineJoin, PaintStyle, Region, Result, SurfaceError,
};
use wasm_bindgen::{Clamped, JsValue};
use web_sys::{CanvasGradient, CanvasRenderingContext2d, CanvasWindingRule};

fn js_err(e: JsValue) -> SurfaceError {
    SurfaceError::Context(format!("{e:?}"))
}

pub fn winding_rule(rule: Fill) -> CanvasWindingRule {
    match rule {
        Fill::NonZero => CanvasWindingRule::Nonzero,
        Fill::EvenOdd => CanvasWindingRule::Evenodd,
    }
}

pub struct CanvasContext {
    ctx: CanvasRenderingContext2d,
    width: u32,
    height: u32,
}

impl CanvasContext {
    /// Wrap a context attached to a canvas element; its size is fixed here.
    /// The transform is reset so the surface starts from the identity.
    pub fn new(ctx: CanvasRenderingContext2d) -> Result<Self> {
        let canvas = ctx
            .canvas()
            .ok_or_else(|| SurfaceError::Context("context has no canvas element".into()))?;
        let (width, height) = (canvas.width(), canvas.height());
        ctx.reset_transform().map_err(js_err)?;
        Ok(Self { ctx, width, height })
    }

    pub fn raw(&self) -> &CanvasRenderingContext2d {
        &self.ctx
    }

    fn gradient(&self, g: &Gradient) -> Result<CanvasGradient> {
        let grad = match g.kind {
            GradientKind::Linear { x0, y0, x1, y1 } => self.ctx.create_linear_gradient(x0, y0, x1, y1),
            GradientKind::Radial {
                x0,
                y0,
                r0,
                x1,
                y1,
                r1,
            } => self
                .ctx
                .create_radial_gradient(x0, y0, r0, x1, y1, r1)
                .map_err(js_err)?,
        };
        if g.extend != Extend::Pad {
            log::warn!("canvas gradients always pad, ignoring {:?}", g.extend);
        }
        for stop in &g.stops {
            grad.add_color_stop(stop.offset, &stop.color.to_hex())
                .map_err(js_err)?;
        }
        Ok(grad)
    }
}

impl DrawingContext for CanvasContext {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    // ─── Path construction ───────────────────────────────────────────────

    fn begin_path(&mut self) {
        self.ctx.begin_path();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.ctx.move_to(x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.ctx.line_to(x, y);
    }

    fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        self.ctx.bezier_curve_to(cp1x, cp1y, cp2x, cp2y, x, y);
    }

    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        self.ctx.quadratic_curve_to(cpx, cpy, x, y);
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
        self.ctx
            .arc_with_anticlockwise(x, y, radius, start_angle, end_angle, anticlockwise)
            .map_err(js_err)
    }

    fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) -> Result<()> {
        self.ctx.arc_to(x1, y1, x2, y2, radius).map_err(js_err)
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ctx.rect(x, y, w, h);
    }

    fn close_path(&mut self) {
        self.ctx.close_path();
    }

    fn clip(&mut self, rule: Fill) {
        self.ctx.clip_with_canvas_winding_rule(winding_rule(rule));
    }

    // ─── Painting ────────────────────────────────────────────────────────

    fn fill(&mut self, rule: Fill) {
        self.ctx.fill_with_canvas_winding_rule(winding_rule(rule));
    }

    fn stroke(&mut self) {
        self.ctx.stroke();
    }

    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ctx.clear_rect(x, y, w, h);
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ctx.fill_rect(x, y, w, h);
    }

    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ctx.stroke_rect(x, y, w, h);
    }

    // ─── Style state ─────────────────────────────────────────────────────

    fn set_fill_style(&mut self, style: &PaintStyle) -> Result<()> {
        match style {
            PaintStyle::Solid(color) => self.ctx.set_fill_style_str(&color.to_hex()),
            PaintStyle::Gradient(g) => {
                let grad = self.gradient(g)?;
                self.ctx.set_fill_style_canvas_gradient(&grad);
            }
        }
        Ok(())
    }

    fn set_stroke_style(&mut self, style: &PaintStyle) -> Result<()> {
        match style {
            PaintStyle::Solid(color) => self.ctx.set_stroke_style_str(&color.to_hex()),
            PaintStyle::Gradient(g) => {
                let grad = self.gradient(g)?;
                self.ctx.set_stroke_style_canvas_gradient(&grad);
            }
        }
        Ok(())
    }

    fn set_line_width(&mut self, width: f64) {
        self.ctx.set_line_width(width);
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.ctx.set_line_cap(cap.as_css());
    }

    fn set_line_join(&mut self, join: LineJoin) {
        self.ctx.set_line_join(join.as_css());
    }

    fn set_miter_limit(&mut self, limit: f64) {
        self.ctx.set_miter_limit(limit);
    }

    fn set_line_dash(&mut self, segments: &[f64]) -> Result<()> {
        let array: js_sys::Array = segments.iter().map(|&s| JsValue::from_f64(s)).collect();
        self.ctx.set_line_dash(&array).map_err(js_err)
    }

    fn set_line_dash_offset(&mut self, offset: f64) {
        self.ctx.set_line_dash_offset(offset);
    }

    fn set_font(&mut self, font: &str) {
        self.ctx.set_font(font);
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.ctx.set_global_alpha(alpha);
    }

    fn set_global_composite_operation(&mut self, op: CompositeOp) -> Result<()> {
        self.ctx
            .set_global_composite_operation(op.as_css())
            .map_err(js_err)
    }

    // ─── Transform & state stack ─────────────────────────────────────────

    fn scale(&mut self, x: f64, y: f64) -> Result<()> {
        self.ctx.scale(x, y).map_err(js_err)
    }

    fn rotate(&mut self, angle: f64) -> Result<()> {
        self.ctx.rotate(angle).map_err(js_err)
    }

    fn translate(&mut self, x: f64, y: f64) -> Result<()> {
        self.ctx.translate(x, y).map_err(js_err)
    }

    fn transform(&mut self, m: Affine) -> Result<()> {
        let [a, b, c, d, e, f] = m.as_coeffs();
        self.ctx.transform(a, b, c, d, e, f).map_err(js_err)
    }

    fn set_transform(&mut self, m: Affine) -> Result<()> {
        let [a, b, c, d, e, f] = m.as_coeffs();
        self.ctx.set_transform(a, b, c, d, e, f).map_err(js_err)
    }

    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    // ─── Raw pixels ──────────────────────────────────────────────────────

    fn get_image_data(&self, region: Region) -> Result<ImageData> {
        let image = self
            .ctx
            .get_image_data(
                f64::from(region.x),
                f64::from(region.y),
                f64::from(region.width),
                f64::from(region.height),
            )
            .map_err(js_err)?;
        ImageData::from_rgba8(image.width(), image.height(), &image.data())
    }

    fn put_image_data(&mut self, data: &ImageData, x: u32, y: u32) -> Result<()> {
        let bytes = data.to_rgba8();
        let image = web_sys::ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(&bytes),
            data.width(),
            data.height(),
        )
        .map_err(js_err)?;
        self.ctx
            .put_image_data(&image, f64::from(x), f64::from(y))
            .map_err(js_err)
    }
}
