//! The drawing-engine capability a surface delegates to.
//!
//! Method names and argument order follow the HTML canvas 2D API so that a
//! browser context can implement the trait one-to-one. Methods that can fail
//! in a browser (radius checks, transform arguments, pixel import/export)
//! return `Result`; the rest are infallible.

use crate::error::Result;
use crate::image::{ImageData, Region};
use crate::style::{CompositeOp, Fill, LineCap, LineJoin, PaintStyle};
use kurbo::Affine;

pub trait DrawingContext {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    // ─── Path construction ───────────────────────────────────────────────

    fn begin_path(&mut self);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64);
    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64);
    #[allow(clippy::too_many_arguments)]
    fn arc(
        &mut self,
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        anticlockwise: bool,
    ) -> Result<()>;
    fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) -> Result<()>;
    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn close_path(&mut self);
    fn clip(&mut self, rule: Fill);

    // ─── Painting ────────────────────────────────────────────────────────

    fn fill(&mut self, rule: Fill);
    fn stroke(&mut self);
    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64);

    // ─── Style state ─────────────────────────────────────────────────────

    fn set_fill_style(&mut self, style: &PaintStyle) -> Result<()>;
    fn set_stroke_style(&mut self, style: &PaintStyle) -> Result<()>;
    fn set_line_width(&mut self, width: f64);
    fn set_line_cap(&mut self, cap: LineCap);
    fn set_line_join(&mut self, join: LineJoin);
    fn set_miter_limit(&mut self, limit: f64);
    fn set_line_dash(&mut self, segments: &[f64]) -> Result<()>;
    fn set_line_dash_offset(&mut self, offset: f64);
    fn set_font(&mut self, font: &str);
    fn set_global_alpha(&mut self, alpha: f64);
    fn set_global_composite_operation(&mut self, op: CompositeOp) -> Result<()>;

    // ─── Transform & state stack ─────────────────────────────────────────

    fn scale(&mut self, x: f64, y: f64) -> Result<()>;
    fn rotate(&mut self, angle: f64) -> Result<()>;
    fn translate(&mut self, x: f64, y: f64) -> Result<()>;
    /// Post-multiply the current transform.
    fn transform(&mut self, m: Affine) -> Result<()>;
    /// Replace the current transform.
    fn set_transform(&mut self, m: Affine) -> Result<()>;
    fn save(&mut self);
    fn restore(&mut self);

    // ─── Raw pixels ──────────────────────────────────────────────────────

    /// Export a block of unpremultiplied packed pixels.
    fn get_image_data(&self, region: Region) -> Result<ImageData>;
    /// Replace pixels at `(x, y)` with `data`, ignoring transform, clip,
    /// alpha and compositing.
    fn put_image_data(&mut self, data: &ImageData, x: u32, y: u32) -> Result<()>;
}
