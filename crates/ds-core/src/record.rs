//! A drawing context that records the command stream.
//!
//! Nothing is rasterized except axis-aligned `fill_rect` / `clear_rect` with a
//! solid fill, which write straight into the context's own pixel store. That
//! is enough to observe the surface's cache re-derivation without a real
//! renderer, and the command log makes path equivalence checkable.

use crate::context::DrawingContext;
use crate::error::{Result, SurfaceError};
use crate::image::{ImageData, Region};
use crate::style::{CompositeOp, Fill, LineCap, LineJoin, PaintStyle};
use kurbo::Affine;
use std::cell::Cell;

/// One recorded context call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    BeginPath,
    MoveTo(f64, f64),
    LineTo(f64, f64),
    BezierCurveTo(f64, f64, f64, f64, f64, f64),
    QuadraticCurveTo(f64, f64, f64, f64),
    Arc {
        x: f64,
        y: f64,
        radius: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    },
    ArcTo(f64, f64, f64, f64, f64),
    Rect(f64, f64, f64, f64),
    ClosePath,
    Clip(Fill),
    Fill(Fill),
    Stroke,
    ClearRect(f64, f64, f64, f64),
    FillRect(f64, f64, f64, f64),
    StrokeRect(f64, f64, f64, f64),
    FillStyle(PaintStyle),
    StrokeStyle(PaintStyle),
    LineWidth(f64),
    LineCap(LineCap),
    LineJoin(LineJoin),
    MiterLimit(f64),
    LineDash(Vec<f64>),
    LineDashOffset(f64),
    Font(String),
    GlobalAlpha(f64),
    Composite(CompositeOp),
    Scale(f64, f64),
    Rotate(f64),
    Translate(f64, f64),
    Transform(Affine),
    SetTransform(Affine),
    Save,
    Restore,
    PutImageData { x: u32, y: u32, width: u32, height: u32 },
}

pub struct RecordingContext {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    fill: PaintStyle,
    saved_fills: Vec<PaintStyle>,
    commands: Vec<DrawCmd>,
    /// Reads are `&self`, so they are counted rather than logged.
    reads: Cell<usize>,
    last_read: Cell<Option<Region>>,
    refuse_puts: bool,
}

impl RecordingContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
            fill: PaintStyle::default(),
            saved_fills: Vec::new(),
            commands: Vec::new(),
            reads: Cell::new(0),
            last_read: Cell::new(None),
            refuse_puts: false,
        }
    }

    pub fn commands(&self) -> &[DrawCmd] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCmd> {
        std::mem::take(&mut self.commands)
    }

    /// How many times `get_image_data` was called.
    pub fn read_count(&self) -> usize {
        self.reads.get()
    }

    /// The region passed to the latest `get_image_data`.
    pub fn last_read(&self) -> Option<Region> {
        self.last_read.get()
    }

    /// Make `put_image_data` fail until switched back.
    pub fn refuse_puts(&mut self, refuse: bool) {
        self.refuse_puts = refuse;
    }

    /// Direct access to the context's own pixel store, bypassing the surface.
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    fn paint_rect(&mut self, x: f64, y: f64, w: f64, h: f64, value: u32) {
        let x0 = x.min(x + w).max(0.0).round() as u32;
        let y0 = y.min(y + h).max(0.0).round() as u32;
        let x1 = (x.max(x + w).round().max(0.0) as u32).min(self.width);
        let y1 = (y.max(y + h).round().max(0.0) as u32).min(self.height);
        for py in y0..y1 {
            for px in x0..x1 {
                self.pixels[(py * self.width + px) as usize] = value;
            }
        }
    }
}

impl DrawingContext for RecordingContext {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn begin_path(&mut self) {
        self.commands.push(DrawCmd::BeginPath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.commands.push(DrawCmd::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.commands.push(DrawCmd::LineTo(x, y));
    }

    fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        self.commands
            .push(DrawCmd::BezierCurveTo(cp1x, cp1y, cp2x, cp2y, x, y));
    }

    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        self.commands.push(DrawCmd::QuadraticCurveTo(cpx, cpy, x, y));
    }

    fn arc(
        &mut self,
        x: f64,
        y: f64,
        radius: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    ) -> Result<()> {
        if radius < 0.0 {
            return Err(SurfaceError::Context(format!("negative arc radius {radius}")));
        }
        self.commands.push(DrawCmd::Arc {
            x,
            y,
            radius,
            start,
            end,
            anticlockwise,
        });
        Ok(())
    }

    fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) -> Result<()> {
        if radius < 0.0 {
            return Err(SurfaceError::Context(format!("negative arc radius {radius}")));
        }
        self.commands.push(DrawCmd::ArcTo(x1, y1, x2, y2, radius));
        Ok(())
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.commands.push(DrawCmd::Rect(x, y, w, h));
    }

    fn close_path(&mut self) {
        self.commands.push(DrawCmd::ClosePath);
    }

    fn clip(&mut self, rule: Fill) {
        self.commands.push(DrawCmd::Clip(rule));
    }

    fn fill(&mut self, rule: Fill) {
        self.commands.push(DrawCmd::Fill(rule));
    }

    fn stroke(&mut self) {
        self.commands.push(DrawCmd::Stroke);
    }

    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.commands.push(DrawCmd::ClearRect(x, y, w, h));
        self.paint_rect(x, y, w, h, 0);
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.commands.push(DrawCmd::FillRect(x, y, w, h));
        if let PaintStyle::Solid(color) = self.fill {
            self.paint_rect(x, y, w, h, color.to_packed());
        }
    }

    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.commands.push(DrawCmd::StrokeRect(x, y, w, h));
    }

    fn set_fill_style(&mut self, style: &PaintStyle) -> Result<()> {
        self.fill = style.clone();
        self.commands.push(DrawCmd::FillStyle(style.clone()));
        Ok(())
    }

    fn set_stroke_style(&mut self, style: &PaintStyle) -> Result<()> {
        self.commands.push(DrawCmd::StrokeStyle(style.clone()));
        Ok(())
    }

    fn set_line_width(&mut self, width: f64) {
        self.commands.push(DrawCmd::LineWidth(width));
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.commands.push(DrawCmd::LineCap(cap));
    }

    fn set_line_join(&mut self, join: LineJoin) {
        self.commands.push(DrawCmd::LineJoin(join));
    }

    fn set_miter_limit(&mut self, limit: f64) {
        self.commands.push(DrawCmd::MiterLimit(limit));
    }

    fn set_line_dash(&mut self, segments: &[f64]) -> Result<()> {
        self.commands.push(DrawCmd::LineDash(segments.to_vec()));
        Ok(())
    }

    fn set_line_dash_offset(&mut self, offset: f64) {
        self.commands.push(DrawCmd::LineDashOffset(offset));
    }

    fn set_font(&mut self, font: &str) {
        self.commands.push(DrawCmd::Font(font.to_string()));
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.commands.push(DrawCmd::GlobalAlpha(alpha));
    }

    fn set_global_composite_operation(&mut self, op: CompositeOp) -> Result<()> {
        self.commands.push(DrawCmd::Composite(op));
        Ok(())
    }

    fn scale(&mut self, x: f64, y: f64) -> Result<()> {
        self.commands.push(DrawCmd::Scale(x, y));
        Ok(())
    }

    fn rotate(&mut self, angle: f64) -> Result<()> {
        self.commands.push(DrawCmd::Rotate(angle));
        Ok(())
    }

    fn translate(&mut self, x: f64, y: f64) -> Result<()> {
        self.commands.push(DrawCmd::Translate(x, y));
        Ok(())
    }

    fn transform(&mut self, m: Affine) -> Result<()> {
        self.commands.push(DrawCmd::Transform(m));
        Ok(())
    }

    fn set_transform(&mut self, m: Affine) -> Result<()> {
        self.commands.push(DrawCmd::SetTransform(m));
        Ok(())
    }

    fn save(&mut self) {
        self.saved_fills.push(self.fill.clone());
        self.commands.push(DrawCmd::Save);
    }

    fn restore(&mut self) {
        if let Some(fill) = self.saved_fills.pop() {
            self.fill = fill;
        }
        self.commands.push(DrawCmd::Restore);
    }

    fn get_image_data(&self, region: Region) -> Result<ImageData> {
        self.reads.set(self.reads.get() + 1);
        self.last_read.set(Some(region));
        let clipped = region.clip_to(self.width, self.height);
        Ok(ImageData::copy_from(&self.pixels, self.width, clipped))
    }

    fn put_image_data(&mut self, data: &ImageData, x: u32, y: u32) -> Result<()> {
        if self.refuse_puts {
            return Err(SurfaceError::Context("put_image_data refused".into()));
        }
        self.commands.push(DrawCmd::PutImageData {
            x,
            y,
            width: data.width(),
            height: data.height(),
        });
        for row in 0..data.height() {
            for col in 0..data.width() {
                let (px, py) = (x + col, y + row);
                if px < self.width && py < self.height {
                    self.pixels[(py * self.width + px) as usize] = data.data()[(row * data.width() + col) as usize];
                }
            }
        }
        Ok(())
    }
}
