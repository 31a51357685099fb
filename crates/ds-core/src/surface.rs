//! `DrawSurface`: a drawing context, its packed pixel buffer, and the dirty
//! flag that decides when the texture is re-uploaded.
//!
//! The packed buffer (held inside the [`Texture`]) is the copy consumers and
//! uploads see. Vector operations run on the drawing context; after each
//! painting call the buffer is re-derived from the context, and direct pixel
//! edits are pushed back into it, so the two never drift apart.
//!
//! Contexts may store pixels in a lossy form (premultiplied alpha). The
//! surface remembers what the context last reported for every pixel and
//! re-derives only pixels that moved away from that, so exact values written
//! with [`DrawSurface::set_pixel32`] survive drawing elsewhere. Rect calls
//! re-read only their device-space bounds; path fills and strokes re-read the
//! whole surface.
//!
//! Mutations set `dirty`. [`DrawSurface::render`] is the only place that
//! clears it.

use crate::color::Color;
use crate::config::{BoundsPolicy, RefreshPolicy, SurfaceConfig, UploadPolicy};
use crate::context::DrawingContext;
use crate::error::{Result, SurfaceError};
use crate::image::{ImageData, Region};
use crate::pixel;
use crate::style::{CompositeOp, Fill, Gradient, LineCap, LineJoin, PaintStyle};
use crate::texture::{Bindable, Texture, TextureConsumer, TextureSource};
use crate::upload::UploadQueue;
use kurbo::{Affine, Rect};
use std::f64::consts::TAU;

/// Control-point distance for approximating a quarter ellipse with a cubic.
pub const KAPPA: f64 = 0.5522848;

/// The slice of context state that decides which pixels a rect call touches.
/// Mirrors the context's save/restore stack.
#[derive(Debug, Clone, Copy)]
struct PaintBounds {
    transform: Affine,
    line_width: f64,
    composite: CompositeOp,
}

impl Default for PaintBounds {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            line_width: 1.0,
            composite: CompositeOp::SourceOver,
        }
    }
}

/// Wraps a drawing context and keeps a packed copy of its pixels.
///
/// The context must be in its default state (identity transform) when
/// wrapped, and is only driven through the surface afterwards.
pub struct DrawSurface<C: DrawingContext> {
    context: C,
    texture: Texture,
    /// Pixels as the context last reported them.
    reported: Vec<u32>,
    bounds: PaintBounds,
    saved_bounds: Vec<PaintBounds>,
    config: SurfaceConfig,
    dirty: bool,
    /// Area the context has drawn into since the buffer was last re-derived
    /// (only under `RefreshPolicy::Manual`).
    stale: Option<Region>,
}

impl<C: DrawingContext> DrawSurface<C> {
    pub fn new(context: C) -> Result<Self> {
        Self::with_config(context, SurfaceConfig::default())
    }

    /// Wrap `context`. The surface takes the context's size and captures its
    /// current pixels as the initial buffer.
    pub fn with_config(context: C, config: SurfaceConfig) -> Result<Self> {
        let (width, height) = (context.width(), context.height());
        if width == 0 || height == 0 {
            return Err(SurfaceError::InvalidDimensions { width, height });
        }
        let image = context.get_image_data(Region::full(width, height))?;
        if image.width() != width || image.height() != height {
            return Err(SurfaceError::InvalidDimensions { width, height });
        }
        let reported = image.into_data();
        let texture = Texture::new(width, height, reported.clone());
        log::debug!("draw surface {width}x{height} -> {} ({config:?})", texture.id());
        Ok(Self {
            context,
            texture,
            reported,
            bounds: PaintBounds::default(),
            saved_bounds: Vec::new(),
            config,
            dirty: false,
            stale: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    pub fn height(&self) -> u32 {
        self.texture.height()
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Read-only access to the drawing context. Mutation goes through the
    /// surface so it can be tracked.
    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn into_context(self) -> C {
        self.context
    }

    // ─── Pixel access ────────────────────────────────────────────────────

    fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as u32, y as u32);
        (x < self.width() && y < self.height()).then(|| (y * self.width() + x) as usize)
    }

    fn out_of_range(&mut self, x: i32, y: i32) -> Result<&mut Self> {
        match self.config.bounds {
            BoundsPolicy::Ignore => {
                log::trace!("ignored pixel write at ({x}, {y})");
                Ok(self)
            }
            BoundsPolicy::Strict => Err(SurfaceError::OutOfRange {
                x,
                y,
                width: self.width(),
                height: self.height(),
            }),
        }
    }

    /// Write one pixel and push it through to the drawing context.
    ///
    /// Writes outside `[0, width) × [0, height)` leave the surface untouched.
    /// If the context rejects the write, so does the buffer.
    pub fn set_pixel32(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8, a: u8) -> Result<&mut Self> {
        let Some(idx) = self.index_of(x, y) else {
            return self.out_of_range(x, y);
        };
        self.ensure_fresh()?;

        let (px, py) = (x as u32, y as u32);
        let value = pixel::pack(r, g, b, a);
        let patch = ImageData::from_packed(1, 1, vec![value])?;
        {
            let mut pixels = self.texture.pixels_mut()?;
            self.context.put_image_data(&patch, px, py)?;
            pixels[idx] = value;
        }
        self.dirty = true;
        self.note_reported(Region::new(px, py, 1, 1))?;
        Ok(self)
    }

    /// Opaque [`set_pixel32`](Self::set_pixel32).
    pub fn set_pixel(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8) -> Result<&mut Self> {
        self.set_pixel32(x, y, r, g, b, 255)
    }

    /// Packed value at `(x, y)`, or `None` outside the surface.
    pub fn get_pixel32(&self, x: i32, y: i32) -> Option<u32> {
        self.index_of(x, y)
            .and_then(|idx| self.texture.with_pixels(|px| px.get(idx).copied()))
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<u32> {
        self.get_pixel32(x, y)
    }

    pub fn get_pixel_color(&self, x: i32, y: i32) -> Option<Color> {
        self.get_pixel32(x, y).map(Color::from_packed)
    }

    /// Snapshot of `region`, clipped to the surface.
    pub fn get_pixels(&self, region: Region) -> ImageData {
        let clipped = region.clip_to(self.width(), self.height());
        self.texture
            .with_pixels(|px| ImageData::copy_from(px, self.width(), clipped))
    }

    /// Re-derive the packed buffer from the drawing context's own pixels.
    ///
    /// Only pixels the context changed since it last reported them are
    /// copied; the dirty flag is set only if one was.
    pub fn refresh_buffer(&mut self) -> Result<&mut Self> {
        self.pull_region(Region::full(self.width(), self.height()), false)?;
        self.stale = None;
        Ok(self)
    }

    /// Edit the whole buffer in one go, then push it to the context once.
    /// The closure gets the row-major buffer and the row width.
    pub fn update_pixels<F>(&mut self, f: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut [u32], u32),
    {
        self.ensure_fresh()?;
        let (width, height) = (self.width(), self.height());
        let mut edited = self.texture.to_vec();
        f(&mut edited, width);
        let data = ImageData::from_packed(width, height, edited)?;
        {
            let mut pixels = self.texture.pixels_mut()?;
            self.context.put_image_data(&data, 0, 0)?;
            pixels.copy_from_slice(data.data());
        }
        self.dirty = true;
        self.note_reported(Region::full(width, height))?;
        Ok(self)
    }

    /// Flood the surface with one color.
    pub fn fill_color(&mut self, r: u8, g: u8, b: u8, a: u8) -> Result<&mut Self> {
        let value = pixel::pack(r, g, b, a);
        self.update_pixels(|pixels, _| pixels.fill(value))
    }

    /// Clear the whole surface to transparent black.
    pub fn clear(&mut self) -> Result<&mut Self> {
        let (w, h) = (self.width() as f64, self.height() as f64);
        self.clear_rect(0.0, 0.0, w, h)
    }

    /// Read `region` back from the context and copy every pixel that differs
    /// from what the context last reported. With `cleared`, pixels the
    /// context reports as transparent black become exactly that, even when
    /// an invisible direct edit left them equal to the last report.
    fn pull_region(&mut self, region: Region, cleared: bool) -> Result<()> {
        let region = region.clip_to(self.width(), self.height());
        if region.is_empty() {
            return Ok(());
        }
        let image = self.read_back(region)?;
        let width = self.width() as usize;
        let mut changed = 0usize;
        {
            let mut pixels = self.texture.pixels_mut()?;
            for (row, src) in image.data().chunks_exact(region.width as usize).enumerate() {
                let start = (region.y as usize + row) * width + region.x as usize;
                let end = start + src.len();
                let seen = &mut self.reported[start..end];
                let dst = &mut pixels[start..end];
                for ((seen, dst), &now) in seen.iter_mut().zip(dst.iter_mut()).zip(src) {
                    if *seen != now || (cleared && now == 0 && *dst != 0) {
                        *seen = now;
                        *dst = now;
                        changed += 1;
                    }
                }
            }
        }
        if changed > 0 {
            self.dirty = true;
        }
        log::trace!(
            "refreshed {region:?} of {} ({changed} changed)",
            self.texture.id()
        );
        Ok(())
    }

    /// Remember what the context now holds in `region`, leaving the buffer be.
    fn note_reported(&mut self, region: Region) -> Result<()> {
        let image = self.read_back(region)?;
        let width = self.width() as usize;
        for (row, src) in image.data().chunks_exact(region.width as usize).enumerate() {
            let start = (region.y as usize + row) * width + region.x as usize;
            self.reported[start..start + src.len()].copy_from_slice(src);
        }
        Ok(())
    }

    fn read_back(&self, region: Region) -> Result<ImageData> {
        let image = self.context.get_image_data(region)?;
        if image.width() != region.width || image.height() != region.height {
            return Err(SurfaceError::InvalidDimensions {
                width: image.width(),
                height: image.height(),
            });
        }
        Ok(image)
    }

    fn ensure_fresh(&mut self) -> Result<()> {
        if let Some(region) = self.stale {
            self.pull_region(region, false)?;
            self.stale = None;
        }
        Ok(())
    }

    /// Device-space pixels a rect call can touch, or `None` when they cannot
    /// be bounded. `inflate` grows the rect in user space (half a stroke).
    fn rect_bounds(&self, x: f64, y: f64, w: f64, h: f64, inflate: f64) -> Option<Region> {
        if !self.bounds.composite.is_bounded() {
            return None;
        }
        let rect = Rect::new(x, y, x + w, y + h).abs().inflate(inflate, inflate);
        let device = self.bounds.transform.transform_rect_bbox(rect);
        if !device.is_finite() {
            return None;
        }
        // One extra pixel on each side for anti-aliased edges.
        let (sw, sh) = (f64::from(self.width()), f64::from(self.height()));
        let x0 = (device.x0.floor() - 1.0).clamp(0.0, sw);
        let y0 = (device.y0.floor() - 1.0).clamp(0.0, sh);
        let x1 = (device.x1.ceil() + 1.0).clamp(0.0, sw);
        let y1 = (device.y1.ceil() + 1.0).clamp(0.0, sh);
        Some(Region::new(
            x0 as u32,
            y0 as u32,
            (x1 - x0) as u32,
            (y1 - y0) as u32,
        ))
    }

    /// Bookkeeping after the context painted somewhere inside `area`
    /// (`None` for anywhere).
    fn painted(&mut self, area: Option<Region>) -> Result<&mut Self> {
        self.dirty = true;
        let area = area.unwrap_or_else(|| Region::full(self.width(), self.height()));
        match self.config.refresh {
            RefreshPolicy::AfterDraw => self.pull_region(area, false)?,
            RefreshPolicy::Manual => {
                self.stale = Some(self.stale.map_or(area, |stale| stale.union(area)));
            }
        }
        Ok(self)
    }

    fn apply_transform(&mut self, m: Affine, replace: bool) {
        if !m.is_finite() {
            return;
        }
        self.bounds.transform = if replace {
            m
        } else {
            self.bounds.transform * m
        };
    }

    // ─── Path construction ───────────────────────────────────────────────

    /// Starts a new path. Does not touch pixels.
    pub fn begin_path(&mut self) -> &mut Self {
        self.context.begin_path();
        self
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.dirty = true;
        self.context.move_to(x, y);
        self
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.dirty = true;
        self.context.line_to(x, y);
        self
    }

    pub fn bezier_curve_to(
        &mut self,
        cp1x: f64,
        cp1y: f64,
        cp2x: f64,
        cp2y: f64,
        x: f64,
        y: f64,
    ) -> &mut Self {
        self.dirty = true;
        self.context.bezier_curve_to(cp1x, cp1y, cp2x, cp2y, x, y);
        self
    }

    pub fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) -> &mut Self {
        self.dirty = true;
        self.context.quadratic_curve_to(cpx, cpy, x, y);
        self
    }

    pub fn arc(
        &mut self,
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        anticlockwise: bool,
    ) -> Result<&mut Self> {
        self.dirty = true;
        self.context
            .arc(x, y, radius, start_angle, end_angle, anticlockwise)?;
        Ok(self)
    }

    pub fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) -> Result<&mut Self> {
        self.dirty = true;
        self.context.arc_to(x1, y1, x2, y2, radius)?;
        Ok(self)
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> &mut Self {
        self.dirty = true;
        self.context.rect(x, y, w, h);
        self
    }

    pub fn close_path(&mut self) -> &mut Self {
        self.dirty = true;
        self.context.close_path();
        self
    }

    /// Intersect the clip region with the current path (non-zero rule).
    pub fn clip(&mut self) -> &mut Self {
        self.clip_with_rule(Fill::NonZero)
    }

    pub fn clip_with_rule(&mut self, rule: Fill) -> &mut Self {
        self.context.clip(rule);
        self
    }

    // ─── Painting ────────────────────────────────────────────────────────

    /// Fill the current path (non-zero rule).
    pub fn fill(&mut self) -> Result<&mut Self> {
        self.fill_with_rule(Fill::NonZero)
    }

    pub fn fill_with_rule(&mut self, rule: Fill) -> Result<&mut Self> {
        self.context.fill(rule);
        self.painted(None)
    }

    pub fn stroke(&mut self) -> Result<&mut Self> {
        self.context.stroke();
        self.painted(None)
    }

    /// Clear to transparent black. The cleared area is read back right away
    /// under either refresh policy.
    pub fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<&mut Self> {
        self.context.clear_rect(x, y, w, h);
        self.dirty = true;
        let area = self
            .rect_bounds(x, y, w, h, 0.0)
            .unwrap_or_else(|| Region::full(self.width(), self.height()));
        self.pull_region(area, true)?;
        Ok(self)
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<&mut Self> {
        self.context.fill_rect(x, y, w, h);
        let area = self.rect_bounds(x, y, w, h, 0.0);
        self.painted(area)
    }

    pub fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<&mut Self> {
        self.context.stroke_rect(x, y, w, h);
        let area = self.rect_bounds(x, y, w, h, self.bounds.line_width / 2.0);
        self.painted(area)
    }

    // ─── Style state (never dirty) ───────────────────────────────────────

    pub fn set_fill_style(&mut self, style: impl Into<PaintStyle>) -> Result<&mut Self> {
        self.context.set_fill_style(&style.into())?;
        Ok(self)
    }

    pub fn set_stroke_style(&mut self, style: impl Into<PaintStyle>) -> Result<&mut Self> {
        self.context.set_stroke_style(&style.into())?;
        Ok(self)
    }

    /// Zero, negative and non-finite widths are ignored.
    pub fn set_line_width(&mut self, width: f64) -> &mut Self {
        self.context.set_line_width(width);
        if width.is_finite() && width > 0.0 {
            self.bounds.line_width = width;
        }
        self
    }

    pub fn set_line_cap(&mut self, cap: LineCap) -> &mut Self {
        self.context.set_line_cap(cap);
        self
    }

    pub fn set_line_join(&mut self, join: LineJoin) -> &mut Self {
        self.context.set_line_join(join);
        self
    }

    pub fn set_miter_limit(&mut self, limit: f64) -> &mut Self {
        self.context.set_miter_limit(limit);
        self
    }

    pub fn set_line_dash(&mut self, segments: &[f64]) -> Result<&mut Self> {
        self.context.set_line_dash(segments)?;
        Ok(self)
    }

    pub fn set_line_dash_offset(&mut self, offset: f64) -> &mut Self {
        self.context.set_line_dash_offset(offset);
        self
    }

    pub fn set_font(&mut self, font: &str) -> &mut Self {
        self.context.set_font(font);
        self
    }

    pub fn set_global_alpha(&mut self, alpha: f64) -> &mut Self {
        self.context.set_global_alpha(alpha);
        self
    }

    pub fn set_global_composite_operation(&mut self, op: CompositeOp) -> Result<&mut Self> {
        self.context.set_global_composite_operation(op)?;
        self.bounds.composite = op;
        Ok(self)
    }

    // ─── Transform & state stack ─────────────────────────────────────────

    pub fn scale(&mut self, x: f64, y: f64) -> Result<&mut Self> {
        self.context.scale(x, y)?;
        self.apply_transform(Affine::scale_non_uniform(x, y), false);
        Ok(self)
    }

    pub fn rotate(&mut self, angle: f64) -> Result<&mut Self> {
        self.context.rotate(angle)?;
        self.apply_transform(Affine::rotate(angle), false);
        Ok(self)
    }

    pub fn translate(&mut self, x: f64, y: f64) -> Result<&mut Self> {
        self.context.translate(x, y)?;
        self.apply_transform(Affine::translate((x, y)), false);
        Ok(self)
    }

    pub fn transform(&mut self, m: Affine) -> Result<&mut Self> {
        self.context.transform(m)?;
        self.apply_transform(m, false);
        Ok(self)
    }

    pub fn set_transform(&mut self, m: Affine) -> Result<&mut Self> {
        self.context.set_transform(m)?;
        self.apply_transform(m, true);
        Ok(self)
    }

    pub fn reset_transform(&mut self) -> Result<&mut Self> {
        self.set_transform(Affine::IDENTITY)
    }

    pub fn save(&mut self) -> &mut Self {
        self.context.save();
        self.saved_bounds.push(self.bounds);
        self
    }

    pub fn restore(&mut self) -> &mut Self {
        self.context.restore();
        if let Some(bounds) = self.saved_bounds.pop() {
            self.bounds = bounds;
        }
        self
    }

    // ─── Gradients ───────────────────────────────────────────────────────

    pub fn create_linear_gradient(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> Gradient {
        Gradient::linear(x0, y0, x1, y1)
    }

    pub fn create_radial_gradient(
        &self,
        x0: f64,
        y0: f64,
        r0: f64,
        x1: f64,
        y1: f64,
        r1: f64,
    ) -> Gradient {
        Gradient::radial(x0, y0, r0, x1, y1, r1)
    }

    // ─── Composite helpers ───────────────────────────────────────────────

    /// Full circle: `arc(x, y, r, 0, 2π, false)`.
    pub fn circle(&mut self, x: f64, y: f64, radius: f64) -> Result<&mut Self> {
        self.arc(x, y, radius, 0.0, TAU, false)
    }

    /// Closed ellipse inscribed in the box `(x, y, w, h)`, built from four
    /// cubic Béziers starting at the left-middle point.
    pub fn ellipse(&mut self, x: f64, y: f64, w: f64, h: f64) -> &mut Self {
        let ox = (w / 2.0) * KAPPA;
        let oy = (h / 2.0) * KAPPA;
        let xe = x + w;
        let ye = y + h;
        let xm = x + w / 2.0;
        let ym = y + h / 2.0;

        self.move_to(x, ym)
            .bezier_curve_to(x, ym - oy, xm - ox, y, xm, y)
            .bezier_curve_to(xm + ox, y, xe, ym - oy, xe, ym)
            .bezier_curve_to(xe, ym + oy, xm + ox, ye, xm, ye)
            .bezier_curve_to(xm - ox, ye, x, ym + oy, x, ym)
            .close_path()
    }

    pub fn begin_fill(&mut self, color: Color) -> Result<&mut Self> {
        self.set_fill_style(color)
    }

    /// Linear gradient fill; stops are `zip(ratios, colors)`.
    #[allow(clippy::too_many_arguments)]
    pub fn begin_linear_gradient_fill(
        &mut self,
        colors: &[Color],
        ratios: &[f32],
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
    ) -> Result<&mut Self> {
        let gradient = Gradient::linear(x0, y0, x1, y1).with_stops(colors, ratios)?;
        self.set_fill_style(gradient)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn begin_radial_gradient_fill(
        &mut self,
        colors: &[Color],
        ratios: &[f32],
        x0: f64,
        y0: f64,
        r0: f64,
        x1: f64,
        y1: f64,
        r1: f64,
    ) -> Result<&mut Self> {
        let gradient = Gradient::radial(x0, y0, r0, x1, y1, r1).with_stops(colors, ratios)?;
        self.set_fill_style(gradient)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn begin_linear_gradient_stroke(
        &mut self,
        colors: &[Color],
        ratios: &[f32],
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
    ) -> Result<&mut Self> {
        let gradient = Gradient::linear(x0, y0, x1, y1).with_stops(colors, ratios)?;
        self.set_stroke_style(gradient)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn begin_radial_gradient_stroke(
        &mut self,
        colors: &[Color],
        ratios: &[f32],
        x0: f64,
        y0: f64,
        r0: f64,
        x1: f64,
        y1: f64,
        r1: f64,
    ) -> Result<&mut Self> {
        let gradient = Gradient::radial(x0, y0, r0, x1, y1, r1).with_stops(colors, ratios)?;
        self.set_stroke_style(gradient)
    }

    /// Line width, cap, join and miter limit in one call.
    pub fn set_line_style(
        &mut self,
        thickness: f64,
        cap: LineCap,
        join: LineJoin,
        miter_limit: f64,
    ) -> &mut Self {
        self.set_line_width(thickness)
            .set_line_cap(cap)
            .set_line_join(join)
            .set_miter_limit(miter_limit)
    }

    // ─── Consumer binding ────────────────────────────────────────────────

    /// Bind this surface's texture to `consumer`. The texture stays owned by
    /// the surface.
    pub fn add(&self, consumer: &mut dyn TextureConsumer) -> &Self {
        consumer.load_texture(self);
        self
    }

    /// Bind every target that accepts textures; the rest are skipped.
    /// Returns how many were bound.
    pub fn add_to<'a, I>(&self, targets: I) -> usize
    where
        I: IntoIterator<Item = &'a mut dyn Bindable>,
    {
        let mut bound = 0;
        for target in targets {
            match target.texture_consumer() {
                Some(consumer) => {
                    self.add(consumer);
                    bound += 1;
                }
                None => log::trace!("add_to: skipped target without texture support"),
            }
        }
        bound
    }

    // ─── Synchronization ─────────────────────────────────────────────────

    /// Flush pending changes: if dirty, request a texture upload (when the
    /// backend needs one) and clear the flag. Returns whether anything was
    /// flushed. Calling it again without a mutation in between is a no-op.
    ///
    /// A failed upload request leaves the surface dirty.
    pub fn render(&mut self, queue: &mut dyn UploadQueue) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.ensure_fresh()?;
        if self.config.upload == UploadPolicy::Explicit {
            queue.request_upload(&self.texture)?;
        }
        self.texture.bump_generation();
        self.dirty = false;
        log::trace!(
            "flushed {} (generation {})",
            self.texture.id(),
            self.texture.generation()
        );
        Ok(true)
    }
}

impl<C: DrawingContext> TextureSource for DrawSurface<C> {
    fn texture(&self) -> Texture {
        self.texture.clone()
    }

    fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DrawCmd, RecordingContext};
    use crate::upload::PendingUploads;
    use pretty_assertions::assert_eq;

    fn surface(w: u32, h: u32) -> DrawSurface<RecordingContext> {
        DrawSurface::new(RecordingContext::new(w, h)).unwrap()
    }

    #[test]
    fn new_surface_is_clean() {
        let s = surface(4, 4);
        assert!(!s.is_dirty());
        assert_eq!((s.width(), s.height()), (4, 4));
        assert_eq!(s.get_pixel32(0, 0), Some(0));
    }

    #[test]
    fn zero_size_is_rejected() {
        let err = DrawSurface::new(RecordingContext::new(0, 4)).err().unwrap();
        assert_eq!(err, SurfaceError::InvalidDimensions { width: 0, height: 4 });
    }

    #[test]
    fn set_pixel32_packs_abgr() {
        let mut s = surface(4, 4);
        s.set_pixel32(1, 2, 0x11, 0x22, 0x33, 0x44).unwrap();
        assert_eq!(s.get_pixel32(1, 2), Some(0x4433_2211));
        assert!(s.is_dirty());
    }

    #[test]
    fn set_pixel_is_opaque() {
        let mut s = surface(2, 2);
        s.set_pixel(0, 1, 10, 20, 30).unwrap();
        let px = s.get_pixel(0, 1).unwrap();
        assert_eq!(pixel::alpha(px), 0xFF);
        assert_eq!(px, pixel::pack(10, 20, 30, 255));
    }

    #[test]
    fn pixel_write_reaches_the_context() {
        let mut s = surface(3, 3);
        s.set_pixel(2, 1, 1, 2, 3).unwrap();
        let ctx_pixels = s.context().get_image_data(Region::full(3, 3)).unwrap();
        assert_eq!(ctx_pixels.get(2, 1), Some(pixel::pack(1, 2, 3, 255)));
        assert_eq!(
            s.context().commands().last(),
            Some(&DrawCmd::PutImageData {
                x: 2,
                y: 1,
                width: 1,
                height: 1
            })
        );
    }

    #[test]
    fn out_of_range_writes_are_ignored() {
        let mut s = surface(4, 4);
        // x == width is one past the end: exclusive bounds reject it.
        for (x, y) in [(4, 0), (5, 0), (0, 4), (-1, 0), (0, -1)] {
            s.set_pixel32(x, y, 255, 255, 255, 255).unwrap();
        }
        assert!(!s.is_dirty());
        assert!(s.context().commands().is_empty());
        assert_eq!(s.get_pixel32(4, 0), None);
        assert_eq!(s.get_pixel32(-1, 0), None);
    }

    #[test]
    fn strict_bounds_report_out_of_range() {
        let config = SurfaceConfig::default().with_bounds(BoundsPolicy::Strict);
        let mut s = DrawSurface::with_config(RecordingContext::new(4, 4), config).unwrap();
        let err = s.set_pixel(4, 1, 0, 0, 0).err().unwrap();
        assert_eq!(
            err,
            SurfaceError::OutOfRange {
                x: 4,
                y: 1,
                width: 4,
                height: 4
            }
        );
        assert!(!s.is_dirty());
    }

    #[test]
    fn path_ops_mark_dirty_but_style_setters_do_not() {
        let mut s = surface(4, 4);
        s.set_line_width(3.0)
            .set_line_cap(LineCap::Round)
            .set_font("12px sans-serif")
            .set_global_alpha(0.5)
            .begin_path()
            .save()
            .restore();
        s.set_fill_style(Color::WHITE).unwrap();
        s.translate(1.0, 1.0).unwrap();
        assert!(!s.is_dirty());

        s.line_to(2.0, 2.0);
        assert!(s.is_dirty());
    }

    #[test]
    fn render_clears_dirty_once() {
        let mut s = surface(4, 4);
        let mut queue = PendingUploads::new();
        assert!(!s.render(&mut queue).unwrap());

        s.set_pixel(0, 0, 1, 1, 1).unwrap();
        assert!(s.render(&mut queue).unwrap());
        assert!(!s.is_dirty());
        assert!(!s.render(&mut queue).unwrap());
        assert_eq!(queue.len(), 1);
        assert_eq!(s.texture().generation(), 1);
    }

    #[test]
    fn implicit_upload_never_enqueues() {
        let config = SurfaceConfig::default().with_upload(UploadPolicy::Implicit);
        let mut s = DrawSurface::with_config(RecordingContext::new(2, 2), config).unwrap();
        let mut queue = PendingUploads::new();
        s.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        assert!(s.render(&mut queue).unwrap());
        assert!(queue.is_empty());
        assert!(!s.is_dirty());
    }

    #[test]
    fn failed_upload_keeps_surface_dirty() {
        struct Broken;
        impl UploadQueue for Broken {
            fn request_upload(&mut self, _: &Texture) -> Result<()> {
                Err(SurfaceError::Upload("device lost".into()))
            }
        }

        let mut s = surface(2, 2);
        s.set_pixel(1, 1, 9, 9, 9).unwrap();
        let err = s.render(&mut Broken).unwrap_err();
        assert_eq!(err, SurfaceError::Upload("device lost".into()));
        assert!(s.is_dirty());
    }

    #[test]
    fn fill_rect_rederives_buffer() {
        let mut s = surface(4, 4);
        s.set_fill_style(Color::rgba(1.0, 0.0, 0.0, 1.0))
            .unwrap()
            .fill_rect(0.0, 0.0, 4.0, 4.0)
            .unwrap();
        assert!(s.is_dirty());
        assert_eq!(s.get_pixel32(2, 2), Some(0xFF00_00FF));
    }

    #[test]
    fn manual_refresh_defers_rederivation() {
        let config = SurfaceConfig::default().with_refresh(RefreshPolicy::Manual);
        let mut s = DrawSurface::with_config(RecordingContext::new(2, 2), config).unwrap();
        s.set_fill_style(Color::WHITE).unwrap();
        s.fill_rect(0.0, 0.0, 2.0, 2.0).unwrap();
        assert!(s.is_dirty());
        assert_eq!(s.get_pixel32(0, 0), Some(0), "buffer is a cache until refreshed");

        s.refresh_buffer().unwrap();
        assert_eq!(s.get_pixel32(0, 0), Some(0xFFFF_FFFF));
    }

    #[test]
    fn manual_refresh_happens_before_direct_write() {
        let config = SurfaceConfig::default().with_refresh(RefreshPolicy::Manual);
        let mut s = DrawSurface::with_config(RecordingContext::new(2, 2), config).unwrap();
        s.set_fill_style(Color::WHITE).unwrap();
        s.fill_rect(0.0, 0.0, 2.0, 2.0).unwrap();
        s.set_pixel(0, 0, 0, 0, 0).unwrap();

        // The vector fill survives next to the direct edit.
        assert_eq!(s.get_pixel32(1, 1), Some(0xFFFF_FFFF));
        assert_eq!(s.get_pixel32(0, 0), Some(0xFF00_0000));
    }

    #[test]
    fn circle_is_a_full_arc() {
        let mut a = surface(8, 8);
        a.circle(4.0, 4.0, 3.0).unwrap();
        let mut b = surface(8, 8);
        b.arc(4.0, 4.0, 3.0, 0.0, TAU, false).unwrap();
        assert_eq!(a.context().commands(), b.context().commands());
        assert!(a.is_dirty());
    }

    #[test]
    fn ellipse_is_four_closed_beziers() {
        let mut s = surface(8, 8);
        s.ellipse(0.0, 0.0, 4.0, 2.0);
        let cmds = s.context().commands();
        assert_eq!(cmds.len(), 6);
        assert_eq!(cmds[0], DrawCmd::MoveTo(0.0, 1.0));
        assert_eq!(cmds[2], DrawCmd::BezierCurveTo(2.0 + 2.0 * KAPPA, 0.0, 4.0, 1.0 - KAPPA, 4.0, 1.0));
        assert_eq!(cmds[5], DrawCmd::ClosePath);
        assert!(matches!(cmds[4], DrawCmd::BezierCurveTo(_, _, _, _, x, y) if x == 0.0 && y == 1.0));
    }

    #[test]
    fn gradient_helpers_set_styles() {
        let mut s = surface(4, 4);
        s.begin_linear_gradient_fill(&[Color::BLACK, Color::WHITE], &[0.0, 1.0], 0.0, 0.0, 4.0, 0.0)
            .unwrap()
            .begin_radial_gradient_stroke(&[Color::WHITE], &[0.5], 2.0, 2.0, 0.0, 2.0, 2.0, 2.0)
            .unwrap();

        let cmds = s.context().commands();
        match &cmds[0] {
            DrawCmd::FillStyle(PaintStyle::Gradient(g)) => assert_eq!(g.stops.len(), 2),
            other => panic!("expected gradient fill, got {other:?}"),
        }
        assert!(matches!(&cmds[1], DrawCmd::StrokeStyle(PaintStyle::Gradient(_))));
        assert!(!s.is_dirty());
    }

    #[test]
    fn bad_gradient_ratio_propagates() {
        let mut s = surface(4, 4);
        let err = s
            .begin_linear_gradient_fill(&[Color::BLACK], &[2.0], 0.0, 0.0, 1.0, 0.0)
            .err()
            .unwrap();
        assert_eq!(err, SurfaceError::InvalidColorStop(2.0));
    }

    #[test]
    fn update_pixels_pushes_once() {
        let mut s = surface(3, 2);
        s.update_pixels(|pixels, width| {
            for (i, px) in pixels.iter_mut().enumerate() {
                *px = (i as u32 % width) + 1;
            }
        })
        .unwrap();
        assert!(s.is_dirty());
        assert_eq!(s.get_pixels(Region::new(0, 1, 3, 1)).data(), &[1, 2, 3]);
        let puts = s
            .context()
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCmd::PutImageData { .. }))
            .count();
        assert_eq!(puts, 1);
    }

    #[test]
    fn get_pixels_is_a_snapshot() {
        let mut s = surface(2, 2);
        s.fill_color(1, 2, 3, 4).unwrap();
        let snap = s.get_pixels(Region::full(8, 8));
        s.set_pixel(0, 0, 0, 0, 0).unwrap();
        assert_eq!((snap.width(), snap.height()), (2, 2));
        assert_eq!(snap.get(0, 0), Some(pixel::pack(1, 2, 3, 4)));
    }

    #[test]
    fn clear_wipes_everything() {
        let mut s = surface(2, 2);
        s.fill_color(255, 255, 255, 255).unwrap();
        s.clear().unwrap();
        assert_eq!(s.get_pixels(Region::full(2, 2)).data(), &[0, 0, 0, 0]);
        assert!(s.is_dirty());
    }

    #[test]
    fn refresh_without_change_keeps_clean() {
        let mut s = surface(2, 2);
        s.refresh_buffer().unwrap();
        assert!(!s.is_dirty());
    }

    #[test]
    fn writes_fail_while_a_consumer_reads() {
        let mut s = surface(2, 2);
        let tex = s.texture().clone();
        let err = tex.with_pixels(|_| s.set_pixel(0, 0, 1, 2, 3).err());
        assert_eq!(err, Some(SurfaceError::TextureBusy(tex.id())));
        assert!(!s.is_dirty());
        assert!(s.context().commands().is_empty());

        let err = tex.with_pixels(|_| s.update_pixels(|px, _| px.fill(1)).err());
        assert_eq!(err, Some(SurfaceError::TextureBusy(tex.id())));
        assert_eq!(s.get_pixel32(1, 1), Some(0));
    }

    #[test]
    fn busy_refresh_catches_up_later() {
        let mut s = surface(2, 2);
        s.set_fill_style(Color::WHITE).unwrap();
        let tex = s.texture().clone();
        let err = tex.with_pixels(|_| s.fill_rect(0.0, 0.0, 2.0, 2.0).err());
        assert!(matches!(err, Some(SurfaceError::TextureBusy(_))));

        s.refresh_buffer().unwrap();
        assert_eq!(s.get_pixel32(1, 1), Some(0xFFFF_FFFF));
        assert!(s.is_dirty());
    }

    #[test]
    fn rejected_put_leaves_buffer_alone() {
        let mut ctx = RecordingContext::new(2, 2);
        ctx.refuse_puts(true);
        let mut s = DrawSurface::new(ctx).unwrap();

        assert!(s.set_pixel(0, 0, 9, 9, 9).is_err());
        assert_eq!(s.get_pixel32(0, 0), Some(0));
        assert!(!s.is_dirty());

        assert!(s.fill_color(5, 5, 5, 5).is_err());
        assert_eq!(s.get_pixel32(1, 1), Some(0));
        assert!(!s.is_dirty());
    }

    #[test]
    fn rect_calls_read_back_only_their_bounds() {
        let mut s = surface(16, 16);
        s.fill_rect(4.0, 4.0, 2.0, 2.0).unwrap();
        assert_eq!(s.context().last_read(), Some(Region::new(3, 3, 4, 4)));

        s.clear_rect(6.0, 6.0, -2.0, -2.0).unwrap();
        assert_eq!(s.context().last_read(), Some(Region::new(3, 3, 4, 4)));

        s.set_line_width(2.0).stroke_rect(4.0, 4.0, 4.0, 4.0).unwrap();
        assert_eq!(s.context().last_read(), Some(Region::new(2, 2, 8, 8)));

        s.save().translate(8.0, 0.0).unwrap();
        s.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(s.context().last_read(), Some(Region::new(7, 0, 3, 2)));

        s.restore().fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(s.context().last_read(), Some(Region::new(0, 0, 2, 2)));
    }

    #[test]
    fn paths_and_unbounded_composites_read_everything() {
        let mut s = surface(16, 16);
        s.fill().unwrap();
        assert_eq!(s.context().last_read(), Some(Region::full(16, 16)));

        s.set_global_composite_operation(CompositeOp::Copy).unwrap();
        s.fill_rect(1.0, 1.0, 1.0, 1.0).unwrap();
        assert_eq!(s.context().last_read(), Some(Region::full(16, 16)));

        s.set_global_composite_operation(CompositeOp::SourceOver)
            .unwrap();
        s.fill_rect(f64::NAN, 1.0, 1.0, 1.0).unwrap();
        assert_eq!(s.context().last_read(), Some(Region::full(16, 16)));
    }

    #[test]
    fn manual_refresh_reads_the_union_of_painted_areas() {
        let config = SurfaceConfig::default().with_refresh(RefreshPolicy::Manual);
        let mut s = DrawSurface::with_config(RecordingContext::new(16, 16), config).unwrap();
        s.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        s.fill_rect(4.0, 4.0, 1.0, 1.0).unwrap();
        assert_eq!(s.context().read_count(), 1);

        s.render(&mut PendingUploads::new()).unwrap();
        assert_eq!(s.context().last_read(), Some(Region::new(0, 0, 6, 6)));
    }
}
