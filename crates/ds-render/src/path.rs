//! Canvas-style path accumulation on top of `kurbo::BezPath`.
//!
//! Tracks the current point and subpath start the way a canvas does, so
//! `arc`/`arc_to` can connect to what came before, and converts the result
//! to a tiny-skia path for rasterization.

use ds_core::{Result, SurfaceError};
use kurbo::{Arc, BezPath, PathEl, Point, Vec2};
use std::f64::consts::{PI, TAU};

/// Flattening tolerance for arcs → cubics, in user units.
const ARC_TOLERANCE: f64 = 0.1;

/// Relative tolerance floor so huge radii still flatten to a few cubics.
const ARC_RELATIVE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    path: BezPath,
    current: Option<Point>,
    subpath_start: Option<Point>,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn path(&self) -> &BezPath {
        &self.path
    }

    pub fn current_point(&self) -> Option<Point> {
        self.current
    }

    /// Calls with a non-finite coordinate are ignored, as on a canvas.
    pub fn move_to(&mut self, p: Point) {
        if !p.is_finite() {
            return;
        }
        self.path.move_to(p);
        self.current = Some(p);
        self.subpath_start = Some(p);
    }

    /// With no current point this starts a subpath instead.
    pub fn line_to(&mut self, p: Point) {
        if !p.is_finite() {
            return;
        }
        if self.current.is_none() {
            self.move_to(p);
            return;
        }
        self.path.line_to(p);
        self.current = Some(p);
    }

    pub fn quad_to(&mut self, c: Point, p: Point) {
        if !(c.is_finite() && p.is_finite()) {
            return;
        }
        self.ensure_subpath(c);
        self.path.quad_to(c, p);
        self.current = Some(p);
    }

    pub fn curve_to(&mut self, c1: Point, c2: Point, p: Point) {
        if !(c1.is_finite() && c2.is_finite() && p.is_finite()) {
            return;
        }
        self.ensure_subpath(c1);
        self.path.curve_to(c1, c2, p);
        self.current = Some(p);
    }

    pub fn close(&mut self) {
        if self.current.is_some() {
            self.path.close_path();
            self.current = self.subpath_start;
        }
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        if ![x, y, w, h].iter().all(|v| v.is_finite()) {
            return;
        }
        self.move_to(Point::new(x, y));
        self.path.line_to((x + w, y));
        self.path.line_to((x + w, y + h));
        self.path.line_to((x, y + h));
        self.close();
    }

    pub fn arc(
        &mut self,
        center: Point,
        radius: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    ) -> Result<()> {
        if !(center.is_finite() && radius.is_finite() && start.is_finite() && end.is_finite()) {
            return Ok(());
        }
        if radius < 0.0 {
            return Err(SurfaceError::Context(format!("negative arc radius {radius}")));
        }
        let sweep = arc_sweep(start, end, anticlockwise);
        let first = center + Vec2::from_angle(start) * radius;
        self.line_or_move(first);
        if radius == 0.0 || sweep == 0.0 {
            return Ok(());
        }
        self.append_arc(center, radius, start, sweep);
        Ok(())
    }

    /// Canvas `arcTo`: a line to the first tangent point, then the arc of
    /// `radius` tangent to both `current → p1` and `p1 → p2`.
    pub fn arc_to(&mut self, p1: Point, p2: Point, radius: f64) -> Result<()> {
        if !(p1.is_finite() && p2.is_finite() && radius.is_finite()) {
            return Ok(());
        }
        if radius < 0.0 {
            return Err(SurfaceError::Context(format!("negative arc radius {radius}")));
        }
        let Some(p0) = self.current else {
            self.move_to(p1);
            return Ok(());
        };

        let v1 = p0 - p1;
        let v2 = p2 - p1;
        if p0 == p1 || p1 == p2 || radius == 0.0 || v1.cross(v2).abs() < 1e-9 {
            self.line_to(p1);
            return Ok(());
        }

        let u1 = v1.normalize();
        let u2 = v2.normalize();
        let theta = u1.dot(u2).clamp(-1.0, 1.0).acos();
        let half = theta / 2.0;
        let tangent_len = radius / half.tan();
        let t1 = p1 + u1 * tangent_len;
        let t2 = p1 + u2 * tangent_len;
        let center = p1 + (u1 + u2).normalize() * (radius / half.sin());

        self.line_to(t1);
        let a0 = (t1 - center).atan2();
        let a1 = (t2 - center).atan2();
        let mut sweep = a1 - a0;
        while sweep > PI {
            sweep -= TAU;
        }
        while sweep <= -PI {
            sweep += TAU;
        }
        self.append_arc(center, radius, a0, sweep);
        Ok(())
    }

    pub fn to_skia(&self) -> Option<tiny_skia::Path> {
        let mut pb = tiny_skia::PathBuilder::new();
        for el in self.path.elements() {
            match *el {
                PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
                PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
                PathEl::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
                PathEl::CurveTo(c1, c2, p) => pb.cubic_to(
                    c1.x as f32,
                    c1.y as f32,
                    c2.x as f32,
                    c2.y as f32,
                    p.x as f32,
                    p.y as f32,
                ),
                PathEl::ClosePath => pb.close(),
            }
        }
        pb.finish()
    }

    fn ensure_subpath(&mut self, p: Point) {
        if self.current.is_none() {
            self.move_to(p);
        }
    }

    fn line_or_move(&mut self, p: Point) {
        if self.current.is_some() {
            self.path.line_to(p);
            self.current = Some(p);
        } else {
            self.move_to(p);
        }
    }

    fn append_arc(&mut self, center: Point, radius: f64, start: f64, sweep: f64) {
        let arc = Arc {
            center,
            radii: Vec2::new(radius, radius),
            start_angle: start,
            sweep_angle: sweep,
            x_rotation: 0.0,
        };
        let tolerance = ARC_TOLERANCE.max(radius * ARC_RELATIVE_TOLERANCE);
        for el in arc.append_iter(tolerance) {
            self.path.push(el);
        }
        self.current = Some(center + Vec2::from_angle(start + sweep) * radius);
    }
}

/// Signed sweep for canvas `arc(start, end, anticlockwise)`: a full turn when
/// the span reaches 2π, otherwise the span reduced into one turn in the
/// requested direction.
pub fn arc_sweep(start: f64, end: f64, anticlockwise: bool) -> f64 {
    if anticlockwise {
        if start - end >= TAU {
            -TAU
        } else {
            -(start - end).rem_euclid(TAU)
        }
    } else if end - start >= TAU {
        TAU
    } else {
        (end - start).rem_euclid(TAU)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn sweep_follows_canvas_rules() {
        assert!(close(arc_sweep(0.0, TAU, false), TAU));
        assert!(close(arc_sweep(0.0, 3.0 * TAU, false), TAU));
        assert!(close(arc_sweep(0.0, PI / 2.0, false), PI / 2.0));
        // Anticlockwise from 0 to π/2 goes the long way round.
        assert!(close(arc_sweep(0.0, PI / 2.0, true), -1.5 * PI));
        assert!(close(arc_sweep(1.0, 1.0, false), 0.0));
    }

    #[test]
    fn line_to_without_current_point_starts_subpath() {
        let mut pb = PathBuilder::new();
        pb.line_to(Point::new(3.0, 4.0));
        assert_eq!(pb.path().elements(), &[PathEl::MoveTo(Point::new(3.0, 4.0))]);
    }

    #[test]
    fn close_returns_to_subpath_start() {
        let mut pb = PathBuilder::new();
        pb.rect(1.0, 2.0, 3.0, 4.0);
        assert_eq!(pb.current_point(), Some(Point::new(1.0, 2.0)));
    }

    #[test]
    fn full_arc_ends_where_it_started() {
        let mut pb = PathBuilder::new();
        pb.arc(Point::new(5.0, 5.0), 2.0, 0.0, TAU, false).unwrap();
        let end = pb.current_point().unwrap();
        assert!(close(end.x, 7.0) && close(end.y, 5.0));
        assert!(pb.path().elements().len() > 2);
    }

    #[test]
    fn arc_to_right_angle_corner() {
        let mut pb = PathBuilder::new();
        pb.move_to(Point::new(0.0, 0.0));
        pb.arc_to(Point::new(10.0, 0.0), Point::new(10.0, 10.0), 2.0)
            .unwrap();
        // First tangent point is 2 units before the corner, arc ends 2 units after.
        assert_eq!(pb.path().elements()[1], PathEl::LineTo(Point::new(8.0, 0.0)));
        let end = pb.current_point().unwrap();
        assert!(close(end.x, 10.0) && close(end.y, 2.0), "ended at {end:?}");
    }

    #[test]
    fn collinear_arc_to_is_a_line() {
        let mut pb = PathBuilder::new();
        pb.move_to(Point::new(0.0, 0.0));
        pb.arc_to(Point::new(5.0, 0.0), Point::new(10.0, 0.0), 3.0)
            .unwrap();
        assert_eq!(pb.path().elements()[1], PathEl::LineTo(Point::new(5.0, 0.0)));
    }

    #[test]
    fn negative_radius_fails() {
        let mut pb = PathBuilder::new();
        assert!(pb.arc(Point::ORIGIN, -1.0, 0.0, 1.0, false).is_err());
        assert!(pb.arc_to(Point::ORIGIN, Point::new(1.0, 1.0), -1.0).is_err());
    }

    #[test]
    fn non_finite_arcs_are_ignored() {
        let mut pb = PathBuilder::new();
        pb.arc(Point::new(4.0, 4.0), f64::INFINITY, 0.0, 1.0, false)
            .unwrap();
        pb.arc(Point::new(4.0, 4.0), 2.0, f64::NAN, 1.0, false).unwrap();
        pb.arc(Point::new(f64::NAN, 4.0), 2.0, 0.0, 1.0, false).unwrap();
        pb.arc_to(Point::new(1.0, 1.0), Point::new(2.0, 0.0), f64::INFINITY)
            .unwrap();
        assert!(pb.path().elements().is_empty());
        assert_eq!(pb.current_point(), None);
    }

    #[test]
    fn huge_radius_flattens_to_a_few_segments() {
        let mut pb = PathBuilder::new();
        pb.arc(Point::new(4.0, 4.0), 1e60, 0.0, TAU, false).unwrap();
        let n = pb.path().elements().len();
        assert!(n > 2 && n < 64, "{n} elements");
    }

    #[test]
    fn non_finite_segments_leave_the_rest_of_the_path() {
        let mut pb = PathBuilder::new();
        pb.rect(0.0, 0.0, 4.0, 4.0);
        let before = pb.path().elements().to_vec();
        pb.line_to(Point::new(f64::NAN, 1.0));
        pb.move_to(Point::new(f64::INFINITY, 0.0));
        pb.quad_to(Point::new(1.0, 1.0), Point::new(2.0, f64::NAN));
        pb.curve_to(
            Point::new(f64::NEG_INFINITY, 1.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
        );
        pb.rect(0.0, f64::NAN, 1.0, 1.0);
        assert_eq!(pb.path().elements(), before.as_slice());
        assert!(pb.to_skia().is_some());
    }

    #[test]
    fn empty_path_has_no_skia_path() {
        assert!(PathBuilder::new().to_skia().is_none());
    }
}
