//! Canvas style state → tiny-skia paints, strokes and transforms.

use ds_core::{Color, CompositeOp, Gradient, GradientKind, LineCap, LineJoin, PaintStyle};
use kurbo::Affine;
use peniko::{Extend, Fill};
use tiny_skia::{
    BlendMode, FillRule, LinearGradient, Paint, RadialGradient, Shader, SpreadMode, Stroke,
    StrokeDash, Transform,
};

/// Build a paint for `style` at `global_alpha`.
///
/// Returns `None` when nothing would be drawn: a gradient with no stops, or a
/// degenerate gradient tiny-skia refuses to build.
pub fn paint(style: &PaintStyle, global_alpha: f64, op: CompositeOp) -> Option<Paint<'static>> {
    let shader = match style {
        PaintStyle::Solid(color) => Shader::SolidColor(skia_color(*color, global_alpha)),
        PaintStyle::Gradient(gradient) => gradient_shader(gradient, global_alpha)?,
    };
    let mut paint = Paint::default();
    paint.shader = shader;
    paint.blend_mode = blend_mode(op);
    paint.anti_alias = true;
    Some(paint)
}

pub fn skia_color(color: Color, global_alpha: f64) -> tiny_skia::Color {
    let [r, g, b, a] = color.to_rgba8();
    let a = (f64::from(a) * global_alpha.clamp(0.0, 1.0)).round() as u8;
    tiny_skia::Color::from_rgba8(r, g, b, a)
}

fn gradient_shader(gradient: &Gradient, global_alpha: f64) -> Option<Shader<'static>> {
    if gradient.stops.is_empty() {
        return None;
    }
    let stops = gradient
        .stops
        .iter()
        .map(|s| tiny_skia::GradientStop::new(s.offset, skia_color(s.color, global_alpha)))
        .collect();
    let mode = spread_mode(gradient.extend);

    match gradient.kind {
        GradientKind::Linear { x0, y0, x1, y1 } => LinearGradient::new(
            point(x0, y0),
            point(x1, y1),
            stops,
            mode,
            Transform::identity(),
        ),
        GradientKind::Radial {
            x0,
            y0,
            r0,
            x1,
            y1,
            r1,
        } => {
            if r0 != 0.0 {
                log::trace!("radial gradient start radius {r0} approximated as a focal point");
            }
            RadialGradient::new(
                point(x0, y0),
                point(x1, y1),
                r1 as f32,
                stops,
                mode,
                Transform::identity(),
            )
        }
    }
}

fn point(x: f64, y: f64) -> tiny_skia::Point {
    tiny_skia::Point::from_xy(x as f32, y as f32)
}

pub fn spread_mode(extend: Extend) -> SpreadMode {
    match extend {
        Extend::Pad => SpreadMode::Pad,
        Extend::Repeat => SpreadMode::Repeat,
        Extend::Reflect => SpreadMode::Reflect,
    }
}

pub fn blend_mode(op: CompositeOp) -> BlendMode {
    match op {
        CompositeOp::SourceOver => BlendMode::SourceOver,
        CompositeOp::SourceIn => BlendMode::SourceIn,
        CompositeOp::SourceOut => BlendMode::SourceOut,
        CompositeOp::SourceAtop => BlendMode::SourceAtop,
        CompositeOp::DestinationOver => BlendMode::DestinationOver,
        CompositeOp::DestinationIn => BlendMode::DestinationIn,
        CompositeOp::DestinationOut => BlendMode::DestinationOut,
        CompositeOp::DestinationAtop => BlendMode::DestinationAtop,
        CompositeOp::Lighter => BlendMode::Plus,
        CompositeOp::Copy => BlendMode::Source,
        CompositeOp::Xor => BlendMode::Xor,
        CompositeOp::Multiply => BlendMode::Multiply,
        CompositeOp::Screen => BlendMode::Screen,
        CompositeOp::Overlay => BlendMode::Overlay,
        CompositeOp::Darken => BlendMode::Darken,
        CompositeOp::Lighten => BlendMode::Lighten,
        CompositeOp::ColorDodge => BlendMode::ColorDodge,
        CompositeOp::ColorBurn => BlendMode::ColorBurn,
        CompositeOp::HardLight => BlendMode::HardLight,
        CompositeOp::SoftLight => BlendMode::SoftLight,
        CompositeOp::Difference => BlendMode::Difference,
        CompositeOp::Exclusion => BlendMode::Exclusion,
        CompositeOp::Hue => BlendMode::Hue,
        CompositeOp::Saturation => BlendMode::Saturation,
        CompositeOp::Color => BlendMode::Color,
        CompositeOp::Luminosity => BlendMode::Luminosity,
    }
}

pub fn fill_rule(rule: Fill) -> FillRule {
    match rule {
        Fill::NonZero => FillRule::Winding,
        Fill::EvenOdd => FillRule::EvenOdd,
    }
}

pub fn transform(m: Affine) -> Transform {
    let [a, b, c, d, e, f] = m.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

/// Line settings as a tiny-skia stroke. Odd dash lists repeat once so the
/// on/off pattern stays paired; an invalid list means a solid line.
pub fn stroke(
    width: f64,
    cap: LineCap,
    join: LineJoin,
    miter_limit: f64,
    dash: &[f64],
    dash_offset: f64,
) -> Stroke {
    let dash = if dash.is_empty() {
        None
    } else {
        let mut segments: Vec<f32> = dash.iter().map(|&d| d as f32).collect();
        if segments.len() % 2 == 1 {
            segments.extend_from_within(..);
        }
        StrokeDash::new(segments, dash_offset as f32)
    };
    Stroke {
        width: width as f32,
        miter_limit: miter_limit as f32,
        line_cap: match cap {
            LineCap::Butt => tiny_skia::LineCap::Butt,
            LineCap::Round => tiny_skia::LineCap::Round,
            LineCap::Square => tiny_skia::LineCap::Square,
        },
        line_join: match join {
            LineJoin::Miter => tiny_skia::LineJoin::Miter,
            LineJoin::Round => tiny_skia::LineJoin::Round,
            LineJoin::Bevel => tiny_skia::LineJoin::Bevel,
        },
        dash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_alpha_scales_color_alpha() {
        let c = skia_color(Color::rgba(1.0, 0.0, 0.0, 1.0), 0.5);
        assert_eq!(c.to_color_u8().alpha(), 128);
    }

    #[test]
    fn empty_gradient_paints_nothing() {
        let g = PaintStyle::Gradient(Gradient::linear(0.0, 0.0, 10.0, 0.0));
        assert!(paint(&g, 1.0, CompositeOp::SourceOver).is_none());
    }

    #[test]
    fn canvas_keywords_map_to_porter_duff() {
        assert_eq!(blend_mode(CompositeOp::Lighter), BlendMode::Plus);
        assert_eq!(blend_mode(CompositeOp::Copy), BlendMode::Source);
        assert_eq!(blend_mode(CompositeOp::DestinationOut), BlendMode::DestinationOut);
    }

    #[test]
    fn affine_coefficients_keep_column_order() {
        let t = transform(Affine::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        assert_eq!((t.sx, t.ky, t.kx, t.sy, t.tx, t.ty), (1.0, 2.0, 3.0, 4.0, 5.0, 6.0));
    }

    #[test]
    fn odd_dash_list_is_doubled() {
        let s = stroke(1.0, LineCap::Butt, LineJoin::Miter, 10.0, &[3.0], 0.0);
        assert!(s.dash.is_some());
        let s = stroke(1.0, LineCap::Butt, LineJoin::Miter, 10.0, &[], 0.0);
        assert!(s.dash.is_none());
    }
}
