//! Paint and stroke state passed through to drawing contexts.

use crate::color::Color;
use crate::error::{Result, SurfaceError};
use peniko::Extend;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

pub use peniko::Fill;

// ─── Gradients ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32, // 0.0 .. 1.0
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradientKind {
    Linear {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
    },
    /// Two-circle radial gradient, canvas `createRadialGradient` semantics.
    Radial {
        x0: f64,
        y0: f64,
        r0: f64,
        x1: f64,
        y1: f64,
        r1: f64,
    },
}

/// A gradient in user space with an appendable stop list.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub kind: GradientKind,
    pub stops: SmallVec<[GradientStop; 4]>,
    /// Canvas backends only honour `Extend::Pad`.
    pub extend: Extend,
}

impl Gradient {
    pub fn linear(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self::new(GradientKind::Linear { x0, y0, x1, y1 })
    }

    pub fn radial(x0: f64, y0: f64, r0: f64, x1: f64, y1: f64, r1: f64) -> Self {
        Self::new(GradientKind::Radial {
            x0,
            y0,
            r0,
            x1,
            y1,
            r1,
        })
    }

    fn new(kind: GradientKind) -> Self {
        Self {
            kind,
            stops: SmallVec::new(),
            extend: Extend::Pad,
        }
    }

    /// Append a stop. Offsets outside `[0, 1]` are rejected, as in canvas.
    pub fn add_color_stop(&mut self, offset: f32, color: Color) -> Result<&mut Self> {
        if !(0.0..=1.0).contains(&offset) {
            return Err(SurfaceError::InvalidColorStop(offset));
        }
        self.stops.push(GradientStop { offset, color });
        Ok(self)
    }

    /// Stops built from parallel `ratios`/`colors` lists; the shorter list wins.
    pub(crate) fn with_stops(mut self, colors: &[Color], ratios: &[f32]) -> Result<Self> {
        for (&offset, &color) in ratios.iter().zip(colors) {
            self.add_color_stop(offset, color)?;
        }
        Ok(self)
    }
}

/// Fill or stroke paint.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintStyle {
    Solid(Color),
    Gradient(Gradient),
}

impl Default for PaintStyle {
    fn default() -> Self {
        PaintStyle::Solid(Color::BLACK)
    }
}

impl From<Color> for PaintStyle {
    fn from(c: Color) -> Self {
        PaintStyle::Solid(c)
    }
}

impl From<Gradient> for PaintStyle {
    fn from(g: Gradient) -> Self {
        PaintStyle::Gradient(g)
    }
}

// ─── Stroke ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl LineCap {
    pub fn as_css(self) -> &'static str {
        match self {
            LineCap::Butt => "butt",
            LineCap::Round => "round",
            LineCap::Square => "square",
        }
    }
}

impl LineJoin {
    pub fn as_css(self) -> &'static str {
        match self {
            LineJoin::Miter => "miter",
            LineJoin::Round => "round",
            LineJoin::Bevel => "bevel",
        }
    }
}

// ─── Compositing ─────────────────────────────────────────────────────────

/// The `globalCompositeOperation` keyword set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompositeOp {
    #[default]
    SourceOver,
    SourceIn,
    SourceOut,
    SourceAtop,
    DestinationOver,
    DestinationIn,
    DestinationOut,
    DestinationAtop,
    Lighter,
    Copy,
    Xor,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

const COMPOSITE_KEYWORDS: &[(CompositeOp, &str)] = &[
    (CompositeOp::SourceOver, "source-over"),
    (CompositeOp::SourceIn, "source-in"),
    (CompositeOp::SourceOut, "source-out"),
    (CompositeOp::SourceAtop, "source-atop"),
    (CompositeOp::DestinationOver, "destination-over"),
    (CompositeOp::DestinationIn, "destination-in"),
    (CompositeOp::DestinationOut, "destination-out"),
    (CompositeOp::DestinationAtop, "destination-atop"),
    (CompositeOp::Lighter, "lighter"),
    (CompositeOp::Copy, "copy"),
    (CompositeOp::Xor, "xor"),
    (CompositeOp::Multiply, "multiply"),
    (CompositeOp::Screen, "screen"),
    (CompositeOp::Overlay, "overlay"),
    (CompositeOp::Darken, "darken"),
    (CompositeOp::Lighten, "lighten"),
    (CompositeOp::ColorDodge, "color-dodge"),
    (CompositeOp::ColorBurn, "color-burn"),
    (CompositeOp::HardLight, "hard-light"),
    (CompositeOp::SoftLight, "soft-light"),
    (CompositeOp::Difference, "difference"),
    (CompositeOp::Exclusion, "exclusion"),
    (CompositeOp::Hue, "hue"),
    (CompositeOp::Saturation, "saturation"),
    (CompositeOp::Color, "color"),
    (CompositeOp::Luminosity, "luminosity"),
];

impl CompositeOp {
    pub fn as_css(self) -> &'static str {
        COMPOSITE_KEYWORDS
            .iter()
            .find(|(op, _)| *op == self)
            .map_or("source-over", |(_, kw)| kw)
    }

    /// Whether drawing with this operation leaves pixels outside the shape
    /// alone. `copy`, `source-in` and friends also rewrite the rest.
    pub fn is_bounded(self) -> bool {
        !matches!(
            self,
            CompositeOp::SourceIn
                | CompositeOp::SourceOut
                | CompositeOp::DestinationIn
                | CompositeOp::DestinationAtop
                | CompositeOp::Copy
        )
    }
}

impl FromStr for CompositeOp {
    type Err = SurfaceError;

    fn from_str(s: &str) -> Result<Self> {
        COMPOSITE_KEYWORDS
            .iter()
            .find(|(_, kw)| *kw == s)
            .map(|(op, _)| *op)
            .ok_or_else(|| SurfaceError::Context(format!("unknown composite operation {s:?}")))
    }
}

impl fmt::Display for CompositeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_css())
    }
}
