pub mod color;
pub mod config;
pub mod context;
pub mod error;
pub mod image;
pub mod pixel;
pub mod record;
pub mod sprite;
pub mod style;
pub mod surface;
pub mod texture;
pub mod upload;

pub use color::Color;
pub use config::{BoundsPolicy, RefreshPolicy, SurfaceConfig, UploadPolicy};
pub use context::DrawingContext;
pub use error::{Result, SurfaceError};
pub use image::{ImageData, Region};
pub use sprite::Sprite;
pub use style::{CompositeOp, Fill, Gradient, GradientKind, GradientStop, LineCap, LineJoin, PaintStyle};
pub use surface::DrawSurface;
pub use texture::{Bindable, Texture, TextureConsumer, TextureId, TextureSource};
pub use upload::{PendingUploads, UploadQueue};

// Re-export geometry types used in the public API so callers don't need a direct dependency
pub use kurbo::Affine;
pub use peniko::Extend;
