pub mod gpu;
pub mod paint;
pub mod path;
pub mod skia;

pub use gpu::{GpuTexture, GpuTextureCache};
pub use skia::SkiaContext;

use ds_core::{DrawSurface, Result, SurfaceConfig};

/// A drawing surface rasterized in software with the default configuration.
pub fn software_surface(width: u32, height: u32) -> Result<DrawSurface<SkiaContext>> {
    software_surface_with_config(width, height, SurfaceConfig::default())
}

pub fn software_surface_with_config(
    width: u32,
    height: u32,
    config: SurfaceConfig,
) -> Result<DrawSurface<SkiaContext>> {
    DrawSurface::with_config(SkiaContext::new(width, height)?, config)
}
