//! WASM bridge for drawsurf: a drawing surface over a browser canvas.
//!
//! Compiled via `wasm-pack build --target web`. JavaScript draws through
//! [`WasmSurface`], calls `render()` once per frame and uploads whatever
//! `take_pending_uploads()` reports.

mod canvas2d;

pub use canvas2d::CanvasContext;

use ds_core::{Color, DrawSurface, PendingUploads, SurfaceConfig, SurfaceError};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

fn to_js(e: SurfaceError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn parse_color(css: &str) -> Result<Color, JsValue> {
    Color::from_hex(css).ok_or_else(|| JsValue::from_str(&format!("unsupported color {css:?}")))
}

#[derive(Serialize)]
struct SurfaceInfo {
    width: u32,
    height: u32,
    dirty: bool,
    texture: u64,
    generation: u64,
}

#[wasm_bindgen]
pub struct WasmSurface {
    surface: DrawSurface<CanvasContext>,
    uploads: PendingUploads,
}

#[wasm_bindgen]
impl WasmSurface {
    /// Wrap `ctx`. `config_json` may be empty for the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(ctx: CanvasRenderingContext2d, config_json: &str) -> Result<WasmSurface, JsValue> {
        install_panic_hook();

        let config = if config_json.trim().is_empty() {
            SurfaceConfig::default()
        } else {
            SurfaceConfig::from_json(config_json).map_err(to_js)?
        };
        let context = CanvasContext::new(ctx).map_err(to_js)?;
        let surface = DrawSurface::with_config(context, config).map_err(to_js)?;
        Ok(Self {
            surface,
            uploads: PendingUploads::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    pub fn is_dirty(&self) -> bool {
        self.surface.is_dirty()
    }

    pub fn texture_id(&self) -> u64 {
        self.surface.texture().id().get()
    }

    // ─── Pixels ──────────────────────────────────────────────────────────

    pub fn set_pixel32(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8, a: u8) -> Result<(), JsValue> {
        self.surface.set_pixel32(x, y, r, g, b, a).map_err(to_js)?;
        Ok(())
    }

    pub fn get_pixel32(&self, x: i32, y: i32) -> Option<u32> {
        self.surface.get_pixel32(x, y)
    }

    pub fn fill_color(&mut self, r: u8, g: u8, b: u8, a: u8) -> Result<(), JsValue> {
        self.surface.fill_color(r, g, b, a).map_err(to_js)?;
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), JsValue> {
        self.surface.clear().map_err(to_js)?;
        Ok(())
    }

    /// The shared buffer as RGBA bytes, ready for `texImage2D`.
    pub fn pixels_rgba(&self) -> Vec<u8> {
        self.surface.texture().to_rgba8()
    }

    // ─── Drawing ─────────────────────────────────────────────────────────

    pub fn begin_fill(&mut self, css: &str) -> Result<(), JsValue> {
        let color = parse_color(css)?;
        self.surface.begin_fill(color).map_err(to_js)?;
        Ok(())
    }

    pub fn set_stroke_color(&mut self, css: &str) -> Result<(), JsValue> {
        let color = parse_color(css)?;
        self.surface.set_stroke_style(color).map_err(to_js)?;
        Ok(())
    }

    pub fn set_line_width(&mut self, width: f64) {
        self.surface.set_line_width(width);
    }

    pub fn begin_path(&mut self) {
        self.surface.begin_path();
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.surface.move_to(x, y);
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        self.surface.line_to(x, y);
    }

    pub fn close_path(&mut self) {
        self.surface.close_path();
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.surface.rect(x, y, w, h);
    }

    pub fn circle(&mut self, x: f64, y: f64, radius: f64) -> Result<(), JsValue> {
        self.surface.circle(x, y, radius).map_err(to_js)?;
        Ok(())
    }

    pub fn ellipse(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.surface.ellipse(x, y, w, h);
    }

    pub fn fill(&mut self) -> Result<(), JsValue> {
        self.surface.fill().map_err(to_js)?;
        Ok(())
    }

    pub fn stroke(&mut self) -> Result<(), JsValue> {
        self.surface.stroke().map_err(to_js)?;
        Ok(())
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<(), JsValue> {
        self.surface.fill_rect(x, y, w, h).map_err(to_js)?;
        Ok(())
    }

    pub fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<(), JsValue> {
        self.surface.clear_rect(x, y, w, h).map_err(to_js)?;
        Ok(())
    }

    // ─── Synchronization ─────────────────────────────────────────────────

    /// Flush pending changes. Returns `true` when something was flushed.
    pub fn render(&mut self) -> Result<bool, JsValue> {
        self.surface.render(&mut self.uploads).map_err(to_js)
    }

    /// Ids of textures that need re-uploading since the last call.
    pub fn take_pending_uploads(&mut self) -> Vec<u64> {
        self.uploads.drain().map(|t| t.id().get()).collect()
    }

    /// Size, dirty flag and texture generation as JSON.
    pub fn info_json(&self) -> String {
        let texture = self.surface.texture();
        let info = SurfaceInfo {
            width: self.surface.width(),
            height: self.surface.height(),
            dirty: self.surface.is_dirty(),
            texture: texture.id().get(),
            generation: texture.generation(),
        };
        serde_json::to_string(&info).unwrap_or_default()
    }

    pub fn config_json(&self) -> String {
        serde_json::to_string(self.surface.config()).unwrap_or_default()
    }
}

/// Route panics to the browser console and the `log` facade, once per
/// module instance.
fn install_panic_hook() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let previous = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                let message = panic_message(info.location(), info.payload());
                log::error!("{message}");
                web_sys::console::error_1(&JsValue::from_str(&message));
                previous(info);
            }));
        });
    }
}

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn panic_message(location: Option<&std::panic::Location<'_>>, payload: &dyn std::any::Any) -> String {
    let location = location
        .map(|l| format!(" at {}:{}", l.file(), l.line()))
        .unwrap_or_default();
    let payload = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload");
    format!("drawsurf surface panicked{location}: {payload}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn info_serializes_flat() {
        let info = SurfaceInfo {
            width: 4,
            height: 2,
            dirty: true,
            texture: 7,
            generation: 3,
        };
        assert_eq!(
            serde_json::to_string(&info).unwrap(),
            r#"{"width":4,"height":2,"dirty":true,"texture":7,"generation":3}"#
        );
    }

    #[test]
    fn panic_message_names_location_and_payload() {
        let here = std::panic::Location::caller();
        let msg = panic_message(Some(here), &"index out of bounds");
        assert!(msg.starts_with("drawsurf surface panicked at "), "{msg}");
        assert!(msg.ends_with(": index out of bounds"), "{msg}");

        let owned = String::from("boom");
        assert_eq!(
            panic_message(None, &owned),
            "drawsurf surface panicked: boom"
        );
        assert_eq!(
            panic_message(None, &42_u8),
            "drawsurf surface panicked: non-string payload"
        );
    }
}
