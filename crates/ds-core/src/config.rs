//! Surface behaviour knobs.

use crate::error::{Result, SurfaceError};
use serde::{Deserialize, Serialize};

/// What a pixel write outside the surface does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsPolicy {
    /// Silently ignore the write.
    #[default]
    Ignore,
    /// Report [`SurfaceError::OutOfRange`].
    Strict,
}

/// Whether the rendering backend needs an explicit upload request when the
/// surface changes. GPU backends do; a canvas backend sampling the buffer
/// directly does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadPolicy {
    #[default]
    Explicit,
    Implicit,
}

/// When the packed buffer is re-derived from the drawing context after a
/// vector draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// After every painting operation.
    #[default]
    AfterDraw,
    /// Only on `refresh_buffer()`, or lazily before the next direct pixel
    /// write or `render()`.
    Manual,
}

/// Configuration for a [`DrawSurface`](crate::DrawSurface).
///
/// Defaults match a GPU-backed game loop: ignore bad coordinates, request
/// uploads explicitly, keep the packed buffer in step with every draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub bounds: BoundsPolicy,
    pub upload: UploadPolicy,
    pub refresh: RefreshPolicy,
}

impl SurfaceConfig {
    /// Parse a JSON object; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| SurfaceError::Config(e.to_string()))
    }

    pub fn with_bounds(mut self, bounds: BoundsPolicy) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_upload(mut self, upload: UploadPolicy) -> Self {
        self.upload = upload;
        self
    }

    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_fills_defaults() {
        let config = SurfaceConfig::from_json(r#"{ "upload": "implicit" }"#).unwrap();
        assert_eq!(
            config,
            SurfaceConfig::default().with_upload(UploadPolicy::Implicit)
        );
    }

    #[test]
    fn empty_object_is_default() {
        assert_eq!(SurfaceConfig::from_json("{}").unwrap(), SurfaceConfig::default());
    }

    #[test]
    fn unknown_variant_is_config_error() {
        let err = SurfaceConfig::from_json(r#"{ "bounds": "clamp" }"#).unwrap_err();
        assert!(matches!(err, SurfaceError::Config(_)));
    }
}
