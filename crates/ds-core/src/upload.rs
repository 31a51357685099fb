//! Texture re-upload requests.

use crate::error::Result;
use crate::texture::{Texture, TextureId};

/// The backend's texture-upload queue. `DrawSurface::render` calls this when
/// a dirty surface is flushed under [`UploadPolicy::Explicit`](crate::UploadPolicy).
pub trait UploadQueue {
    fn request_upload(&mut self, texture: &Texture) -> Result<()>;
}

/// In-memory queue that collects textures until a backend drains them.
/// A texture queued twice before draining is uploaded once.
#[derive(Debug, Default)]
pub struct PendingUploads {
    pending: Vec<Texture>,
}

impl PendingUploads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, id: TextureId) -> bool {
        self.pending.iter().any(|t| t.id() == id)
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Texture> + '_ {
        self.pending.drain(..)
    }
}

impl UploadQueue for PendingUploads {
    fn request_upload(&mut self, texture: &Texture) -> Result<()> {
        if !self.contains(texture.id()) {
            log::trace!("queue upload {}", texture.id());
            self.pending.push(texture.clone());
        }
        Ok(())
    }
}
