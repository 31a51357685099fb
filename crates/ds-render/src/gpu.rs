//! GPU side of texture synchronization.
//!
//! Surfaces only queue upload requests; the host drains the queue once per
//! frame through [`GpuTextureCache::flush`], which creates device textures
//! on first sight and rewrites their contents from the shared pixel buffer.

use ds_core::{PendingUploads, Texture, TextureId};
use std::collections::HashMap;

pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// A device texture mirroring one surface texture.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    generation: u64,
}

impl GpuTexture {
    /// Generation of the surface texture at the last upload.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Default)]
pub struct GpuTextureCache {
    textures: HashMap<TextureId, GpuTexture>,
}

impl GpuTextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn get(&self, id: TextureId) -> Option<&GpuTexture> {
        self.textures.get(&id)
    }

    /// Drop the device texture for `id`. Returns whether one existed.
    pub fn evict(&mut self, id: TextureId) -> bool {
        self.textures.remove(&id).is_some()
    }

    /// Upload every pending texture. Returns how many were written.
    pub fn flush(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pending: &mut PendingUploads,
    ) -> usize {
        let mut uploaded = 0;
        for texture in pending.drain() {
            let entry = self
                .textures
                .entry(texture.id())
                .or_insert_with(|| create(device, &texture));
            write(queue, &entry.texture, &texture);
            entry.generation = texture.generation();
            uploaded += 1;
        }
        if uploaded > 0 {
            log::debug!("uploaded {uploaded} texture(s)");
        }
        uploaded
    }
}

fn extent(texture: &Texture) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: texture.width(),
        height: texture.height(),
        depth_or_array_layers: 1,
    }
}

pub fn bytes_per_row(width: u32) -> u32 {
    width * 4
}

fn create(device: &wgpu::Device, texture: &Texture) -> GpuTexture {
    log::trace!("creating device texture for {}", texture.id());
    let gpu = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("drawsurf texture"),
        size: extent(texture),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TEXTURE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = gpu.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        texture: gpu,
        view,
        generation: 0,
    }
}

fn write(queue: &wgpu::Queue, target: &wgpu::Texture, texture: &Texture) {
    let layout = wgpu::TexelCopyBufferLayout {
        offset: 0,
        bytes_per_row: Some(bytes_per_row(texture.width())),
        rows_per_image: Some(texture.height()),
    };
    let copy = wgpu::TexelCopyTextureInfo {
        texture: target,
        mip_level: 0,
        origin: wgpu::Origin3d::ZERO,
        aspect: wgpu::TextureAspect::All,
    };
    // Packed pixels are already RGBA bytes on little-endian targets.
    if cfg!(target_endian = "little") {
        texture.with_pixels(|pixels| {
            queue.write_texture(copy, bytemuck::cast_slice(pixels), layout, extent(texture));
        });
    } else {
        queue.write_texture(copy, &texture.to_rgba8(), layout, extent(texture));
    }
}
