use crate::texture::{Bindable, Texture, TextureConsumer, TextureSource};

/// Minimal texture consumer: remembers the bound texture and adopts its size
/// as the display frame.
#[derive(Debug, Default)]
pub struct Sprite {
    pub name: String,
    pub x: f32,
    pub y: f32,
    texture: Option<Texture>,
    frame: (u32, u32),
}

impl Sprite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    pub fn frame(&self) -> (u32, u32) {
        self.frame
    }
}

impl TextureConsumer for Sprite {
    fn load_texture(&mut self, source: &dyn TextureSource) {
        let texture = source.texture();
        self.frame = (texture.width(), texture.height());
        log::trace!("sprite {:?} bound to {}", self.name, texture.id());
        self.texture = Some(texture);
    }
}

impl Bindable for Sprite {
    fn texture_consumer(&mut self) -> Option<&mut dyn TextureConsumer> {
        Some(self)
    }
}
