//! Shared texture handle and the consumer-side binding traits.
//!
//! A [`Texture`] wraps the surface's packed pixel buffer. The surface is the
//! only writer; consumers receive cheap clones of the handle and read the
//! same buffer, so a mutation is visible to every bound consumer at once.

use crate::color::Color;
use crate::error::{Result, SurfaceError};
use crate::pixel;
use std::cell::{Cell, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique texture identifier. Backends key GPU resources on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        TextureId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}

struct TextureInner {
    id: TextureId,
    width: u32,
    height: u32,
    pixels: RefCell<Vec<u32>>,
    /// Bumped each time the surface flushes a change.
    generation: Cell<u64>,
}

/// Read-only (to consumers) handle over a surface's pixel buffer.
#[derive(Clone)]
pub struct Texture {
    inner: Rc<TextureInner>,
}

impl Texture {
    pub(crate) fn new(width: u32, height: u32, pixels: Vec<u32>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            inner: Rc::new(TextureInner {
                id: TextureId::next(),
                width,
                height,
                pixels: RefCell::new(pixels),
                generation: Cell::new(0),
            }),
        }
    }

    pub fn id(&self) -> TextureId {
        self.inner.id
    }

    pub fn width(&self) -> u32 {
        self.inner.width
    }

    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// Number of flushed changes so far. A consumer that caches derived data
    /// can compare generations instead of pixels.
    pub fn generation(&self) -> u64 {
        self.inner.generation.get()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x < self.width() && y < self.height() {
            Some(self.inner.pixels.borrow()[(y * self.width() + x) as usize])
        } else {
            None
        }
    }

    pub fn pixel_color(&self, x: u32, y: u32) -> Option<Color> {
        self.pixel(x, y).map(Color::from_packed)
    }

    /// Run `f` over the packed buffer.
    ///
    /// The surface cannot write while `f` runs; its mutating calls fail with
    /// [`SurfaceError::TextureBusy`] instead.
    pub fn with_pixels<R>(&self, f: impl FnOnce(&[u32]) -> R) -> R {
        f(&self.inner.pixels.borrow())
    }

    /// Owned copy of the packed buffer.
    pub fn to_vec(&self) -> Vec<u32> {
        self.with_pixels(|px| px.to_vec())
    }

    /// RGBA byte copy of the buffer, ready for an `Rgba8Unorm` upload.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.with_pixels(pixel::unpack_rgba8)
    }

    /// Whether two handles refer to the same texture.
    pub fn ptr_eq(&self, other: &Texture) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn pixels_mut(&self) -> Result<RefMut<'_, Vec<u32>>> {
        self.inner
            .pixels
            .try_borrow_mut()
            .map_err(|_| SurfaceError::TextureBusy(self.id()))
    }

    pub(crate) fn bump_generation(&self) {
        self.inner.generation.set(self.inner.generation.get() + 1);
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id())
            .field("width", &self.width())
            .field("height", &self.height())
            .field("generation", &self.generation())
            .finish()
    }
}

/// Something that can hand out a texture to bind.
pub trait TextureSource {
    fn texture(&self) -> Texture;

    fn size(&self) -> (u32, u32) {
        let t = self.texture();
        (t.width(), t.height())
    }
}

/// A sprite-like object that renders with a texture.
pub trait TextureConsumer {
    fn load_texture(&mut self, source: &dyn TextureSource);
}

/// A scene object that may or may not accept textures.
///
/// `DrawSurface::add_to` walks a mixed list of these and binds only the ones
/// that expose a consumer.
pub trait Bindable {
    fn texture_consumer(&mut self) -> Option<&mut dyn TextureConsumer> {
        None
    }
}
