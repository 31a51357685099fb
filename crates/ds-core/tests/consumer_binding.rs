//! Integration tests: binding a surface's texture to consumers.
//!
//! Several sprites share one surface; mutations and flushes must be visible
//! through every bound handle.

use ds_core::record::RecordingContext;
use ds_core::{Bindable, DrawSurface, PendingUploads, Sprite, TextureConsumer, TextureSource};

fn make_surface() -> DrawSurface<RecordingContext> {
    DrawSurface::new(RecordingContext::new(4, 4)).unwrap()
}

/// A scene object with no texture slot.
struct Label;

impl Bindable for Label {}

#[test]
fn add_binds_shared_texture() {
    let surface = make_surface();
    let mut sprite = Sprite::new("hero");
    surface.add(&mut sprite);

    let bound = sprite.texture().expect("sprite has no texture");
    assert!(bound.ptr_eq(surface.texture()));
    assert_eq!(sprite.frame(), (4, 4));
}

#[test]
fn add_to_skips_targets_without_texture_support() {
    let surface = make_surface();
    let mut c1 = Sprite::new("c1");
    let mut label = Label;
    let mut c2 = Sprite::new("c2");

    let bound = surface.add_to([
        &mut c1 as &mut dyn Bindable,
        &mut label,
        &mut c2,
    ]);

    assert_eq!(bound, 2);
    assert!(c1.texture().is_some());
    assert!(c2.texture().is_some());
}

#[test]
fn mutation_is_visible_to_all_bound_consumers_after_render() {
    let mut surface = make_surface();
    let mut c1 = Sprite::new("c1");
    let mut c2 = Sprite::new("c2");
    surface.add_to([&mut c1 as &mut dyn Bindable, &mut c2]);

    surface.set_pixel(3, 3, 0, 255, 0).unwrap();
    let mut queue = PendingUploads::new();
    assert!(surface.render(&mut queue).unwrap());

    for sprite in [&c1, &c2] {
        let tex = sprite.texture().unwrap();
        assert_eq!(tex.pixel(3, 3), Some(0xFF00_FF00), "{} is stale", sprite.name);
        assert_eq!(tex.generation(), 1);
    }
    // One shared texture means one upload, however many sprites use it.
    assert_eq!(queue.len(), 1);
}

#[test]
fn custom_consumer_receives_the_surface() {
    #[derive(Default)]
    struct SizeRecorder {
        seen: Option<(u32, u32)>,
    }

    impl TextureConsumer for SizeRecorder {
        fn load_texture(&mut self, source: &dyn TextureSource) {
            self.seen = Some(source.size());
        }
    }

    let surface = make_surface();
    let mut recorder = SizeRecorder::default();
    surface.add(&mut recorder);
    assert_eq!(recorder.seen, Some((4, 4)));
}
