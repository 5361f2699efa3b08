// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod common;

use common::Fixture;
use offstage_core::{
    ContextBindings, DeviceErrorCode, DrawBuffer, DrawableError, GlxDrawable, NativeDisplay,
    PixelRect,
};
use offstage_drawable::SurfaceManager;
use offstage_infra::{ConfigDescriptor, Fault};

const SIZE: u32 = 4;

fn pattern(x: u32, y: u32) -> [u8; 4] {
    [x as u8 * 10, y as u8 * 10, 50, 255]
}

/// A configured manager whose surface front buffer holds [`pattern`], and
/// an empty window of the same size to copy into.
fn setup(fx: &Fixture) -> (SurfaceManager, GlxDrawable) {
    let config = fx.display.add_config(ConfigDescriptor::rgba8(1));
    let manager = fx.manager(0x600001);
    manager.configure(SIZE as i32, SIZE as i32, config).unwrap();
    let surface = manager.surface_drawable().unwrap();
    fx.display.fill_with(surface, DrawBuffer::Front, pattern);

    let visual = fx.display.visual_from_config(config).unwrap();
    let window = fx.display.create_window(&visual, SIZE, SIZE).unwrap();
    (manager, GlxDrawable::from(window))
}

#[test]
fn full_copy_preserves_every_row() {
    let fx = Fixture::with_defaults();
    let (manager, target) = setup(&fx);

    manager
        .copy_pixels(PixelRect::new(0, 0, SIZE as i32, SIZE as i32), 0, 0, target)
        .unwrap();

    for buffer in [DrawBuffer::Front, DrawBuffer::Back] {
        for y in 0..SIZE {
            for x in 0..SIZE {
                assert_eq!(
                    fx.display.pixel(target, buffer, x, y),
                    Some(pattern(x, y)),
                    "{buffer:?} ({x}, {y})"
                );
            }
        }
    }
    assert_eq!(fx.display.current_bindings(), ContextBindings::RELEASED);
}

#[test]
fn destination_offset_is_measured_from_the_top() {
    let fx = Fixture::with_defaults();
    let (manager, target) = setup(&fx);

    manager
        .copy_pixels(PixelRect::new(0, 0, SIZE as i32, SIZE as i32), 1, 1, target)
        .unwrap();

    // One pixel right and one pixel down; the bottom source row falls off.
    for y in 0..SIZE - 1 {
        for x in 1..SIZE {
            assert_eq!(
                fx.display.pixel(target, DrawBuffer::Front, x, y),
                Some(pattern(x - 1, y + 1)),
                "({x}, {y})"
            );
        }
    }
    assert_eq!(
        fx.display.pixel(target, DrawBuffer::Front, 0, 0),
        Some([0, 0, 0, 0]),
        "column left of the offset stays untouched"
    );
    assert_eq!(
        fx.display.pixel(target, DrawBuffer::Front, 1, SIZE - 1),
        Some([0, 0, 0, 0]),
        "top row below the offset stays untouched"
    );
}

#[test]
fn source_offset_selects_columns() {
    let fx = Fixture::with_defaults();
    let (manager, target) = setup(&fx);

    manager
        .copy_pixels(PixelRect::new(1, 0, 2, 2), 0, 0, target)
        .unwrap();

    for y in 0..2 {
        for x in 0..2 {
            assert_eq!(
                fx.display.pixel(target, DrawBuffer::Front, x, y),
                Some(pattern(x + 1, y))
            );
        }
    }
    assert_eq!(fx.display.pixel(target, DrawBuffer::Front, 2, 0), Some([0, 0, 0, 0]));
}

#[test]
fn repeated_copies_keep_the_matrix_stacks_balanced() {
    let fx = Fixture::with_defaults();
    let (manager, target) = setup(&fx);
    let rect = PixelRect::new(0, 0, SIZE as i32, SIZE as i32);

    // The stacks are 32 deep; a leaked push would overflow well before 40.
    for _ in 0..40 {
        manager.copy_pixels(rect, 0, 0, target).unwrap();
    }
}

#[test]
fn device_errors_are_tagged_copy_pixels() {
    let fx = Fixture::with_defaults();
    let (manager, target) = setup(&fx);
    fx.display
        .inject_fault(Fault::CopyPixels(DeviceErrorCode::INVALID_VALUE));

    let err = manager
        .copy_pixels(PixelRect::new(0, 0, SIZE as i32, SIZE as i32), 0, 0, target)
        .unwrap_err();
    match err {
        DrawableError::Device { operation, codes } => {
            assert_eq!(operation, "Copy Pixels");
            // One error per copied row.
            assert_eq!(codes, vec![DeviceErrorCode::INVALID_VALUE.0; SIZE as usize]);
        }
        other => panic!("expected a device error, got {other:?}"),
    }
    assert_eq!(fx.display.current_bindings(), ContextBindings::RELEASED);
}

#[test]
fn empty_rectangles_and_missing_surfaces_are_rejected() {
    let fx = Fixture::with_defaults();
    let (manager, target) = setup(&fx);
    assert!(matches!(
        manager.copy_pixels(PixelRect::new(0, 0, 0, 4), 0, 0, target),
        Err(DrawableError::InvalidArgument(_))
    ));

    let bare = fx.manager(0x600002);
    assert!(matches!(
        bare.copy_pixels(PixelRect::new(0, 0, 1, 1), 0, 0, target),
        Err(DrawableError::Uninitialized(_))
    ));
}

#[test]
fn unknown_target_cannot_be_bound() {
    let fx = Fixture::with_defaults();
    let (manager, _) = setup(&fx);
    assert!(matches!(
        manager.copy_pixels(PixelRect::new(0, 0, 1, 1), 0, 0, GlxDrawable(0x7777)),
        Err(DrawableError::Resource(_))
    ));
}
