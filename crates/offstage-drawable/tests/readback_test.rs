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

use approx::assert_relative_eq;
use common::Fixture;
use offstage_core::{
    ContextBindings, DeviceErrorCode, DrawBuffer, DrawableError, FbConfig, NativeDisplay,
    OffscreenSettings, PixelFormat, PixelRect, ReadbackStrategy,
};
use offstage_drawable::{ForceAlphaHint, ReadbackRequest, SurfaceManager};
use offstage_infra::{ConfigDescriptor, Fault};
use offstage_telemetry::{ProbeChannel, ProbeKey, ProbeSink};
use std::time::Duration;

const W: i32 = 5;
const H: i32 = 3;

fn gradient(x: u32, y: u32) -> [u8; 4] {
    [(x * 40) as u8, (y * 70) as u8, 200, 128]
}

fn settings(readback: ReadbackStrategy) -> OffscreenSettings {
    OffscreenSettings {
        readback,
        ..OffscreenSettings::default()
    }
}

fn configured(fx: &Fixture, logical: u64) -> (SurfaceManager, FbConfig) {
    let config = fx.display.add_config(ConfigDescriptor::rgba8(1));
    let manager = fx.manager(logical);
    manager.configure(W, H, config).unwrap();
    let surface = manager.surface_drawable().unwrap();
    fx.display.fill_with(surface, DrawBuffer::Back, gradient);
    (manager, config)
}

fn expected(format: PixelFormat, row_pitch: usize) -> Vec<u8> {
    let bpp = format.bytes_per_pixel();
    let mut out = vec![0u8; row_pitch * H as usize];
    for y in 0..H as u32 {
        for x in 0..W as u32 {
            let offset = y as usize * row_pitch + x as usize * bpp;
            format.encode(gradient(x, y), &mut out[offset..offset + bpp]);
        }
    }
    out
}

fn full_frame(format: PixelFormat) -> ReadbackRequest {
    ReadbackRequest::new(PixelRect::new(0, 0, W, H), format, DrawBuffer::Back)
}

#[test]
fn both_strategies_read_every_format() {
    for strategy in [ReadbackStrategy::Synchronous, ReadbackStrategy::Staged] {
        let fx = Fixture::new(settings(strategy));
        let (manager, _) = configured(&fx, 0x500001);

        for format in [
            PixelFormat::Rgb,
            PixelFormat::Rgba,
            PixelFormat::Bgr,
            PixelFormat::Bgra,
            PixelFormat::Abgr,
            PixelFormat::Red,
            PixelFormat::Blue,
        ] {
            let request = full_frame(format);
            let mut out = vec![0u8; request.required_len()];
            manager.readback(&request, &mut out).unwrap();
            assert_eq!(
                out,
                expected(format, request.row_pitch),
                "{strategy:?} readback of {format}"
            );
        }
    }
}

#[test]
fn padded_rows_land_at_the_requested_pitch() {
    for strategy in [ReadbackStrategy::Synchronous, ReadbackStrategy::Staged] {
        let fx = Fixture::new(settings(strategy));
        let (manager, _) = configured(&fx, 0x500001);

        // 5 RGB pixels are 15 bytes; a 16-byte pitch selects 8-byte alignment.
        let request = full_frame(PixelFormat::Rgb).with_row_pitch(16);
        let mut out = vec![0u8; request.required_len()];
        manager.readback(&request, &mut out).unwrap();

        let want = expected(PixelFormat::Rgb, 16);
        for row in 0..H as usize {
            let pixels = row * 16..row * 16 + 15;
            assert_eq!(out[pixels.clone()], want[pixels], "{strategy:?} row {row}");
        }
    }
}

#[test]
fn pitches_the_device_cannot_produce_are_rejected() {
    for strategy in [ReadbackStrategy::Synchronous, ReadbackStrategy::Staged] {
        let fx = Fixture::new(settings(strategy));
        let (manager, _) = configured(&fx, 0x500001);

        // A 20-byte pitch packs at 4-byte alignment, which yields 16-byte rows.
        let request = full_frame(PixelFormat::Rgb).with_row_pitch(20);
        let mut out = vec![0xeeu8; request.required_len()];
        assert!(matches!(
            manager.readback(&request, &mut out),
            Err(DrawableError::InvalidArgument(_))
        ));
        assert!(out.iter().all(|&b| b == 0xee), "{strategy:?} wrote pixels");
    }
}

#[test]
fn oversized_pitch_is_an_argument_error() {
    let fx = Fixture::with_defaults();
    let (manager, _) = configured(&fx, 0x500001);
    let request = ReadbackRequest::new(
        PixelRect::new(0, 0, 1, 4),
        PixelFormat::Rgb,
        DrawBuffer::Back,
    )
    .with_row_pitch(usize::MAX / 2);
    let mut out = vec![0u8; 64];
    assert!(matches!(
        manager.readback(&request, &mut out),
        Err(DrawableError::InvalidArgument(_))
    ));

    // Consistently packed rows whose total size does not fit in memory.
    let request = ReadbackRequest {
        region: PixelRect::new(0, 0, i32::MAX, i32::MAX),
        row_pitch: i32::MAX as usize * 8,
        format: PixelFormat::Rgba,
        pixel_size: 8,
        buffer: DrawBuffer::Back,
        stereo: false,
    };
    assert_eq!(request.required_len(), usize::MAX);
    assert!(matches!(
        manager.readback(&request, &mut out),
        Err(DrawableError::InvalidArgument(_))
    ));
}

#[test]
fn undersized_destination_is_rejected() {
    let fx = Fixture::with_defaults();
    let (manager, _) = configured(&fx, 0x500001);
    let request = full_frame(PixelFormat::Rgba);
    let mut out = vec![0u8; request.required_len() - 1];
    assert!(matches!(
        manager.readback(&request, &mut out),
        Err(DrawableError::InvalidArgument(_))
    ));
    assert!(!manager.has_context(), "validation happens before any native call");
}

#[test]
fn staged_readback_without_extension_is_unsupported() {
    let fx = Fixture::new(settings(ReadbackStrategy::Staged));
    let (manager, _) = configured(&fx, 0x500001);
    fx.display.set_extensions(Vec::<String>::new());

    let request = full_frame(PixelFormat::Rgba);
    let mut out = vec![0u8; request.required_len()];
    for _ in 0..2 {
        assert!(matches!(
            manager.readback(&request, &mut out),
            Err(DrawableError::UnsupportedFeature(_))
        ));
    }
    assert_eq!(fx.display.current_bindings(), ContextBindings::RELEASED);

    let sync = Fixture::new(settings(ReadbackStrategy::Synchronous));
    let (manager, _) = configured(&sync, 0x500002);
    sync.display.set_extensions(Vec::<String>::new());
    manager.readback(&request, &mut out).unwrap();
}

#[test]
fn device_errors_after_the_transfer_are_reported() {
    let fx = Fixture::with_defaults();
    let (manager, _) = configured(&fx, 0x500001);
    fx.display
        .inject_fault(Fault::ReadPixels(DeviceErrorCode::INVALID_OPERATION));

    let request = full_frame(PixelFormat::Rgba);
    let mut out = vec![0u8; request.required_len()];
    let err = manager.readback(&request, &mut out).unwrap_err();
    assert_eq!(
        err,
        DrawableError::Device {
            operation: "Read Pixels",
            codes: vec![DeviceErrorCode::INVALID_OPERATION.0],
        }
    );
    assert_eq!(err.device_operation(), Some("Read Pixels"));
}

#[test]
fn staged_buffer_failures_are_resource_errors() {
    let cases = [
        (Fault::BufferGeneration, "Could not generate pixel buffer object"),
        (Fault::BufferAllocation, "Could not set PBO size"),
        (Fault::BufferMap, "Could not map pixel buffer object"),
        (Fault::BufferUnmap, "Could not unmap pixel buffer object"),
    ];
    for (fault, message) in cases {
        let fx = Fixture::new(settings(ReadbackStrategy::Staged));
        let (manager, _) = configured(&fx, 0x500001);
        fx.display.inject_fault(fault);

        let request = full_frame(PixelFormat::Bgra);
        let mut out = vec![0u8; request.required_len()];
        assert_eq!(
            manager.readback(&request, &mut out),
            Err(DrawableError::resource(message)),
            "{fault:?}"
        );
        assert_eq!(
            fx.display.current_bindings(),
            ContextBindings::RELEASED,
            "bindings must be restored after {fault:?}"
        );

        // Once the fault is gone the next readback works again.
        fx.display.clear_faults();
        manager.readback(&request, &mut out).unwrap();
        assert_eq!(out, expected(PixelFormat::Bgra, request.row_pitch));
    }
}

#[test]
fn staged_buffer_is_shared_and_resized() {
    let fx = Fixture::new(settings(ReadbackStrategy::Staged));
    let (first, config) = configured(&fx, 0x500001);
    let second = fx.manager(0x500002);
    second.configure(2, 2, config).unwrap();

    let request = full_frame(PixelFormat::Rgba);
    let mut out = vec![0u8; request.required_len()];
    first.readback(&request, &mut out).unwrap();

    let small = ReadbackRequest::new(PixelRect::new(0, 0, 2, 2), PixelFormat::Rgb, DrawBuffer::Back);
    let mut small_out = vec![0u8; small.required_len()];
    second.readback(&small, &mut small_out).unwrap();

    assert_eq!(fx.display.live_buffers(), 1);
    assert_eq!(
        fx.runtime.selector().staged_buffer().handle().map(|b| b.0),
        Some(1)
    );
}

#[test]
fn readback_uses_and_restores_the_callers_bindings() {
    let fx = Fixture::new(settings(ReadbackStrategy::Synchronous));
    let (manager, config) = configured(&fx, 0x500001);

    // The client renders into its own pbuffer with its own context.
    let client_drawable = fx.display.create_pbuffer(config, W as u32, H as u32).unwrap();
    fx.display.fill(client_drawable, DrawBuffer::Back, [7, 7, 7, 7]);
    let client_context = fx.display.create_context(config, true).unwrap();
    let client = ContextBindings::new(client_context, client_drawable, client_drawable);
    assert!(fx.display.make_current(client));

    let request = full_frame(PixelFormat::Rgba);
    let mut out = vec![0u8; request.required_len()];
    manager.readback(&request, &mut out).unwrap();

    assert!(out.chunks_exact(4).all(|p| p == [7, 7, 7, 7]));
    assert_eq!(fx.display.current_bindings(), client);
    fx.display.make_current(ContextBindings::RELEASED);
}

#[test]
fn blocking_staged_transfers_trip_calibration_once() {
    let fx = Fixture::new(OffscreenSettings {
        readback: ReadbackStrategy::Staged,
        force_alpha: true,
        verbose: true,
        ..OffscreenSettings::default()
    });
    let (manager, _) = configured(&fx, 0x500001);
    fx.display.set_read_latency(Duration::from_millis(4));

    let request = full_frame(PixelFormat::Rgb);
    let mut out = vec![0u8; request.required_len()];
    for _ in 0..12 {
        manager.readback(&request, &mut out).unwrap();
    }

    let selector = fx.runtime.selector();
    let trips = selector.calibration_trips();
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].target_format, PixelFormat::Rgb);
    assert_eq!(trips[0].native_format, PixelFormat::native_for_host(32));
    if trips[0].native_format == PixelFormat::Rgba {
        assert_eq!(trips[0].hint, Some(ForceAlphaHint::Disable));
    } else {
        assert_eq!(trips[0].hint, None);
    }
    // Informational only: the strategy is never switched.
    assert_eq!(selector.strategy(), ReadbackStrategy::Staged);
    assert_eq!(out, expected(PixelFormat::Rgb, request.row_pitch));

    // A new target format re-arms the detector.
    let bgr = full_frame(PixelFormat::Bgr);
    for _ in 0..10 {
        manager.readback(&bgr, &mut out).unwrap();
    }
    assert_eq!(selector.calibration_trips().len(), 2);
}

#[test]
fn overlapped_staged_transfers_do_not_trip() {
    let fx = Fixture::new(settings(ReadbackStrategy::Staged));
    let (manager, _) = configured(&fx, 0x500001);
    fx.display.set_map_latency(Duration::from_millis(4));

    let request = full_frame(PixelFormat::Bgra);
    let mut out = vec![0u8; request.required_len()];
    for _ in 0..12 {
        manager.readback(&request, &mut out).unwrap();
    }

    let window = fx.runtime.selector().calibration_window();
    assert_eq!(window.frames(), 12);
    assert_eq!(window.sync_frames(), 0);
    assert!(fx.runtime.selector().calibration_trips().is_empty());
}

#[test]
fn synchronous_readback_is_not_calibrated() {
    let fx = Fixture::new(settings(ReadbackStrategy::Synchronous));
    let (manager, _) = configured(&fx, 0x500001);
    fx.display.set_read_latency(Duration::from_millis(2));

    let request = full_frame(PixelFormat::Rgba);
    let mut out = vec![0u8; request.required_len()];
    for _ in 0..3 {
        manager.readback(&request, &mut out).unwrap();
    }
    assert_eq!(fx.runtime.selector().calibration_window().frames(), 0);
}

#[test]
fn format_change_resets_the_calibration_window() {
    let fx = Fixture::new(settings(ReadbackStrategy::Staged));
    let (manager, _) = configured(&fx, 0x500001);

    let rgba = full_frame(PixelFormat::Rgba);
    let mut out = vec![0u8; rgba.required_len()];
    for _ in 0..3 {
        manager.readback(&rgba, &mut out).unwrap();
    }
    assert_eq!(fx.runtime.selector().calibration_window().frames(), 3);

    // Green after red counts as the same format.
    let red = full_frame(PixelFormat::Red);
    let green = full_frame(PixelFormat::Green);
    manager.readback(&red, &mut out).unwrap();
    manager.readback(&green, &mut out).unwrap();
    assert_eq!(fx.runtime.selector().calibration_window().frames(), 2);
}

#[test]
fn failed_readbacks_leave_the_calibration_window_alone() {
    let fx = Fixture::new(settings(ReadbackStrategy::Staged));
    let (manager, _) = configured(&fx, 0x500001);

    let rgba = full_frame(PixelFormat::Rgba);
    let mut out = vec![0u8; rgba.required_len()];
    for _ in 0..3 {
        manager.readback(&rgba, &mut out).unwrap();
    }

    // A manager without a surface reads nothing and must not count as a
    // format change.
    let bare = fx.manager(0x500002);
    assert!(matches!(
        bare.readback(&full_frame(PixelFormat::Bgr), &mut out),
        Err(DrawableError::Uninitialized(_))
    ));
    assert_eq!(fx.runtime.selector().calibration_window().frames(), 3);

    manager.readback(&rgba, &mut out).unwrap();
    assert_eq!(fx.runtime.selector().calibration_window().frames(), 4);
}

#[test]
fn probe_publishes_flat_color_and_frame_count() {
    let fx = Fixture::new(OffscreenSettings {
        autotest: true,
        ..OffscreenSettings::default()
    });
    let config = fx.display.add_config(ConfigDescriptor::rgba8(1));
    let manager = fx.manager(0x500abc);
    manager.configure(4, 4, config).unwrap();
    let surface = manager.surface_drawable().unwrap();
    let logical = manager.logical_drawable();
    let color = ProbeKey::new(logical, ProbeChannel::Color);
    let frames = ProbeKey::new(logical, ProbeChannel::FrameCount);

    fx.display.fill(surface, DrawBuffer::Back, [0x12, 0x34, 0x56, 0xff]);
    let request = ReadbackRequest::new(PixelRect::new(0, 0, 4, 4), PixelFormat::Bgra, DrawBuffer::Back);
    let mut out = vec![0u8; request.required_len()];
    manager.readback(&request, &mut out).unwrap();

    assert_eq!(fx.sink.value(&color), Some(0x563412));
    assert_eq!(fx.sink.value(&frames), Some(1));
    assert_eq!(color.variable_name(), "OFFSTAGE_AUTOTEST_CLR500abc");

    // One differing pixel makes the frame "not flat".
    fx.display.fill_with(surface, DrawBuffer::Back, |x, y| {
        if (x, y) == (3, 2) {
            [0, 0, 0, 0]
        } else {
            [1, 1, 1, 1]
        }
    });
    manager.readback(&request, &mut out).unwrap();
    assert_eq!(fx.sink.value(&color), Some(-1));
    assert_eq!(fx.sink.value(&frames), Some(2));
    assert_eq!(manager.frame_count(), 2);
}

#[test]
fn probe_separates_the_right_eye() {
    let fx = Fixture::new(OffscreenSettings {
        autotest: true,
        readback: ReadbackStrategy::Synchronous,
        ..OffscreenSettings::default()
    });
    let config = fx
        .display
        .add_config(ConfigDescriptor::rgba8(1).with_stereo(true));
    let manager = fx.manager(0x500001);
    manager.configure(2, 2, config).unwrap();
    let surface = manager.surface_drawable().unwrap();
    let logical = manager.logical_drawable();

    fx.display.fill(surface, DrawBuffer::BackLeft, [0xff, 0, 0, 0xff]);
    fx.display.fill(surface, DrawBuffer::BackRight, [0, 0, 0xff, 0xff]);

    let left = ReadbackRequest::new(PixelRect::new(0, 0, 2, 2), PixelFormat::Rgb, DrawBuffer::BackLeft)
        .with_stereo(true);
    let right = ReadbackRequest { buffer: DrawBuffer::BackRight, ..left };
    let mut out = vec![0u8; left.required_len()];
    manager.readback(&left, &mut out).unwrap();
    manager.readback(&right, &mut out).unwrap();

    assert_eq!(fx.sink.value(&ProbeKey::new(logical, ProbeChannel::Color)), Some(0x0000ff));
    assert_eq!(
        fx.sink.value(&ProbeKey::new(logical, ProbeChannel::RightEyeColor)),
        Some(0xff0000)
    );
    assert_eq!(fx.sink.value(&ProbeKey::new(logical, ProbeChannel::FrameCount)), Some(1));

    // Two stereo halves weigh one frame.
    let totals = manager.profiler_totals();
    assert_relative_eq!(totals.frames, 1.0);
    assert_eq!(totals.pixels, 8);
}

#[test]
fn probe_is_silent_without_autotest() {
    let fx = Fixture::with_defaults();
    let (manager, _) = configured(&fx, 0x500001);
    let request = full_frame(PixelFormat::Rgba);
    let mut out = vec![0u8; request.required_len()];
    manager.readback(&request, &mut out).unwrap();
    assert!(fx.sink.is_empty());
    assert_eq!(manager.frame_count(), 0);
}
