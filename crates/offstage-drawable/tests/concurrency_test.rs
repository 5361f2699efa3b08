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
    ContextBindings, DrawBuffer, NativeDisplay, OffscreenSettings, PixelFormat, PixelRect,
    ReadbackStrategy,
};
use offstage_drawable::ReadbackRequest;
use offstage_infra::ConfigDescriptor;
use offstage_telemetry::{ProbeChannel, ProbeKey, ProbeSink};
use std::sync::Arc;
use std::thread;

#[test]
fn independent_managers_on_separate_threads() {
    for strategy in [ReadbackStrategy::Synchronous, ReadbackStrategy::Staged] {
        let fx = Arc::new(Fixture::new(OffscreenSettings {
            readback: strategy,
            autotest: true,
            ..OffscreenSettings::default()
        }));
        let config = fx.display.add_config(ConfigDescriptor::rgba8(1));

        let workers: Vec<_> = (0..4u8)
            .map(|n| {
                let fx = fx.clone();
                thread::spawn(move || {
                    let manager = fx.manager(0x700000 + n as u64);
                    manager.configure(8 + n as i32, 8, config).unwrap();
                    let surface = manager.surface_drawable().unwrap();
                    let color = [n * 50, 0, 255 - n * 50, 255];
                    fx.display.fill(surface, DrawBuffer::Back, color);

                    let request = ReadbackRequest::new(
                        PixelRect::new(0, 0, 8 + n as i32, 8),
                        PixelFormat::Rgba,
                        DrawBuffer::Back,
                    );
                    let mut out = vec![0u8; request.required_len()];
                    for _ in 0..20 {
                        manager.readback(&request, &mut out).unwrap();
                        assert!(out.chunks_exact(4).all(|p| p == color));
                    }
                    assert_eq!(fx.display.current_bindings(), ContextBindings::RELEASED);
                    manager.logical_drawable()
                })
            })
            .collect();

        for worker in workers {
            let logical = worker.join().expect("worker panicked");
            let frames = fx
                .sink
                .value(&ProbeKey::new(logical, ProbeChannel::FrameCount));
            assert_eq!(frames, Some(20), "{strategy:?}");
        }
        // Every manager was dropped on its own thread.
        assert_eq!(fx.display.live_contexts(), 0);
    }
}

#[test]
fn one_manager_shared_between_threads() {
    let fx = Fixture::new(OffscreenSettings {
        readback: ReadbackStrategy::Staged,
        ..OffscreenSettings::default()
    });
    let config = fx.display.add_config(ConfigDescriptor::rgba8(1));
    let manager = Arc::new(fx.manager(0x700100));
    manager.configure(6, 6, config).unwrap();
    let surface = manager.surface_drawable().unwrap();
    fx.display.fill(surface, DrawBuffer::Back, [4, 5, 6, 7]);

    let workers: Vec<_> = (0..3)
        .map(|_| {
            let manager = manager.clone();
            thread::spawn(move || {
                let request = ReadbackRequest::new(
                    PixelRect::new(0, 0, 6, 6),
                    PixelFormat::Rgba,
                    DrawBuffer::Back,
                );
                let mut out = vec![0u8; request.required_len()];
                for _ in 0..10 {
                    manager.readback(&request, &mut out).unwrap();
                    manager.configure(6, 6, config).unwrap();
                }
                out
            })
        })
        .collect();

    for worker in workers {
        let out = worker.join().expect("worker panicked");
        assert!(out.chunks_exact(4).all(|p| p == [4, 5, 6, 7]));
    }
    assert!(manager.has_context());
    assert_eq!(manager.profiler_totals().pixels, 3 * 10 * 36);
}
