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

// Offstage Sandbox
// Drives a surface manager against the software display.
//
// Usage: sandbox [settings.json]
// Without an argument, settings come from the OFFSTAGE_* environment variables.

use std::sync::Arc;

use anyhow::{Context, Result};
use offstage_core::{
    DrawBuffer, GlxDrawable, LogicalDrawable, NativeDisplay, OffscreenSettings, PixelFormat,
    PixelRect,
};
use offstage_drawable::{DrawableRuntime, ReadbackRequest, SurfaceManager};
use offstage_infra::{ConfigDescriptor, SoftwareDisplay};
use offstage_telemetry::InMemoryProbeSink;

const CLIENT_DRAWABLE: LogicalDrawable = LogicalDrawable(0x0440_0001);

/// Geometry requested on successive frames. The repeat is served by the
/// existing surface.
const FRAMES: &[(i32, i32, [u8; 4])] = &[
    (320, 240, [255, 128, 0, 255]),
    (320, 240, [0, 128, 255, 255]),
    (640, 480, [32, 200, 32, 255]),
];

fn load_settings() -> Result<OffscreenSettings> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings file '{path}'"))?;
            Ok(OffscreenSettings::from_json(&json)?)
        }
        None => Ok(OffscreenSettings::from_env()?),
    }
}

fn main() -> Result<()> {
    offstage_telemetry::logging::init_logging("info");

    let mut settings = load_settings()?;
    // The sandbox always reports what it does.
    settings.verbose = true;
    settings.autotest = true;
    log::info!("Settings: {settings:?}");

    let probe = Arc::new(InMemoryProbeSink::new());
    let runtime = Arc::new(DrawableRuntime::new(settings, probe.clone()));
    let display = Arc::new(SoftwareDisplay::new());
    let config = display.add_config(ConfigDescriptor::rgba8(1));

    let manager = SurfaceManager::new(display.clone(), CLIENT_DRAWABLE, runtime.clone())?;

    for (frame, &(width, height, color)) in FRAMES.iter().enumerate() {
        let outcome = manager.configure(width, height, config)?;
        let surface = manager.surface_drawable()?;
        display.fill(surface, DrawBuffer::Back, color);

        let request = ReadbackRequest::new(
            PixelRect::new(0, 0, width, height),
            PixelFormat::Rgb,
            DrawBuffer::Back,
        );
        let mut pixels = vec![0u8; request.required_len()];
        manager.readback(&request, &mut pixels)?;
        log::info!(
            "Frame {frame}: {width}x{height} ({outcome:?}), first pixel {:?}",
            &pixels[..3]
        );
    }

    let info = manager
        .surface_info()
        .context("surface manager lost its surface")?;
    let visual = display
        .visual_from_config(config)
        .context("configuration has no visual")?;
    let window = display
        .create_window(&visual, info.width, info.height)
        .context("Could not create target window")?;
    let target = GlxDrawable::from(window);

    let (w, h) = (info.width as i32, info.height as i32);
    manager.copy_pixels(PixelRect::new(0, 0, w, h), 0, 0, target)?;
    log::info!(
        "Copied {w}x{h} into window {window:#x}, center pixel {:?}",
        display.pixel(target, DrawBuffer::Front, info.width / 2, info.height / 2)
    );

    let totals = manager.profiler_totals();
    log::info!(
        "Read back {} frames, {} pixels in {:?}",
        totals.frames,
        totals.pixels,
        totals.busy
    );
    log::info!(
        "Calibration trips: {}",
        runtime.selector().calibration_trips().len()
    );
    println!("{:#}", probe.to_json());

    drop(manager);
    display.destroy_window(window);
    Ok(())
}
