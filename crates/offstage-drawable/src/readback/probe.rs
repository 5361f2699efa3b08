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

//! Per-frame signatures published for automated verification.

use super::ReadbackRequest;
use offstage_core::{LogicalDrawable, NativeDisplay, PixelFormat, PixelRect, ReadTarget};
use offstage_telemetry::{ProbeChannel, ProbeKey, ProbeSink};

/// Value published when a frame is not a single flat color.
pub const NOT_FLAT: i64 = -1;

/// Returns `true` if every pixel of each row equals the first pixel of
/// that row.
///
/// `pixels` holds `height` rows of `row_pitch` bytes, each pixel taking
/// `pixel_size` bytes.
pub fn is_flat(
    pixels: &[u8],
    width: usize,
    height: usize,
    row_pitch: usize,
    pixel_size: usize,
) -> bool {
    if pixel_size == 0 {
        return false;
    }
    (0..height).all(|row| {
        let start = row * row_pitch;
        let Some(line) = pixels.get(start..start + width * pixel_size) else {
            return false;
        };
        let mut texels = line.chunks_exact(pixel_size);
        let Some(first) = texels.next() else {
            return true;
        };
        texels.all(|p| p == first)
    })
}

/// Packs an RGB triple the way the probe publishes it.
pub fn pack_rgb(rgb: [u8; 3]) -> i64 {
    rgb[0] as i64 + ((rgb[1] as i64) << 8) + ((rgb[2] as i64) << 16)
}

/// Frame counter and flat-color detector of one surface manager.
#[derive(Debug, Default)]
pub struct FrameProbe {
    frame_count: i64,
}

impl FrameProbe {
    /// Creates a probe with a zero frame count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-right-eye frames seen.
    pub fn frame_count(&self) -> i64 {
        self.frame_count
    }

    /// Inspects a completed readback and publishes its signature.
    ///
    /// The color is sampled again from pixel (0, 0) of the read buffer, so
    /// the caller's context must still be bound.
    pub fn inspect(
        &mut self,
        display: &dyn NativeDisplay,
        sink: &dyn ProbeSink,
        drawable: LogicalDrawable,
        request: &ReadbackRequest,
        pixels: &[u8],
    ) {
        let right_eye = request.buffer.is_right_eye();
        if !right_eye {
            self.frame_count += 1;
        }

        let flat = is_flat(
            pixels,
            request.region.width as usize,
            request.region.height as usize,
            request.row_pitch,
            request.pixel_size,
        );
        let color = if flat {
            sample_origin(display, request.format)
        } else {
            NOT_FLAT
        };

        let channel = if right_eye {
            ProbeChannel::RightEyeColor
        } else {
            ProbeChannel::Color
        };
        let published = [
            (ProbeKey::new(drawable, channel), color),
            (ProbeKey::new(drawable, ProbeChannel::FrameCount), self.frame_count),
        ];
        for (key, value) in published {
            if let Err(e) = sink.publish(key, value) {
                log::warn!("Failed to publish probe value {key}: {e}");
            }
        }
    }
}

fn sample_origin(display: &dyn NativeDisplay, format: PixelFormat) -> i64 {
    let origin = PixelRect::new(0, 0, 1, 1);
    if format == PixelFormat::ColorIndex {
        let mut index = [0u8; 1];
        display.read_pixels(origin, PixelFormat::ColorIndex, ReadTarget::Host(&mut index));
        index[0] as i64
    } else {
        let mut rgb = [0u8; 3];
        display.read_pixels(origin, PixelFormat::Rgb, ReadTarget::Host(&mut rgb));
        pack_rgb(rgb)
    }
}
