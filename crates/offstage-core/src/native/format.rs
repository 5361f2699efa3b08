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

//! Pixel formats used for transfers between a surface and host memory.

use std::fmt;

/// The channel layout of transferred pixels. Every channel is one unsigned byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Red, green, blue.
    Rgb,
    /// Red, green, blue, alpha.
    Rgba,
    /// Blue, green, red.
    Bgr,
    /// Blue, green, red, alpha.
    Bgra,
    /// Alpha, blue, green, red.
    Abgr,
    /// A single color-index channel.
    ColorIndex,
    /// The red channel only.
    Red,
    /// The green channel only.
    Green,
    /// The blue channel only.
    Blue,
}

impl PixelFormat {
    /// Returns the number of bytes a single pixel occupies in this format.
    pub const fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb | PixelFormat::Bgr => 3,
            PixelFormat::Rgba | PixelFormat::Bgra | PixelFormat::Abgr => 4,
            PixelFormat::ColorIndex | PixelFormat::Red | PixelFormat::Green | PixelFormat::Blue => 1,
        }
    }

    /// Selects the native format of a surface from its combined channel
    /// depth and the host byte order.
    ///
    /// 32-bit configurations use a four-channel format, anything else a
    /// three-channel one. Little-endian hosts get the blue-first variant so
    /// that a packed pixel reads as `0xAARRGGBB`.
    pub const fn native(channel_bits: i32, little_endian: bool) -> Self {
        match (channel_bits == 32, little_endian) {
            (true, true) => PixelFormat::Bgra,
            (true, false) => PixelFormat::Rgba,
            (false, true) => PixelFormat::Bgr,
            (false, false) => PixelFormat::Rgb,
        }
    }

    /// Like [`PixelFormat::native`], for the byte order of the running host.
    pub const fn native_for_host(channel_bits: i32) -> Self {
        Self::native(channel_bits, cfg!(target_endian = "little"))
    }

    /// Collapses formats that behave identically for transfer performance.
    ///
    /// Single-channel reads of green or blue are treated as red.
    pub const fn calibration_key(&self) -> Self {
        match self {
            PixelFormat::Green | PixelFormat::Blue => PixelFormat::Red,
            other => *other,
        }
    }

    /// Returns the short name used in diagnostics.
    pub const fn name(&self) -> &'static str {
        match self {
            PixelFormat::Rgb => "RGB",
            PixelFormat::Rgba => "RGBA",
            PixelFormat::Bgr => "BGR",
            PixelFormat::Bgra => "BGRA",
            PixelFormat::Abgr => "ABGR",
            PixelFormat::ColorIndex => "INDEX",
            PixelFormat::Red | PixelFormat::Green | PixelFormat::Blue => "COMPONENT",
        }
    }

    /// Encodes an RGBA8 color into this format's byte layout.
    ///
    /// `out` must be at least [`PixelFormat::bytes_per_pixel`] long. The
    /// color-index format stores the red channel.
    pub fn encode(&self, rgba: [u8; 4], out: &mut [u8]) {
        let [r, g, b, a] = rgba;
        match self {
            PixelFormat::Rgb => out[..3].copy_from_slice(&[r, g, b]),
            PixelFormat::Rgba => out[..4].copy_from_slice(&[r, g, b, a]),
            PixelFormat::Bgr => out[..3].copy_from_slice(&[b, g, r]),
            PixelFormat::Bgra => out[..4].copy_from_slice(&[b, g, r, a]),
            PixelFormat::Abgr => out[..4].copy_from_slice(&[a, b, g, r]),
            PixelFormat::ColorIndex | PixelFormat::Red => out[0] = r,
            PixelFormat::Green => out[0] = g,
            PixelFormat::Blue => out[0] = b,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_format_follows_depth_and_byte_order() {
        assert_eq!(PixelFormat::native(32, true), PixelFormat::Bgra);
        assert_eq!(PixelFormat::native(32, false), PixelFormat::Rgba);
        assert_eq!(PixelFormat::native(24, true), PixelFormat::Bgr);
        assert_eq!(PixelFormat::native(24, false), PixelFormat::Rgb);
        // 30-bit deep color is not 32, so it falls back to three channels.
        assert_eq!(PixelFormat::native(30, true), PixelFormat::Bgr);
    }

    #[test]
    fn component_formats_share_a_calibration_key() {
        assert_eq!(PixelFormat::Green.calibration_key(), PixelFormat::Red);
        assert_eq!(PixelFormat::Blue.calibration_key(), PixelFormat::Red);
        assert_eq!(PixelFormat::Bgra.calibration_key(), PixelFormat::Bgra);
        assert_ne!(PixelFormat::Rgb.calibration_key(), PixelFormat::Red);
    }

    #[test]
    fn encode_layouts() {
        let mut out = [0u8; 4];
        PixelFormat::Bgra.encode([1, 2, 3, 4], &mut out);
        assert_eq!(out, [3, 2, 1, 4]);
        PixelFormat::Abgr.encode([1, 2, 3, 4], &mut out);
        assert_eq!(out, [4, 3, 2, 1]);
        let mut one = [0u8; 1];
        PixelFormat::Blue.encode([1, 2, 3, 4], &mut one);
        assert_eq!(one, [3]);
    }

    #[test]
    fn diagnostic_names() {
        assert_eq!(PixelFormat::Green.name(), "COMPONENT");
        assert_eq!(PixelFormat::ColorIndex.to_string(), "INDEX");
    }
}
