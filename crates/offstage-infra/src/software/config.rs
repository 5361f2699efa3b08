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

use offstage_core::{ConfigAttrib, VisualInfo};

/// Describes a framebuffer configuration registered with a
/// [`SoftwareDisplay`](super::SoftwareDisplay).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigDescriptor {
    /// Server-side identity. Two handles with the same id are interchangeable.
    pub id: i32,
    /// Bits in the red channel.
    pub red_size: i32,
    /// Bits in the green channel.
    pub green_size: i32,
    /// Bits in the blue channel.
    pub blue_size: i32,
    /// Bits in the alpha channel.
    pub alpha_size: i32,
    /// Stereo support.
    pub stereo: bool,
    /// Double buffering.
    pub double_buffer: bool,
    /// The matching host visual, if any.
    pub visual: Option<VisualInfo>,
}

impl ConfigDescriptor {
    /// A double-buffered 24-bit configuration without alpha.
    pub fn rgb8(id: i32) -> Self {
        Self {
            id,
            red_size: 8,
            green_size: 8,
            blue_size: 8,
            alpha_size: 0,
            stereo: false,
            double_buffer: true,
            visual: Some(VisualInfo {
                visual_id: 0x20 + id as u64,
                depth: 24,
                screen: 0,
            }),
        }
    }

    /// A double-buffered 32-bit configuration with alpha.
    pub fn rgba8(id: i32) -> Self {
        Self {
            alpha_size: 8,
            visual: Some(VisualInfo {
                visual_id: 0x20 + id as u64,
                depth: 32,
                screen: 0,
            }),
            ..Self::rgb8(id)
        }
    }

    /// Sets stereo support.
    pub fn with_stereo(mut self, stereo: bool) -> Self {
        self.stereo = stereo;
        self
    }

    /// Sets double buffering.
    pub fn with_double_buffer(mut self, double_buffer: bool) -> Self {
        self.double_buffer = double_buffer;
        self
    }

    /// Removes the matching host visual.
    pub fn without_visual(mut self) -> Self {
        self.visual = None;
        self
    }

    pub(crate) fn attrib(&self, attrib: ConfigAttrib) -> i32 {
        match attrib {
            ConfigAttrib::Stereo => self.stereo as i32,
            ConfigAttrib::RedSize => self.red_size,
            ConfigAttrib::GreenSize => self.green_size,
            ConfigAttrib::BlueSize => self.blue_size,
            ConfigAttrib::AlphaSize => self.alpha_size,
            ConfigAttrib::DoubleBuffer => self.double_buffer as i32,
        }
    }
}
