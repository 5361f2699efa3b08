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

use bytemuck::{Pod, Zeroable};
use offstage_core::DrawBuffer;
use std::collections::HashMap;

/// One RGBA8 pixel as stored by the software display.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct Texel {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Texel {
    /// Transparent black, the content of a freshly allocated drawable.
    pub const TRANSPARENT: Texel = Texel::new(0, 0, 0, 0);

    /// Creates a texel.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a texel from `[r, g, b, a]`.
    pub fn from_rgba(rgba: [u8; 4]) -> Self {
        bytemuck::cast(rgba)
    }

    /// Returns `[r, g, b, a]`.
    pub fn to_rgba(self) -> [u8; 4] {
        bytemuck::cast(self)
    }

    /// Quantizes a floating point color, clamping each channel to `[0, 1]`.
    pub fn from_float(rgba: [f32; 4]) -> Self {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(q(rgba[0]), q(rgba[1]), q(rgba[2]), q(rgba[3]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Slot {
    back: bool,
    right: bool,
}

const FRONT_LEFT: Slot = Slot {
    back: false,
    right: false,
};
const FRONT_RIGHT: Slot = Slot {
    back: false,
    right: true,
};
const BACK_LEFT: Slot = Slot {
    back: true,
    right: false,
};
const BACK_RIGHT: Slot = Slot {
    back: true,
    right: true,
};

/// The color buffers of one drawable.
#[derive(Debug)]
pub(crate) struct ColorStorage {
    width: u32,
    height: u32,
    stereo: bool,
    double_buffered: bool,
    planes: HashMap<Slot, Vec<Texel>>,
}

impl ColorStorage {
    pub(crate) fn new(width: u32, height: u32, stereo: bool, double_buffered: bool) -> Self {
        let len = width as usize * height as usize;
        let planes = [FRONT_LEFT, FRONT_RIGHT, BACK_LEFT, BACK_RIGHT]
            .into_iter()
            .filter(|slot| (stereo || !slot.right) && (double_buffered || !slot.back))
            .map(|slot| (slot, vec![Texel::TRANSPARENT; len]))
            .collect();
        Self {
            width,
            height,
            stereo,
            double_buffered,
            planes,
        }
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn double_buffered(&self) -> bool {
        self.double_buffered
    }

    /// The buffer a context reads and draws by default.
    pub(crate) fn default_buffer(&self) -> DrawBuffer {
        if self.double_buffered {
            DrawBuffer::Back
        } else {
            DrawBuffer::Front
        }
    }

    /// Resolves `buffer` to the single plane it reads from.
    pub(crate) fn read_slot(&self, buffer: DrawBuffer) -> Option<Slot> {
        let slot = match buffer {
            DrawBuffer::Front | DrawBuffer::FrontLeft => FRONT_LEFT,
            DrawBuffer::Back | DrawBuffer::BackLeft => BACK_LEFT,
            DrawBuffer::FrontRight => FRONT_RIGHT,
            DrawBuffer::BackRight => BACK_RIGHT,
            DrawBuffer::FrontAndBack => return None,
        };
        self.planes.contains_key(&slot).then_some(slot)
    }

    /// Resolves `buffer` to every plane it draws to.
    pub(crate) fn draw_slots(&self, buffer: DrawBuffer) -> Vec<Slot> {
        let wanted: &[Slot] = match buffer {
            DrawBuffer::Front => &[FRONT_LEFT, FRONT_RIGHT],
            DrawBuffer::Back => &[BACK_LEFT, BACK_RIGHT],
            DrawBuffer::FrontLeft => &[FRONT_LEFT],
            DrawBuffer::FrontRight => &[FRONT_RIGHT],
            DrawBuffer::BackLeft => &[BACK_LEFT],
            DrawBuffer::BackRight => &[BACK_RIGHT],
            DrawBuffer::FrontAndBack => &[FRONT_LEFT, FRONT_RIGHT, BACK_LEFT, BACK_RIGHT],
        };
        wanted
            .iter()
            .copied()
            .filter(|slot| self.planes.contains_key(slot))
            .collect()
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub(crate) fn get(&self, slot: Slot, x: i64, y: i64) -> Option<Texel> {
        let index = self.index(x, y)?;
        self.planes.get(&slot).map(|plane| plane[index])
    }

    pub(crate) fn set(&mut self, slot: Slot, x: i64, y: i64, texel: Texel) {
        if let Some(index) = self.index(x, y) {
            if let Some(plane) = self.planes.get_mut(&slot) {
                plane[index] = texel;
            }
        }
    }

    pub(crate) fn fill(&mut self, slot: Slot, texel: Texel) {
        if let Some(plane) = self.planes.get_mut(&slot) {
            plane.fill(texel);
        }
    }

    pub(crate) fn plane(&self, slot: Slot) -> Option<&[Texel]> {
        self.planes.get(&slot).map(Vec::as_slice)
    }

    /// Exchanges front and back planes of each eye.
    pub(crate) fn swap(&mut self) {
        if !self.double_buffered {
            return;
        }
        let eyes: &[(Slot, Slot)] = if self.stereo {
            &[(FRONT_LEFT, BACK_LEFT), (FRONT_RIGHT, BACK_RIGHT)]
        } else {
            &[(FRONT_LEFT, BACK_LEFT)]
        };
        for (front, back) in eyes {
            if let (Some(f), Some(b)) = (self.planes.remove(front), self.planes.remove(back)) {
                self.planes.insert(*front, b);
                self.planes.insert(*back, f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_single_buffered_storage_has_one_plane() {
        let storage = ColorStorage::new(2, 2, false, false);
        assert!(storage.read_slot(DrawBuffer::Front).is_some());
        assert!(storage.read_slot(DrawBuffer::Back).is_none());
        assert!(storage.read_slot(DrawBuffer::FrontRight).is_none());
        assert_eq!(storage.draw_slots(DrawBuffer::FrontAndBack).len(), 1);
    }

    #[test]
    fn swap_exchanges_front_and_back() {
        let mut storage = ColorStorage::new(1, 1, false, true);
        storage.fill(BACK_LEFT, Texel::new(9, 9, 9, 9));
        storage.swap();
        assert_eq!(storage.get(FRONT_LEFT, 0, 0), Some(Texel::new(9, 9, 9, 9)));
        assert_eq!(storage.get(BACK_LEFT, 0, 0), Some(Texel::TRANSPARENT));
    }

    #[test]
    fn float_colors_are_quantized() {
        assert_eq!(
            Texel::from_float([1.0, 0.5, -2.0, 0.0]),
            Texel::new(255, 128, 0, 0)
        );
        assert_eq!(Texel::from_rgba([1, 2, 3, 4]).to_rgba(), [1, 2, 3, 4]);
    }
}
