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

use offstage_core::{BufferId, DeviceErrorCode, DrawBuffer, FbConfigId, MatrixMode};
use std::collections::VecDeque;
use std::thread::ThreadId;

/// Column-major 4x4 matrix.
pub(crate) type Matrix = [f64; 16];

pub(crate) const IDENTITY: Matrix = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

const MAX_STACK_DEPTH: usize = 32;

pub(crate) fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    let mut out = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            out[col * 4 + row] = (0..4).map(|k| a[k * 4 + row] * b[col * 4 + k]).sum();
        }
    }
    out
}

pub(crate) fn ortho_matrix(l: f64, r: f64, b: f64, t: f64, n: f64, f: f64) -> Matrix {
    let mut m = IDENTITY;
    m[0] = 2.0 / (r - l);
    m[5] = 2.0 / (t - b);
    m[10] = -2.0 / (f - n);
    m[12] = -(r + l) / (r - l);
    m[13] = -(t + b) / (t - b);
    m[14] = -(f + n) / (f - n);
    m
}

fn transform(m: &Matrix, v: [f64; 4]) -> [f64; 4] {
    let mut out = [0.0; 4];
    for (row, value) in out.iter_mut().enumerate() {
        *value = (0..4).map(|k| m[k * 4 + row] * v[k]).sum();
    }
    out
}

/// Fixed-function state owned by one context.
#[derive(Debug)]
pub(crate) struct GlState {
    pub clear_color: [f32; 4],
    pub read_buffer: Option<DrawBuffer>,
    pub draw_buffer: Option<DrawBuffer>,
    pub pack_alignment: u32,
    pub unpack_alignment: u32,
    pub viewport: [i32; 4],
    pub matrix_mode: MatrixMode,
    pub projection: Vec<Matrix>,
    pub modelview: Vec<Matrix>,
    /// Window coordinates of the raster position, `None` when invalid.
    pub raster: Option<(i64, i64)>,
    pub pack_buffer: Option<BufferId>,
    errors: VecDeque<DeviceErrorCode>,
}

impl GlState {
    fn new() -> Self {
        Self {
            clear_color: [0.0; 4],
            read_buffer: None,
            draw_buffer: None,
            pack_alignment: 4,
            unpack_alignment: 4,
            viewport: [0; 4],
            matrix_mode: MatrixMode::Modelview,
            projection: vec![IDENTITY],
            modelview: vec![IDENTITY],
            raster: Some((0, 0)),
            pack_buffer: None,
            errors: VecDeque::new(),
        }
    }

    pub(crate) fn record_error(&mut self, code: DeviceErrorCode) {
        self.errors.push_back(code);
    }

    pub(crate) fn take_error(&mut self) -> Option<DeviceErrorCode> {
        self.errors.pop_front()
    }

    fn stack_mut(&mut self) -> &mut Vec<Matrix> {
        match self.matrix_mode {
            MatrixMode::Projection => &mut self.projection,
            MatrixMode::Modelview => &mut self.modelview,
        }
    }

    fn top_mut(&mut self) -> &mut Matrix {
        let stack = self.stack_mut();
        let last = stack.len() - 1;
        &mut stack[last]
    }

    pub(crate) fn push_matrix(&mut self) {
        let stack = self.stack_mut();
        if stack.len() >= MAX_STACK_DEPTH {
            self.record_error(DeviceErrorCode::STACK_OVERFLOW);
            return;
        }
        let top = stack[stack.len() - 1];
        stack.push(top);
    }

    pub(crate) fn pop_matrix(&mut self) {
        let stack = self.stack_mut();
        if stack.len() <= 1 {
            self.record_error(DeviceErrorCode::STACK_UNDERFLOW);
            return;
        }
        stack.pop();
    }

    pub(crate) fn load_identity(&mut self) {
        *self.top_mut() = IDENTITY;
    }

    pub(crate) fn multiply_top(&mut self, m: &Matrix) {
        let top = self.top_mut();
        *top = multiply(top, m);
    }

    /// Projects `(x, y)` to window coordinates. The position is invalid when
    /// it falls outside the clip volume.
    pub(crate) fn set_raster_pos(&mut self, x: i32, y: i32) {
        let modelview = self.modelview[self.modelview.len() - 1];
        let projection = self.projection[self.projection.len() - 1];
        let clip = transform(
            &multiply(&projection, &modelview),
            [x as f64, y as f64, 0.0, 1.0],
        );
        if clip[3] == 0.0 {
            self.raster = None;
            return;
        }
        let ndc = [clip[0] / clip[3], clip[1] / clip[3], clip[2] / clip[3]];
        const EPS: f64 = 1e-9;
        if ndc.iter().any(|c| c.abs() > 1.0 + EPS) {
            self.raster = None;
            return;
        }
        let [vx, vy, vw, vh] = self.viewport;
        let wx = vx as f64 + (ndc[0] + 1.0) * vw as f64 / 2.0;
        let wy = vy as f64 + (ndc[1] + 1.0) * vh as f64 / 2.0;
        self.raster = Some((wx.round() as i64, wy.round() as i64));
    }
}

/// A rendering context.
#[derive(Debug)]
pub(crate) struct ContextEntry {
    pub config_id: FbConfigId,
    pub direct: bool,
    pub current_on: Option<ThreadId>,
    pub state: GlState,
}

impl ContextEntry {
    pub(crate) fn new(config_id: FbConfigId, direct: bool) -> Self {
        Self {
            config_id,
            direct,
            current_on: None,
            state: GlState::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ortho_maps_integer_coordinates_onto_pixels() {
        let mut state = GlState::new();
        state.viewport = [0, 0, 8, 4];
        state.matrix_mode = MatrixMode::Projection;
        state.multiply_top(&ortho_matrix(0.0, 8.0, 0.0, 4.0, -1.0, 1.0));

        state.set_raster_pos(3, 2);
        assert_eq!(state.raster, Some((3, 2)));

        state.set_raster_pos(9, 0);
        assert_eq!(state.raster, None);
    }

    #[test]
    fn pop_on_a_single_entry_stack_underflows() {
        let mut state = GlState::new();
        state.pop_matrix();
        assert_eq!(state.take_error(), Some(DeviceErrorCode::STACK_UNDERFLOW));
        state.push_matrix();
        state.pop_matrix();
        assert_eq!(state.take_error(), None);
    }
}
