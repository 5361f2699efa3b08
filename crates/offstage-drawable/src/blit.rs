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

//! Row-by-row copy from a surface into another drawable.

use crate::context_scope::ContextScope;
use crate::readback::{check_errors, drain_errors};
use offstage_core::{
    ContextId, DrawBuffer, DrawableError, DrawableResult, GlxDrawable, MatrixMode, NativeDisplay,
    PixelRect,
};

/// Saves the projection and modelview matrices and restores them on drop.
struct TransformGuard<'a> {
    display: &'a dyn NativeDisplay,
}

impl<'a> TransformGuard<'a> {
    fn push(display: &'a dyn NativeDisplay) -> Self {
        display.set_matrix_mode(MatrixMode::Projection);
        display.push_matrix();
        display.set_matrix_mode(MatrixMode::Modelview);
        display.push_matrix();
        Self { display }
    }
}

impl Drop for TransformGuard<'_> {
    fn drop(&mut self) {
        self.display.set_matrix_mode(MatrixMode::Modelview);
        self.display.pop_matrix();
        self.display.set_matrix_mode(MatrixMode::Projection);
        self.display.pop_matrix();
    }
}

/// Copies `source` from the front buffer of `surface` into `target`, one
/// row at a time, with `(dest_x, dest_y)` as the destination offset.
///
/// Rows are addressed from the top so that row `i` of the source lands on
/// row `i` of the destination.
/// ## Errors
/// [`DrawableError::InvalidArgument`] for an empty rectangle, a
/// [`DrawableError::Resource`] if the context cannot be bound, or a
/// [`DrawableError::Device`] tagged `"Copy Pixels"` if the device reported
/// errors.
pub(crate) fn copy_rows(
    display: &dyn NativeDisplay,
    context: ContextId,
    surface: GlxDrawable,
    source: PixelRect,
    dest_x: i32,
    dest_y: i32,
    target: GlxDrawable,
) -> DrawableResult<()> {
    let PixelRect {
        x: src_x,
        y: src_y,
        width: w,
        height: h,
    } = source;
    if w < 1 || h < 1 {
        return Err(DrawableError::invalid_argument(format!(
            "copy rectangle must be positive, got {w}x{h}"
        )));
    }

    let _scope = ContextScope::bind(display, target, surface, context)?;

    display.set_read_buffer(DrawBuffer::Front);
    display.set_draw_buffer(DrawBuffer::FrontAndBack);
    display.set_pack_alignment(1);
    display.set_unpack_alignment(1);

    drain_errors(display);
    display.set_viewport(0, 0, w, h);

    {
        let _transforms = TransformGuard::push(display);
        display.set_matrix_mode(MatrixMode::Projection);
        display.load_identity();
        display.ortho(0.0, w as f64, 0.0, h as f64, -1.0, 1.0);
        display.set_matrix_mode(MatrixMode::Modelview);
        display.load_identity();

        for i in 0..h {
            display.set_raster_pos(dest_x, h - dest_y - i - 1);
            display.copy_pixels(PixelRect::new(src_x, h - src_y - i - 1, w, 1));
        }
    }

    check_errors(display, "Copy Pixels")
}
