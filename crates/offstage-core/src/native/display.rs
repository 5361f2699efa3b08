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

use super::format::PixelFormat;
use super::handles::*;
use std::fmt::Debug;

/// The native window-system and rendering interface the drawable layer drives.
///
/// The methods fall into two groups. Resource methods (configurations,
/// drawables, contexts, bindings) act on the display connection as a whole.
/// Command methods act on the context that is current for the *calling
/// thread*; without a current context they do nothing and return neutral
/// values, exactly like the underlying API.
///
/// Allocation methods report failure with `None` rather than an error type:
/// the native layer only tells whether the object exists, and the caller
/// decides which [`DrawableError`](crate::DrawableError) that maps to.
pub trait NativeDisplay: Send + Sync + Debug + 'static {
    // --- Framebuffer configurations ---

    /// Returns the server-side identity of `config`.
    /// ## Returns
    /// `None` if the handle does not name a known configuration.
    fn config_id(&self, config: FbConfig) -> Option<FbConfigId>;

    /// Queries a server-side attribute of `config`.
    /// ## Arguments
    /// * `config` - The configuration to query.
    /// * `attrib` - The attribute to read.
    /// ## Returns
    /// The attribute value, or `0` when the configuration is unknown.
    fn config_attrib(&self, config: FbConfig, attrib: ConfigAttrib) -> i32;

    /// Returns the host visual matching `config`, if there is one.
    fn visual_from_config(&self, config: FbConfig) -> Option<VisualInfo>;

    // --- Off-screen drawables ---

    /// Creates a pbuffer with preserved contents.
    fn create_pbuffer(&self, config: FbConfig, width: u32, height: u32) -> Option<GlxDrawable>;

    /// Destroys a pbuffer.
    fn destroy_pbuffer(&self, drawable: GlxDrawable);

    /// Creates an unmapped host window using `visual`.
    fn create_window(&self, visual: &VisualInfo, width: u32, height: u32) -> Option<WindowId>;

    /// Destroys a host window.
    fn destroy_window(&self, window: WindowId);

    /// Creates a host pixmap on the screen of `window`.
    /// ## Arguments
    /// * `window` - Any window on the target screen.
    /// * `width`, `height` - Pixmap geometry.
    /// * `depth` - Pixmap depth in bits.
    fn create_pixmap(
        &self,
        window: WindowId,
        width: u32,
        height: u32,
        depth: u32,
    ) -> Option<PixmapId>;

    /// Frees a host pixmap.
    fn free_pixmap(&self, pixmap: PixmapId);

    /// Wraps a host pixmap into a GLX drawable.
    /// ## Arguments
    /// * `config` - The configuration the drawable renders with.
    /// * `pixmap` - The host pixmap backing it.
    /// * `attribs` - Attribute key/value pairs passed through to the native call.
    fn create_glx_pixmap(
        &self,
        config: FbConfig,
        pixmap: PixmapId,
        attribs: &[(i32, i32)],
    ) -> Option<GlxDrawable>;

    /// Destroys a GLX pixmap. The host pixmap is left alone.
    fn destroy_glx_pixmap(&self, drawable: GlxDrawable);

    /// Swaps the front and back buffers of a double-buffered drawable.
    fn swap_buffers(&self, drawable: GlxDrawable);

    // --- Contexts and bindings ---

    /// Creates an RGBA rendering context for `config`.
    /// ## Arguments
    /// * `config` - The configuration the context is compatible with.
    /// * `direct` - Request a direct-rendering context.
    fn create_context(&self, config: FbConfig, direct: bool) -> Option<ContextId>;

    /// Destroys a rendering context.
    fn destroy_context(&self, context: ContextId);

    /// Returns the bindings current for the calling thread.
    fn current_bindings(&self) -> ContextBindings;

    /// Makes `bindings` current for the calling thread.
    ///
    /// Passing [`ContextBindings::RELEASED`] releases the current context.
    /// ## Returns
    /// `false` if the native layer refused the binding.
    fn make_current(&self, bindings: ContextBindings) -> bool;

    // --- Commands on the current context ---

    /// Returns `true` if the current context exposes the named extension.
    fn has_extension(&self, name: &str) -> bool;

    /// Pops the oldest pending error of the current context.
    fn take_error(&self) -> Option<DeviceErrorCode>;

    /// Returns the current clear color.
    fn clear_color(&self) -> [f32; 4];

    /// Sets the clear color.
    fn set_clear_color(&self, rgba: [f32; 4]);

    /// Clears the color buffer(s) selected for drawing with the clear color.
    fn clear_color_buffer(&self);

    /// Selects the buffer pixel reads come from.
    fn set_read_buffer(&self, buffer: DrawBuffer);

    /// Selects the buffer(s) drawing goes to.
    fn set_draw_buffer(&self, buffer: DrawBuffer);

    /// Sets the row alignment used when writing pixels to memory.
    fn set_pack_alignment(&self, alignment: u32);

    /// Sets the row alignment used when reading pixels from memory.
    fn set_unpack_alignment(&self, alignment: u32);

    /// Reads a rectangle of the read buffer.
    /// ## Arguments
    /// * `rect` - The source rectangle, origin bottom-left.
    /// * `format` - The layout written for each pixel.
    /// * `target` - Host memory, or the bound pack buffer.
    fn read_pixels(&self, rect: PixelRect, format: PixelFormat, target: ReadTarget<'_>);

    /// Generates a new buffer object name.
    fn gen_buffer(&self) -> Option<BufferId>;

    /// Returns `true` if `buffer` still names a live buffer object.
    fn is_buffer(&self, buffer: BufferId) -> bool;

    /// Binds `buffer` as the pixel pack buffer, or unbinds with `None`.
    fn bind_pack_buffer(&self, buffer: Option<BufferId>);

    /// Returns the size in bytes of the bound pack buffer.
    fn pack_buffer_size(&self) -> usize;

    /// (Re)allocates the bound pack buffer's storage for streamed reads.
    fn allocate_pack_buffer(&self, size: usize);

    /// Maps the bound pack buffer for reading, hands its contents to `reader`,
    /// then unmaps it.
    fn map_pack_buffer(&self, reader: &mut dyn FnMut(&[u8])) -> Result<(), BufferMapError>;

    /// Sets the viewport rectangle.
    fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32);

    /// Selects the matrix stack subsequent matrix calls target.
    fn set_matrix_mode(&self, mode: MatrixMode);

    /// Duplicates the top of the current matrix stack.
    fn push_matrix(&self);

    /// Pops the current matrix stack.
    fn pop_matrix(&self);

    /// Replaces the top of the current matrix stack with the identity.
    fn load_identity(&self);

    /// Multiplies the current matrix by an orthographic projection.
    fn ortho(&self, left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64);

    /// Sets the raster position in object coordinates.
    fn set_raster_pos(&self, x: i32, y: i32);

    /// Copies a rectangle of the read buffer to the raster position of the
    /// draw buffer(s).
    fn copy_pixels(&self, rect: PixelRect);
}
