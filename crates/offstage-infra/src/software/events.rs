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

use offstage_core::{
    BufferId, ContextBindings, ContextId, DeviceErrorCode, GlxDrawable, PixmapId, WindowId,
};

/// A failure that can be armed on a [`SoftwareDisplay`](super::SoftwareDisplay).
///
/// Armed faults stay active until cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// `visual_from_config` returns `None`.
    VisualLookup,
    /// `create_pbuffer` returns `None`.
    PbufferCreation,
    /// `create_window` returns `None`.
    WindowCreation,
    /// `create_pixmap` returns `None`.
    PixmapCreation,
    /// `create_glx_pixmap` returns `None`.
    GlxPixmapCreation,
    /// `create_context` returns `None`.
    ContextCreation,
    /// `make_current` refuses every binding except a release.
    MakeCurrent,
    /// `gen_buffer` returns `None`.
    BufferGeneration,
    /// `allocate_pack_buffer` leaves the storage untouched and raises
    /// `OUT_OF_MEMORY`.
    BufferAllocation,
    /// `map_pack_buffer` fails to map.
    BufferMap,
    /// `map_pack_buffer` maps, then fails to unmap.
    BufferUnmap,
    /// `read_pixels` raises the given error after transferring.
    ReadPixels(DeviceErrorCode),
    /// `copy_pixels` raises the given error after copying.
    CopyPixels(DeviceErrorCode),
}

/// A resource operation recorded by a [`SoftwareDisplay`](super::SoftwareDisplay).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeEvent {
    /// A pbuffer was created.
    CreatePbuffer(GlxDrawable),
    /// A pbuffer was destroyed.
    DestroyPbuffer(GlxDrawable),
    /// A window was created.
    CreateWindow(WindowId),
    /// A window was destroyed.
    DestroyWindow(WindowId),
    /// A host pixmap was created.
    CreatePixmap(PixmapId),
    /// A host pixmap was freed.
    FreePixmap(PixmapId),
    /// A GLX pixmap was created.
    CreateGlxPixmap(GlxDrawable),
    /// A GLX pixmap was destroyed.
    DestroyGlxPixmap(GlxDrawable),
    /// A context was created.
    CreateContext {
        /// The new context.
        context: ContextId,
        /// Whether direct rendering was requested.
        direct: bool,
    },
    /// A context was destroyed.
    DestroyContext(ContextId),
    /// Bindings changed on some thread.
    MakeCurrent(ContextBindings),
    /// A buffer object name was generated.
    GenBuffer(BufferId),
    /// A pack buffer's storage was (re)allocated.
    AllocateBuffer {
        /// The buffer.
        buffer: BufferId,
        /// The new size in bytes.
        size: usize,
    },
}
