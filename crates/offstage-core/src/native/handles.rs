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

//! Opaque native handles and the small value types exchanged with a
//! [`NativeDisplay`](super::NativeDisplay).
//!
//! Handles follow the window-system convention that the value `0` means
//! "no object". They are plain identifiers: owning one does not keep the
//! native object alive.

use std::fmt;

macro_rules! native_handle {
    ($(#[$attr:meta])* $name:ident($ty:ty)) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub $ty);

        impl $name {
            /// The null handle.
            pub const NULL: Self = Self(0);

            /// Returns `true` if this is the null handle.
            #[inline]
            pub const fn is_null(&self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::LowerHex for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::LowerHex::fmt(&self.0, f)
            }
        }
    };
}

native_handle!(
    /// The caller-supplied 2D drawable (window or pixmap) a surface is bound to.
    LogicalDrawable(u64)
);
native_handle!(
    /// A framebuffer configuration handle.
    ///
    /// Two distinct handles may describe the same configuration; compare
    /// [`FbConfigId`]s to decide whether they are interchangeable.
    FbConfig(u64)
);
native_handle!(
    /// A GLX-level drawable: a pbuffer, a GLX pixmap, or a window.
    GlxDrawable(u64)
);
native_handle!(
    /// A host window.
    WindowId(u64)
);
native_handle!(
    /// A host pixmap.
    PixmapId(u64)
);
native_handle!(
    /// A rendering context.
    ContextId(u64)
);
native_handle!(
    /// A pixel pack buffer object.
    BufferId(u32)
);

impl From<WindowId> for GlxDrawable {
    /// Windows are valid GLX drawables.
    fn from(window: WindowId) -> Self {
        GlxDrawable(window.0)
    }
}

/// The server-side identity of a framebuffer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FbConfigId(pub i32);

/// A framebuffer configuration attribute that can be queried from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigAttrib {
    /// Non-zero when the configuration supports stereo buffers.
    Stereo,
    /// Bits in the red channel.
    RedSize,
    /// Bits in the green channel.
    GreenSize,
    /// Bits in the blue channel.
    BlueSize,
    /// Bits in the alpha channel.
    AlphaSize,
    /// Non-zero when the configuration is double buffered.
    DoubleBuffer,
}

/// The host visual matching a framebuffer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualInfo {
    /// The visual identifier.
    pub visual_id: u64,
    /// The visual's depth in bits.
    pub depth: u32,
    /// The screen the visual belongs to.
    pub screen: u32,
}

/// The context and drawables bound to a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextBindings {
    /// The current context, if any.
    pub context: Option<ContextId>,
    /// The current draw drawable.
    pub draw: Option<GlxDrawable>,
    /// The current read drawable.
    pub read: Option<GlxDrawable>,
}

impl ContextBindings {
    /// Bindings that release whatever is current.
    pub const RELEASED: Self = Self {
        context: None,
        draw: None,
        read: None,
    };

    /// Bindings making `context` current against `draw` and `read`.
    pub fn new(context: ContextId, draw: GlxDrawable, read: GlxDrawable) -> Self {
        Self {
            context: Some(context),
            draw: Some(draw),
            read: Some(read),
        }
    }
}

/// A color buffer of a drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawBuffer {
    /// The front buffer (left eye for stereo drawables).
    Front,
    /// The back buffer (left eye for stereo drawables).
    Back,
    /// The left-eye front buffer.
    FrontLeft,
    /// The right-eye front buffer.
    FrontRight,
    /// The left-eye back buffer.
    BackLeft,
    /// The right-eye back buffer.
    BackRight,
    /// Both front and back buffers (drawing only).
    FrontAndBack,
}

impl DrawBuffer {
    /// Returns `true` for the right-eye buffers of a stereo drawable.
    pub const fn is_right_eye(&self) -> bool {
        matches!(self, DrawBuffer::FrontRight | DrawBuffer::BackRight)
    }
}

/// The matrix stack targeted by matrix operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixMode {
    /// The projection matrix stack.
    Projection,
    /// The modelview matrix stack.
    Modelview,
}

/// A rectangle of pixels in window coordinates (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    /// Left edge.
    pub x: i32,
    /// Bottom edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl PixelRect {
    /// Creates a new rectangle.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns the number of pixels covered, or zero for degenerate rectangles.
    pub fn area(&self) -> u64 {
        if self.width <= 0 || self.height <= 0 {
            0
        } else {
            self.width as u64 * self.height as u64
        }
    }
}

/// A low-level error code drained from the device error queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceErrorCode(pub u32);

impl DeviceErrorCode {
    /// An enumerated argument was out of range.
    pub const INVALID_ENUM: Self = Self(0x0500);
    /// A numeric argument was out of range.
    pub const INVALID_VALUE: Self = Self(0x0501);
    /// The operation is not allowed in the current state.
    pub const INVALID_OPERATION: Self = Self(0x0502);
    /// A push would overflow the matrix stack.
    pub const STACK_OVERFLOW: Self = Self(0x0503);
    /// A pop would underflow the matrix stack.
    pub const STACK_UNDERFLOW: Self = Self(0x0504);
    /// Not enough memory left to execute the command.
    pub const OUT_OF_MEMORY: Self = Self(0x0505);
}

impl fmt::Display for DeviceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Where a pixel transfer writes its data.
#[derive(Debug)]
pub enum ReadTarget<'a> {
    /// Directly into host memory.
    Host(&'a mut [u8]),
    /// Into the currently bound pixel pack buffer, starting at offset zero.
    PackBuffer,
}

/// A failure while mapping or unmapping the pack buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferMapError {
    /// The buffer could not be mapped for reading.
    MapFailed,
    /// The buffer was mapped but could not be unmapped; its contents are undefined.
    UnmapFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handles() {
        assert!(LogicalDrawable::NULL.is_null());
        assert!(!FbConfig(7).is_null());
        assert_eq!(format!("{:x}", LogicalDrawable(0x2a00001)), "2a00001");
    }

    #[test]
    fn right_eye_buffers() {
        assert!(DrawBuffer::FrontRight.is_right_eye());
        assert!(DrawBuffer::BackRight.is_right_eye());
        assert!(!DrawBuffer::Front.is_right_eye());
        assert!(!DrawBuffer::BackLeft.is_right_eye());
    }

    #[test]
    fn degenerate_rect_has_no_area() {
        assert_eq!(PixelRect::new(0, 0, 4, 3).area(), 12);
        assert_eq!(PixelRect::new(0, 0, 0, 3).area(), 0);
        assert_eq!(PixelRect::new(0, 0, 4, -1).area(), 0);
    }
}
