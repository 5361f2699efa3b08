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

//! Off-screen rendering surfaces.

use offstage_core::{
    ConfigAttrib, DrawableError, DrawableResult, FbConfig, FbConfigId, GlxDrawable,
    NativeDisplay, PixelFormat, PixmapId, SurfaceBacking, VisualInfo, WindowId,
};
use std::sync::Arc;

/// A snapshot of a surface's properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Requested pixmap depth, `0` for pbuffers.
    pub depth: u32,
    /// The native pixel format of the color buffers.
    pub format: PixelFormat,
    /// Whether the surface has right-eye buffers.
    pub stereo: bool,
    /// How the surface is backed.
    pub backing: SurfaceBacking,
    /// The configuration handle the surface was created with.
    pub config: FbConfig,
    /// The configuration's server-side identity.
    pub config_id: FbConfigId,
    /// The GLX drawable rendering goes to.
    pub drawable: GlxDrawable,
}

/// An off-screen drawable owning its native resources.
///
/// Dropping the surface releases the GLX drawable first, then the host
/// pixmap and the auxiliary window for pixmap-backed surfaces.
#[derive(Debug)]
pub struct OffscreenSurface {
    display: Arc<dyn NativeDisplay>,
    info: SurfaceInfo,
    pixmap: Option<PixmapId>,
    window: Option<WindowId>,
    cleared: bool,
}

/// Holds the intermediate handles of a pixmap-backed surface while it is
/// being built. Whatever has not been handed over is released in reverse
/// acquisition order.
struct PixmapBuilder<'a> {
    display: &'a dyn NativeDisplay,
    window: Option<WindowId>,
    pixmap: Option<PixmapId>,
}

impl<'a> PixmapBuilder<'a> {
    fn new(display: &'a dyn NativeDisplay) -> Self {
        Self {
            display,
            window: None,
            pixmap: None,
        }
    }

    /// Hands ownership of the intermediate handles to the caller.
    fn disarm(&mut self) {
        self.window = None;
        self.pixmap = None;
    }
}

impl Drop for PixmapBuilder<'_> {
    fn drop(&mut self) {
        if let Some(pixmap) = self.pixmap.take() {
            self.display.free_pixmap(pixmap);
        }
        if let Some(window) = self.window.take() {
            self.display.destroy_window(window);
        }
    }
}

fn validate_geometry(width: i32, height: i32, config: FbConfig) -> DrawableResult<(u32, u32)> {
    if width < 1 || height < 1 {
        return Err(DrawableError::invalid_argument(format!(
            "surface size must be positive, got {width}x{height}"
        )));
    }
    if config.is_null() {
        return Err(DrawableError::invalid_argument(
            "framebuffer configuration is null",
        ));
    }
    Ok((width as u32, height as u32))
}

impl OffscreenSurface {
    /// Creates a pbuffer-backed surface with preserved contents.
    /// ## Arguments
    /// * `display` - The display the pbuffer is allocated on.
    /// * `width`, `height` - Surface geometry; both must be positive.
    /// * `config` - The framebuffer configuration to render with.
    pub fn pbuffer(
        display: Arc<dyn NativeDisplay>,
        width: i32,
        height: i32,
        config: FbConfig,
    ) -> DrawableResult<Self> {
        let (w, h) = validate_geometry(width, height, config)?;
        let config_id = display.config_id(config).ok_or_else(|| {
            DrawableError::invalid_argument(format!("unknown framebuffer configuration {config:#x}"))
        })?;

        let drawable = display
            .create_pbuffer(config, w, h)
            .ok_or_else(|| DrawableError::resource("Could not create Pbuffer"))?;

        let info = Self::describe(
            display.as_ref(),
            w,
            h,
            0,
            config,
            config_id,
            drawable,
            SurfaceBacking::Pbuffer,
        );
        Ok(Self {
            display,
            info,
            pixmap: None,
            window: None,
            cleared: false,
        })
    }

    /// Creates a pixmap-backed surface.
    ///
    /// The host pixmap lives on the screen of an auxiliary 1x1 window that
    /// the surface owns for its whole lifetime.
    /// ## Arguments
    /// * `depth` - Pixmap depth in bits; `0` uses the depth of the config's visual.
    /// * `attribs` - Passed through to the GLX pixmap creation.
    pub fn pixmap(
        display: Arc<dyn NativeDisplay>,
        width: i32,
        height: i32,
        depth: i32,
        config: FbConfig,
        attribs: &[(i32, i32)],
    ) -> DrawableResult<Self> {
        let (w, h) = validate_geometry(width, height, config)?;
        if depth < 0 {
            return Err(DrawableError::invalid_argument(format!(
                "pixmap depth must not be negative, got {depth}"
            )));
        }
        let config_id = display.config_id(config).ok_or_else(|| {
            DrawableError::invalid_argument(format!("unknown framebuffer configuration {config:#x}"))
        })?;
        let failed = || DrawableError::resource("Could not create GLX pixmap");

        let native = display.as_ref();
        let mut builder = PixmapBuilder::new(native);
        let visual = native.visual_from_config(config).ok_or_else(failed)?;
        let window = native.create_window(&visual, 1, 1).ok_or_else(failed)?;
        builder.window = Some(window);
        let pixmap_depth = if depth > 0 { depth as u32 } else { visual.depth };
        let pixmap = native
            .create_pixmap(window, w, h, pixmap_depth)
            .ok_or_else(failed)?;
        builder.pixmap = Some(pixmap);
        let drawable = native
            .create_glx_pixmap(config, pixmap, attribs)
            .ok_or_else(failed)?;
        builder.disarm();
        drop(builder);

        let info = Self::describe(
            native,
            w,
            h,
            depth as u32,
            config,
            config_id,
            drawable,
            SurfaceBacking::Pixmap,
        );
        Ok(Self {
            display,
            info,
            pixmap: Some(pixmap),
            window: Some(window),
            cleared: false,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn describe(
        display: &dyn NativeDisplay,
        width: u32,
        height: u32,
        depth: u32,
        config: FbConfig,
        config_id: FbConfigId,
        drawable: GlxDrawable,
        backing: SurfaceBacking,
    ) -> SurfaceInfo {
        let stereo = display.config_attrib(config, ConfigAttrib::Stereo) != 0;
        let channel_bits = [
            ConfigAttrib::RedSize,
            ConfigAttrib::GreenSize,
            ConfigAttrib::BlueSize,
            ConfigAttrib::AlphaSize,
        ]
        .into_iter()
        .map(|attrib| display.config_attrib(config, attrib))
        .sum();
        SurfaceInfo {
            width,
            height,
            depth,
            format: PixelFormat::native_for_host(channel_bits),
            stereo,
            backing,
            config,
            config_id,
            drawable,
        }
    }

    /// Clears the color buffer to transparent black the first time it is
    /// called. Later calls do nothing.
    ///
    /// Operates on the context current for the calling thread and leaves its
    /// clear color as it found it.
    pub fn clear(&mut self) {
        if self.cleared {
            return;
        }
        self.cleared = true;
        let saved = self.display.clear_color();
        self.display.set_clear_color([0.0; 4]);
        self.display.clear_color_buffer();
        self.display.set_clear_color(saved);
    }

    /// Swaps the surface's front and back buffers.
    pub fn swap_buffers(&self) {
        self.display.swap_buffers(self.info.drawable);
    }

    /// Looks up the host visual of the surface's configuration.
    pub fn visual(&self) -> Option<VisualInfo> {
        self.display.visual_from_config(self.info.config)
    }

    /// Returns a snapshot of the surface's properties.
    pub fn info(&self) -> SurfaceInfo {
        self.info
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.info.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.info.height
    }

    /// The native pixel format.
    pub fn format(&self) -> PixelFormat {
        self.info.format
    }

    /// The GLX drawable.
    pub fn drawable(&self) -> GlxDrawable {
        self.info.drawable
    }

    /// The configuration handle.
    pub fn config(&self) -> FbConfig {
        self.info.config
    }

    /// The configuration identity.
    pub fn config_id(&self) -> FbConfigId {
        self.info.config_id
    }

    /// Whether the surface is stereo.
    pub fn is_stereo(&self) -> bool {
        self.info.stereo
    }

    /// The backing kind.
    pub fn backing(&self) -> SurfaceBacking {
        self.info.backing
    }

    /// Returns `true` once [`OffscreenSurface::clear`] has run.
    pub fn is_cleared(&self) -> bool {
        self.cleared
    }
}

impl Drop for OffscreenSurface {
    fn drop(&mut self) {
        match self.info.backing {
            SurfaceBacking::Pbuffer => self.display.destroy_pbuffer(self.info.drawable),
            SurfaceBacking::Pixmap => self.display.destroy_glx_pixmap(self.info.drawable),
        }
        if let Some(pixmap) = self.pixmap.take() {
            self.display.free_pixmap(pixmap);
        }
        if let Some(window) = self.window.take() {
            self.display.destroy_window(window);
        }
        log::debug!(
            "Released {} surface {:#x}",
            self.info.backing.label(),
            self.info.drawable
        );
    }
}
