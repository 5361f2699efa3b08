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

//! The per-drawable surface manager.

use crate::blit;
use crate::readback::{ReadbackEngine, ReadbackRequest, ReadbackTarget};
use crate::runtime::DrawableRuntime;
use crate::surface::{OffscreenSurface, SurfaceInfo};
use offstage_core::{
    ContextId, DrawableError, DrawableResult, FbConfig, FbConfigId, GlxDrawable, LogicalDrawable,
    NativeDisplay, PixelRect, SurfaceBacking,
};
use offstage_telemetry::ProfilerTotals;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The client's direct-rendering preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectRendering {
    /// No preference expressed yet. Contexts are created direct.
    #[default]
    Unset,
    /// Request a direct-rendering context.
    Direct,
    /// Request an indirect context.
    Indirect,
}

impl DirectRendering {
    /// Maps a native boolean-as-integer: `1` is direct, `0` indirect, and
    /// anything else is treated as no preference.
    pub fn from_native(value: i32) -> Self {
        match value {
            1 => DirectRendering::Direct,
            0 => DirectRendering::Indirect,
            _ => DirectRendering::Unset,
        }
    }

    /// Whether a context created under this preference is direct.
    pub fn wants_direct(&self) -> bool {
        !matches!(self, DirectRendering::Indirect)
    }
}

/// What [`SurfaceManager::configure`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureOutcome {
    /// The existing surface already matched.
    Reused,
    /// A new surface was allocated.
    Allocated,
}

#[derive(Debug, Default)]
struct ManagerState {
    surface: Option<OffscreenSurface>,
    context: Option<ContextId>,
    config: Option<FbConfig>,
    config_id: Option<FbConfigId>,
    direct: DirectRendering,
}

impl ManagerState {
    fn destroy_context(&mut self, display: &dyn NativeDisplay) {
        if let Some(context) = self.context.take() {
            display.destroy_context(context);
            log::debug!("Destroyed rendering context {context:#x}");
        }
    }

    fn ensure_context(&mut self, display: &dyn NativeDisplay) -> DrawableResult<ContextId> {
        if let Some(context) = self.context {
            return Ok(context);
        }
        let config = self.config.ok_or_else(|| {
            DrawableError::Uninitialized("surface manager has not been fully initialized".into())
        })?;
        let direct = self.direct.wants_direct();
        let context = display
            .create_context(config, direct)
            .filter(|c| !c.is_null())
            .ok_or_else(|| {
                DrawableError::resource("Could not create rendering context for readback")
            })?;
        log::debug!(
            "Created {} rendering context {context:#x}",
            if direct { "direct" } else { "indirect" }
        );
        self.context = Some(context);
        Ok(context)
    }

    fn surface(&self) -> DrawableResult<&OffscreenSurface> {
        self.surface.as_ref().ok_or_else(|| {
            DrawableError::Uninitialized("surface manager has not been fully initialized".into())
        })
    }
}

/// Owns the off-screen surface and rendering context standing in for one
/// logical drawable.
///
/// Every method takes `&self`; a manager can be shared between threads.
/// Readback and copy state is serialized by one lock, taken before the lock
/// guarding the surface and context.
#[derive(Debug)]
pub struct SurfaceManager {
    display: Arc<dyn NativeDisplay>,
    logical: LogicalDrawable,
    runtime: Arc<DrawableRuntime>,
    engine: Mutex<ReadbackEngine>,
    state: Mutex<ManagerState>,
}

impl SurfaceManager {
    /// Creates a manager with no surface.
    /// ## Arguments
    /// * `display` - The display surfaces and contexts are created on.
    /// * `logical` - The client drawable this manager stands in for.
    /// * `runtime` - The process-wide runtime.
    /// ## Errors
    /// [`DrawableError::InvalidArgument`] if `logical` is null.
    pub fn new(
        display: Arc<dyn NativeDisplay>,
        logical: LogicalDrawable,
        runtime: Arc<DrawableRuntime>,
    ) -> DrawableResult<Self> {
        if logical.is_null() {
            return Err(DrawableError::invalid_argument("logical drawable is null"));
        }
        let engine = ReadbackEngine::new(runtime.settings().profile);
        Ok(Self {
            display,
            logical,
            runtime,
            engine: Mutex::new(engine),
            state: Mutex::new(ManagerState::default()),
        })
    }

    fn lock_engine(&self) -> MutexGuard<'_, ReadbackEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_state(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes sure the surface matches the requested geometry and
    /// configuration, allocating a new one if it does not.
    ///
    /// Configurations are compared by identity, so an aliased handle of the
    /// current configuration reuses the surface. When the identity changes
    /// the rendering context is destroyed. A failed allocation leaves the
    /// previous surface in place.
    /// ## Errors
    /// [`DrawableError::InvalidArgument`] for bad geometry or an unknown or
    /// null configuration, [`DrawableError::Resource`] if allocation fails.
    pub fn configure(
        &self,
        width: i32,
        height: i32,
        config: FbConfig,
    ) -> DrawableResult<ConfigureOutcome> {
        if width < 1 || height < 1 {
            return Err(DrawableError::invalid_argument(format!(
                "surface size must be positive, got {width}x{height}"
            )));
        }
        if config.is_null() {
            return Err(DrawableError::invalid_argument("framebuffer configuration is null"));
        }
        let config_id = self.display.config_id(config).ok_or_else(|| {
            DrawableError::invalid_argument(format!("unknown framebuffer configuration {config:#x}"))
        })?;

        let _engine = self.lock_engine();
        let mut state = self.lock_state();

        if let Some(surface) = &state.surface {
            if surface.width() == width as u32
                && surface.height() == height as u32
                && surface.config_id() == config_id
            {
                return Ok(ConfigureOutcome::Reused);
            }
        }

        let backing = self.runtime.settings().backing;
        self.runtime.selector().announce_backing(backing);
        let surface = match backing {
            SurfaceBacking::Pbuffer => {
                OffscreenSurface::pbuffer(self.display.clone(), width, height, config)?
            }
            SurfaceBacking::Pixmap => {
                OffscreenSurface::pixmap(self.display.clone(), width, height, 0, config, &[])?
            }
        };

        if state.config_id.is_some_and(|previous| previous != config_id) {
            state.destroy_context(self.display.as_ref());
        }
        state.config = Some(config);
        state.config_id = Some(config_id);
        let previous = state.surface.replace(surface);
        drop(previous);

        log::debug!(
            "Drawable {:#x}: allocated {width}x{height} surface",
            self.logical
        );
        Ok(ConfigureOutcome::Allocated)
    }

    /// Records the client's direct-rendering preference.
    ///
    /// [`DirectRendering::Unset`] is ignored. A changed preference destroys
    /// the existing context so that the next one honours it.
    pub fn set_direct_rendering(&self, preference: DirectRendering) {
        if preference == DirectRendering::Unset {
            return;
        }
        let _engine = self.lock_engine();
        let mut state = self.lock_state();
        if preference != state.direct {
            state.destroy_context(self.display.as_ref());
        }
        state.direct = preference;
    }

    /// Clears a freshly allocated surface once, using the context current
    /// on the calling thread. Does nothing without a surface.
    pub fn clear(&self) {
        if let Some(surface) = self.lock_state().surface.as_mut() {
            surface.clear();
        }
    }

    /// Reads pixels from the surface into `destination`.
    ///
    /// Reads come from the drawable currently bound on the calling thread
    /// if there is one, the surface otherwise. The calling thread's bindings
    /// are restored before returning.
    /// ## Errors
    /// * [`DrawableError::InvalidArgument`] for a degenerate request or a
    ///   destination shorter than [`ReadbackRequest::required_len`].
    /// * [`DrawableError::Uninitialized`] before the first successful
    ///   [`SurfaceManager::configure`].
    /// * [`DrawableError::UnsupportedFeature`] when staged readback is
    ///   selected but the display lacks pixel buffer objects.
    /// * [`DrawableError::Resource`] if the context or the staged buffer
    ///   cannot be created, bound or mapped.
    /// * [`DrawableError::Device`] tagged `"Read Pixels"` if the device
    ///   reported errors.
    pub fn readback(&self, request: &ReadbackRequest, destination: &mut [u8]) -> DrawableResult<()> {
        request.validate(destination.len())?;

        let mut engine = self.lock_engine();
        let target = {
            let mut state = self.lock_state();
            let surface = state.surface()?;
            let (surface, native_format) = (surface.drawable(), surface.format());
            let context = state.ensure_context(self.display.as_ref())?;
            ReadbackTarget {
                logical: self.logical,
                context,
                surface,
                native_format,
            }
        };
        let strategy = self.runtime.selector().observe_format(request.format);

        engine.read(
            self.display.as_ref(),
            &self.runtime,
            target,
            strategy,
            request,
            destination,
        )
    }

    /// Copies `source` from the surface's front buffer into `target`, with
    /// `(dest_x, dest_y)` as the destination offset.
    /// ## Errors
    /// [`DrawableError::InvalidArgument`] for an empty rectangle,
    /// [`DrawableError::Uninitialized`] without a surface,
    /// [`DrawableError::Resource`] if the context cannot be created or bound,
    /// and [`DrawableError::Device`] tagged `"Copy Pixels"` on device errors.
    pub fn copy_pixels(
        &self,
        source: PixelRect,
        dest_x: i32,
        dest_y: i32,
        target: GlxDrawable,
    ) -> DrawableResult<()> {
        if source.width < 1 || source.height < 1 {
            return Err(DrawableError::invalid_argument(format!(
                "copy rectangle must be positive, got {}x{}",
                source.width, source.height
            )));
        }

        let _engine = self.lock_engine();
        let (context, surface) = {
            let mut state = self.lock_state();
            let surface = state.surface()?.drawable();
            (state.ensure_context(self.display.as_ref())?, surface)
        };

        blit::copy_rows(
            self.display.as_ref(),
            context,
            surface,
            source,
            dest_x,
            dest_y,
            target,
        )
    }

    /// The native handle of the surface.
    /// ## Errors
    /// [`DrawableError::Uninitialized`] if no surface has been allocated.
    pub fn surface_drawable(&self) -> DrawableResult<GlxDrawable> {
        Ok(self.lock_state().surface()?.drawable())
    }

    /// The client drawable this manager stands in for.
    pub fn logical_drawable(&self) -> LogicalDrawable {
        self.logical
    }

    /// A snapshot of the surface's properties, if one exists.
    pub fn surface_info(&self) -> Option<SurfaceInfo> {
        self.lock_state().surface.as_ref().map(OffscreenSurface::info)
    }

    /// Whether a surface has been allocated.
    pub fn is_initialized(&self) -> bool {
        self.lock_state().surface.is_some()
    }

    /// Whether a rendering context currently exists.
    pub fn has_context(&self) -> bool {
        self.lock_state().context.is_some()
    }

    /// The rendering context, if one exists.
    pub fn context(&self) -> Option<ContextId> {
        self.lock_state().context
    }

    /// The stored direct-rendering preference.
    pub fn direct_rendering(&self) -> DirectRendering {
        self.lock_state().direct
    }

    /// Cumulative readback throughput of this manager.
    pub fn profiler_totals(&self) -> ProfilerTotals {
        self.lock_engine().profiler_totals()
    }

    /// Number of left-eye or mono frames the test probe has seen.
    pub fn frame_count(&self) -> i64 {
        self.lock_engine().frame_count()
    }

    /// The runtime this manager belongs to.
    pub fn runtime(&self) -> &Arc<DrawableRuntime> {
        &self.runtime
    }
}

impl Drop for SurfaceManager {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        drop(state.surface.take());
        state.destroy_context(self.display.as_ref());
    }
}
