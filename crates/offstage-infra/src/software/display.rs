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

use super::config::ConfigDescriptor;
use super::context::{ortho_matrix, ContextEntry};
use super::events::{Fault, NativeEvent};
use super::storage::{ColorStorage, Texel};
use super::PIXEL_BUFFER_OBJECT_EXTENSION;
use offstage_core::{
    BufferId, BufferMapError, ConfigAttrib, ContextBindings, ContextId, DeviceErrorCode,
    DrawBuffer, FbConfig, FbConfigId, GlxDrawable, MatrixMode, NativeDisplay, PixelFormat,
    PixelRect, PixmapId, ReadTarget, VisualInfo, WindowId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::Duration;

// X resource ids start above the client base so they never look null.
const FIRST_RESOURCE_ID: u64 = 0x0200_0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrawableKind {
    Pbuffer,
    GlxPixmap,
    Window,
}

#[derive(Debug)]
struct DrawableEntry {
    kind: DrawableKind,
    config_id: Option<FbConfigId>,
    storage: ColorStorage,
}

#[derive(Debug)]
struct PixmapEntry {
    width: u32,
    height: u32,
}

#[derive(Debug, Default)]
struct PackBufferEntry {
    data: Vec<u8>,
}

#[derive(Debug)]
struct SoftwareState {
    configs: HashMap<FbConfig, ConfigDescriptor>,
    drawables: HashMap<GlxDrawable, DrawableEntry>,
    windows: HashMap<WindowId, VisualInfo>,
    pixmaps: HashMap<PixmapId, PixmapEntry>,
    contexts: HashMap<ContextId, ContextEntry>,
    bindings: HashMap<ThreadId, ContextBindings>,
    buffers: HashMap<BufferId, PackBufferEntry>,
    extensions: Vec<String>,
    faults: Vec<Fault>,
    events: Vec<NativeEvent>,
    read_latency: Duration,
    map_latency: Duration,
}

impl SoftwareState {
    fn armed(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }

    fn bindings_of(&self, thread: ThreadId) -> ContextBindings {
        self.bindings
            .get(&thread)
            .copied()
            .unwrap_or(ContextBindings::RELEASED)
    }

    /// Returns the calling thread's bindings if its context is still alive.
    fn current(&self) -> Option<(ContextId, ContextBindings)> {
        let bindings = self.bindings_of(thread::current().id());
        let context = bindings.context?;
        self.contexts
            .contains_key(&context)
            .then_some((context, bindings))
    }

    fn current_context_mut(&mut self) -> Option<&mut ContextEntry> {
        let (context, _) = self.current()?;
        self.contexts.get_mut(&context)
    }

    fn record_error(&mut self, context: ContextId, code: DeviceErrorCode) {
        if let Some(entry) = self.contexts.get_mut(&context) {
            entry.state.record_error(code);
        }
    }

    fn release_thread(&mut self, thread: ThreadId) {
        if let Some(previous) = self.bindings.remove(&thread) {
            if let Some(entry) = previous.context.and_then(|c| self.contexts.get_mut(&c)) {
                entry.current_on = None;
            }
        }
    }
}

/// An in-memory [`NativeDisplay`].
///
/// All state sits behind a single mutex. Simulated latencies are slept
/// outside of it so concurrent callers still overlap.
#[derive(Debug)]
pub struct SoftwareDisplay {
    state: Mutex<SoftwareState>,
    next_resource_id: AtomicU64,
    next_buffer_id: AtomicU32,
}

impl Default for SoftwareDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareDisplay {
    /// Creates an empty display advertising pixel buffer object support.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SoftwareState {
                configs: HashMap::new(),
                drawables: HashMap::new(),
                windows: HashMap::new(),
                pixmaps: HashMap::new(),
                contexts: HashMap::new(),
                bindings: HashMap::new(),
                buffers: HashMap::new(),
                extensions: vec![PIXEL_BUFFER_OBJECT_EXTENSION.to_string()],
                faults: Vec::new(),
                events: Vec::new(),
                read_latency: Duration::ZERO,
                map_latency: Duration::ZERO,
            }),
            next_resource_id: AtomicU64::new(FIRST_RESOURCE_ID),
            next_buffer_id: AtomicU32::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SoftwareState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn generate_resource_id(&self) -> u64 {
        self.next_resource_id.fetch_add(1, Ordering::Relaxed)
    }

    // --- Test harness controls ---

    /// Registers a framebuffer configuration and returns a handle to it.
    pub fn add_config(&self, descriptor: ConfigDescriptor) -> FbConfig {
        let handle = FbConfig(self.generate_resource_id());
        self.lock().configs.insert(handle, descriptor);
        handle
    }

    /// Returns a new, distinct handle describing the same configuration as
    /// `config`.
    pub fn alias_config(&self, config: FbConfig) -> Option<FbConfig> {
        let descriptor = *self.lock().configs.get(&config)?;
        Some(self.add_config(descriptor))
    }

    /// Arms `fault` until [`SoftwareDisplay::clear_faults`] is called.
    pub fn inject_fault(&self, fault: Fault) {
        let mut state = self.lock();
        if !state.faults.contains(&fault) {
            state.faults.push(fault);
        }
    }

    /// Disarms every fault.
    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// Replaces the advertised extension list.
    pub fn set_extensions<I, S>(&self, extensions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().extensions = extensions.into_iter().map(Into::into).collect();
    }

    /// Adds a delay to every `read_pixels` call.
    pub fn set_read_latency(&self, latency: Duration) {
        self.lock().read_latency = latency;
    }

    /// Adds a delay to every `map_pack_buffer` call.
    pub fn set_map_latency(&self, latency: Duration) {
        self.lock().map_latency = latency;
    }

    /// Returns the resource event log.
    pub fn events(&self) -> Vec<NativeEvent> {
        self.lock().events.clone()
    }

    /// Empties the resource event log.
    pub fn clear_events(&self) {
        self.lock().events.clear();
    }

    /// Returns `true` if `drawable` is alive.
    pub fn contains_drawable(&self, drawable: GlxDrawable) -> bool {
        self.lock().drawables.contains_key(&drawable)
    }

    /// Returns the size of `drawable`.
    pub fn drawable_size(&self, drawable: GlxDrawable) -> Option<(u32, u32)> {
        let state = self.lock();
        let entry = state.drawables.get(&drawable)?;
        Some((entry.storage.width(), entry.storage.height()))
    }

    /// Number of live contexts.
    pub fn live_contexts(&self) -> usize {
        self.lock().contexts.len()
    }

    /// Returns whether `context` was created for direct rendering.
    pub fn context_is_direct(&self, context: ContextId) -> Option<bool> {
        self.lock().contexts.get(&context).map(|c| c.direct)
    }

    /// Number of live buffer objects.
    pub fn live_buffers(&self) -> usize {
        self.lock().buffers.len()
    }

    /// Fills one color buffer of `drawable` with a single color.
    /// ## Returns
    /// `false` if the drawable or buffer does not exist.
    pub fn fill(&self, drawable: GlxDrawable, buffer: DrawBuffer, rgba: [u8; 4]) -> bool {
        self.fill_with(drawable, buffer, |_, _| rgba)
    }

    /// Fills one color buffer of `drawable` pixel by pixel. `f` receives
    /// `(x, y)` with the origin at the bottom-left corner.
    pub fn fill_with<F>(&self, drawable: GlxDrawable, buffer: DrawBuffer, f: F) -> bool
    where
        F: Fn(u32, u32) -> [u8; 4],
    {
        let mut state = self.lock();
        let Some(entry) = state.drawables.get_mut(&drawable) else {
            return false;
        };
        let Some(slot) = entry.storage.read_slot(buffer) else {
            return false;
        };
        for y in 0..entry.storage.height() {
            for x in 0..entry.storage.width() {
                entry
                    .storage
                    .set(slot, x as i64, y as i64, Texel::from_rgba(f(x, y)));
            }
        }
        true
    }

    /// Reads one pixel of `drawable`, origin bottom-left.
    pub fn pixel(
        &self,
        drawable: GlxDrawable,
        buffer: DrawBuffer,
        x: u32,
        y: u32,
    ) -> Option<[u8; 4]> {
        let state = self.lock();
        let entry = state.drawables.get(&drawable)?;
        let slot = entry.storage.read_slot(buffer)?;
        entry
            .storage
            .get(slot, x as i64, y as i64)
            .map(Texel::to_rgba)
    }

    /// Returns the raw RGBA8 bytes of one color buffer, bottom row first.
    pub fn buffer_bytes(&self, drawable: GlxDrawable, buffer: DrawBuffer) -> Option<Vec<u8>> {
        let state = self.lock();
        let entry = state.drawables.get(&drawable)?;
        let slot = entry.storage.read_slot(buffer)?;
        let plane = entry.storage.plane(slot)?;
        Some(bytemuck::cast_slice::<Texel, u8>(plane).to_vec())
    }

    fn with_current<R>(&self, f: impl FnOnce(&mut ContextEntry) -> R) -> Option<R> {
        let mut state = self.lock();
        state.current_context_mut().map(f)
    }

    fn read_into(
        state: &mut SoftwareState,
        context: ContextId,
        read: GlxDrawable,
        rect: PixelRect,
        format: PixelFormat,
        target: ReadTarget<'_>,
    ) -> Result<(), DeviceErrorCode> {
        if rect.width < 0 || rect.height < 0 {
            return Err(DeviceErrorCode::INVALID_VALUE);
        }
        let gl = &state
            .contexts
            .get(&context)
            .ok_or(DeviceErrorCode::INVALID_OPERATION)?
            .state;
        let drawable = state
            .drawables
            .get(&read)
            .ok_or(DeviceErrorCode::INVALID_OPERATION)?;
        let buffer = gl
            .read_buffer
            .unwrap_or_else(|| drawable.storage.default_buffer());
        let slot = drawable
            .storage
            .read_slot(buffer)
            .ok_or(DeviceErrorCode::INVALID_OPERATION)?;

        let bpp = format.bytes_per_pixel();
        let alignment = gl.pack_alignment as usize;
        let row_bytes = rect.width as usize * bpp;
        let stride = row_bytes.div_ceil(alignment) * alignment;
        let required = if rect.area() == 0 {
            0
        } else {
            stride * (rect.height as usize - 1) + row_bytes
        };

        let out: &mut [u8] = match target {
            ReadTarget::Host(out) => out,
            ReadTarget::PackBuffer => {
                let id = gl.pack_buffer.ok_or(DeviceErrorCode::INVALID_OPERATION)?;
                state
                    .buffers
                    .get_mut(&id)
                    .ok_or(DeviceErrorCode::INVALID_OPERATION)?
                    .data
                    .as_mut_slice()
            }
        };
        if out.len() < required {
            return Err(DeviceErrorCode::INVALID_OPERATION);
        }

        for row in 0..rect.height.max(0) as usize {
            for col in 0..rect.width.max(0) as usize {
                let x = rect.x as i64 + col as i64;
                let y = rect.y as i64 + row as i64;
                if let Some(texel) = drawable.storage.get(slot, x, y) {
                    let offset = row * stride + col * bpp;
                    format.encode(texel.to_rgba(), &mut out[offset..offset + bpp]);
                }
            }
        }
        Ok(())
    }

    fn copy_rows(
        state: &mut SoftwareState,
        context: ContextId,
        bindings: ContextBindings,
        rect: PixelRect,
    ) -> Result<(), DeviceErrorCode> {
        if rect.width < 0 || rect.height < 0 {
            return Err(DeviceErrorCode::INVALID_VALUE);
        }
        let (Some(draw), Some(read)) = (bindings.draw, bindings.read) else {
            return Err(DeviceErrorCode::INVALID_OPERATION);
        };
        let gl = &state
            .contexts
            .get(&context)
            .ok_or(DeviceErrorCode::INVALID_OPERATION)?
            .state;
        let Some((raster_x, raster_y)) = gl.raster else {
            // An invalid raster position discards the copy.
            return Ok(());
        };
        let read_buffer = gl.read_buffer;
        let draw_buffer = gl.draw_buffer;

        let source = state
            .drawables
            .get(&read)
            .ok_or(DeviceErrorCode::INVALID_OPERATION)?;
        let slot = source
            .storage
            .read_slot(read_buffer.unwrap_or_else(|| source.storage.default_buffer()))
            .ok_or(DeviceErrorCode::INVALID_OPERATION)?;
        let width = rect.width as usize;
        let mut texels = Vec::with_capacity(rect.area() as usize);
        for row in 0..rect.height as i64 {
            for col in 0..width as i64 {
                texels.push(source.storage.get(slot, rect.x as i64 + col, rect.y as i64 + row));
            }
        }

        let target = state
            .drawables
            .get_mut(&draw)
            .ok_or(DeviceErrorCode::INVALID_OPERATION)?;
        let slots = target
            .storage
            .draw_slots(draw_buffer.unwrap_or_else(|| target.storage.default_buffer()));
        for (index, texel) in texels.into_iter().enumerate() {
            let Some(texel) = texel else { continue };
            let x = raster_x + (index % width) as i64;
            let y = raster_y + (index / width) as i64;
            for slot in &slots {
                target.storage.set(*slot, x, y, texel);
            }
        }
        Ok(())
    }
}

impl NativeDisplay for SoftwareDisplay {
    fn config_id(&self, config: FbConfig) -> Option<FbConfigId> {
        self.lock().configs.get(&config).map(|d| FbConfigId(d.id))
    }

    fn config_attrib(&self, config: FbConfig, attrib: ConfigAttrib) -> i32 {
        self.lock()
            .configs
            .get(&config)
            .map(|d| d.attrib(attrib))
            .unwrap_or(0)
    }

    fn visual_from_config(&self, config: FbConfig) -> Option<VisualInfo> {
        let state = self.lock();
        if state.armed(Fault::VisualLookup) {
            return None;
        }
        state.configs.get(&config)?.visual
    }

    fn create_pbuffer(&self, config: FbConfig, width: u32, height: u32) -> Option<GlxDrawable> {
        let mut state = self.lock();
        if state.armed(Fault::PbufferCreation) || width == 0 || height == 0 {
            return None;
        }
        let descriptor = *state.configs.get(&config)?;
        let drawable = GlxDrawable(self.generate_resource_id());
        state.drawables.insert(
            drawable,
            DrawableEntry {
                kind: DrawableKind::Pbuffer,
                config_id: Some(FbConfigId(descriptor.id)),
                storage: ColorStorage::new(
                    width,
                    height,
                    descriptor.stereo,
                    descriptor.double_buffer,
                ),
            },
        );
        state.events.push(NativeEvent::CreatePbuffer(drawable));
        log::trace!("SoftwareDisplay: created pbuffer {drawable:#x} ({width}x{height})");
        Some(drawable)
    }

    fn destroy_pbuffer(&self, drawable: GlxDrawable) {
        let mut state = self.lock();
        if let Some(entry) = state.drawables.get(&drawable) {
            if entry.kind == DrawableKind::Pbuffer {
                state.drawables.remove(&drawable);
                state.events.push(NativeEvent::DestroyPbuffer(drawable));
            }
        }
    }

    fn create_window(&self, visual: &VisualInfo, width: u32, height: u32) -> Option<WindowId> {
        let mut state = self.lock();
        if state.armed(Fault::WindowCreation) || width == 0 || height == 0 {
            return None;
        }
        let window = WindowId(self.generate_resource_id());
        state.windows.insert(window, *visual);
        state.drawables.insert(
            window.into(),
            DrawableEntry {
                kind: DrawableKind::Window,
                config_id: None,
                storage: ColorStorage::new(width, height, false, true),
            },
        );
        state.events.push(NativeEvent::CreateWindow(window));
        Some(window)
    }

    fn destroy_window(&self, window: WindowId) {
        let mut state = self.lock();
        if state.windows.remove(&window).is_some() {
            state.drawables.remove(&GlxDrawable::from(window));
            state.events.push(NativeEvent::DestroyWindow(window));
        }
    }

    fn create_pixmap(
        &self,
        window: WindowId,
        width: u32,
        height: u32,
        depth: u32,
    ) -> Option<PixmapId> {
        let mut state = self.lock();
        if state.armed(Fault::PixmapCreation)
            || !state.windows.contains_key(&window)
            || width == 0
            || height == 0
            || depth == 0
        {
            return None;
        }
        let pixmap = PixmapId(self.generate_resource_id());
        state.pixmaps.insert(pixmap, PixmapEntry { width, height });
        state.events.push(NativeEvent::CreatePixmap(pixmap));
        Some(pixmap)
    }

    fn free_pixmap(&self, pixmap: PixmapId) {
        let mut state = self.lock();
        if state.pixmaps.remove(&pixmap).is_some() {
            state.events.push(NativeEvent::FreePixmap(pixmap));
        }
    }

    fn create_glx_pixmap(
        &self,
        config: FbConfig,
        pixmap: PixmapId,
        _attribs: &[(i32, i32)],
    ) -> Option<GlxDrawable> {
        let mut state = self.lock();
        if state.armed(Fault::GlxPixmapCreation) {
            return None;
        }
        let descriptor = *state.configs.get(&config)?;
        let (width, height) = {
            let entry = state.pixmaps.get(&pixmap)?;
            (entry.width, entry.height)
        };
        let drawable = GlxDrawable(self.generate_resource_id());
        state.drawables.insert(
            drawable,
            DrawableEntry {
                kind: DrawableKind::GlxPixmap,
                config_id: Some(FbConfigId(descriptor.id)),
                // GLX pixmaps are always single-buffered mono.
                storage: ColorStorage::new(width, height, false, false),
            },
        );
        state.events.push(NativeEvent::CreateGlxPixmap(drawable));
        Some(drawable)
    }

    fn destroy_glx_pixmap(&self, drawable: GlxDrawable) {
        let mut state = self.lock();
        if let Some(entry) = state.drawables.get(&drawable) {
            if entry.kind == DrawableKind::GlxPixmap {
                state.drawables.remove(&drawable);
                state.events.push(NativeEvent::DestroyGlxPixmap(drawable));
            }
        }
    }

    fn swap_buffers(&self, drawable: GlxDrawable) {
        if let Some(entry) = self.lock().drawables.get_mut(&drawable) {
            entry.storage.swap();
        }
    }

    fn create_context(&self, config: FbConfig, direct: bool) -> Option<ContextId> {
        let mut state = self.lock();
        if state.armed(Fault::ContextCreation) {
            return None;
        }
        let config_id = FbConfigId(state.configs.get(&config)?.id);
        let context = ContextId(self.generate_resource_id());
        state
            .contexts
            .insert(context, ContextEntry::new(config_id, direct));
        state
            .events
            .push(NativeEvent::CreateContext { context, direct });
        Some(context)
    }

    fn destroy_context(&self, context: ContextId) {
        let mut state = self.lock();
        if state.contexts.remove(&context).is_some() {
            state.events.push(NativeEvent::DestroyContext(context));
        }
    }

    fn current_bindings(&self) -> ContextBindings {
        self.lock().bindings_of(thread::current().id())
    }

    fn make_current(&self, bindings: ContextBindings) -> bool {
        let thread = thread::current().id();
        let mut state = self.lock();

        let Some(context) = bindings.context else {
            state.release_thread(thread);
            state.events.push(NativeEvent::MakeCurrent(bindings));
            return true;
        };
        if state.armed(Fault::MakeCurrent) {
            return false;
        }
        let (Some(draw), Some(read)) = (bindings.draw, bindings.read) else {
            return false;
        };
        let Some(entry) = state.contexts.get(&context) else {
            return false;
        };
        if entry.current_on.is_some_and(|owner| owner != thread) {
            log::debug!("SoftwareDisplay: context {context:#x} is current on another thread");
            return false;
        }
        let config_id = entry.config_id;
        for drawable in [draw, read] {
            match state.drawables.get(&drawable) {
                None => return false,
                Some(d) if d.config_id.is_some_and(|id| id != config_id) => return false,
                Some(_) => {}
            }
        }

        state.release_thread(thread);
        if let Some(entry) = state.contexts.get_mut(&context) {
            entry.current_on = Some(thread);
        }
        state.bindings.insert(thread, bindings);
        state.events.push(NativeEvent::MakeCurrent(bindings));
        true
    }

    fn has_extension(&self, name: &str) -> bool {
        let state = self.lock();
        state.current().is_some() && state.extensions.iter().any(|e| e == name)
    }

    fn take_error(&self) -> Option<DeviceErrorCode> {
        self.with_current(|c| c.state.take_error()).flatten()
    }

    fn clear_color(&self) -> [f32; 4] {
        self.with_current(|c| c.state.clear_color)
            .unwrap_or([0.0; 4])
    }

    fn set_clear_color(&self, rgba: [f32; 4]) {
        self.with_current(|c| c.state.clear_color = rgba);
    }

    fn clear_color_buffer(&self) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let Some((context, bindings)) = state.current() else {
            return;
        };
        let Some(draw) = bindings.draw else { return };
        let (color, draw_buffer) = match state.contexts.get(&context) {
            Some(c) => (Texel::from_float(c.state.clear_color), c.state.draw_buffer),
            None => return,
        };
        let Some(entry) = state.drawables.get_mut(&draw) else {
            state.record_error(context, DeviceErrorCode::INVALID_OPERATION);
            return;
        };
        let buffer = draw_buffer.unwrap_or_else(|| entry.storage.default_buffer());
        for slot in entry.storage.draw_slots(buffer) {
            entry.storage.fill(slot, color);
        }
    }

    fn set_read_buffer(&self, buffer: DrawBuffer) {
        self.with_current(|c| {
            if buffer == DrawBuffer::FrontAndBack {
                c.state.record_error(DeviceErrorCode::INVALID_ENUM);
            } else {
                c.state.read_buffer = Some(buffer);
            }
        });
    }

    fn set_draw_buffer(&self, buffer: DrawBuffer) {
        self.with_current(|c| c.state.draw_buffer = Some(buffer));
    }

    fn set_pack_alignment(&self, alignment: u32) {
        self.with_current(|c| match alignment {
            1 | 2 | 4 | 8 => c.state.pack_alignment = alignment,
            _ => c.state.record_error(DeviceErrorCode::INVALID_VALUE),
        });
    }

    fn set_unpack_alignment(&self, alignment: u32) {
        self.with_current(|c| match alignment {
            1 | 2 | 4 | 8 => c.state.unpack_alignment = alignment,
            _ => c.state.record_error(DeviceErrorCode::INVALID_VALUE),
        });
    }

    fn read_pixels(&self, rect: PixelRect, format: PixelFormat, target: ReadTarget<'_>) {
        let latency = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let Some((context, bindings)) = state.current() else {
                return;
            };
            let Some(read) = bindings.read else { return };
            let injected = state.faults.iter().find_map(|f| match f {
                Fault::ReadPixels(code) => Some(*code),
                _ => None,
            });
            match Self::read_into(state, context, read, rect, format, target) {
                Ok(()) => {
                    if let Some(code) = injected {
                        state.record_error(context, code);
                    }
                }
                Err(code) => state.record_error(context, code),
            }
            state.read_latency
        };
        if !latency.is_zero() {
            thread::sleep(latency);
        }
    }

    fn gen_buffer(&self) -> Option<BufferId> {
        let mut state = self.lock();
        if state.armed(Fault::BufferGeneration) {
            return None;
        }
        let buffer = BufferId(self.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        state.buffers.insert(buffer, PackBufferEntry::default());
        state.events.push(NativeEvent::GenBuffer(buffer));
        Some(buffer)
    }

    fn is_buffer(&self, buffer: BufferId) -> bool {
        self.lock().buffers.contains_key(&buffer)
    }

    fn bind_pack_buffer(&self, buffer: Option<BufferId>) {
        let mut state = self.lock();
        let Some((context, _)) = state.current() else {
            return;
        };
        if buffer.is_some_and(|b| !state.buffers.contains_key(&b)) {
            state.record_error(context, DeviceErrorCode::INVALID_OPERATION);
            return;
        }
        if let Some(entry) = state.contexts.get_mut(&context) {
            entry.state.pack_buffer = buffer;
        }
    }

    fn pack_buffer_size(&self) -> usize {
        let state = self.lock();
        state
            .current()
            .and_then(|(context, _)| state.contexts.get(&context)?.state.pack_buffer)
            .and_then(|buffer| state.buffers.get(&buffer))
            .map(|entry| entry.data.len())
            .unwrap_or(0)
    }

    fn allocate_pack_buffer(&self, size: usize) {
        let mut state = self.lock();
        let Some((context, _)) = state.current() else {
            return;
        };
        let Some(buffer) = state
            .contexts
            .get(&context)
            .and_then(|c| c.state.pack_buffer)
        else {
            state.record_error(context, DeviceErrorCode::INVALID_OPERATION);
            return;
        };
        if state.armed(Fault::BufferAllocation) {
            state.record_error(context, DeviceErrorCode::OUT_OF_MEMORY);
            return;
        }
        if let Some(entry) = state.buffers.get_mut(&buffer) {
            entry.data = vec![0; size];
            state
                .events
                .push(NativeEvent::AllocateBuffer { buffer, size });
        }
    }

    fn map_pack_buffer(&self, reader: &mut dyn FnMut(&[u8])) -> Result<(), BufferMapError> {
        let latency = self.lock().map_latency;
        if !latency.is_zero() {
            thread::sleep(latency);
        }

        let state = self.lock();
        if state.armed(Fault::BufferMap) {
            return Err(BufferMapError::MapFailed);
        }
        let entry = state
            .current()
            .and_then(|(context, _)| state.contexts.get(&context)?.state.pack_buffer)
            .and_then(|buffer| state.buffers.get(&buffer))
            .ok_or(BufferMapError::MapFailed)?;
        reader(&entry.data);
        if state.armed(Fault::BufferUnmap) {
            return Err(BufferMapError::UnmapFailed);
        }
        Ok(())
    }

    fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.with_current(|c| {
            if width < 0 || height < 0 {
                c.state.record_error(DeviceErrorCode::INVALID_VALUE);
            } else {
                c.state.viewport = [x, y, width, height];
            }
        });
    }

    fn set_matrix_mode(&self, mode: MatrixMode) {
        self.with_current(|c| c.state.matrix_mode = mode);
    }

    fn push_matrix(&self) {
        self.with_current(|c| c.state.push_matrix());
    }

    fn pop_matrix(&self) {
        self.with_current(|c| c.state.pop_matrix());
    }

    fn load_identity(&self) {
        self.with_current(|c| c.state.load_identity());
    }

    fn ortho(&self, left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) {
        self.with_current(|c| {
            if left == right || bottom == top || near == far {
                c.state.record_error(DeviceErrorCode::INVALID_VALUE);
            } else {
                c.state
                    .multiply_top(&ortho_matrix(left, right, bottom, top, near, far));
            }
        });
    }

    fn set_raster_pos(&self, x: i32, y: i32) {
        self.with_current(|c| c.state.set_raster_pos(x, y));
    }

    fn copy_pixels(&self, rect: PixelRect) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let Some((context, bindings)) = state.current() else {
            return;
        };
        let injected = state.faults.iter().find_map(|f| match f {
            Fault::CopyPixels(code) => Some(*code),
            _ => None,
        });
        match Self::copy_rows(state, context, bindings, rect) {
            Ok(()) => {
                if let Some(code) = injected {
                    state.record_error(context, code);
                }
            }
            Err(code) => state.record_error(context, code),
        }
    }
}
