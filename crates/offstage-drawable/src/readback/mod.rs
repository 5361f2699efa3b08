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

//! Pixel readback from a surface into host memory.
//!
//! Two strategies exist. The synchronous one transfers straight into the
//! caller's buffer. The staged one transfers into a pixel pack buffer, then
//! maps it and copies out, which lets the transfer overlap with other work
//! on drivers that implement it asynchronously. Staged frames are timed and
//! a [`CalibrationWindow`] reports when the driver blocks anyway.

pub mod calibration;
pub mod probe;
pub mod strategy;

pub use calibration::CalibrationWindow;
pub use probe::FrameProbe;
pub use strategy::{
    CalibrationTrip, ForceAlphaHint, StagedBuffer, StrategySelector, STAGED_READBACK_EXTENSION,
};

use crate::context_scope::ContextScope;
use crate::runtime::DrawableRuntime;
use offstage_core::{
    BufferId, BufferMapError, ContextId, DrawBuffer, DrawableError, DrawableResult, GlxDrawable,
    LogicalDrawable, NativeDisplay, PixelFormat, PixelRect, ReadTarget, ReadbackStrategy,
    Stopwatch,
};
use offstage_telemetry::{ProfilerTotals, ThroughputProfiler};

/// Describes one readback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadbackRequest {
    /// The source rectangle, origin bottom-left.
    pub region: PixelRect,
    /// Bytes between the starts of consecutive rows in the destination.
    pub row_pitch: usize,
    /// The layout written for each pixel.
    pub format: PixelFormat,
    /// Bytes per pixel in the destination.
    pub pixel_size: usize,
    /// The color buffer to read.
    pub buffer: DrawBuffer,
    /// Whether this is one eye of a stereo frame.
    pub stereo: bool,
}

impl ReadbackRequest {
    /// A tightly packed, non-stereo readback of `region`.
    pub fn new(region: PixelRect, format: PixelFormat, buffer: DrawBuffer) -> Self {
        let pixel_size = format.bytes_per_pixel();
        Self {
            region,
            row_pitch: region.width.max(0) as usize * pixel_size,
            format,
            pixel_size,
            buffer,
            stereo: false,
        }
    }

    /// Sets the destination row pitch.
    pub fn with_row_pitch(mut self, row_pitch: usize) -> Self {
        self.row_pitch = row_pitch;
        self
    }

    /// Marks the request as one eye of a stereo frame.
    pub fn with_stereo(mut self, stereo: bool) -> Self {
        self.stereo = stereo;
        self
    }

    /// Bytes the destination must hold. Saturates at `usize::MAX` for
    /// requests too large to address.
    pub fn required_len(&self) -> usize {
        self.checked_len().unwrap_or(usize::MAX)
    }

    fn checked_len(&self) -> Option<usize> {
        self.row_pitch
            .checked_mul(self.region.height.max(0) as usize)
    }

    /// Rejects requests the device cannot lay out at `row_pitch`.
    ///
    /// Rows are transferred at the pack alignment derived from the pitch, so
    /// the pitch must equal a tight row rounded up to that alignment.
    pub(crate) fn validate(&self, available: usize) -> DrawableResult<()> {
        let PixelRect { width, height, .. } = self.region;
        if width < 1 || height < 1 {
            return Err(DrawableError::invalid_argument(format!(
                "readback region must be positive, got {width}x{height}"
            )));
        }
        if self.pixel_size == 0 {
            return Err(DrawableError::invalid_argument("pixel size must be positive"));
        }
        let row_bytes = (width as usize)
            .checked_mul(self.pixel_size)
            .ok_or_else(|| {
                DrawableError::invalid_argument(format!(
                    "a row of {width} pixels of {} bytes is too large",
                    self.pixel_size
                ))
            })?;
        if self.row_pitch < row_bytes {
            return Err(DrawableError::invalid_argument(format!(
                "row pitch {} is smaller than a row of {width} pixels of {} bytes",
                self.row_pitch, self.pixel_size
            )));
        }
        let alignment = pack_alignment(self.row_pitch) as usize;
        if row_bytes.checked_next_multiple_of(alignment) != Some(self.row_pitch) {
            return Err(DrawableError::invalid_argument(format!(
                "row pitch {} does not match {row_bytes}-byte rows packed at {alignment}-byte alignment",
                self.row_pitch
            )));
        }
        let needed = self.checked_len().ok_or_else(|| {
            DrawableError::invalid_argument(format!(
                "{height} rows of {} bytes is too large",
                self.row_pitch
            ))
        })?;
        if available < needed {
            return Err(DrawableError::invalid_argument(format!(
                "destination holds {available} bytes, {needed} needed"
            )));
        }
        Ok(())
    }
}

/// Largest pack alignment in {8, 4, 2, 1} dividing `row_pitch`.
pub fn pack_alignment(row_pitch: usize) -> u32 {
    [8, 4, 2]
        .into_iter()
        .find(|a| row_pitch % *a as usize == 0)
        .unwrap_or(1)
}

/// Discards every pending device error.
pub(crate) fn drain_errors(display: &dyn NativeDisplay) {
    while display.take_error().is_some() {}
}

/// Drains pending device errors, logging each, and fails with a
/// [`DrawableError::Device`] if there were any.
pub(crate) fn check_errors(
    display: &dyn NativeDisplay,
    operation: &'static str,
) -> DrawableResult<()> {
    let mut codes = Vec::new();
    while let Some(code) = display.take_error() {
        log::error!("Device error {code} during {operation}");
        codes.push(code.0);
    }
    if codes.is_empty() {
        Ok(())
    } else {
        Err(DrawableError::Device { operation, codes })
    }
}

/// Keeps a pack buffer bound until dropped.
struct PackBinding<'a> {
    display: &'a dyn NativeDisplay,
}

impl<'a> PackBinding<'a> {
    fn bind(display: &'a dyn NativeDisplay, buffer: BufferId) -> Self {
        display.bind_pack_buffer(Some(buffer));
        Self { display }
    }
}

impl Drop for PackBinding<'_> {
    fn drop(&mut self) {
        self.display.bind_pack_buffer(None);
    }
}

/// What a readback needs from the surface manager's locked state.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReadbackTarget {
    pub logical: LogicalDrawable,
    pub context: ContextId,
    pub surface: GlxDrawable,
    pub native_format: PixelFormat,
}

/// Per-manager readback state. Serialized by the manager's readback lock.
#[derive(Debug)]
pub(crate) struct ReadbackEngine {
    profiler: ThroughputProfiler,
    probe: FrameProbe,
}

impl ReadbackEngine {
    pub(crate) fn new(profile: bool) -> Self {
        Self {
            profiler: ThroughputProfiler::new("Readback", profile),
            probe: FrameProbe::new(),
        }
    }

    pub(crate) fn profiler_totals(&self) -> ProfilerTotals {
        self.profiler.totals()
    }

    pub(crate) fn frame_count(&self) -> i64 {
        self.probe.frame_count()
    }

    /// Runs one readback. `request` has already been validated against
    /// `destination`.
    pub(crate) fn read(
        &mut self,
        display: &dyn NativeDisplay,
        runtime: &DrawableRuntime,
        target: ReadbackTarget,
        strategy: ReadbackStrategy,
        request: &ReadbackRequest,
        destination: &mut [u8],
    ) -> DrawableResult<()> {
        // Read from whatever the caller is rendering to, else the surface.
        let drawable = display
            .current_bindings()
            .draw
            .filter(|d| !d.is_null())
            .unwrap_or(target.surface);
        let _scope = ContextScope::bind(display, drawable, drawable, target.context)?;

        display.set_read_buffer(request.buffer);
        display.set_pack_alignment(pack_alignment(request.row_pitch));

        let selector = runtime.selector();
        let len = request.required_len();
        let destination = &mut destination[..len];

        match strategy {
            ReadbackStrategy::Synchronous => {
                selector.announce(strategy, target.native_format, request.format);
                drain_errors(display);
                self.profiler.start_frame();
                display.read_pixels(
                    request.region,
                    request.format,
                    ReadTarget::Host(&mut *destination),
                );
            }
            ReadbackStrategy::Staged => {
                if !selector.staged_supported(display) {
                    return Err(DrawableError::UnsupportedFeature(format!(
                        "{STAGED_READBACK_EXTENSION} extension not available"
                    )));
                }
                let mut staged = selector.staged_buffer();
                let buffer = staged.ensure(display)?;
                selector.announce(strategy, target.native_format, request.format);

                let binding = PackBinding::bind(display, buffer);
                if display.pack_buffer_size() != len {
                    display.allocate_pack_buffer(len);
                }
                if display.pack_buffer_size() != len {
                    return Err(DrawableError::resource("Could not set PBO size"));
                }

                drain_errors(display);
                self.profiler.start_frame();
                let stopwatch = Stopwatch::new();
                display.read_pixels(request.region, request.format, ReadTarget::PackBuffer);
                let issue = stopwatch.elapsed();

                let mut copied = false;
                display
                    .map_pack_buffer(&mut |bytes: &[u8]| {
                        if let Some(src) = bytes.get(..len) {
                            destination.copy_from_slice(src);
                            copied = true;
                        }
                    })
                    .map_err(|e| match e {
                        BufferMapError::MapFailed => {
                            DrawableError::resource("Could not map pixel buffer object")
                        }
                        BufferMapError::UnmapFailed => {
                            DrawableError::resource("Could not unmap pixel buffer object")
                        }
                    })?;
                if !copied {
                    return Err(DrawableError::resource(
                        "Pixel buffer object is smaller than the readback",
                    ));
                }
                drop(binding);
                let total = stopwatch.elapsed();
                drop(staged);

                selector.record_timing(issue, total, target.native_format, request.format);
            }
        }

        let weight = if request.stereo { 0.5 } else { 1.0 };
        self.profiler.end_frame(request.region.area(), weight);
        check_errors(display, "Read Pixels")?;

        if runtime.settings().autotest {
            self.probe
                .inspect(display, runtime.probe(), target.logical, request, destination);
        }
        Ok(())
    }
}
