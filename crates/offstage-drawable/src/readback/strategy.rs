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

//! Process-wide readback strategy state.

use super::calibration::CalibrationWindow;
use offstage_core::{
    BufferId, DrawableError, DrawableResult, NativeDisplay, OffscreenSettings, PixelFormat,
    ReadbackStrategy, SurfaceBacking,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// The extension a display must expose for staged readback.
pub const STAGED_READBACK_EXTENSION: &str = "GL_ARB_pixel_buffer_object";

/// Remediation suggested when a staged transfer blocks because the
/// transport's forced alpha channel disagrees with the surface format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceAlphaHint {
    /// The surface has alpha but the transport strips it: try disabling forced alpha.
    Disable,
    /// The surface has no alpha but the transport asks for it: try enabling forced alpha.
    Enable,
}

impl ForceAlphaHint {
    fn for_formats(native: PixelFormat, target: PixelFormat, force_alpha: bool) -> Option<Self> {
        use PixelFormat::*;
        match (native, target) {
            (Bgra, Bgr) | (Rgba, Rgb) if force_alpha => Some(ForceAlphaHint::Disable),
            (Bgr, Bgra) | (Rgb, Rgba) if !force_alpha => Some(ForceAlphaHint::Enable),
            _ => None,
        }
    }
}

/// A recorded detection of staged readback blocking the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationTrip {
    /// The surface's native format.
    pub native_format: PixelFormat,
    /// The format that was being read.
    pub target_format: PixelFormat,
    /// A forced-alpha suggestion, when one applies.
    pub hint: Option<ForceAlphaHint>,
}

/// The shared pixel pack buffer used by staged readbacks.
///
/// The handle is checked against the display on every use and regenerated
/// when it no longer names a live buffer.
#[derive(Debug, Default)]
pub struct StagedBuffer {
    handle: Option<BufferId>,
}

impl StagedBuffer {
    /// Returns a live buffer handle, generating one if needed.
    /// ## Errors
    /// [`DrawableError::Resource`] if no buffer can be generated.
    pub fn ensure(&mut self, display: &dyn NativeDisplay) -> DrawableResult<BufferId> {
        if let Some(handle) = self.handle {
            if display.is_buffer(handle) {
                return Ok(handle);
            }
            log::debug!("Staged readback buffer {handle:#x} is gone, generating a new one");
        }
        let handle = display
            .gen_buffer()
            .filter(|b| !b.is_null())
            .ok_or_else(|| DrawableError::resource("Could not generate pixel buffer object"))?;
        self.handle = Some(handle);
        Ok(handle)
    }

    /// The last handle handed out.
    pub fn handle(&self) -> Option<BufferId> {
        self.handle
    }
}

#[derive(Debug)]
struct SelectorState {
    strategy: ReadbackStrategy,
    last_format: Option<PixelFormat>,
    window: CalibrationWindow,
    announced: bool,
    staged_supported: Option<bool>,
    trips: Vec<CalibrationTrip>,
}

/// Chooses and monitors the readback strategy for every surface manager of
/// the process.
///
/// One selector is created per process and shared by every manager. It owns
/// the one-time diagnostic flags, the calibration window and the staged
/// buffer.
#[derive(Debug)]
pub struct StrategySelector {
    seed: ReadbackStrategy,
    verbose: bool,
    force_alpha: bool,
    backing_announced: AtomicBool,
    state: Mutex<SelectorState>,
    staged: Mutex<StagedBuffer>,
}

impl StrategySelector {
    /// Creates a selector seeded from `settings`.
    pub fn new(settings: &OffscreenSettings) -> Self {
        Self {
            seed: settings.readback,
            verbose: settings.verbose,
            force_alpha: settings.force_alpha,
            backing_announced: AtomicBool::new(false),
            state: Mutex::new(SelectorState {
                strategy: settings.readback,
                last_format: None,
                window: CalibrationWindow::new(),
                announced: false,
                staged_supported: None,
                trips: Vec::new(),
            }),
            staged: Mutex::new(StagedBuffer::default()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SelectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Logs which backing new surfaces use, once per process.
    pub fn announce_backing(&self, backing: SurfaceBacking) {
        if self.verbose && !self.backing_announced.swap(true, Ordering::SeqCst) {
            log::info!("Using {} for rendering", backing.label());
        }
    }

    /// Notes the format of an upcoming readback and returns the strategy to
    /// use for it.
    ///
    /// A format different from the previous readback's resets the
    /// calibration window, the one-time notices and the strategy. Green and
    /// blue single-channel reads count as red.
    pub fn observe_format(&self, format: PixelFormat) -> ReadbackStrategy {
        let key = format.calibration_key();
        let mut state = self.lock_state();
        if state.last_format.is_some_and(|last| last != key) {
            log::debug!("Readback format changed to {format}, resetting calibration");
            state.strategy = self.seed;
            state.window.reset();
            state.announced = false;
        }
        state.last_format = Some(key);
        state.strategy
    }

    /// Returns whether the display supports staged readback. The answer is
    /// looked up once, with a context current, and cached.
    pub fn staged_supported(&self, display: &dyn NativeDisplay) -> bool {
        *self
            .lock_state()
            .staged_supported
            .get_or_insert_with(|| display.has_extension(STAGED_READBACK_EXTENSION))
    }

    /// Logs the strategy in use, once until the next format change.
    pub fn announce(&self, strategy: ReadbackStrategy, native: PixelFormat, target: PixelFormat) {
        if !self.verbose {
            return;
        }
        let mut state = self.lock_state();
        if state.announced {
            return;
        }
        state.announced = true;
        match strategy {
            ReadbackStrategy::Staged => log::info!(
                "Using pixel buffer objects for readback ({native} --> {target})"
            ),
            ReadbackStrategy::Synchronous => {
                log::info!("Using synchronous readback ({native} --> {target})")
            }
        }
    }

    /// Locks the shared staged buffer for the duration of a transfer.
    pub fn staged_buffer(&self) -> MutexGuard<'_, StagedBuffer> {
        self.staged.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Feeds one staged frame's timings into the calibration window.
    /// ## Returns
    /// The trip, if this frame tripped the detector.
    pub fn record_timing(
        &self,
        issue: Duration,
        total: Duration,
        native: PixelFormat,
        target: PixelFormat,
    ) -> Option<CalibrationTrip> {
        let mut state = self.lock_state();
        if !state.window.observe(issue, total) {
            return None;
        }
        let trip = CalibrationTrip {
            native_format: native,
            target_format: target,
            hint: if native != target {
                ForceAlphaHint::for_formats(native, target, self.force_alpha)
            } else {
                None
            },
        };
        state.trips.push(trip);
        drop(state);

        if self.verbose {
            log::warn!("NOTICE: Pixel buffer object readback is not behaving asynchronously.");
            if native != target {
                log::warn!("   This could be due to a mismatch between the readback pixel format");
                log::warn!("   ({target}) and the surface pixel format ({native}).");
                match trip.hint {
                    Some(ForceAlphaHint::Disable) => {
                        log::warn!("   Try setting {}=0.", OffscreenSettings::ENV_FORCEALPHA)
                    }
                    Some(ForceAlphaHint::Enable) => {
                        log::warn!("   Try setting {}=1.", OffscreenSettings::ENV_FORCEALPHA)
                    }
                    None => {}
                }
            }
        }
        Some(trip)
    }

    /// The strategy readbacks currently use.
    pub fn strategy(&self) -> ReadbackStrategy {
        self.lock_state().strategy
    }

    /// The strategy configured at startup.
    pub fn seed(&self) -> ReadbackStrategy {
        self.seed
    }

    /// Every trip recorded so far.
    pub fn calibration_trips(&self) -> Vec<CalibrationTrip> {
        self.lock_state().trips.clone()
    }

    /// A copy of the current calibration window.
    pub fn calibration_window(&self) -> CalibrationWindow {
        self.lock_state().window
    }
}
