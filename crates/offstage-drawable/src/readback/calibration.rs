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

//! Detection of staged transfers that do not overlap with the caller.

use std::time::Duration;

/// Number of frames after a reset that take part in the measurement.
pub const MEASURED_FRAMES: u32 = 10;

/// Number of synchronous-looking frames that trips the detector.
pub const SYNC_FRAME_THRESHOLD: u32 = 10;

/// Fraction of a frame spent issuing the transfer above which the frame
/// is counted as synchronous.
pub const ISSUE_RATIO_THRESHOLD: f64 = 0.5;

/// Rolling measurement of how long issuing a staged transfer takes compared
/// to the whole staged readback.
///
/// When the issue call dominates, the transfer blocked instead of running
/// in the background. Only the first [`MEASURED_FRAMES`] frames after a
/// reset are looked at, and the detector trips at most once per reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalibrationWindow {
    frames: u32,
    sync_frames: u32,
    tripped: bool,
}

impl CalibrationWindow {
    /// Creates an empty window.
    pub const fn new() -> Self {
        Self {
            frames: 0,
            sync_frames: 0,
            tripped: false,
        }
    }

    /// Records one staged frame.
    /// ## Arguments
    /// * `issue` - Time spent in the transfer call itself.
    /// * `total` - Time from issuing the transfer to the data being in host memory.
    /// ## Returns
    /// `true` exactly once, on the frame that trips the detector.
    pub fn observe(&mut self, issue: Duration, total: Duration) -> bool {
        self.frames = self.frames.saturating_add(1);
        if total.is_zero() || self.frames > MEASURED_FRAMES {
            return false;
        }
        if issue.as_secs_f64() / total.as_secs_f64() <= ISSUE_RATIO_THRESHOLD {
            return false;
        }
        self.sync_frames += 1;
        if self.sync_frames >= SYNC_FRAME_THRESHOLD && !self.tripped {
            self.tripped = true;
            return true;
        }
        false
    }

    /// Forgets every measurement and re-arms the detector.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Frames observed since the last reset.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Frames counted as synchronous since the last reset.
    pub fn sync_frames(&self) -> u32 {
        self.sync_frames
    }

    /// Whether the detector has tripped since the last reset.
    pub fn is_tripped(&self) -> bool {
        self.tripped
    }
}
