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

//! Throughput profiling for pixel transfers.

use offstage_core::Stopwatch;
use std::time::Duration;

/// The reporting interval used by [`ThroughputProfiler::new`].
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(2);

/// Running totals accumulated by a [`ThroughputProfiler`] since creation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProfilerTotals {
    /// Weighted frame count. A stereo half-frame counts as `0.5`.
    pub frames: f64,
    /// Pixels transferred.
    pub pixels: u64,
    /// Time spent between `start_frame` and `end_frame`.
    pub busy: Duration,
}

/// Measures frames and pixels per second for one named stage and logs a
/// summary line every reporting interval.
///
/// Totals are always accumulated. The periodic log line is only emitted
/// when the profiler is enabled.
#[derive(Debug)]
pub struct ThroughputProfiler {
    name: String,
    enabled: bool,
    interval: Duration,
    window: Stopwatch,
    frame: Option<Stopwatch>,
    window_frames: f64,
    window_pixels: u64,
    window_busy: Duration,
    totals: ProfilerTotals,
}

impl ThroughputProfiler {
    /// Creates a profiler reporting every [`DEFAULT_REPORT_INTERVAL`].
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self::with_interval(name, enabled, DEFAULT_REPORT_INTERVAL)
    }

    /// Creates a profiler with a custom reporting interval.
    pub fn with_interval(name: impl Into<String>, enabled: bool, interval: Duration) -> Self {
        Self {
            name: name.into(),
            enabled,
            interval,
            window: Stopwatch::new(),
            frame: None,
            window_frames: 0.0,
            window_pixels: 0,
            window_busy: Duration::ZERO,
            totals: ProfilerTotals::default(),
        }
    }

    /// Marks the beginning of a frame.
    pub fn start_frame(&mut self) {
        self.frame = Some(Stopwatch::new());
    }

    /// Marks the end of a frame.
    /// ## Arguments
    /// * `pixels` - Pixels processed in this frame.
    /// * `weight` - Fraction of a frame this call represents (`0.5` for one stereo eye).
    /// ## Returns
    /// The summary line if this frame closed a reporting window.
    pub fn end_frame(&mut self, pixels: u64, weight: f64) -> Option<String> {
        let busy = self.frame.take().map(|s| s.elapsed()).unwrap_or_default();

        self.window_frames += weight;
        self.window_pixels += pixels;
        self.window_busy += busy;
        self.totals.frames += weight;
        self.totals.pixels += pixels;
        self.totals.busy += busy;

        let elapsed = self.window.elapsed();
        if elapsed < self.interval {
            return None;
        }

        let secs = elapsed.as_secs_f64().max(f64::EPSILON);
        let line = format!(
            "{:<10}- {:>8.2} Mpixels/sec - {:>8.2} fps - {:>8.2} ms/frame",
            self.name,
            self.window_pixels as f64 / 1_000_000.0 / secs,
            self.window_frames / secs,
            if self.window_frames > 0.0 {
                self.window_busy.as_secs_f64() * 1000.0 / self.window_frames
            } else {
                0.0
            }
        );

        self.window.restart();
        self.window_frames = 0.0;
        self.window_pixels = 0;
        self.window_busy = Duration::ZERO;

        if self.enabled {
            log::info!("{line}");
        }
        Some(line)
    }

    /// Returns the totals accumulated since creation.
    pub fn totals(&self) -> ProfilerTotals {
        self.totals
    }

    /// Returns the profiler's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_frames_count_half() {
        let mut profiler = ThroughputProfiler::with_interval("Readback", false, Duration::from_secs(3600));
        profiler.start_frame();
        assert!(profiler.end_frame(100, 1.0).is_none());
        profiler.start_frame();
        profiler.end_frame(100, 0.5);
        profiler.start_frame();
        profiler.end_frame(100, 0.5);

        let totals = profiler.totals();
        assert_eq!(totals.frames, 2.0);
        assert_eq!(totals.pixels, 300);
    }

    #[test]
    fn reports_when_the_window_elapses() {
        let mut profiler = ThroughputProfiler::with_interval("Readback", false, Duration::ZERO);
        profiler.start_frame();
        let line = profiler.end_frame(2_000_000, 1.0).expect("window should close");
        assert!(line.starts_with("Readback"));
        assert!(line.contains("Mpixels/sec"));
    }
}
