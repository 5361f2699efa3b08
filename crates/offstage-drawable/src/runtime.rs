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

//! Process-scope state shared by every surface manager.

use crate::readback::StrategySelector;
use offstage_core::{OffscreenSettings, SettingsError};
use offstage_telemetry::{EnvProbeSink, ProbeSink};
use std::sync::Arc;

/// The settings, strategy selector and probe sink of a process.
///
/// Create one and share it through an `Arc` with every
/// [`SurfaceManager`](crate::SurfaceManager).
#[derive(Debug)]
pub struct DrawableRuntime {
    settings: OffscreenSettings,
    selector: StrategySelector,
    probe: Arc<dyn ProbeSink>,
}

impl DrawableRuntime {
    /// Creates a runtime from explicit settings and a probe sink.
    pub fn new(settings: OffscreenSettings, probe: Arc<dyn ProbeSink>) -> Self {
        let selector = StrategySelector::new(&settings);
        log::debug!(
            "Drawable runtime created: readback={:?}, backing={:?}, autotest={}",
            settings.readback,
            settings.backing,
            settings.autotest
        );
        Self {
            settings,
            selector,
            probe,
        }
    }

    /// Creates a runtime from the `OFFSTAGE_*` environment variables,
    /// publishing probe values back into the environment.
    ///
    /// The probe writes environment variables from whichever thread reads
    /// back, which is only sound when no other thread touches the
    /// environment. With `autotest` on in a multi-threaded process, use
    /// [`DrawableRuntime::new`] with an in-memory sink.
    pub fn from_env() -> Result<Self, SettingsError> {
        let settings = OffscreenSettings::from_env()?;
        Ok(Self::new(settings, Arc::new(EnvProbeSink::new())))
    }

    /// The settings every manager reads.
    pub fn settings(&self) -> &OffscreenSettings {
        &self.settings
    }

    /// The shared readback strategy selector.
    pub fn selector(&self) -> &StrategySelector {
        &self.selector
    }

    /// The sink test-probe values go to.
    pub fn probe(&self) -> &dyn ProbeSink {
        self.probe.as_ref()
    }
}
