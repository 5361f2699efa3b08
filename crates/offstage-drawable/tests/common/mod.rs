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

//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use offstage_core::{LogicalDrawable, NativeDisplay, OffscreenSettings};
use offstage_drawable::{DrawableRuntime, SurfaceManager};
use offstage_infra::SoftwareDisplay;
use offstage_telemetry::InMemoryProbeSink;
use std::sync::Arc;

/// A software display, an in-memory probe sink and a runtime tying them
/// together.
pub struct Fixture {
    pub display: Arc<SoftwareDisplay>,
    pub sink: Arc<InMemoryProbeSink>,
    pub runtime: Arc<DrawableRuntime>,
}

impl Fixture {
    pub fn new(settings: OffscreenSettings) -> Self {
        offstage_telemetry::logging::init_test_logging();
        let sink = Arc::new(InMemoryProbeSink::new());
        let runtime = Arc::new(DrawableRuntime::new(settings, sink.clone()));
        Self {
            display: Arc::new(SoftwareDisplay::new()),
            sink,
            runtime,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(OffscreenSettings::default())
    }

    pub fn native(&self) -> Arc<dyn NativeDisplay> {
        self.display.clone()
    }

    pub fn manager(&self, logical: u64) -> SurfaceManager {
        SurfaceManager::new(self.native(), LogicalDrawable(logical), self.runtime.clone())
            .expect("non-null logical drawable")
    }
}
