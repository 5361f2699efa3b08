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

use super::{ProbeKey, ProbeResult, ProbeSink};
use std::sync::Mutex;

/// Publishes probe values as process environment variables, for harnesses
/// that inspect the process from outside.
///
/// Writes are serialized through an internal lock, which does not cover
/// readers elsewhere in the process. Setting variables while other threads
/// read the environment is unsound on some platforms (glibc `getenv` is not
/// synchronized with `setenv`), so only use this sink in harnesses that
/// read back from a single thread. Multi-threaded processes should publish
/// to an [`InMemoryProbeSink`](super::InMemoryProbeSink) instead.
#[derive(Debug, Default)]
pub struct EnvProbeSink {
    write_lock: Mutex<()>,
}

impl EnvProbeSink {
    /// Creates a new environment sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProbeSink for EnvProbeSink {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn publish(&self, key: ProbeKey, value: i64) -> ProbeResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::env::set_var(key.variable_name(), value.to_string());
        Ok(())
    }

    fn value(&self, key: &ProbeKey) -> Option<i64> {
        std::env::var(key.variable_name()).ok()?.parse().ok()
    }
}
