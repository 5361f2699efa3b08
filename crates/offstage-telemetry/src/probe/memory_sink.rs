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

use super::{ProbeError, ProbeKey, ProbeResult, ProbeSink};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-process probe sink backed by `RwLock<BTreeMap>`.
///
/// Keys are kept ordered so snapshots are stable.
#[derive(Debug, Default)]
pub struct InMemoryProbeSink {
    storage: RwLock<BTreeMap<ProbeKey, i64>>,
}

impl InMemoryProbeSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every published value, ordered by key.
    pub fn snapshot(&self) -> Vec<(ProbeKey, i64)> {
        match self.storage.read() {
            Ok(storage) => storage.iter().map(|(k, v)| (*k, *v)).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Serializes the current values as a JSON object keyed by variable name.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .snapshot()
            .into_iter()
            .map(|(key, value)| (key.variable_name(), serde_json::Value::from(value)))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }

    /// Number of distinct keys published so far.
    pub fn len(&self) -> usize {
        self.storage.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Returns `true` if nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProbeSink for InMemoryProbeSink {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn publish(&self, key: ProbeKey, value: i64) -> ProbeResult<()> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| ProbeError::StorageError("Failed to acquire write lock".to_string()))?;
        storage.insert(key, value);
        Ok(())
    }

    fn value(&self, key: &ProbeKey) -> Option<i64> {
        self.storage.read().ok()?.get(key).copied()
    }
}
