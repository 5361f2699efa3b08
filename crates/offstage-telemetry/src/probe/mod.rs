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

//! The test-probe side channel.
//!
//! When automatic testing is enabled, every readback publishes a small set
//! of decimal integers keyed by the logical drawable and a channel tag. A
//! verification harness reads them back to check what was rendered without
//! inspecting the pixels itself.

mod env_sink;
mod memory_sink;

pub use env_sink::EnvProbeSink;
pub use memory_sink::InMemoryProbeSink;

use offstage_core::LogicalDrawable;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// The category of a published probe value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProbeChannel {
    /// The flat color of the last left-eye (or mono) frame, or `-1`.
    Color,
    /// The flat color of the last right-eye frame, or `-1`.
    RightEyeColor,
    /// The number of non-right-eye frames read back so far.
    FrameCount,
}

impl ProbeChannel {
    /// The tag used when the channel is rendered as a variable name.
    pub const fn tag(&self) -> &'static str {
        match self {
            ProbeChannel::Color => "CLR",
            ProbeChannel::RightEyeColor => "RCLR",
            ProbeChannel::FrameCount => "FRAME",
        }
    }
}

/// Identifies one published value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProbeKey {
    /// Numeric identity of the logical drawable.
    pub drawable: u64,
    /// The value's category.
    pub channel: ProbeChannel,
}

impl ProbeKey {
    /// Creates a key for `drawable` and `channel`.
    pub fn new(drawable: LogicalDrawable, channel: ProbeChannel) -> Self {
        Self {
            drawable: drawable.0,
            channel,
        }
    }

    /// Renders the key as `OFFSTAGE_AUTOTEST_<TAG><hex drawable>`.
    pub fn variable_name(&self) -> String {
        format!("OFFSTAGE_AUTOTEST_{}{:x}", self.channel.tag(), self.drawable)
    }
}

impl fmt::Display for ProbeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.variable_name())
    }
}

/// An error raised by a probe sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The sink's storage could not be accessed.
    StorageError(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::StorageError(msg) => write!(f, "Probe storage error: {msg}"),
        }
    }
}

impl std::error::Error for ProbeError {}

/// Result alias for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Trait defining where probe values are published.
pub trait ProbeSink: Send + Sync + Debug + 'static {
    /// Get a reference to this object as Any for downcasting
    fn as_any(&self) -> &dyn std::any::Any;

    /// Publishes `value` under `key`, replacing any previous value.
    fn publish(&self, key: ProbeKey, value: i64) -> ProbeResult<()>;

    /// Reads back the last value published under `key`.
    fn value(&self, key: &ProbeKey) -> Option<i64>;
}
