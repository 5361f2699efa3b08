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

//! Concrete implementations of the [`NativeDisplay`](offstage_core::NativeDisplay)
//! contract.
//!
//! The `software` backend keeps every drawable, context and buffer in host
//! memory. It is used by the test suites and the sandbox, and it is the
//! reference for how the drawable layer expects a display to behave.

#![warn(missing_docs)]

#[cfg(feature = "software")]
pub mod software;

#[cfg(feature = "software")]
pub use software::{ConfigDescriptor, Fault, NativeEvent, SoftwareDisplay, Texel};
