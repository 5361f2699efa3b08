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

//! An in-memory display.
//!
//! Pixels are stored as RGBA8 [`Texel`]s with the origin at the bottom-left
//! corner. Contexts carry the subset of fixed-function state the drawable
//! layer touches, and bindings are tracked per thread. Failures can be
//! injected with [`Fault`] and every resource operation is appended to an
//! event log so tests can check ordering.

mod config;
mod context;
mod display;
mod events;
mod storage;

pub use config::ConfigDescriptor;
pub use display::SoftwareDisplay;
pub use events::{Fault, NativeEvent};
pub use storage::Texel;

/// Extension advertised by default for staged readback support.
pub const PIXEL_BUFFER_OBJECT_EXTENSION: &str = "GL_ARB_pixel_buffer_object";
