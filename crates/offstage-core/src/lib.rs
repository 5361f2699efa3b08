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

//! # Offstage Core
//!
//! Foundational crate containing the native display contract, the handle and
//! pixel-format vocabulary shared by every other crate, the error taxonomy and
//! the read-only process settings.
//!
//! This crate defines the 'what'. The surface bookkeeping and readback logic
//! live in `offstage-drawable`, and a concrete implementation of
//! [`NativeDisplay`] lives in `offstage-infra`.

#![warn(missing_docs)]

pub mod error;
pub mod native;
pub mod settings;
pub mod utils;

pub use error::{DrawableError, DrawableResult};
pub use native::*;
pub use settings::{OffscreenSettings, ReadbackStrategy, SettingsError, SurfaceBacking};
pub use utils::timer::Stopwatch;
