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

//! Provides the backend-agnostic contract for the native display layer.
//!
//! - [`NativeDisplay`]: the window-system and rendering calls the drawable layer issues.
//! - [`handles`]: opaque identifiers for configurations, drawables, contexts and buffers.
//! - [`format`]: the pixel formats used for transfers.
//!
//! A concrete implementation lives in `offstage-infra`.

mod display;
pub mod format;
pub mod handles;

pub use self::display::NativeDisplay;
pub use self::format::PixelFormat;
pub use self::handles::*;
