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

//! # Offstage Drawable
//!
//! Off-screen surfaces standing in for client drawables, and the machinery
//! that gets pixels out of them.
//!
//! A [`SurfaceManager`] owns at most one [`OffscreenSurface`] and one
//! rendering context per logical drawable. It reallocates the surface when
//! the requested geometry or configuration changes, reads pixels back with
//! a synchronous or staged strategy chosen by the process-wide
//! [`StrategySelector`], and copies rows into other drawables. Everything
//! is driven through the [`NativeDisplay`](offstage_core::NativeDisplay)
//! contract.

#![warn(missing_docs)]

mod blit;
pub mod context_scope;
pub mod manager;
pub mod readback;
pub mod runtime;
pub mod surface;

pub use context_scope::ContextScope;
pub use manager::{ConfigureOutcome, DirectRendering, SurfaceManager};
pub use readback::{
    pack_alignment, CalibrationTrip, CalibrationWindow, ForceAlphaHint, FrameProbe,
    ReadbackRequest, StrategySelector,
};
pub use runtime::DrawableRuntime;
pub use surface::{OffscreenSurface, SurfaceInfo};
