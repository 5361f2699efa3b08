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

//! Scoped context binding.

use offstage_core::{
    ContextBindings, ContextId, DrawableError, DrawableResult, GlxDrawable, NativeDisplay,
};

/// Makes a context current for the lifetime of the scope and restores the
/// thread's previous bindings when dropped, including on early returns.
pub struct ContextScope<'a> {
    display: &'a dyn NativeDisplay,
    previous: ContextBindings,
    rebound: bool,
}

impl<'a> ContextScope<'a> {
    /// Binds `context` against `draw` and `read` on the calling thread.
    ///
    /// Nothing is rebound if the requested bindings are already current.
    /// ## Errors
    /// [`DrawableError::Resource`] if the native layer refuses the binding.
    pub fn bind(
        display: &'a dyn NativeDisplay,
        draw: GlxDrawable,
        read: GlxDrawable,
        context: ContextId,
    ) -> DrawableResult<Self> {
        let previous = display.current_bindings();
        let wanted = ContextBindings::new(context, draw, read);
        if previous == wanted {
            return Ok(Self {
                display,
                previous,
                rebound: false,
            });
        }
        if !display.make_current(wanted) {
            return Err(DrawableError::resource(format!(
                "Could not bind context {context:#x} to drawables {draw:#x}/{read:#x}"
            )));
        }
        Ok(Self {
            display,
            previous,
            rebound: true,
        })
    }

    /// The bindings that will be restored on drop.
    pub fn previous(&self) -> ContextBindings {
        self.previous
    }
}

impl Drop for ContextScope<'_> {
    fn drop(&mut self) {
        if !self.rebound {
            return;
        }
        let restore = if self.previous.context.is_some() {
            self.previous
        } else {
            ContextBindings::RELEASED
        };
        if !self.display.make_current(restore) {
            log::warn!(
                "[ContextScope] Failed to restore previous bindings {:?}",
                self.previous
            );
        }
    }
}
