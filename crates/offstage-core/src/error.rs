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

//! Defines the error taxonomy for off-screen surfaces and pixel readback.

use std::fmt;

/// A convenient result alias for drawable operations.
pub type DrawableResult<T> = Result<T, DrawableError>;

/// An error raised by a surface, a surface manager, or one of its pixel
/// transfer operations.
///
/// Every failure aborts the current call. Nothing is retried internally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawableError {
    /// Invalid geometry, depth, configuration or buffer size.
    InvalidArgument(String),
    /// A native allocation failed (surface, context, transfer buffer, mapping).
    Resource(String),
    /// An operation was attempted before a surface or context existed.
    Uninitialized(String),
    /// The staged-buffer strategy was requested where the runtime lacks it.
    UnsupportedFeature(String),
    /// Low-level errors accumulated while the named operation ran.
    Device {
        /// The operation tag, e.g. `"Read Pixels"`.
        operation: &'static str,
        /// The raw error codes that were drained from the device.
        codes: Vec<u32>,
    },
}

impl DrawableError {
    /// Shorthand for [`DrawableError::InvalidArgument`].
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        DrawableError::InvalidArgument(msg.into())
    }

    /// Shorthand for [`DrawableError::Resource`].
    pub fn resource(msg: impl Into<String>) -> Self {
        DrawableError::Resource(msg.into())
    }

    /// Returns the operation tag when this is a [`DrawableError::Device`] error.
    pub fn device_operation(&self) -> Option<&'static str> {
        match self {
            DrawableError::Device { operation, .. } => Some(operation),
            _ => None,
        }
    }
}

impl fmt::Display for DrawableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawableError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            DrawableError::Resource(msg) => write!(f, "Resource error: {msg}"),
            DrawableError::Uninitialized(msg) => write!(f, "Not initialized: {msg}"),
            DrawableError::UnsupportedFeature(msg) => write!(f, "Unsupported feature: {msg}"),
            DrawableError::Device { operation, codes } => {
                write!(f, "Could not {operation}")?;
                if !codes.is_empty() {
                    let list = codes
                        .iter()
                        .map(|c| format!("0x{c:04x}"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    write!(f, " (device errors: {list})")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for DrawableError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_error_display_lists_codes() {
        let err = DrawableError::Device {
            operation: "Read Pixels",
            codes: vec![0x0502, 0x0501],
        };
        assert_eq!(
            format!("{err}"),
            "Could not Read Pixels (device errors: 0x0502, 0x0501)"
        );
        assert_eq!(err.device_operation(), Some("Read Pixels"));
    }

    #[test]
    fn plain_errors_have_no_operation_tag() {
        let err = DrawableError::invalid_argument("width must be positive");
        assert_eq!(format!("{err}"), "Invalid argument: width must be positive");
        assert_eq!(err.device_operation(), None);
    }
}
