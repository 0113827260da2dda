// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by the root's peers.
//!
//! Neither error ever reaches the root's callers. Session failures are
//! retried on the next frame; surface failures force a relayout and redraw,
//! and under memory pressure may end the process.

use core::fmt;

/// Errors from [`WindowSession`](crate::peer::WindowSession) calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// The window manager is unreachable.
    Disconnected,
    /// The window manager no longer knows this window.
    InvalidWindow,
    /// The window manager refused the request (status code).
    Rejected(i32),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "window session disconnected"),
            Self::InvalidWindow => write!(f, "window is no longer known to the window manager"),
            Self::Rejected(code) => write!(f, "window manager rejected request ({code})"),
        }
    }
}

impl core::error::Error for SessionError {}

/// Errors from [`FrameSink`](crate::peer::FrameSink) calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceError {
    /// The surface went away (for example after a relayout).
    Lost,
    /// Buffers for the frame could not be allocated.
    AllocationFailed,
    /// The system is out of graphics memory.
    OutOfResources,
}

impl SurfaceError {
    /// Returns `true` if the failure indicates system memory pressure.
    #[must_use]
    pub const fn is_memory_pressure(self) -> bool {
        matches!(self, Self::OutOfResources)
    }
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lost => write!(f, "surface lost"),
            Self::AllocationFailed => write!(f, "surface buffer allocation failed"),
            Self::OutOfResources => write!(f, "out of graphics memory"),
        }
    }
}

impl core::error::Error for SurfaceError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display_includes_status() {
        assert_eq!(
            SessionError::Rejected(-3).to_string(),
            "window manager rejected request (-3)"
        );
        assert!(SurfaceError::OutOfResources.is_memory_pressure());
        assert!(!SurfaceError::Lost.is_memory_pressure());
    }
}
