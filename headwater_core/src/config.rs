// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Root coordinator configuration.
//!
//! All configuration is plain `Copy` data with `const` presets. Pick a
//! preset and override individual fields:
//!
//! ```rust
//! use headwater_core::config::RootConfig;
//!
//! let mut config = RootConfig::television();
//! config.input.joystick.repeat_delay = core::time::Duration::from_millis(80);
//! ```

use core::time::Duration;

use kurbo::Size;

use crate::event::KeyCode;

/// Trackball to directional-key translation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackballConfig {
    /// Upper bound on the acceleration multiplier.
    pub max_acceleration: f32,
    /// Nominal time for one unit of movement; faster cadence accelerates.
    pub fast_move_time: Duration,
    /// Milliseconds of cadence difference per unit of acceleration change.
    pub acceleration_scale_ms: f32,
    /// Distance that produces the first key.
    pub first_threshold: f32,
    /// Cumulative distance that produces the second key.
    pub second_threshold: f32,
    /// Distance per key once moving steadily.
    pub steady_threshold: f32,
    /// Acceleration growth per steady-state key.
    pub steady_growth: f32,
    /// Inactivity after which both axes reset.
    pub inactivity_reset: Duration,
}

/// Joystick to directional-key translation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JoystickConfig {
    /// Axis magnitude that enters a direction.
    pub enter_threshold: f32,
    /// Axis magnitude below which a held direction is released.
    pub exit_threshold: f32,
    /// Delay before the first repeat of a held direction.
    pub repeat_timeout: Duration,
    /// Delay between subsequent repeats.
    pub repeat_delay: Duration,
}

/// Touch-navigation pad to directional-key translation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchNavigationConfig {
    /// Physical distance of one key tick, in millimeters.
    pub tick_distance_mm: f32,
    /// Assumed pad width when the device does not report a resolution.
    pub default_pad_width_mm: f32,
    /// Minimum fling velocity, in ticks per second.
    pub min_fling_ticks_per_second: f32,
    /// Velocity cap, in ticks per second.
    pub max_fling_ticks_per_second: f32,
    /// Velocity multiplier applied after each fling tick.
    pub fling_decay: f32,
    /// Samples older than this do not contribute to velocity.
    pub velocity_horizon: Duration,
}

/// Input pipeline configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputConfig {
    /// Trackball translation.
    pub trackball: TrackballConfig,
    /// Joystick translation.
    pub joystick: JoystickConfig,
    /// Touch-navigation translation.
    pub touch_navigation: TouchNavigationConfig,
    /// Key substituted when a key press goes unconsumed.
    pub fallback_keys: &'static [(KeyCode, KeyCode)],
}

/// Standard fallback table: escape and gamepad B act as back, gamepad A
/// acts as select.
pub const DEFAULT_FALLBACK_KEYS: &[(KeyCode, KeyCode)] = &[
    (KeyCode::ESCAPE, KeyCode::BACK),
    (KeyCode::BUTTON_B, KeyCode::BACK),
    (KeyCode::BUTTON_A, KeyCode::DPAD_CENTER),
];

impl InputConfig {
    /// Defaults for hand-held touch devices.
    #[must_use]
    pub const fn handset() -> Self {
        Self {
            trackball: TrackballConfig {
                max_acceleration: 20.0,
                fast_move_time: Duration::from_millis(150),
                acceleration_scale_ms: 40.0,
                first_threshold: 0.5,
                second_threshold: 2.0,
                steady_threshold: 1.0,
                steady_growth: 1.1,
                inactivity_reset: Duration::from_millis(250),
            },
            joystick: JoystickConfig {
                enter_threshold: 0.5,
                exit_threshold: 0.25,
                repeat_timeout: Duration::from_millis(500),
                repeat_delay: Duration::from_millis(50),
            },
            touch_navigation: TouchNavigationConfig {
                tick_distance_mm: 12.0,
                default_pad_width_mm: 48.0,
                min_fling_ticks_per_second: 6.0,
                max_fling_ticks_per_second: 20.0,
                fling_decay: 0.8,
                velocity_horizon: Duration::from_millis(100),
            },
            fallback_keys: DEFAULT_FALLBACK_KEYS,
        }
    }

    /// Defaults for remote-driven displays: slower joystick repeat.
    #[must_use]
    pub const fn television() -> Self {
        let mut config = Self::handset();
        config.joystick.repeat_delay = Duration::from_millis(100);
        config
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self::handset()
    }
}

/// Traversal configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraversalConfig {
    /// Display size used before the window manager reports a frame.
    pub display_size: Size,
    /// First width tried for wrap-content windows.
    pub preferred_wrap_width: f64,
    /// Extra layout passes allowed per frame when layout requests layout.
    ///
    /// Up to two are reasonable. The presets allow one: a request raised
    /// during the first layout gets a second pass in the same frame, and a
    /// request raised during that second pass waits for the next frame.
    pub corrective_layout_passes: u8,
    /// Upper bound on a synchronous draw wait.
    pub draw_wait_timeout: Duration,
}

impl TraversalConfig {
    /// Defaults for hand-held touch devices.
    #[must_use]
    pub const fn handset() -> Self {
        Self {
            display_size: Size::new(1080.0, 2400.0),
            preferred_wrap_width: 720.0,
            corrective_layout_passes: 1,
            draw_wait_timeout: Duration::from_secs(2),
        }
    }

    /// Defaults for remote-driven displays.
    #[must_use]
    pub const fn television() -> Self {
        Self {
            display_size: Size::new(1920.0, 1080.0),
            preferred_wrap_width: 960.0,
            corrective_layout_passes: 1,
            draw_wait_timeout: Duration::from_secs(2),
        }
    }
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self::handset()
    }
}

/// Complete configuration for a [`ViewRoot`](crate::root::ViewRoot).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RootConfig {
    /// Input pipeline.
    pub input: InputConfig,
    /// Traversal.
    pub traversal: TraversalConfig,
    /// Whether the window starts in touch mode.
    pub initial_touch_mode: bool,
    /// Rewrite mouse input as touch input for trees that predate mouse
    /// support. Sources see their original event in the completion.
    pub compat_mouse_as_touch: bool,
}

impl RootConfig {
    /// Hand-held touch device.
    #[must_use]
    pub const fn handset() -> Self {
        Self {
            input: InputConfig::handset(),
            traversal: TraversalConfig::handset(),
            initial_touch_mode: true,
            compat_mouse_as_touch: false,
        }
    }

    /// Remote-driven display: starts out of touch mode.
    #[must_use]
    pub const fn television() -> Self {
        Self {
            input: InputConfig::television(),
            traversal: TraversalConfig::television(),
            initial_touch_mode: false,
            compat_mouse_as_touch: false,
        }
    }
}

impl Default for RootConfig {
    fn default() -> Self {
        Self::handset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_share_thresholds() {
        let h = RootConfig::handset();
        let t = RootConfig::television();
        assert_eq!(h.input.trackball, t.input.trackball);
        let (handset, television) = (h.input.joystick, t.input.joystick);
        assert!(television.repeat_delay > handset.repeat_delay);
        assert!(h.initial_touch_mode && !t.initial_touch_mode);
    }

    #[test]
    fn hysteresis_band_is_ordered() {
        let j = InputConfig::default().joystick;
        assert!(
            j.exit_threshold < j.enter_threshold,
            "exit must sit below enter"
        );
    }
}
