// Copyright 2026 the Headwater Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input device registry.
//!
//! The host registers the devices it knows about so translators can
//! normalize their input. Today that means the touch-navigation translator,
//! which sizes its key tick from the pad's physical resolution.

use hashbrown::HashMap;

use crate::event::DeviceId;

/// Reported range of one device axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionRange {
    /// Smallest reported value.
    pub min: f32,
    /// Largest reported value.
    pub max: f32,
    /// Units per millimeter, or zero if unknown.
    pub resolution: f32,
}

impl MotionRange {
    /// Extent of the range.
    #[must_use]
    pub fn extent(&self) -> f32 {
        self.max - self.min
    }
}

/// What the host knows about an input device.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputDeviceInfo {
    /// Device id.
    pub id: DeviceId,
    /// Horizontal axis range.
    pub x: Option<MotionRange>,
    /// Vertical axis range.
    pub y: Option<MotionRange>,
}

/// Devices registered with a root.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<DeviceId, InputDeviceInfo>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a device.
    pub fn register(&mut self, info: InputDeviceInfo) {
        self.devices.insert(info.id, info);
    }

    /// Removes a device.
    pub fn unregister(&mut self, id: DeviceId) -> Option<InputDeviceInfo> {
        self.devices.remove(&id)
    }

    /// Looks up a device.
    #[must_use]
    pub fn get(&self, id: DeviceId) -> Option<&InputDeviceInfo> {
        self.devices.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_replaces() {
        let mut reg = DeviceRegistry::new();
        let mut info = InputDeviceInfo {
            id: DeviceId(3),
            x: None,
            y: None,
        };
        reg.register(info);
        info.x = Some(MotionRange {
            min: 0.0,
            max: 960.0,
            resolution: 0.0,
        });
        reg.register(info);
        let extent = reg.get(DeviceId(3)).and_then(|d| d.x).map(|r| r.extent());
        assert_eq!(extent, Some(960.0));
        assert!(reg.unregister(DeviceId(3)).is_some());
        assert!(reg.get(DeviceId(3)).is_none());
    }
}
