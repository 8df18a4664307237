// SPDX-License-Identifier: GPL-3.0-only

//! Video input discovery and default camera selection

use super::MediaPlatform;
use super::types::{DeviceDescriptor, DeviceKind};
use tracing::{debug, info, warn};

/// Label fragments that mark a rear-facing camera
const REAR_FACING_HINTS: [&str; 3] = ["back", "rear", "environment"];

/// List the platform's video inputs in platform order
///
/// A platform that refuses enumeration yields an empty list.
pub fn list_video_inputs(platform: &dyn MediaPlatform) -> Vec<DeviceDescriptor> {
    let raw = match platform.enumerate_devices() {
        Ok(raw) => raw,
        Err(e) => {
            warn!(backend = %platform.backend_type(), error = %e, "Device enumeration failed");
            return Vec::new();
        }
    };

    let devices: Vec<DeviceDescriptor> = raw
        .into_iter()
        .filter(|device| device.kind == DeviceKind::VideoInput)
        .map(|device| DeviceDescriptor {
            id: device.id,
            label: device.label,
        })
        .collect();

    info!(count = devices.len(), "Enumerated video inputs");
    for device in &devices {
        debug!(id = %device.id, label = %device.label, "Video input");
    }
    devices
}

/// Whether a device label suggests a rear-facing camera
pub fn is_rear_facing(label: &str) -> bool {
    let label = label.to_lowercase();
    REAR_FACING_HINTS.iter().any(|hint| label.contains(hint))
}

/// Index of the first rear-facing device, or 0
pub fn default_device_index(devices: &[DeviceDescriptor]) -> usize {
    devices
        .iter()
        .position(|device| is_rear_facing(&device.label))
        .unwrap_or(0)
}

/// Enumerated devices plus the currently selected index
#[derive(Debug, Clone, Default)]
pub struct DeviceList {
    devices: Vec<DeviceDescriptor>,
    current: usize,
}

impl DeviceList {
    /// Build a list positioned at the default device
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        let current = default_device_index(&devices);
        Self { devices, current }
    }

    /// Position at the device with this id, if it is listed
    pub fn select(&mut self, id: &str) -> bool {
        match self.devices.iter().position(|device| device.id == id) {
            Some(index) => {
                self.current = index;
                true
            }
            None => false,
        }
    }

    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&DeviceDescriptor> {
        self.devices.get(self.current)
    }

    /// Switching only makes sense with more than one camera
    pub fn can_switch(&self) -> bool {
        self.devices.len() > 1
    }

    /// Move to the next device, wrapping around
    pub fn advance(&mut self) -> Option<&DeviceDescriptor> {
        if self.devices.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.devices.len();
        self.devices.get(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, label: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            id: id.to_string(),
            label: label.to_string(),
        }
    }

    #[test]
    fn test_rear_hints_case_insensitive() {
        assert!(is_rear_facing("Back Camera"));
        assert!(is_rear_facing("camera2 1, facing REAR"));
        assert!(is_rear_facing("Environment"));
        assert!(!is_rear_facing("Integrated Webcam"));
        assert!(!is_rear_facing(""));
    }

    #[test]
    fn test_default_index_prefers_first_rear() {
        let devices = vec![
            device("a", "Front Camera"),
            device("b", "Rear Wide"),
            device("c", "Back Tele"),
        ];
        assert_eq!(default_device_index(&devices), 1);
    }

    #[test]
    fn test_default_index_falls_back_to_first() {
        let devices = vec![device("a", "USB Cam"), device("b", "")];
        assert_eq!(default_device_index(&devices), 0);
        assert_eq!(default_device_index(&[]), 0);
    }

    #[test]
    fn test_advance_wraps() {
        let mut list = DeviceList::new(vec![device("a", "Front"), device("b", "Back")]);
        assert_eq!(list.current_index(), 1);
        assert_eq!(list.advance().map(|d| d.id.as_str()), Some("a"));
        assert_eq!(list.advance().map(|d| d.id.as_str()), Some("b"));
    }

    #[test]
    fn test_single_device_cannot_switch() {
        let list = DeviceList::new(vec![device("a", "Only")]);
        assert!(!list.can_switch());
        assert!(!DeviceList::default().can_switch());
        assert!(DeviceList::default().current().is_none());
    }

    #[test]
    fn test_select_by_id() {
        let mut list = DeviceList::new(vec![device("a", "Front"), device("b", "Side")]);
        assert!(list.select("b"));
        assert_eq!(list.current_index(), 1);
        assert!(!list.select("missing"));
        assert_eq!(list.current_index(), 1);
    }
}
