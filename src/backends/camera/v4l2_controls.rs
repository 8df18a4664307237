// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 control interface
//!
//! Raw ioctl helpers to query and set the zoom and flash controls of a
//! `/dev/video*` node, and to tell capture nodes apart from metadata nodes.

use crate::backends::camera::types::ZoomRange;
use std::fs::File;
use std::os::unix::io::AsRawFd;
use tracing::{debug, warn};

// ===== V4L2 Control Class Bases =====
const V4L2_CTRL_CLASS_CAMERA: u32 = 0x009a0000;
const V4L2_CTRL_CLASS_FLASH: u32 = 0x009c0000;

const V4L2_CID_CAMERA_CLASS_BASE: u32 = V4L2_CTRL_CLASS_CAMERA | 0x900;
const V4L2_CID_FLASH_CLASS_BASE: u32 = V4L2_CTRL_CLASS_FLASH | 0x900;

/// Absolute optical zoom position
pub const V4L2_CID_ZOOM_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 13;
/// Flash LED mode: none, flash or torch
pub const V4L2_CID_FLASH_LED_MODE: u32 = V4L2_CID_FLASH_CLASS_BASE + 1;

pub const V4L2_FLASH_LED_MODE_NONE: i32 = 0;
pub const V4L2_FLASH_LED_MODE_TORCH: i32 = 2;

const V4L2_CTRL_TYPE_INTEGER: u32 = 1;
const V4L2_CTRL_TYPE_BOOLEAN: u32 = 2;
const V4L2_CTRL_TYPE_MENU: u32 = 3;

const V4L2_CTRL_FLAG_DISABLED: u32 = 0x0001;

const V4L2_CAP_VIDEO_CAPTURE: u32 = 0x0000_0001;
const V4L2_CAP_DEVICE_CAPS: u32 = 0x8000_0000;

// ===== V4L2 ioctl Numbers =====
// (dir << 30) | (size << 16) | ('V' << 8) | nr

/// v4l2_control: 8 bytes
const VIDIOC_G_CTRL: libc::c_ulong = 0xC008561B;
const VIDIOC_S_CTRL: libc::c_ulong = 0xC008561C;
/// v4l2_queryctrl: 68 bytes
const VIDIOC_QUERYCTRL: libc::c_ulong = 0xC0445624;
/// v4l2_capability: 104 bytes
const VIDIOC_QUERYCAP: libc::c_ulong = 0x80685600;

#[repr(C)]
struct V4l2Control {
    id: u32,
    value: i32,
}

#[repr(C)]
struct V4l2Queryctrl {
    id: u32,
    ctrl_type: u32,
    name: [u8; 32],
    minimum: i32,
    maximum: i32,
    step: i32,
    default_value: i32,
    flags: u32,
    reserved: [u32; 2],
}

#[repr(C)]
struct V4l2Capability {
    driver: [u8; 16],
    card: [u8; 32],
    bus_info: [u8; 32],
    version: u32,
    capabilities: u32,
    device_caps: u32,
    reserved: [u32; 3],
}

/// Information about a V4L2 control
#[derive(Debug, Clone)]
pub struct ControlInfo {
    pub id: u32,
    pub name: String,
    pub ctrl_type: ControlType,
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default_value: i32,
    pub flags: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    Integer,
    Boolean,
    Menu,
    Unknown(u32),
}

impl From<u32> for ControlType {
    fn from(value: u32) -> Self {
        match value {
            V4L2_CTRL_TYPE_INTEGER => ControlType::Integer,
            V4L2_CTRL_TYPE_BOOLEAN => ControlType::Boolean,
            V4L2_CTRL_TYPE_MENU => ControlType::Menu,
            other => ControlType::Unknown(other),
        }
    }
}

impl ControlInfo {
    pub fn is_disabled(&self) -> bool {
        self.flags & V4L2_CTRL_FLAG_DISABLED != 0
    }

    /// Zoom bounds expressed as a track range
    pub fn as_zoom_range(&self) -> Option<ZoomRange> {
        if self.is_disabled() || self.maximum <= self.minimum {
            return None;
        }
        Some(ZoomRange::new(
            self.minimum as f64,
            self.maximum as f64,
            (self.step > 0).then_some(self.step as f64),
        ))
    }
}

fn extract_name(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&c| c == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).to_string()
}

/// Query if a control exists and get its information
pub fn query_control(device_path: &str, control_id: u32) -> Option<ControlInfo> {
    let file = File::open(device_path).ok()?;
    let fd = file.as_raw_fd();

    let mut qctrl = V4l2Queryctrl {
        id: control_id,
        ctrl_type: 0,
        name: [0; 32],
        minimum: 0,
        maximum: 0,
        step: 0,
        default_value: 0,
        flags: 0,
        reserved: [0; 2],
    };

    let result =
        unsafe { libc::ioctl(fd, VIDIOC_QUERYCTRL as _, &mut qctrl as *mut V4l2Queryctrl) };
    if result < 0 {
        return None;
    }

    Some(ControlInfo {
        id: qctrl.id,
        name: extract_name(&qctrl.name),
        ctrl_type: qctrl.ctrl_type.into(),
        minimum: qctrl.minimum,
        maximum: qctrl.maximum,
        step: qctrl.step,
        default_value: qctrl.default_value,
        flags: qctrl.flags,
    })
}

/// Get current value of a control
pub fn get_control(device_path: &str, control_id: u32) -> Option<i32> {
    let file = File::open(device_path).ok()?;
    let mut ctrl = V4l2Control {
        id: control_id,
        value: 0,
    };

    let result =
        unsafe { libc::ioctl(file.as_raw_fd(), VIDIOC_G_CTRL as _, &mut ctrl as *mut V4l2Control) };
    if result < 0 {
        debug!(device_path, control_id, "Failed to get V4L2 control");
        return None;
    }
    Some(ctrl.value)
}

/// Set value of a control
pub fn set_control(device_path: &str, control_id: u32, value: i32) -> Result<(), String> {
    let file = File::open(device_path).map_err(|e| format!("Failed to open device: {}", e))?;
    let mut ctrl = V4l2Control {
        id: control_id,
        value,
    };

    let result =
        unsafe { libc::ioctl(file.as_raw_fd(), VIDIOC_S_CTRL as _, &mut ctrl as *mut V4l2Control) };
    if result < 0 {
        let errno = std::io::Error::last_os_error();
        warn!(device_path, control_id, value, ?errno, "Failed to set V4L2 control");
        return Err(format!("Failed to set control: {}", errno));
    }

    if ctrl.value != value {
        debug!(
            device_path,
            control_id,
            requested = value,
            actual = ctrl.value,
            "V4L2 control value was clamped"
        );
    }
    Ok(())
}

/// Check if a control is available on the device
pub fn has_control(device_path: &str, control_id: u32) -> bool {
    query_control(device_path, control_id).is_some_and(|info| !info.is_disabled())
}

/// Card name and whether the node captures video
///
/// UVC cameras expose a second metadata node per camera; only nodes whose
/// device caps include video capture are cameras.
pub fn query_capture_caps(device_path: &str) -> Option<(String, bool)> {
    let file = File::open(device_path).ok()?;
    let mut cap: V4l2Capability = unsafe { std::mem::zeroed() };
    let result = unsafe {
        libc::ioctl(
            file.as_raw_fd(),
            VIDIOC_QUERYCAP as _,
            &mut cap as *mut V4l2Capability,
        )
    };
    if result < 0 {
        return None;
    }

    let caps = if cap.capabilities & V4L2_CAP_DEVICE_CAPS != 0 {
        cap.device_caps
    } else {
        cap.capabilities
    };
    Some((extract_name(&cap.card), caps & V4L2_CAP_VIDEO_CAPTURE != 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_id_values() {
        assert_eq!(V4L2_CID_ZOOM_ABSOLUTE, 0x009a090d);
        assert_eq!(V4L2_CID_FLASH_LED_MODE, 0x009c0901);
    }

    #[test]
    fn test_control_type_conversion() {
        assert_eq!(ControlType::from(1), ControlType::Integer);
        assert_eq!(ControlType::from(3), ControlType::Menu);
        assert_eq!(ControlType::from(99), ControlType::Unknown(99));
    }

    #[test]
    fn test_zoom_range_from_control() {
        let info = ControlInfo {
            id: V4L2_CID_ZOOM_ABSOLUTE,
            name: "Zoom, Absolute".to_string(),
            ctrl_type: ControlType::Integer,
            minimum: 100,
            maximum: 500,
            step: 1,
            default_value: 100,
            flags: 0,
        };
        assert_eq!(info.as_zoom_range(), Some(ZoomRange::new(100.0, 500.0, Some(1.0))));

        let disabled = ControlInfo {
            flags: V4L2_CTRL_FLAG_DISABLED,
            ..info
        };
        assert_eq!(disabled.as_zoom_range(), None);
    }

    #[test]
    fn test_extract_name_stops_at_nul() {
        assert_eq!(extract_name(b"UVC Camera\0\0garbage"), "UVC Camera");
    }

    #[test]
    fn test_missing_device_has_no_controls() {
        assert!(!has_control("/nonexistent/video0", V4L2_CID_ZOOM_ABSOLUTE));
        assert!(query_capture_caps("/nonexistent/video0").is_none());
    }
}
