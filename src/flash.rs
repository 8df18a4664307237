// SPDX-License-Identifier: GPL-3.0-only

//! Torch LEDs via Linux sysfs
//!
//! Phones and some laptops expose the camera flash as `/sys/class/leds/*:flash`
//! instead of a V4L2 control. Writing the `brightness` file drives the LED
//! in torch mode.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const LEDS_DIR: &str = "/sys/class/leds";

/// A flash LED discovered via sysfs
#[derive(Debug, Clone)]
pub struct FlashDevice {
    /// e.g. `/sys/class/leds/white:flash`
    path: PathBuf,
    max_brightness: u32,
    name: String,
}

impl FlashDevice {
    /// Writable `*:flash` LEDs on this system
    pub fn discover() -> Vec<FlashDevice> {
        Self::discover_in(Path::new(LEDS_DIR))
    }

    /// Writable `*:flash` LEDs under `leds_dir`, sorted by name
    pub fn discover_in(leds_dir: &Path) -> Vec<FlashDevice> {
        let Ok(entries) = std::fs::read_dir(leds_dir) else {
            warn!(
                dir = %leds_dir.display(),
                "Cannot read LED class directory, torch discovery skipped"
            );
            return Vec::new();
        };

        let mut devices: Vec<FlashDevice> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                if !name.ends_with(":flash") {
                    return None;
                }
                Self::probe(entry.path(), name)
            })
            .collect();

        devices.sort_by(|a, b| a.name.cmp(&b.name));
        devices
    }

    fn probe(led_path: PathBuf, name: String) -> Option<FlashDevice> {
        let max_path = led_path.join("max_brightness");
        let max_brightness = match std::fs::read_to_string(&max_path) {
            Ok(s) => match s.trim().parse::<u32>() {
                Ok(v) if v > 0 => v,
                _ => {
                    warn!(path = %max_path.display(), "Invalid max_brightness value");
                    return None;
                }
            },
            Err(e) => {
                warn!(path = %max_path.display(), error = %e, "Cannot read max_brightness");
                return None;
            }
        };

        let brightness_path = led_path.join("brightness");
        if let Err(e) = std::fs::OpenOptions::new().write(true).open(&brightness_path) {
            warn!(
                path = %brightness_path.display(),
                error = %e,
                "Flash LED found but brightness is not writable"
            );
            return None;
        }

        info!(name = %name, max_brightness, "Discovered flash LED");
        Some(FlashDevice {
            path: led_path,
            max_brightness,
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set raw brightness (0 = off), clamped to the LED's maximum
    pub fn set_brightness(&self, value: u32) -> io::Result<()> {
        std::fs::write(
            self.path.join("brightness"),
            value.min(self.max_brightness).to_string(),
        )
    }

    pub fn off(&self) -> io::Result<()> {
        self.set_brightness(0)
    }

    /// Turn on at a fraction of max brightness
    pub fn torch(&self, intensity: f32) -> io::Result<()> {
        let value = (intensity.clamp(0.0, 1.0) * self.max_brightness as f32).round() as u32;
        self.set_brightness(value)
    }
}

/// Switch every LED on at full brightness or off; the first failure is returned
pub fn set_all(devices: &[FlashDevice], on: bool) -> io::Result<()> {
    let mut first_error = None;
    for dev in devices {
        let result = if on { dev.torch(1.0) } else { dev.off() };
        if let Err(e) = result {
            warn!(device = %dev.name, error = %e, on, "Failed to switch flash LED");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}
