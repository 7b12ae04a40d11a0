//! Camera zoom-out
//!
//! The character object template sets up the camera with
//! `CreateCameraZoomNode( distance, height, speed );`. Scaling the first two
//! arguments pulls the camera back.

use anyhow::Result;
use regex::{Captures, Regex};

use super::{changed, PatchPlugin};
use crate::settings::SettingsSnapshot;

const CHARACTER_OT: &str = "metadata/characters/character.ot";

/// Multiplies the camera zoom distance by the `zoomLevel` setting
pub struct CameraZoom {
    zoom_node: Regex,
    multiplier: f32,
}

impl CameraZoom {
    pub fn create() -> Result<Box<dyn PatchPlugin>> {
        Ok(Box::new(Self {
            zoom_node: Regex::new(
                r"CreateCameraZoomNode\(\s*([0-9]+(?:\.[0-9]+)?)f?\s*,\s*([0-9]+(?:\.[0-9]+)?)f?\s*,",
            )?,
            multiplier: 1.0,
        }))
    }
}

fn scale(raw: &str, multiplier: f32) -> String {
    let value: f32 = raw.parse().unwrap_or(0.0);
    format!("{:.1}f", value * multiplier)
}

impl PatchPlugin for CameraZoom {
    fn name(&self) -> &'static str {
        "CameraZoom"
    }

    fn should_patch(&mut self, settings: &SettingsSnapshot) -> bool {
        // Values below 1 would zoom in; treat them (and an absent key) as 1
        self.multiplier = settings.value("zoomLevel").max(1.0);
        settings.flag("cameraZoom")
    }

    fn files_to_patch(&self) -> Vec<String> {
        vec![CHARACTER_OT.to_string()]
    }

    fn patch_file(&self, text: &str) -> Option<String> {
        if self.multiplier <= 1.0 {
            return None;
        }
        let patched = self.zoom_node.replace_all(text, |caps: &Captures| {
            format!(
                "CreateCameraZoomNode( {}, {},",
                scale(&caps[1], self.multiplier),
                scale(&caps[2], self.multiplier)
            )
        });
        changed(text, patched.into_owned())
    }
}
