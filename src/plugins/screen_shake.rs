//! Screen shake removal

use anyhow::Result;
use regex::Regex;

use super::{changed, PatchPlugin};
use crate::settings::SettingsSnapshot;

const CHARACTER_OT: &str = "metadata/characters/character.ot";

/// Zeroes every `camera_shake*` intensity in the character template
pub struct ScreenShake {
    shake: Regex,
}

impl ScreenShake {
    pub fn create() -> Result<Box<dyn PatchPlugin>> {
        Ok(Box::new(Self {
            shake: Regex::new(r"(?m)^(\s*camera_shake\w*\s*=\s*)[0-9]+(?:\.[0-9]+)?")?,
        }))
    }
}

impl PatchPlugin for ScreenShake {
    fn name(&self) -> &'static str {
        "ScreenShake"
    }

    fn should_patch(&mut self, settings: &SettingsSnapshot) -> bool {
        settings.flag("disableScreenShake")
    }

    fn files_to_patch(&self) -> Vec<String> {
        vec![CHARACTER_OT.to_string()]
    }

    fn patch_file(&self, text: &str) -> Option<String> {
        let patched = self.shake.replace_all(text, "${1}0");
        changed(text, patched.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroes_intensity() {
        let plugin = ScreenShake::create().unwrap();
        let text = "Camera\n{\n\tcamera_shake_intensity = 1.5\n\tcamera_shake_duration = 300\n}\n";
        let patched = plugin.patch_file(text).unwrap();
        assert!(patched.contains("camera_shake_intensity = 0\n"));
        assert!(patched.contains("camera_shake_duration = 0\n"));
    }

    #[test]
    fn test_already_zero_is_no_change() {
        let plugin = ScreenShake::create().unwrap();
        assert_eq!(plugin.patch_file("camera_shake_intensity = 0\n"), None);
    }
}
