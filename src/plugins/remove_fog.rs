//! Fog removal for shader sources

use anyhow::Result;
use regex::Regex;

use super::{changed, PatchPlugin};
use crate::settings::SettingsSnapshot;

/// Forces every fog factor assignment in the shaders to zero
pub struct RemoveFog {
    fog_assignment: Regex,
}

impl RemoveFog {
    pub fn create() -> Result<Box<dyn PatchPlugin>> {
        Ok(Box::new(Self {
            fog_assignment: Regex::new(r"(?m)^(\s*(?:float\s+)?fog_?(?:amount|factor|Amount|Factor)\s*=\s*)[^;]+;")?,
        }))
    }
}

impl PatchPlugin for RemoveFog {
    fn name(&self) -> &'static str {
        "RemoveFog"
    }

    fn should_patch(&mut self, settings: &SettingsSnapshot) -> bool {
        settings.flag("removeFog")
    }

    fn directories_to_patch(&self) -> Vec<String> {
        vec!["shaders".to_string()]
    }

    fn extension(&self) -> &str {
        "*.hlsl"
    }

    fn patch_file(&self, text: &str) -> Option<String> {
        let patched = self.fog_assignment.replace_all(text, "${1}0.0;");
        changed(text, patched.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroes_fog() {
        let plugin = RemoveFog::create().unwrap();
        let text = "float4 main() {\n    float fog_amount = saturate(depth * fog_density);\n    fogFactor = exp(-d);\n}\n";
        let patched = plugin.patch_file(text).unwrap();
        assert!(patched.contains("float fog_amount = 0.0;"));
        assert!(patched.contains("fogFactor = 0.0;"));
    }

    #[test]
    fn test_idempotent() {
        let plugin = RemoveFog::create().unwrap();
        let once = plugin.patch_file("float fog_factor = d * k;\n").unwrap();
        assert_eq!(plugin.patch_file(&once), None);
    }

    #[test]
    fn test_enabled_by_flag() {
        let mut plugin = RemoveFog::create().unwrap();
        assert!(!plugin.should_patch(&SettingsSnapshot::default()));
        assert!(plugin.should_patch(&SettingsSnapshot::default().with_flag("removeFog", true)));
    }
}
