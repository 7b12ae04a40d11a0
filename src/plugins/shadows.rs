//! Shadow disabling for shader sources

use anyhow::Result;
use regex::Regex;

use super::{changed, PatchPlugin};
use crate::settings::SettingsSnapshot;

/// Replaces shadow map lookups with "fully lit"
pub struct DisableShadows {
    shadow_call: Regex,
}

impl DisableShadows {
    pub fn create() -> Result<Box<dyn PatchPlugin>> {
        Ok(Box::new(Self {
            shadow_call: Regex::new(r"\b(?:Calculate|Sample)(?:Cascaded)?Shadows?\s*\([^;]*\)")?,
        }))
    }
}

impl PatchPlugin for DisableShadows {
    fn name(&self) -> &'static str {
        "DisableShadows"
    }

    fn should_patch(&mut self, settings: &SettingsSnapshot) -> bool {
        settings.flag("disableShadows")
    }

    fn directories_to_patch(&self) -> Vec<String> {
        vec!["shaders".to_string()]
    }

    fn extension(&self) -> &str {
        "*.hlsl"
    }

    fn patch_file(&self, text: &str) -> Option<String> {
        let patched = self.shadow_call.replace_all(text, "1.0");
        changed(text, patched.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_lookups() {
        let plugin = DisableShadows::create().unwrap();
        let text = "float lit = CalculateShadow(shadow_map, uv(pos));\nfloat c = SampleCascadedShadows(s, p);\n";
        let patched = plugin.patch_file(text).unwrap();
        assert_eq!(patched, "float lit = 1.0;\nfloat c = 1.0;\n");
    }

    #[test]
    fn test_targets_single_byte_shaders_only() {
        use crate::encoding::{encoding_for_path, TargetEncoding};
        use crate::plugins::split_patterns;
        use std::path::Path;

        let plugin = DisableShadows::create().unwrap();
        let patterns: Vec<&str> = split_patterns(plugin.extension()).collect();
        assert_eq!(patterns, vec!["*.hlsl"]);
        for pattern in patterns {
            assert_eq!(encoding_for_path(Path::new(pattern)), TargetEncoding::Ascii);
        }
    }

    #[test]
    fn test_no_shadows_is_no_change() {
        let plugin = DisableShadows::create().unwrap();
        assert_eq!(plugin.patch_file("float4 color = tex.Sample(s, uv);"), None);
    }
}
