//! Particle density reduction

use anyhow::Result;
use regex::{Captures, Regex};

use super::{changed, PatchPlugin};
use crate::settings::SettingsSnapshot;

/// Scales emitter particle counts by the `particleScale` setting (0..=1)
pub struct ReduceParticles {
    count: Regex,
    scale: f32,
}

impl ReduceParticles {
    pub fn create() -> Result<Box<dyn PatchPlugin>> {
        Ok(Box::new(Self {
            count: Regex::new(r"(?m)^(\s*(?:max_particles|particle_count|emit_count)\s*=?\s*)([0-9]+)")?,
            scale: 1.0,
        }))
    }
}

impl PatchPlugin for ReduceParticles {
    fn name(&self) -> &'static str {
        "ReduceParticles"
    }

    fn should_patch(&mut self, settings: &SettingsSnapshot) -> bool {
        self.scale = settings.value("particleScale").clamp(0.0, 1.0);
        settings.flag("reduceParticles")
    }

    fn directories_to_patch(&self) -> Vec<String> {
        vec!["metadata/effects".to_string()]
    }

    fn extension(&self) -> &str {
        "*.pet|*.trl"
    }

    fn patch_file(&self, text: &str) -> Option<String> {
        let patched = self.count.replace_all(text, |caps: &Captures| {
            let count: u64 = caps[2].parse().unwrap_or(0);
            let reduced = (count as f64 * self.scale as f64).floor() as u64;
            format!("{}{}", &caps[1], reduced)
        });
        changed(text, patched.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(scale: f32) -> Box<dyn PatchPlugin> {
        let mut plugin = ReduceParticles::create().unwrap();
        let settings = SettingsSnapshot::default()
            .with_flag("reduceParticles", true)
            .with_value("particleScale", scale);
        assert!(plugin.should_patch(&settings));
        plugin
    }

    #[test]
    fn test_scales_counts() {
        let text = "Emitter\n{\n\tmax_particles = 200\n\temit_count 15\n}\n";
        let patched = enabled(0.5).patch_file(text).unwrap();
        assert!(patched.contains("max_particles = 100"));
        assert!(patched.contains("emit_count 7"));
    }

    #[test]
    fn test_absent_scale_removes_particles() {
        let patched = enabled(0.0).patch_file("particle_count = 40\n").unwrap();
        assert_eq!(patched, "particle_count = 0\n");
    }

    #[test]
    fn test_full_scale_is_no_change() {
        assert_eq!(enabled(1.0).patch_file("max_particles = 200\n"), None);
    }
}
