use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

use crate::processing::{
    ContactStackParams, MeshResolution, NecrosisParams, SlicePoseController, SliceView,
};

/// Planner parameters, read from TOML. Missing keys take the defaults of the
/// planning panel.
///
/// ```toml
/// [litt]
/// fiber_diameter = 1.65
/// necrosis_offsets = [0.0, 10.0]
///
/// [mpr]
/// mirrored_views = ["green", "yellow"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub litt: LittConfig,
    pub seeg: SeegConfig,
    pub mesh: MeshConfig,
    pub mpr: MprConfig,
    pub scene: SceneConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LittConfig {
    pub fiber_diameter: f64,
    pub necrosis_offsets: Vec<f64>,
    pub necrosis_diameter: f64,
    pub necrosis_length: f64,
    pub fiber_color: [f64; 3],
    pub necrosis_color: [f64; 3],
    pub fiber_opacity: f64,
    pub necrosis_opacity: f64,
}

impl Default for LittConfig {
    fn default() -> Self {
        Self {
            fiber_diameter: 4.0,
            necrosis_offsets: vec![0.0],
            necrosis_diameter: 10.0,
            necrosis_length: 15.0,
            fiber_color: [1.0, 85.0 / 255.0, 0.0],
            necrosis_color: [50.0 / 255.0, 180.0 / 255.0, 1.0],
            fiber_opacity: 0.85,
            necrosis_opacity: 0.6,
        }
    }
}

impl LittConfig {
    pub fn necrosis_params(&self) -> NecrosisParams {
        NecrosisParams {
            fiber_diameter: self.fiber_diameter,
            offsets: self.necrosis_offsets.clone(),
            necrosis_diameter: self.necrosis_diameter,
            necrosis_length: self.necrosis_length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeegConfig {
    /// Requested contact count; the suggestion is used when absent.
    pub contact_count: Option<usize>,
    pub contact_length: f64,
    pub gap_length: f64,
    pub contact_radius: f64,
    pub shaft_radius: f64,
    pub allowed_contacts: Vec<usize>,
    pub electrode_name: Option<String>,
    pub shaft_color: [f64; 3],
    pub contact_color: [f64; 3],
}

impl Default for SeegConfig {
    fn default() -> Self {
        Self {
            contact_count: None,
            contact_length: 1.5,
            gap_length: 2.0,
            contact_radius: 0.7,
            shaft_radius: 0.6,
            allowed_contacts: vec![5, 8, 10, 12, 15, 18],
            electrode_name: None,
            shaft_color: [1.0, 85.0 / 255.0, 0.0],
            contact_color: [50.0 / 255.0, 180.0 / 255.0, 1.0],
        }
    }
}

impl SeegConfig {
    pub fn stack_params(&self, contact_count: usize) -> ContactStackParams {
        ContactStackParams {
            contact_count,
            contact_length: self.contact_length,
            gap_length: self.gap_length,
            contact_radius: self.contact_radius,
            shaft_radius: self.shaft_radius,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub tube_sides: usize,
    pub ellipsoid_u_resolution: usize,
    pub ellipsoid_v_resolution: usize,
    pub cylinder_resolution: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        let res = MeshResolution::default();
        Self {
            tube_sides: res.tube_sides,
            ellipsoid_u_resolution: res.ellipsoid_u,
            ellipsoid_v_resolution: res.ellipsoid_v,
            cylinder_resolution: res.cylinder_sides,
        }
    }
}

impl MeshConfig {
    pub fn resolution(&self) -> MeshResolution {
        MeshResolution {
            tube_sides: self.tube_sides,
            ellipsoid_u: self.ellipsoid_u_resolution,
            ellipsoid_v: self.ellipsoid_v_resolution,
            cylinder_sides: self.cylinder_resolution,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MprConfig {
    /// Views whose normal and in-plane X are negated to match the host's
    /// left-right display convention.
    pub mirrored_views: Vec<SliceView>,
}

impl Default for MprConfig {
    fn default() -> Self {
        Self {
            mirrored_views: vec![SliceView::Green, SliceView::Yellow],
        }
    }
}

impl MprConfig {
    pub fn controller(&self) -> SlicePoseController {
        SlicePoseController::with_mirrored_views(self.mirrored_views.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub overwrite: bool,
    pub search_only_visible: bool,
    pub show_line: bool,
    pub base_name: Option<String>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            overwrite: true,
            search_only_visible: false,
            show_line: false,
            base_name: None,
        }
    }
}

impl PlannerConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid planner configuration")
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("while parsing {}", path.display()))?;
        log::info!("loaded planner configuration from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = PlannerConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, PlannerConfig::default());
        assert_eq!(cfg.seeg.allowed_contacts, vec![5, 8, 10, 12, 15, 18]);
        assert_eq!(cfg.mesh.resolution(), MeshResolution::default());
        assert_eq!(cfg.mpr.mirrored_views, vec![SliceView::Green, SliceView::Yellow]);
        assert!(cfg.scene.overwrite);
    }

    #[test]
    fn test_partial_sections() {
        let cfg = PlannerConfig::from_toml_str(
            r#"
            [litt]
            fiber_diameter = 1.65
            necrosis_offsets = [0.0, 10.0, 20.0]

            [seeg]
            contact_count = 12
            electrode_name = "LA"

            [mpr]
            mirrored_views = []
            "#,
        )
        .unwrap();
        assert_eq!(cfg.litt.fiber_diameter, 1.65);
        assert_eq!(cfg.litt.necrosis_length, 15.0);
        assert_eq!(cfg.litt.necrosis_params().offsets, vec![0.0, 10.0, 20.0]);
        assert_eq!(cfg.seeg.contact_count, Some(12));
        assert_eq!(cfg.seeg.stack_params(12).shaft_radius, 0.6);
        assert_eq!(cfg.seeg.electrode_name.as_deref(), Some("LA"));
        assert!(cfg.mpr.mirrored_views.is_empty());
        assert!(!cfg.mpr.controller().is_mirrored(SliceView::Green));
        assert!(PlannerConfig::default().mpr.controller().is_mirrored(SliceView::Yellow));
    }

    #[test]
    fn test_invalid_view_name_is_rejected() {
        let err = PlannerConfig::from_toml_str("[mpr]\nmirrored_views = [\"blue\"]\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[mesh]\ntube_sides = 16").unwrap();
        let cfg = PlannerConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(cfg.mesh.tube_sides, 16);
        assert_eq!(cfg.mesh.cylinder_resolution, 64);

        assert!(PlannerConfig::from_toml_file("/nonexistent/planner.toml").is_err());
    }
}
