//! Engine and cloth configuration.
//!
//! [`EvolutionConfig`] controls the reference host's substep loop.
//! [`ClothConfig`] selects which constraint families a cloth registers and
//! with what parameters. Both load from TOML.

use serde::{Deserialize, Serialize};
use weft_types::constants::{DEFAULT_ITERATIONS, DEFAULT_SELF_COLLISION_THICKNESS, DEFAULT_SUBSTEPS, GRAVITY};
use weft_types::{WeftError, WeftResult};

use crate::constraints::long_range::TetherMode;

/// Configuration for the reference host engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Rule sweeps per substep.
    pub iterations: u32,

    /// Substeps per frame.
    pub substeps: u32,

    /// Gravity vector [gx, gy, gz] in m/s².
    pub gravity: [f32; 3],

    /// Velocity damping factor (0.0 = no damping, 1.0 = full damping).
    pub damping: f32,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            substeps: DEFAULT_SUBSTEPS,
            gravity: [0.0, -GRAVITY, 0.0],
            damping: 0.01,
        }
    }
}

impl EvolutionConfig {
    /// Creates a config for debugging (single sweep, no damping).
    pub fn debug() -> Self {
        Self {
            iterations: 1,
            substeps: 1,
            damping: 0.0,
            ..Default::default()
        }
    }

    /// Creates a high-quality config (more sweeps and substeps).
    pub fn high_quality() -> Self {
        Self {
            iterations: 12,
            substeps: 4,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> WeftResult<()> {
        if self.iterations == 0 {
            return Err(WeftError::InvalidConfig("iterations must be at least 1".into()));
        }
        if self.substeps == 0 {
            return Err(WeftError::InvalidConfig("substeps must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(WeftError::InvalidConfig(format!(
                "damping must lie in [0, 1], got {}",
                self.damping
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> WeftResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| WeftError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Bending formulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BendingModel {
    /// Distance springs across each interior edge's wing vertices.
    #[default]
    Springs,
    /// Four-particle dihedral angle elements.
    Elements,
}

/// Volume formulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VolumeModel {
    /// Distance springs across double bending edges.
    #[default]
    ThinShell,
    /// One global constraint on the volume enclosed by a closed surface.
    Enclosed,
}

/// Which constraint families a cloth registers, and how.
///
/// A `None` stiffness leaves that family out. In TOML a family is registered
/// only when its stiffness key is present; other missing keys take their
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClothConfig {
    /// Use the extended (compliance) formulation where a family supports it.
    #[serde(default)]
    pub use_xpbd: bool,

    #[serde(default)]
    pub edge_stiffness: Option<f32>,
    #[serde(default)]
    pub bending_stiffness: Option<f32>,
    #[serde(default)]
    pub bending_model: BendingModel,
    #[serde(default)]
    pub area_stiffness: Option<f32>,
    #[serde(default)]
    pub volume_stiffness: Option<f32>,
    #[serde(default)]
    pub volume_model: VolumeModel,

    #[serde(default)]
    pub tether_stiffness: Option<f32>,
    /// Tethers act beyond `tether_limit_scale × reference length`.
    #[serde(default = "unit")]
    pub tether_limit_scale: f32,
    #[serde(default)]
    pub tether_mode: TetherMode,

    /// Backstop distances include the sphere radius.
    #[serde(default)]
    pub use_legacy_backstop: bool,

    #[serde(default)]
    pub shape_target_stiffness: Option<f32>,

    /// `None` disables self-collision.
    #[serde(default)]
    pub self_collision_thickness: Option<f32>,

    /// Initial max-distance radius multiplier.
    #[serde(default = "unit")]
    pub max_distances_multiplier: f32,

    /// Initial anim-drive spring stiffness.
    #[serde(default)]
    pub anim_drive_stiffness: f32,
}

fn unit() -> f32 {
    1.0
}

impl Default for ClothConfig {
    fn default() -> Self {
        Self {
            use_xpbd: false,
            edge_stiffness: Some(1.0),
            bending_stiffness: Some(0.5),
            bending_model: BendingModel::Springs,
            area_stiffness: None,
            volume_stiffness: None,
            volume_model: VolumeModel::ThinShell,
            tether_stiffness: Some(1.0),
            tether_limit_scale: 1.0,
            tether_mode: TetherMode::Geodesic,
            use_legacy_backstop: false,
            shape_target_stiffness: None,
            self_collision_thickness: None,
            max_distances_multiplier: 1.0,
            anim_drive_stiffness: 0.0,
        }
    }
}

impl ClothConfig {
    /// Edge springs only, standard formulation.
    pub fn debug() -> Self {
        Self {
            bending_stiffness: None,
            tether_stiffness: None,
            ..Default::default()
        }
    }

    /// Extended formulation with area preservation and self-collision.
    pub fn high_quality() -> Self {
        Self {
            use_xpbd: true,
            bending_model: BendingModel::Elements,
            area_stiffness: Some(1.0),
            self_collision_thickness: Some(DEFAULT_SELF_COLLISION_THICKNESS),
            ..Default::default()
        }
    }

    /// Check every value against the range the registry accepts.
    pub fn validate(&self) -> WeftResult<()> {
        let stiffnesses = [
            ("edge_stiffness", self.edge_stiffness),
            ("bending_stiffness", self.bending_stiffness),
            ("area_stiffness", self.area_stiffness),
            ("volume_stiffness", self.volume_stiffness),
            ("tether_stiffness", self.tether_stiffness),
            ("shape_target_stiffness", self.shape_target_stiffness),
        ];
        for (name, value) in stiffnesses {
            if let Some(k) = value {
                if !(k > 0.0 && k <= 1.0) {
                    return Err(WeftError::InvalidConfig(format!("{name} must lie in (0, 1], got {k}")));
                }
            }
        }

        if !(self.tether_limit_scale.is_finite() && self.tether_limit_scale > 0.0) {
            return Err(WeftError::InvalidConfig(format!(
                "tether_limit_scale must be positive, got {}",
                self.tether_limit_scale
            )));
        }
        if let Some(thickness) = self.self_collision_thickness {
            if !(thickness.is_finite() && thickness > 0.0) {
                return Err(WeftError::InvalidConfig(format!(
                    "self_collision_thickness must be positive, got {thickness}"
                )));
            }
        }
        if self.max_distances_multiplier.is_nan() || self.anim_drive_stiffness.is_nan() {
            return Err(WeftError::InvalidConfig("live parameters must not be NaN".into()));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> WeftResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| WeftError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
