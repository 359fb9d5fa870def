//! # Engine Configuration
//!
//! All tunables of the scene core in one serializable tree:
//!
//! - **Scene**: quadtree partitioning and the name given to new scene roots
//! - **Time**: fixed step size, initial time scale and frame limiting
//!
//! Every section is `#[serde(default)]`, so partial files only override the
//! keys they mention.

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError, ConfigFormat};
pub use crate::spatial::QuadtreeConfig;
pub use crate::time::TimeConfig;

/// # Scene Configuration
///
/// Settings of a [`Scene`](crate::scene::Scene) and its spatial index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Quadtree bounds and subdivision limits
    pub quadtree: QuadtreeConfig,
    /// Name of the root created by `create_empty_scene`
    pub root_name: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            quadtree: QuadtreeConfig::default(),
            root_name: "Scene".to_string(),
        }
    }
}

/// # Engine Configuration
///
/// Top-level configuration applications load at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default log filter used by [`init_logging`](Self::init_logging)
    pub log_level: String,
    /// Scene settings
    pub scene: SceneConfig,
    /// Simulation clock settings
    pub time: TimeConfig,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            scene: SceneConfig::default(),
            time: TimeConfig::default(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Replace quadtree settings
    pub fn with_quadtree(mut self, quadtree: QuadtreeConfig) -> Self {
        self.scene.quadtree = quadtree;
        self
    }

    /// Replace clock settings
    pub fn with_time(mut self, time: TimeConfig) -> Self {
        self.time = time;
        self
    }

    /// Set the fixed step granted by a single step
    pub fn with_step_delta_time_ms(mut self, step_ms: u64) -> Self {
        self.time.step_delta_time_ms = step_ms;
        self
    }

    /// Initialise `env_logger` with `log_level` as the filter
    pub fn init_logging(&self) {
        crate::foundation::logging::init_with_filter(&self.log_level);
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.scene
            .quadtree
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.time.step_delta_time_ms == 0 {
            return Err(ConfigError::Invalid("time.step_delta_time_ms must be at least 1".to_string()));
        }
        if self.time.time_scale.is_nan() || self.time.time_scale < 0.0 {
            return Err(ConfigError::Invalid("time.time_scale must be non-negative".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec2;
    use crate::scene::AABB2D;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_match_editor() {
        let config = EngineConfig::default();
        assert_eq!(config.scene.root_name, "Scene");
        assert_eq!(config.scene.quadtree.max_depth, 8);
        assert_eq!(config.scene.quadtree.elements_per_node, 4);
        assert_eq!(config.scene.quadtree.bounds, AABB2D::new(Vec2::new(-100.0, -100.0), Vec2::new(100.0, 100.0)));
        assert_eq!(config.time.step_delta_time_ms, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = EngineConfig::new()
            .with_log_level("debug")
            .with_step_delta_time_ms(33)
            .with_quadtree(QuadtreeConfig {
                bounds: AABB2D::new(Vec2::new(-50.0, -25.0), Vec2::new(50.0, 25.0)),
                max_depth: 5,
                elements_per_node: 2,
            });

        let text = config.to_string_as(ConfigFormat::Toml).unwrap();
        let parsed = EngineConfig::from_str_as(&text, ConfigFormat::Toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_ron_round_trip() {
        let mut config = EngineConfig::default();
        config.time.time_scale = 0.5;
        config.scene.root_name = "Level".to_string();

        let text = config.to_string_as(ConfigFormat::Ron).unwrap();
        let parsed = EngineConfig::from_str_as(&text, ConfigFormat::Ron).unwrap();
        assert_eq!(parsed.scene.root_name, "Level");
        assert_relative_eq!(parsed.time.time_scale, 0.5);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let parsed = EngineConfig::from_str_as("[time]\nstep_delta_time_ms = 100\n", ConfigFormat::Toml).unwrap();
        assert_eq!(parsed.time.step_delta_time_ms, 100);
        assert_eq!(parsed.time.max_fps, 60);
        assert_eq!(parsed.scene, SceneConfig::default());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let zero_step = "[time]\nstep_delta_time_ms = 0\n";
        assert!(matches!(
            EngineConfig::from_str_as(zero_step, ConfigFormat::Toml),
            Err(ConfigError::Invalid(_))
        ));

        let empty_leaf = "[scene.quadtree]\nelements_per_node = 0\n";
        assert!(matches!(
            EngineConfig::from_str_as(empty_leaf, ConfigFormat::Toml),
            Err(ConfigError::Invalid(_))
        ));
    }
}
