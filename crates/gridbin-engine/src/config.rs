//! Configuration for the bin pipeline.

use gridbin_kernel::MeshOptions;
use gridbin_types::{DEFAULT_BASE_HEIGHT, DEFAULT_TOTAL_HEIGHT};
use serde::{Deserialize, Serialize};

use crate::types::EngineError;

/// Tunables for caching, tessellation and defaults. Every field has a
/// default, so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Maximum number of solids kept by the result cache.
    pub cache_capacity: usize,
    /// Tessellation quality for preview meshes.
    pub mesh: MeshOptions,
    /// Chord tolerance for sampling edge overlays (mm).
    pub edge_tolerance: f64,
    /// Used when a request does not carry a total height.
    pub default_total_height: f64,
    /// Used when a request does not carry a base height.
    pub default_base_height: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 64,
            mesh: MeshOptions::default(),
            edge_tolerance: 0.1,
            default_total_height: DEFAULT_TOTAL_HEIGHT,
            default_base_height: DEFAULT_BASE_HEIGHT,
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |reason: String| Err(EngineError::InvalidConfig { reason });
        if self.cache_capacity == 0 {
            return invalid("cache capacity must be at least 1".to_string());
        }
        if !(self.mesh.tolerance > 0.0) || !(self.mesh.angular_tolerance > 0.0) {
            return invalid(format!(
                "mesh tolerances must be positive, got {} / {}",
                self.mesh.tolerance, self.mesh.angular_tolerance
            ));
        }
        if !(self.edge_tolerance > 0.0) {
            return invalid(format!(
                "edge tolerance must be positive, got {}",
                self.edge_tolerance
            ));
        }
        if !(self.default_total_height > self.default_base_height && self.default_base_height > 0.0)
        {
            return invalid(format!(
                "default heights are inconsistent: total {} / base {}",
                self.default_total_height, self.default_base_height
            ));
        }
        Ok(())
    }
}
