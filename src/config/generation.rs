use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters for the demo map generator.
///
/// `seed = 0` asks for a random seed; the generator reports the one it used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_rows")]
    pub rows: u32,
    #[serde(default = "default_cols")]
    pub cols: u32,
    #[serde(default = "default_ocean_ratio")]
    pub ocean_ratio: f32,
    #[serde(default = "default_mountain_ratio")]
    pub mountain_ratio: f32,
    #[serde(default = "default_feature_density")]
    pub feature_density: f32,
    #[serde(default = "default_resource_density")]
    pub resource_density: f32,
}

fn default_rows() -> u32 {
    12
}
fn default_cols() -> u32 {
    16
}
fn default_ocean_ratio() -> f32 {
    0.3
}
fn default_mountain_ratio() -> f32 {
    0.08
}
fn default_feature_density() -> f32 {
    0.25
}
fn default_resource_density() -> f32 {
    0.12
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            seed: 0,
            rows: default_rows(),
            cols: default_cols(),
            ocean_ratio: default_ocean_ratio(),
            mountain_ratio: default_mountain_ratio(),
            feature_density: default_feature_density(),
            resource_density: default_resource_density(),
        }
    }
}

impl GenerationParams {
    /// Load generation parameters from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        let params: Self = toml::from_str(&content)
            .map_err(|e| format!("Invalid TOML in {}: {}", path.display(), e))?;
        params.validate()?;
        Ok(params)
    }

    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.rows == 0 || self.cols == 0 {
            return Err(format!(
                "rows and cols must be >= 1, got {}x{}",
                self.rows, self.cols
            ));
        }
        if self.rows as u64 * self.cols as u64 > 1_000_000 {
            return Err(format!(
                "rows * cols must be <= 1000000, got {}x{}",
                self.rows, self.cols
            ));
        }
        if !(0.0..=1.0).contains(&self.ocean_ratio) {
            return Err(format!(
                "ocean_ratio must be 0.0-1.0, got {}",
                self.ocean_ratio
            ));
        }
        if !(0.0..=0.5).contains(&self.mountain_ratio) {
            return Err(format!(
                "mountain_ratio must be 0.0-0.5, got {}",
                self.mountain_ratio
            ));
        }
        if self.ocean_ratio + self.mountain_ratio > 1.0 {
            return Err(format!(
                "ocean_ratio + mountain_ratio must be <= 1.0, got {}",
                self.ocean_ratio + self.mountain_ratio
            ));
        }
        if !(0.0..=1.0).contains(&self.feature_density) {
            return Err(format!(
                "feature_density must be 0.0-1.0, got {}",
                self.feature_density
            ));
        }
        if !(0.0..=1.0).contains(&self.resource_density) {
            return Err(format!(
                "resource_density must be 0.0-1.0, got {}",
                self.resource_density
            ));
        }
        Ok(())
    }
}
