use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::scoring::{Strategy, YieldOverrides, YieldTable};

/// Which placement stages run, in fixed order cities → regions → campuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StageToggles {
    #[serde(default = "default_true")]
    pub cities: bool,
    #[serde(default = "default_true")]
    pub regions: bool,
    #[serde(default = "default_true")]
    pub campuses: bool,
}

impl Default for StageToggles {
    fn default() -> Self {
        Self {
            cities: true,
            regions: true,
            campuses: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_min_city_distance")]
    pub min_city_distance: u32,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub campus_count: Option<u32>,
    #[serde(default = "default_campuses_per_city")]
    pub campuses_per_city: u32,
    #[serde(default = "default_radius")]
    pub campus_owner_radius: u32,
    #[serde(default = "default_radius")]
    pub region_radius: u32,
    #[serde(default = "default_adjacency_scale")]
    pub adjacency_scale: u32,
    #[serde(default = "default_campus_neighbor_bonus")]
    pub campus_neighbor_bonus: f64,
    #[serde(default = "default_solver_time_budget_ms")]
    pub solver_time_budget_ms: u64,
    #[serde(default)]
    pub accept_feasible: bool,
    #[serde(default)]
    pub stages: StageToggles,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default)]
    pub yields: YieldOverrides,
}

fn default_true() -> bool {
    true
}
fn default_min_city_distance() -> u32 {
    3
}
fn default_campuses_per_city() -> u32 {
    1
}
fn default_radius() -> u32 {
    3
}
fn default_adjacency_scale() -> u32 {
    2
}
fn default_campus_neighbor_bonus() -> f64 {
    1.0
}
fn default_solver_time_budget_ms() -> u64 {
    30_000
}
fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_city_distance: default_min_city_distance(),
            strategy: Strategy::default(),
            campus_count: None,
            campuses_per_city: default_campuses_per_city(),
            campus_owner_radius: default_radius(),
            region_radius: default_radius(),
            adjacency_scale: default_adjacency_scale(),
            campus_neighbor_bonus: default_campus_neighbor_bonus(),
            solver_time_budget_ms: default_solver_time_budget_ms(),
            accept_feasible: false,
            stages: StageToggles::default(),
            bind: default_bind(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            yields: YieldOverrides::default(),
        }
    }
}

impl PlannerConfig {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content, path)
    }

    pub fn from_toml_str(content: &str, source_path: &Path) -> Result<Self, String> {
        let config: PlannerConfig =
            toml::from_str(content).map_err(|e| format!("{}: {}", source_path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();

        if self.min_city_distance == 0 {
            errors.push(format!(
                "min_city_distance must be >= 1, got {}. Example: min_city_distance = 3",
                self.min_city_distance
            ));
        }

        if self.campus_owner_radius == 0 {
            errors.push(format!(
                "campus_owner_radius must be >= 1, got {}. Example: campus_owner_radius = 3",
                self.campus_owner_radius
            ));
        }

        if self.region_radius == 0 {
            errors.push(format!(
                "region_radius must be >= 1, got {}. Example: region_radius = 3",
                self.region_radius
            ));
        }

        // Every bonus is a multiple of 0.5, so an even scale keeps them integral.
        if self.adjacency_scale < 2 || self.adjacency_scale % 2 != 0 {
            errors.push(format!(
                "adjacency_scale must be an even number >= 2, got {}. Example: adjacency_scale = 2",
                self.adjacency_scale
            ));
        }

        let halves = self.campus_neighbor_bonus * 2.0;
        if self.campus_neighbor_bonus < 0.0 || halves.fract() != 0.0 {
            errors.push(format!(
                "campus_neighbor_bonus must be a non-negative multiple of 0.5, got {}. Example: campus_neighbor_bonus = 1.0",
                self.campus_neighbor_bonus
            ));
        }

        if self.solver_time_budget_ms == 0 {
            errors.push(format!(
                "solver_time_budget_ms must be > 0, got {}. Example: solver_time_budget_ms = 30000",
                self.solver_time_budget_ms
            ));
        }

        if !(1024..=65535).contains(&self.port) {
            errors.push(format!(
                "port must be 1024-65535, got {}. Example: port = 5000",
                self.port
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            errors.push(format!(
                "log_level must be one of {:?}, got '{}'. Example: log_level = \"info\"",
                valid_levels, self.log_level
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.log_format.as_str()) {
            errors.push(format!(
                "log_format must be one of {:?}, got '{}'. Example: log_format = \"json\"",
                valid_formats, self.log_format
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    }

    /// Standard tables with the configured overrides applied.
    pub fn yield_table(&self) -> YieldTable {
        YieldTable::with_overrides(&self.yields)
    }

    pub fn solver_time_budget(&self) -> Duration {
        Duration::from_millis(self.solver_time_budget_ms)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::tile::{BaseTerrain, Tile};
    use crate::scoring::Yields;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn test_path() -> PathBuf {
        PathBuf::from("test-config.toml")
    }

    #[test]
    fn valid_config_loads_all_fields() {
        let toml = r#"
            min_city_distance = 4
            strategy = "max_food"
            campus_count = 10
            campuses_per_city = 2
            campus_owner_radius = 2
            region_radius = 4
            adjacency_scale = 4
            campus_neighbor_bonus = 0.5
            solver_time_budget_ms = 5000
            accept_feasible = true
            bind = "0.0.0.0"
            port = 8080
            log_level = "debug"
            log_format = "json"

            [stages]
            regions = false
        "#;
        let config = PlannerConfig::from_toml_str(toml, &test_path()).unwrap();
        assert_eq!(config.min_city_distance, 4);
        assert_eq!(config.strategy, Strategy::MaxFood);
        assert_eq!(config.campus_count, Some(10));
        assert_eq!(config.campuses_per_city, 2);
        assert_eq!(config.campus_owner_radius, 2);
        assert_eq!(config.region_radius, 4);
        assert_eq!(config.adjacency_scale, 4);
        assert_eq!(config.campus_neighbor_bonus, 0.5);
        assert_eq!(config.solver_time_budget(), Duration::from_secs(5));
        assert!(config.accept_feasible);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, "json");
        assert!(config.stages.cities);
        assert!(!config.stages.regions);
        assert!(config.stages.campuses);
    }

    #[test]
    fn defaults_applied_for_empty_config() {
        let config = PlannerConfig::from_toml_str("", &test_path()).unwrap();
        assert_eq!(config.min_city_distance, 3);
        assert_eq!(config.strategy, Strategy::MaxCities);
        assert_eq!(config.campus_count, None);
        assert_eq!(config.campuses_per_city, 1);
        assert_eq!(config.campus_owner_radius, 3);
        assert_eq!(config.region_radius, 3);
        assert_eq!(config.adjacency_scale, 2);
        assert_eq!(config.campus_neighbor_bonus, 1.0);
        assert_eq!(config.solver_time_budget_ms, 30_000);
        assert!(!config.accept_feasible);
        assert_eq!(config.stages, StageToggles::default());
        assert_eq!(config.bind_address(), "127.0.0.1:5000");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, "text");
    }

    #[test]
    fn default_impl_matches_empty_file() {
        let parsed = PlannerConfig::from_toml_str("", &test_path()).unwrap();
        let built = PlannerConfig::default();
        assert_eq!(parsed.min_city_distance, built.min_city_distance);
        assert_eq!(parsed.adjacency_scale, built.adjacency_scale);
        assert_eq!(parsed.port, built.port);
        assert!(built.validate().is_ok());
    }

    #[test]
    fn odd_adjacency_scale_rejected() {
        let err = PlannerConfig::from_toml_str("adjacency_scale = 3", &test_path()).unwrap_err();
        assert!(err.contains("adjacency_scale"));
        assert!(err.contains("even"));
    }

    #[test]
    fn fractional_neighbor_bonus_rejected() {
        let err = PlannerConfig::from_toml_str("campus_neighbor_bonus = 0.3", &test_path())
            .unwrap_err();
        assert!(err.contains("campus_neighbor_bonus"));
    }

    #[test]
    fn unknown_strategy_rejected() {
        let err =
            PlannerConfig::from_toml_str(r#"strategy = "max_gold""#, &test_path()).unwrap_err();
        assert!(err.contains("test-config.toml"));
    }

    #[test]
    fn invalid_port_rejected() {
        let err = PlannerConfig::from_toml_str("port = 80", &test_path()).unwrap_err();
        assert!(err.contains("port"));
        assert!(err.contains("1024-65535"));
    }

    #[test]
    fn invalid_log_format_rejected() {
        let err =
            PlannerConfig::from_toml_str(r#"log_format = "xml""#, &test_path()).unwrap_err();
        assert!(err.contains("log_format"));
    }

    #[test]
    fn multiple_errors_reported_together() {
        let toml = "min_city_distance = 0\nregion_radius = 0\nsolver_time_budget_ms = 0";
        let err = PlannerConfig::from_toml_str(toml, &test_path()).unwrap_err();
        assert!(err.contains("min_city_distance"));
        assert!(err.contains("region_radius"));
        assert!(err.contains("solver_time_budget_ms"));
        assert_eq!(err.lines().count(), 3);
    }

    #[test]
    fn yield_overrides_merge_over_standard_tables() {
        let toml = r#"
            [yields.base_terrain]
            plains = [3, 2]
        "#;
        let config = PlannerConfig::from_toml_str(toml, &test_path()).unwrap();
        let table = config.yield_table();
        let plains = Tile::new(0, 0, BaseTerrain::Plains);
        let desert = Tile::new(0, 0, BaseTerrain::Desert);
        assert_eq!(table.yields(&plains).unwrap(), Yields::new(3, 2));
        assert_eq!(
            table.yields(&desert).unwrap(),
            YieldTable::standard().yields(&desert).unwrap()
        );
    }

    #[test]
    fn from_file_loads_valid_config() {
        let mut tmp = NamedTempFile::new().unwrap();
        use std::io::Write;
        writeln!(tmp, "min_city_distance = 5").unwrap();
        let config = PlannerConfig::from_file(tmp.path()).unwrap();
        assert_eq!(config.min_city_distance, 5);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = PlannerConfig::from_file(Path::new("/nonexistent/autotiler.toml")).unwrap_err();
        assert!(err.contains("/nonexistent/autotiler.toml"));
    }
}
