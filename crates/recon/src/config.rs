use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    /// Reference date the two collections were fetched for; echoed in meta.
    #[serde(default)]
    pub reference_date: Option<String>,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
}

#[derive(Debug, Deserialize)]
pub struct SourcesConfig {
    pub avl: AvlSourceConfig,
    pub roster: RosterSourceConfig,
}

// ---------------------------------------------------------------------------
// Source files + column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AvlSourceConfig {
    pub file: String,
    pub columns: AvlColumns,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvlColumns {
    pub id: String,
    pub line_name: String,
    pub direction: String,
    pub service: String,
    pub departure: String,
    #[serde(default)]
    pub departure_actual: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterSourceConfig {
    pub file: String,
    pub columns: RosterColumns,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterColumns {
    pub id: String,
    pub line_code: String,
    #[serde(default)]
    pub line_name: Option<String>,
    pub direction_flag: String,
    pub service_code: String,
    pub departure: String,
    #[serde(default)]
    pub sector: Option<String>,
}

// ---------------------------------------------------------------------------
// Tolerance
// ---------------------------------------------------------------------------

/// Time tolerances, all in minutes and independently overridable.
#[derive(Debug, Clone, Deserialize)]
pub struct ToleranceConfig {
    /// Paired outcomes within this delta are flagged time-compatible.
    #[serde(default = "default_time_equal_min")]
    pub time_equal_min: i64,
    /// Window for the relaxed line|service pass.
    #[serde(default = "default_window_line_service")]
    pub window_line_service_min: i64,
    /// Window for the relaxed line|direction pass.
    #[serde(default = "default_window_line_direction")]
    pub window_line_direction_min: i64,
    /// Window for the relaxed line-only pass.
    #[serde(default = "default_window_line")]
    pub window_line_min: i64,
}

fn default_time_equal_min() -> i64 {
    2
}

fn default_window_line_service() -> i64 {
    120
}

fn default_window_line_direction() -> i64 {
    180
}

fn default_window_line() -> i64 {
    240
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            time_equal_min: default_time_equal_min(),
            window_line_service_min: default_window_line_service(),
            window_line_direction_min: default_window_line_direction(),
            window_line_min: default_window_line(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }

        if self.tolerance.time_equal_min < 0 {
            return Err(ReconError::ConfigValidation(format!(
                "time_equal_min must be >= 0, got {}",
                self.tolerance.time_equal_min
            )));
        }

        for (label, window) in [
            ("window_line_service_min", self.tolerance.window_line_service_min),
            ("window_line_direction_min", self.tolerance.window_line_direction_min),
            ("window_line_min", self.tolerance.window_line_min),
        ] {
            if window <= 0 {
                return Err(ReconError::ConfigValidation(format!(
                    "{label} must be > 0, got {window}"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
