//! Reduction configuration
//!
//! One immutable value passed explicitly into the pipeline. Each core
//! operation takes only the piece it needs (grid, metric name, scale).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default grid horizon: 24 hours.
pub const DEFAULT_HORIZON_SECONDS: f64 = 24.0 * 60.0 * 60.0;

/// Default number of grid points.
pub const DEFAULT_GRID_POINTS: usize = 500;

/// Metric recorded by the fuzzer as the running count of inconsistent pairs.
pub const DEFAULT_INCONSISTENCY_METRIC: &str = "incons_count";

/// Shape of the shared time grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeGridConfig {
    /// Last grid time in seconds.
    pub horizon_seconds: f64,
    /// Number of grid points, first at 0 and last at the horizon.
    pub points: usize,
}

impl Default for TimeGridConfig {
    fn default() -> Self {
        Self {
            horizon_seconds: DEFAULT_HORIZON_SECONDS,
            points: DEFAULT_GRID_POINTS,
        }
    }
}

/// How the total number of parser pairs is trusted across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniversePolicy {
    /// Derive from the first session and check every other session against it.
    #[default]
    Validate,
    /// Derive from the first session and assume every session agrees.
    TrustFirst,
}

/// Matrix cell color intensity scale.
///
/// `intensity(0) = 0`, otherwise `min(base + step * count, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntensityScale {
    /// Intensity of a cell with a single inconsistency type, minus one step.
    pub base: u32,
    /// Intensity added per inconsistency type.
    pub step: u32,
    /// Saturation value.
    pub max: u32,
}

impl Default for IntensityScale {
    fn default() -> Self {
        Self {
            base: 10,
            step: 3,
            max: 100,
        }
    }
}

impl IntensityScale {
    /// Intensity for a cell holding `count` inconsistency types.
    ///
    /// Monotonic non-decreasing in `count`, saturating at `max`.
    #[must_use]
    pub fn intensity(&self, count: usize) -> u32 {
        if count == 0 {
            return 0;
        }
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        self.step
            .saturating_mul(count)
            .saturating_add(self.base)
            .min(self.max)
    }
}

/// Full configuration for a reduction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Time grid for curve resampling.
    pub grid: TimeGridConfig,
    /// Metrics aggregated into curves.
    pub metrics: Vec<String>,
    /// Metric holding the running inconsistent pair count.
    pub inconsistency_metric: String,
    /// Total pair count policy.
    pub universe_policy: UniversePolicy,
    /// Matrix cell intensity scale.
    pub intensity: IntensityScale,
    /// LaTeX column width for the matrix table.
    pub matrix_column_width: String,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            grid: TimeGridConfig::default(),
            metrics: vec![DEFAULT_INCONSISTENCY_METRIC.to_string()],
            inconsistency_metric: DEFAULT_INCONSISTENCY_METRIC.to_string(),
            universe_policy: UniversePolicy::default(),
            intensity: IntensityScale::default(),
            matrix_column_width: "-2.5pt".to_string(),
        }
    }
}

impl StatsConfig {
    /// Create a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> StatsConfigBuilder {
        StatsConfigBuilder::default()
    }

    /// Load a configuration from a JSON file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed, or fails validation.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an empty grid, a negative or non-finite
    /// horizon, an empty metric list, or an inverted intensity scale.
    pub fn validate(&self) -> Result<()> {
        if self.grid.points == 0 {
            return Err(Error::InvalidConfig(
                "grid.points must be greater than 0".to_string(),
            ));
        }
        if !self.grid.horizon_seconds.is_finite() || self.grid.horizon_seconds < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "grid.horizon_seconds must be finite and non-negative, got {}",
                self.grid.horizon_seconds
            )));
        }
        if self.metrics.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one metric is required".to_string(),
            ));
        }
        if self.intensity.base > self.intensity.max {
            return Err(Error::InvalidConfig(format!(
                "intensity.base ({}) exceeds intensity.max ({})",
                self.intensity.base, self.intensity.max
            )));
        }
        Ok(())
    }
}

/// Builder for `StatsConfig`.
#[derive(Debug, Default)]
pub struct StatsConfigBuilder {
    config: StatsConfig,
}

impl StatsConfigBuilder {
    /// Set the grid horizon in seconds.
    #[must_use]
    pub const fn horizon_seconds(mut self, seconds: f64) -> Self {
        self.config.grid.horizon_seconds = seconds;
        self
    }

    /// Set the number of grid points.
    #[must_use]
    pub const fn grid_points(mut self, points: usize) -> Self {
        self.config.grid.points = points;
        self
    }

    /// Replace the aggregated metric list.
    #[must_use]
    pub fn metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.metrics = metrics.into_iter().map(Into::into).collect();
        self
    }

    /// Set the metric used to derive the total pair count.
    #[must_use]
    pub fn inconsistency_metric(mut self, metric: impl Into<String>) -> Self {
        self.config.inconsistency_metric = metric.into();
        self
    }

    /// Set the total pair count policy.
    #[must_use]
    pub const fn universe_policy(mut self, policy: UniversePolicy) -> Self {
        self.config.universe_policy = policy;
        self
    }

    /// Set the matrix intensity scale.
    #[must_use]
    pub const fn intensity(mut self, scale: IntensityScale) -> Self {
        self.config.intensity = scale;
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if validation fails.
    pub fn build(self) -> Result<StatsConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
