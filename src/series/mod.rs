//! Time-normalised progress curves
//!
//! Sessions report progress at irregular times. To compare them, every
//! session is resampled onto one shared grid ([`interpolate`]) and the
//! resampled curves of a configuration group are reduced point-wise to
//! their median ([`aggregate_group`]).
//!
//! ```text
//! SessionRecord ──interpolate──> InterpolatedCurve ─┐
//! SessionRecord ──interpolate──> InterpolatedCurve ─┼─median──> AggregateCurve
//! SessionRecord ──interpolate──> InterpolatedCurve ─┘
//! ```

mod aggregate;
mod interpolate;

pub use aggregate::{aggregate_group, aggregate_sessions, median, AggregateCurve};
pub use interpolate::{interpolate, InterpolatedCurve};

use crate::config::TimeGridConfig;
use crate::{Error, Result};
use serde::{Serialize, Serializer};
use std::sync::Arc;

/// Seconds per hour, for rendering-facing time axes.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Fixed ascending time grid shared by every curve of a run.
///
/// Cheap to clone; curves keep a handle to the grid they were sampled on.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    times: Arc<[f64]>,
}

impl TimeGrid {
    /// Build `points` evenly spaced times from `0` to `horizon_seconds` inclusive.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `points` is zero or the horizon is negative
    /// or non-finite.
    pub fn new(horizon_seconds: f64, points: usize) -> Result<Self> {
        if points == 0 {
            return Err(Error::InvalidConfig(
                "time grid needs at least one point".to_string(),
            ));
        }
        if !horizon_seconds.is_finite() || horizon_seconds < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "time grid horizon must be finite and non-negative, got {horizon_seconds}"
            )));
        }

        let times: Arc<[f64]> = if points == 1 {
            Arc::from([0.0])
        } else {
            let step = horizon_seconds / as_f64(points - 1);
            (0..points)
                .map(|i| {
                    if i == points - 1 {
                        horizon_seconds
                    } else {
                        as_f64(i) * step
                    }
                })
                .collect()
        };

        Ok(Self { times })
    }

    /// Build the grid described by a config section.
    ///
    /// # Errors
    ///
    /// See [`TimeGrid::new`].
    pub fn from_config(config: &TimeGridConfig) -> Result<Self> {
        Self::new(config.horizon_seconds, config.points)
    }

    /// Grid times in seconds, ascending.
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Number of grid points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always false for a constructed grid.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Last grid time.
    #[must_use]
    pub fn horizon(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(n: usize) -> f64 {
    n as f64
}

impl Serialize for TimeGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.times.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_endpoints() {
        let grid = TimeGrid::new(86_400.0, 500).unwrap();
        assert_eq!(grid.len(), 500);
        assert!(grid.times()[0].abs() < f64::EPSILON);
        assert!((grid.horizon() - 86_400.0).abs() < f64::EPSILON);
        assert!(grid.times().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_grid_exact_steps() {
        let grid = TimeGrid::new(20.0, 5).unwrap();
        assert_eq!(grid.times(), &[0.0, 5.0, 10.0, 15.0, 20.0]);
    }

    #[test]
    fn test_single_point_grid() {
        let grid = TimeGrid::new(100.0, 1).unwrap();
        assert_eq!(grid.times(), &[0.0]);
    }

    #[test]
    fn test_invalid_grid() {
        assert!(TimeGrid::new(10.0, 0).is_err());
        assert!(TimeGrid::new(-1.0, 10).is_err());
        assert!(TimeGrid::new(f64::INFINITY, 10).is_err());
    }

    #[test]
    fn test_grid_serializes_as_sequence() {
        let grid = TimeGrid::new(2.0, 3).unwrap();
        assert_eq!(serde_json::to_string(&grid).unwrap(), "[0.0,1.0,2.0]");
    }
}
