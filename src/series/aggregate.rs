//! Group Aggregator - point-wise median across a configuration group

use super::{interpolate, TimeGrid, SECONDS_PER_HOUR};
use crate::outcome::Outcome;
use crate::session::{ConfigurationGroup, ConfigurationKind, SessionRecord};
use serde::Serialize;
use tracing::debug;

/// Median curve of one configuration group for one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateCurve {
    configuration: ConfigurationKind,
    metric: String,
    sessions: usize,
    grid: TimeGrid,
    values: Vec<f64>,
}

impl AggregateCurve {
    /// Configuration the curve summarises.
    #[must_use]
    pub const fn configuration(&self) -> ConfigurationKind {
        self.configuration
    }

    /// Metric the curve summarises.
    #[must_use]
    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Number of sessions the median was taken over.
    #[must_use]
    pub const fn sessions(&self) -> usize {
        self.sessions
    }

    /// Grid the curve was sampled on.
    #[must_use]
    pub const fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// Median value per grid point.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// `(seconds, value)` pairs in grid order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.grid.times().iter().copied().zip(self.values.iter().copied())
    }

    /// `(hours, value)` pairs in grid order, for plotting.
    pub fn hourly_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points().map(|(t, v)| (t / SECONDS_PER_HOUR, v))
    }
}

/// Median of `values`, reordering the slice in place.
///
/// Even-length input yields the mean of the two middle values.
/// Returns `None` for an empty slice.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Aggregate `metric` over every session of `group`.
///
/// An empty group yields [`Outcome::NoData`], never a zero curve.
#[must_use]
pub fn aggregate_group(
    group: &ConfigurationGroup<'_>,
    metric: &str,
    grid: &TimeGrid,
) -> Outcome<AggregateCurve> {
    aggregate_sessions(group.kind(), group.sessions(), metric, grid)
}

/// Aggregate `metric` over `sessions`, tagging the result with `configuration`.
#[must_use]
pub fn aggregate_sessions(
    configuration: ConfigurationKind,
    sessions: &[&SessionRecord],
    metric: &str,
    grid: &TimeGrid,
) -> Outcome<AggregateCurve> {
    if sessions.is_empty() {
        debug!(%configuration, metric, "no sessions, skipping curve");
        return Outcome::NoData;
    }

    let curves: Vec<_> = sessions
        .iter()
        .map(|session| interpolate(session, metric, grid))
        .collect();

    let mut column = Vec::with_capacity(curves.len());
    let values = (0..grid.len())
        .map(|i| {
            column.clear();
            column.extend(curves.iter().map(|c| c.values()[i]));
            median(&mut column).unwrap_or(0.0)
        })
        .collect();

    debug!(%configuration, metric, sessions = sessions.len(), "aggregated median curve");

    Outcome::Value(AggregateCurve {
        configuration,
        metric: metric.to_string(),
        sessions: sessions.len(),
        grid: grid.clone(),
        values,
    })
}
