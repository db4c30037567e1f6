//! Series Interpolator - resample one session onto the shared grid

use super::TimeGrid;
use crate::session::SessionRecord;
use serde::Serialize;

/// One session's metric resampled onto a [`TimeGrid`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterpolatedCurve {
    grid: TimeGrid,
    values: Vec<f64>,
}

impl InterpolatedCurve {
    /// Grid the curve was sampled on.
    #[must_use]
    pub const fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// One value per grid point.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// `(seconds, value)` pairs in grid order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.grid.times().iter().copied().zip(self.values.iter().copied())
    }
}

/// Resample `metric` of `session` onto `grid`, piecewise-linearly.
///
/// - Before the first observation the value is `0`: a session that has not
///   started yet contributes nothing.
/// - At or after the last observation the last observed value is held.
/// - Iterations missing `metric` contribute `0`.
/// - At a duplicated timestamp the later iteration wins; approaching it from
///   the left interpolates towards the earlier one.
///
/// A session without iterations yields an all-zero curve.
#[must_use]
pub fn interpolate(session: &SessionRecord, metric: &str, grid: &TimeGrid) -> InterpolatedCurve {
    let observed: Vec<(f64, f64)> = session
        .iterations()
        .iter()
        .map(|it| (it.seconds_used(), it.metric(metric)))
        .collect();

    let values = grid.times().iter().map(|&t| sample(&observed, t)).collect();

    InterpolatedCurve {
        grid: grid.clone(),
        values,
    }
}

/// Value of the piecewise-linear function through `observed` at time `t`.
///
/// `observed` must be sorted by time (non-decreasing).
fn sample(observed: &[(f64, f64)], t: f64) -> f64 {
    let Some(&(first_time, _)) = observed.first() else {
        return 0.0;
    };
    if t < first_time {
        return 0.0;
    }

    // first index strictly after t; >= 1 because first_time <= t
    let upper = observed.partition_point(|&(time, _)| time <= t);
    let (x0, y0) = observed[upper - 1];
    match observed.get(upper) {
        None => y0,
        Some(&(x1, y1)) => {
            // x0 <= t < x1
            let slope = (y1 - y0) / (x1 - x0);
            slope * (t - x0) + y0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::IterationSnapshot;

    const METRIC: &str = "incons_count";

    fn session(points: &[(f64, f64)]) -> SessionRecord {
        SessionRecord::builder("s")
            .iterations(
                points
                    .iter()
                    .map(|&(t, v)| IterationSnapshot::new(t).with_metric(METRIC, v)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_linear_midpoint_and_right_hold() {
        let grid = TimeGrid::new(20.0, 5).unwrap(); // 0, 5, 10, 15, 20
        let curve = interpolate(&session(&[(0.0, 10.0), (10.0, 20.0)]), METRIC, &grid);
        assert_eq!(curve.values(), &[10.0, 15.0, 20.0, 20.0, 20.0]);
    }

    #[test]
    fn test_left_clamp_to_zero() {
        let grid = TimeGrid::new(20.0, 5).unwrap();
        let curve = interpolate(&session(&[(6.0, 4.0), (16.0, 8.0)]), METRIC, &grid);
        assert!(curve.values()[0].abs() < f64::EPSILON);
        assert!(curve.values()[1].abs() < f64::EPSILON);
        // 10s: 4 + 0.4 * 4
        assert!((curve.values()[2] - 5.6).abs() < 1e-12);
        assert!((curve.values()[4] - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_exact_first_observation_is_not_clamped() {
        let grid = TimeGrid::new(10.0, 3).unwrap(); // 0, 5, 10
        let curve = interpolate(&session(&[(5.0, 7.0)]), METRIC, &grid);
        assert_eq!(curve.values(), &[0.0, 7.0, 7.0]);
    }

    #[test]
    fn test_no_iterations_is_all_zero() {
        let grid = TimeGrid::new(10.0, 4).unwrap();
        let curve = interpolate(&session(&[]), METRIC, &grid);
        assert_eq!(curve.values(), &[0.0; 4]);
    }

    #[test]
    fn test_missing_metric_reads_zero() {
        let grid = TimeGrid::new(10.0, 3).unwrap();
        let s = SessionRecord::builder("s")
            .iteration(IterationSnapshot::new(0.0).with_metric("corpus_size", 9.0))
            .iteration(IterationSnapshot::new(10.0).with_metric(METRIC, 4.0))
            .build()
            .unwrap();
        let curve = interpolate(&s, METRIC, &grid);
        assert_eq!(curve.values(), &[0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_duplicate_timestamp_later_wins() {
        let grid = TimeGrid::new(10.0, 3).unwrap(); // 0, 5, 10
        let curve = interpolate(
            &session(&[(0.0, 0.0), (5.0, 2.0), (5.0, 6.0), (10.0, 6.0)]),
            METRIC,
            &grid,
        );
        assert_eq!(curve.values(), &[0.0, 6.0, 6.0]);
    }

    #[test]
    fn test_points_pairs_grid_and_values() {
        let grid = TimeGrid::new(10.0, 2).unwrap();
        let curve = interpolate(&session(&[(0.0, 1.0)]), METRIC, &grid);
        let points: Vec<_> = curve.points().collect();
        assert_eq!(points, vec![(0.0, 1.0), (10.0, 1.0)]);
    }
}
