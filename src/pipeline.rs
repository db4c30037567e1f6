//! Batch driver
//!
//! Runs the fixed reduction sequence over sessions already resident in
//! memory:
//!
//! ```text
//! sessions ─> TotalPairs::derive ─> classify ─┬─> aggregate (group x metric) ─> curves
//!                                              └─> consistency::reduce        ─> consistency
//! ```
//!
//! Per-record problems become rejections; only an empty batch (or one in
//! which no session can derive the total pair count) is fatal.

use crate::config::StatsConfig;
use crate::consistency::{self, ConsistencyReport, TotalPairs};
use crate::error::{Error, Rejection, Result};
use crate::outcome::Outcome;
use crate::series::{aggregate_group, AggregateCurve, TimeGrid};
use crate::session::{classify, ConfigurationGroup, ConfigurationGroups, ConfigurationKind, SessionRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::info;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One (configuration, metric) curve, or its absence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveEntry {
    /// Configuration the curve belongs to.
    pub configuration: ConfigurationKind,
    /// Metric the curve summarises.
    pub metric: String,
    /// Median curve, or no data for an empty group.
    pub curve: Outcome<AggregateCurve>,
}

/// Number of sessions classified into one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    /// Configuration.
    pub configuration: ConfigurationKind,
    /// Sessions classified into it.
    pub sessions: usize,
}

/// Everything one run produces for the rendering/reporting side.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
    /// Sessions handed to the run.
    pub sessions_in: usize,
    /// Total pair count `P`.
    pub total_pairs: usize,
    /// Session `P` was derived from.
    pub total_pairs_source: String,
    /// Session count per configuration, in report order.
    pub group_counts: Vec<GroupCount>,
    /// One entry per (configuration, metric), configuration-major.
    pub curves: Vec<CurveEntry>,
    /// Per-group and global consistency statistics.
    pub consistency: ConsistencyReport,
    /// Sessions reported and skipped.
    pub rejected: Vec<Rejection>,
}

impl BatchReport {
    /// Curve entry for `(configuration, metric)`.
    #[must_use]
    pub fn curve(&self, configuration: ConfigurationKind, metric: &str) -> Option<&CurveEntry> {
        self.curves
            .iter()
            .find(|c| c.configuration == configuration && c.metric == metric)
    }
}

/// Aggregate every configured metric for every group.
///
/// Entries come back configuration-major in report order regardless of how
/// the work was scheduled.
#[must_use]
pub fn aggregate_curves(
    groups: &ConfigurationGroups<'_>,
    metrics: &[String],
    grid: &TimeGrid,
) -> Vec<CurveEntry> {
    let tasks: Vec<(&ConfigurationGroup<'_>, &str)> = groups
        .iter()
        .flat_map(|group| metrics.iter().map(move |metric| (group, metric.as_str())))
        .collect();

    let reduce_one = |task: &(&ConfigurationGroup<'_>, &str)| {
        let (group, metric) = *task;
        CurveEntry {
            configuration: group.kind(),
            metric: metric.to_string(),
            curve: aggregate_group(group, metric, grid),
        }
    };

    #[cfg(feature = "parallel")]
    let entries = tasks.par_iter().map(reduce_one).collect();
    #[cfg(not(feature = "parallel"))]
    let entries = tasks.iter().map(reduce_one).collect();

    entries
}

/// Run the full reduction over `sessions`.
///
/// # Errors
///
/// Returns `EmptyInput` if `sessions` is empty or no session can derive the
/// total pair count, and `InvalidConfig` if `config` fails validation.
pub fn run(sessions: &[SessionRecord], config: &StatsConfig) -> Result<BatchReport> {
    config.validate()?;
    if sessions.is_empty() {
        return Err(Error::EmptyInput("no sessions to reduce".to_string()));
    }
    let grid = TimeGrid::from_config(&config.grid)?;

    let total = TotalPairs::derive(sessions, &config.inconsistency_metric, config.universe_policy)?;
    let groups = classify(total.accepted().iter().copied());

    let mut rejected = total.rejected().to_vec();
    rejected.extend_from_slice(groups.rejected());

    let curves = aggregate_curves(&groups, &config.metrics, &grid);
    let consistency = consistency::reduce(&groups, total.value());

    info!(
        sessions = sessions.len(),
        classified = groups.classified_count(),
        rejected = rejected.len(),
        "batch reduced"
    );

    Ok(BatchReport {
        generated_at: Utc::now(),
        sessions_in: sessions.len(),
        total_pairs: total.value(),
        total_pairs_source: total.derived_from().to_string(),
        group_counts: groups
            .counts()
            .into_iter()
            .map(|(configuration, sessions)| GroupCount {
                configuration,
                sessions,
            })
            .collect(),
        curves,
        consistency,
        rejected,
    })
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for count in &self.group_counts {
            writeln!(f, "{}: {} sessions", count.configuration, count.sessions)?;
        }
        writeln!(
            f,
            "total pairs: {} (derived from {})",
            self.total_pairs, self.total_pairs_source
        )?;
        for entry in &self.curves {
            match &entry.curve {
                Outcome::Value(curve) => writeln!(
                    f,
                    "{} {}: median of {} sessions, final {:.1}",
                    entry.configuration,
                    entry.metric,
                    curve.sessions(),
                    curve.values().last().copied().unwrap_or(0.0)
                )?,
                Outcome::NoData => writeln!(f, "{} {}: no data", entry.configuration, entry.metric)?,
            }
        }
        writeln!(f, "{}", self.consistency)?;
        if !self.rejected.is_empty() {
            writeln!(f, "rejected: {}", self.rejected.len())?;
            for r in &self.rejected {
                writeln!(f, "  {}: {}", r.source, r.reason)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{IterationSnapshot, ParserPair};

    fn session(label: &str, argmax_ucb: bool, incons: f64, pairs: &[(u32, u32)]) -> SessionRecord {
        SessionRecord::builder(label)
            .argmax_ucb(argmax_ucb)
            .iteration(IterationSnapshot::new(0.0).with_metric("incons_count", 0.0))
            .iteration(IterationSnapshot::new(10.0).with_metric("incons_count", incons))
            .consistent_pairs(pairs.iter().map(|&(a, b)| ParserPair::new(a, b)))
            .build()
            .unwrap()
    }

    fn config() -> StatsConfig {
        StatsConfig::builder()
            .horizon_seconds(20.0)
            .grid_points(5)
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_batch_is_fatal() {
        assert!(matches!(run(&[], &config()), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn test_curves_are_configuration_major() {
        let sessions = [session("a", false, 2.0, &[(0, 1)])];
        let config = StatsConfig::builder()
            .grid_points(3)
            .metrics(["incons_count", "corpus_size"])
            .build()
            .unwrap();
        let report = run(&sessions, &config).unwrap();
        let order: Vec<_> = report
            .curves
            .iter()
            .map(|c| (c.configuration, c.metric.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (ConfigurationKind::Full, "incons_count"),
                (ConfigurationKind::Full, "corpus_size"),
                (ConfigurationKind::ArgmaxUcb, "incons_count"),
                (ConfigurationKind::ArgmaxUcb, "corpus_size"),
                (ConfigurationKind::ByteMutationOnly, "incons_count"),
                (ConfigurationKind::ByteMutationOnly, "corpus_size"),
            ]
        );
    }

    #[test]
    fn test_run_collects_rejections() {
        let both = SessionRecord::builder("both")
            .argmax_ucb(true)
            .byte_mutation_only(true)
            .build()
            .unwrap();
        let sessions = [
            session("a", false, 2.0, &[(0, 1)]),
            both,
            session("odd", true, 7.0, &[(0, 1)]),
        ];
        let report = run(&sessions, &config()).unwrap();
        assert_eq!(report.total_pairs, 3);
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(report.group_counts[0].sessions, 1);
        assert_eq!(report.group_counts[1].sessions, 0);
        assert!(report
            .curve(ConfigurationKind::ArgmaxUcb, "incons_count")
            .unwrap()
            .curve
            .is_no_data());
    }

    #[test]
    fn test_report_display() {
        let sessions = [session("a", false, 2.0, &[(0, 1)])];
        let text = run(&sessions, &config()).unwrap().to_string();
        assert!(text.contains("full: 1 sessions"));
        assert!(text.contains("total pairs: 3 (derived from a)"));
        assert!(text.contains("full incons_count: median of 1 sessions, final 2.0"));
        assert!(text.contains("argmax_ucb incons_count: no data"));
    }
}
