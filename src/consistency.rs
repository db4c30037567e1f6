//! Consistency Reducer - agreement statistics over parser pairs
//!
//! A pair counts as consistent for a set of sessions only if *every* session
//! observed it as consistent, so set-level figures intersect the per-session
//! agreement sets. Median and mean of the per-session counts answer a
//! different question ("how inconsistent is a typical session") and are
//! reported alongside.
//!
//! The total number of parser pairs `P` is not stored in the session files;
//! it is derived as `last incons_count + |consistent_pairs|` (see
//! [`TotalPairs::derive`]).

use crate::config::UniversePolicy;
use crate::error::{Error, Rejection, Result};
use crate::outcome::Outcome;
use crate::series::median;
use crate::session::{ConfigurationGroups, ConfigurationKind, ParserPair, SessionRecord};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{info, warn};

/// Total pair count derived for a batch, plus the sessions it disqualified.
#[derive(Debug, Clone)]
pub struct TotalPairs<'a> {
    value: usize,
    derived_from: String,
    accepted: Vec<&'a SessionRecord>,
    rejected: Vec<Rejection>,
}

impl<'a> TotalPairs<'a> {
    /// Derive `P` from the first session with at least one iteration.
    ///
    /// Under [`UniversePolicy::Validate`] every later session with iterations
    /// must derive the same value; mismatches are rejected as
    /// `InconsistentUniverse`. Sessions without iterations cannot derive `P`
    /// and are accepted unchecked. Under [`UniversePolicy::TrustFirst`] every
    /// session after the one `P` came from is accepted as is.
    ///
    /// # Errors
    ///
    /// Returns `EmptyInput` if no session can derive `P`.
    pub fn derive<I>(sessions: I, metric: &str, policy: UniversePolicy) -> Result<Self>
    where
        I: IntoIterator<Item = &'a SessionRecord>,
    {
        let mut found: Option<(usize, String)> = None;
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for session in sessions {
            if found.is_some() && policy == UniversePolicy::TrustFirst {
                accepted.push(session);
                continue;
            }

            let derived = match session_total_pairs(session, metric) {
                Ok(derived) => derived,
                Err(error) => {
                    warn!(session = session.label(), "{error}");
                    rejected.push(Rejection::from_error(session.label(), &error));
                    continue;
                }
            };

            let expected = found.as_ref().map(|(value, _)| *value);
            match (expected, derived) {
                (None, Some(value)) => found = Some((value, session.label().to_string())),
                (Some(expected), Some(value))
                    if policy == UniversePolicy::Validate && expected != value =>
                {
                    let error = Error::InconsistentUniverse {
                        expected,
                        found: value,
                        session: session.label().to_string(),
                    };
                    warn!(session = session.label(), "{error}");
                    rejected.push(Rejection::from_error(session.label(), &error));
                    continue;
                }
                _ => {}
            }
            accepted.push(session);
        }

        let (value, derived_from) = found.ok_or_else(|| {
            Error::EmptyInput(format!(
                "no session carries a final `{metric}` value to derive the total pair count"
            ))
        })?;
        info!(total_pairs = value, derived_from = %derived_from, "derived total pair count");

        Ok(Self {
            value,
            derived_from,
            accepted,
            rejected,
        })
    }

    /// The total pair count `P`.
    #[must_use]
    pub const fn value(&self) -> usize {
        self.value
    }

    /// Label of the session `P` was derived from.
    #[must_use]
    pub fn derived_from(&self) -> &str {
        &self.derived_from
    }

    /// Sessions that passed the check, in input order.
    #[must_use]
    pub fn accepted(&self) -> &[&'a SessionRecord] {
        &self.accepted
    }

    /// Sessions that failed the check.
    #[must_use]
    pub fn rejected(&self) -> &[Rejection] {
        &self.rejected
    }
}

/// `last incons_count + |consistent_pairs|` for one session.
///
/// `Ok(None)` when the session has no iterations.
///
/// # Errors
///
/// Returns `MalformedInput` if the last iteration lacks `metric` or it is not
/// a non-negative integer.
pub fn session_total_pairs(session: &SessionRecord, metric: &str) -> Result<Option<usize>> {
    let Some(last) = session.last_iteration() else {
        return Ok(None);
    };
    let count = last.metric_opt(metric).ok_or_else(|| {
        Error::MalformedInput(format!(
            "{}: last iteration has no `{metric}` value",
            session.label()
        ))
    })?;
    if count < 0.0 || count.fract() != 0.0 || count > 1e15 {
        return Err(Error::MalformedInput(format!(
            "{}: `{metric}` = {count} is not a pair count",
            session.label()
        )));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = count as usize;
    Ok(Some(count + session.consistent_pairs().len()))
}

/// Intersect every set yielded by `sets`.
///
/// # Errors
///
/// Returns `EmptyInput` when `sets` is empty: the intersection of zero sets
/// is undefined.
pub fn intersect_all<'s, I>(sets: I) -> Result<BTreeSet<ParserPair>>
where
    I: IntoIterator<Item = &'s BTreeSet<ParserPair>>,
{
    let mut sets = sets.into_iter();
    let mut acc = sets
        .next()
        .ok_or_else(|| Error::EmptyInput("cannot intersect zero pair sets".to_string()))?
        .clone();
    for set in sets {
        if acc.is_empty() {
            break;
        }
        acc.retain(|pair| set.contains(pair));
    }
    Ok(acc)
}

/// Consistency statistics over one set of sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSetConsistency {
    /// Number of sessions reduced.
    pub sessions: usize,
    /// `P - |intersection of consistent_pairs|`.
    pub overall: usize,
    /// Median of the per-session inconsistent counts.
    pub median: f64,
    /// Mean of the per-session inconsistent counts.
    pub mean: f64,
    /// `P - |consistent_pairs|` for each session, in input order.
    pub per_session: Vec<usize>,
    /// Pairs consistent in every session.
    pub consistent_pairs: BTreeSet<ParserPair>,
}

/// Reduce `sessions` against the total pair count.
///
/// No sessions yields [`Outcome::NoData`].
#[must_use]
pub fn reduce_sessions<'s, I>(sessions: I, total_pairs: usize) -> Outcome<SessionSetConsistency>
where
    I: IntoIterator<Item = &'s SessionRecord>,
{
    let sessions: Vec<&SessionRecord> = sessions.into_iter().collect();
    let Ok(consistent_pairs) = intersect_all(sessions.iter().map(|s| s.consistent_pairs())) else {
        return Outcome::NoData;
    };

    let per_session: Vec<usize> = sessions
        .iter()
        .map(|session| {
            let agreed = session.consistent_pairs().len();
            if agreed > total_pairs {
                warn!(
                    session = session.label(),
                    agreed, total_pairs, "more consistent pairs than total pairs"
                );
            }
            total_pairs.saturating_sub(agreed)
        })
        .collect();

    let mut counts: Vec<f64> = per_session.iter().map(|&c| to_f64(c)).collect();
    let mean = counts.iter().sum::<f64>() / to_f64(counts.len());
    let median = median(&mut counts).unwrap_or(0.0);

    Outcome::Value(SessionSetConsistency {
        sessions: sessions.len(),
        overall: total_pairs.saturating_sub(consistent_pairs.len()),
        median,
        mean,
        per_session,
        consistent_pairs,
    })
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(n: usize) -> f64 {
    n as f64
}

/// Consistency statistics for one configuration group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupConsistency {
    /// Configuration of the group.
    pub configuration: ConfigurationKind,
    /// Statistics, or no data for an empty group.
    pub stats: Outcome<SessionSetConsistency>,
}

/// Per-group and global consistency statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyReport {
    /// Total pair count the figures were computed against.
    pub total_pairs: usize,
    /// One entry per configuration, in report order.
    pub groups: Vec<GroupConsistency>,
    /// Statistics over every classified session.
    pub global: Outcome<SessionSetConsistency>,
}

impl ConsistencyReport {
    /// Entry for `configuration`.
    #[must_use]
    pub fn group(&self, configuration: ConfigurationKind) -> Option<&GroupConsistency> {
        self.groups.iter().find(|g| g.configuration == configuration)
    }
}

/// Reduce every configuration group and the union of all groups.
#[must_use]
pub fn reduce(groups: &ConfigurationGroups<'_>, total_pairs: usize) -> ConsistencyReport {
    let per_group = groups
        .iter()
        .map(|group| GroupConsistency {
            configuration: group.kind(),
            stats: reduce_sessions(group.sessions().iter().copied(), total_pairs),
        })
        .collect();
    let global = reduce_sessions(groups.all_sessions(), total_pairs);

    let report = ConsistencyReport {
        total_pairs,
        groups: per_group,
        global,
    };
    for line in report.to_string().lines() {
        info!("{line}");
    }
    report
}

impl fmt::Display for ConsistencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for group in &self.groups {
            match &group.stats {
                Outcome::Value(s) => writeln!(
                    f,
                    "{}: overall={} median={:.1} mean={:.1}",
                    group.configuration, s.overall, s.median, s.mean
                )?,
                Outcome::NoData => writeln!(f, "{}: no data", group.configuration)?,
            }
        }
        match &self.global {
            Outcome::Value(s) => {
                writeln!(f, "globally consistent pairs: {}", s.consistent_pairs.len())?;
                let pairs: Vec<String> = s.consistent_pairs.iter().map(ToString::to_string).collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Outcome::NoData => write!(f, "globally consistent pairs: no data"),
        }
    }
}
