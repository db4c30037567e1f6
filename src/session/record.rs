//! Session Record - one fuzzing campaign run

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Index of a parser in the campaign's parser universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParserIndex(pub u32);

impl fmt::Display for ParserIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ParserIndex {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Unordered pair of parsers.
///
/// Stored normalised (smaller index first) so `(a, b)` and `(b, a)` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParserPair {
    first: ParserIndex,
    second: ParserIndex,
}

impl ParserPair {
    /// Create a pair from two raw parser indices in either order.
    #[must_use]
    pub fn new(a: u32, b: u32) -> Self {
        Self::from_indices(ParserIndex(a), ParserIndex(b))
    }

    /// Create a pair from two parser indices in either order.
    #[must_use]
    pub fn from_indices(a: ParserIndex, b: ParserIndex) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// The smaller parser index.
    #[must_use]
    pub const fn first(&self) -> ParserIndex {
        self.first
    }

    /// The larger parser index.
    #[must_use]
    pub const fn second(&self) -> ParserIndex {
        self.second
    }
}

impl fmt::Display for ParserPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}

/// One progress sample within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationSnapshot {
    seconds_used: f64,
    metrics: BTreeMap<String, f64>,
}

impl IterationSnapshot {
    /// Create a snapshot at `seconds_used` with no metrics.
    #[must_use]
    pub const fn new(seconds_used: f64) -> Self {
        Self {
            seconds_used,
            metrics: BTreeMap::new(),
        }
    }

    /// Add a metric value.
    #[must_use]
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Elapsed wall time since session start.
    #[must_use]
    pub const fn seconds_used(&self) -> f64 {
        self.seconds_used
    }

    /// Metric value, `0` when the snapshot does not carry it.
    #[must_use]
    pub fn metric(&self, name: &str) -> f64 {
        self.metrics.get(name).copied().unwrap_or(0.0)
    }

    /// Metric value, `None` when absent.
    #[must_use]
    pub fn metric_opt(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// All metrics carried by this snapshot.
    #[must_use]
    pub const fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }
}

/// One complete fuzzing campaign run.
///
/// Iterations are in chronological order with non-decreasing `seconds_used`;
/// the builder enforces this. Both configuration selectors may be set here;
/// the classifier reports and excludes such records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    label: String,
    argmax_ucb: bool,
    byte_mutation_only: bool,
    iterations: Vec<IterationSnapshot>,
    consistent_pairs: BTreeSet<ParserPair>,
}

impl SessionRecord {
    /// Create a builder for a session identified by `label` (usually its file path).
    #[must_use]
    pub fn builder(label: impl Into<String>) -> SessionRecordBuilder {
        SessionRecordBuilder::new(label)
    }

    /// Session label used in reports and logs.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the run used argmax-based UCB seed selection.
    #[must_use]
    pub const fn argmax_ucb(&self) -> bool {
        self.argmax_ucb
    }

    /// Whether the run restricted itself to byte-level mutations.
    #[must_use]
    pub const fn byte_mutation_only(&self) -> bool {
        self.byte_mutation_only
    }

    /// Progress samples in chronological order.
    #[must_use]
    pub fn iterations(&self) -> &[IterationSnapshot] {
        &self.iterations
    }

    /// Last progress sample, if any.
    #[must_use]
    pub fn last_iteration(&self) -> Option<&IterationSnapshot> {
        self.iterations.last()
    }

    /// Parser pairs that agreed throughout the session.
    #[must_use]
    pub const fn consistent_pairs(&self) -> &BTreeSet<ParserPair> {
        &self.consistent_pairs
    }
}

/// Builder for `SessionRecord`.
#[derive(Debug)]
pub struct SessionRecordBuilder {
    label: String,
    argmax_ucb: bool,
    byte_mutation_only: bool,
    iterations: Vec<IterationSnapshot>,
    consistent_pairs: BTreeSet<ParserPair>,
}

impl SessionRecordBuilder {
    /// Create a new builder with all selectors off and no data.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            argmax_ucb: false,
            byte_mutation_only: false,
            iterations: Vec::new(),
            consistent_pairs: BTreeSet::new(),
        }
    }

    /// Set the argmax-UCB selector.
    #[must_use]
    pub const fn argmax_ucb(mut self, enabled: bool) -> Self {
        self.argmax_ucb = enabled;
        self
    }

    /// Set the byte-mutation-only selector.
    #[must_use]
    pub const fn byte_mutation_only(mut self, enabled: bool) -> Self {
        self.byte_mutation_only = enabled;
        self
    }

    /// Append one progress sample.
    #[must_use]
    pub fn iteration(mut self, snapshot: IterationSnapshot) -> Self {
        self.iterations.push(snapshot);
        self
    }

    /// Append progress samples in order.
    #[must_use]
    pub fn iterations(mut self, snapshots: impl IntoIterator<Item = IterationSnapshot>) -> Self {
        self.iterations.extend(snapshots);
        self
    }

    /// Add one consistent pair.
    #[must_use]
    pub fn consistent_pair(mut self, pair: ParserPair) -> Self {
        self.consistent_pairs.insert(pair);
        self
    }

    /// Add consistent pairs.
    #[must_use]
    pub fn consistent_pairs(mut self, pairs: impl IntoIterator<Item = ParserPair>) -> Self {
        self.consistent_pairs.extend(pairs);
        self
    }

    /// Build the `SessionRecord`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` if a timestamp is negative or non-finite,
    /// timestamps decrease, or a metric value is non-finite.
    pub fn build(self) -> Result<SessionRecord> {
        let mut previous = 0.0_f64;
        for (index, snapshot) in self.iterations.iter().enumerate() {
            let t = snapshot.seconds_used;
            if !t.is_finite() || t < 0.0 {
                return Err(Error::MalformedInput(format!(
                    "{}: iteration {index} has invalid seconds_used {t}",
                    self.label
                )));
            }
            if t < previous {
                return Err(Error::MalformedInput(format!(
                    "{}: iteration {index} goes back in time ({t} < {previous})",
                    self.label
                )));
            }
            previous = t;
            if let Some((name, value)) = snapshot.metrics.iter().find(|(_, v)| !v.is_finite()) {
                return Err(Error::MalformedInput(format!(
                    "{}: iteration {index} has non-finite metric {name} = {value}",
                    self.label
                )));
            }
        }

        Ok(SessionRecord {
            label: self.label,
            argmax_ucb: self.argmax_ucb,
            byte_mutation_only: self.byte_mutation_only,
            iterations: self.iterations,
            consistent_pairs: self.consistent_pairs,
        })
    }
}
