//! Session Classifier - partition sessions into configuration groups

use super::SessionRecord;
use crate::error::{Error, Rejection};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Experimental variant of the fuzzing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationKind {
    /// Every strategy component enabled.
    Full,
    /// Seed selection by argmax UCB instead of sampling.
    ArgmaxUcb,
    /// Structure-aware mutations disabled.
    ByteMutationOnly,
}

impl ConfigurationKind {
    /// All configurations in report order.
    pub const ALL: [Self; 3] = [Self::Full, Self::ArgmaxUcb, Self::ByteMutationOnly];

    /// Stable snake-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::ArgmaxUcb => "argmax_ucb",
            Self::ByteMutationOnly => "byte_mutation_only",
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Full => 0,
            Self::ArgmaxUcb => 1,
            Self::ByteMutationOnly => 2,
        }
    }
}

impl fmt::Display for ConfigurationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sessions classified into one configuration, in input order.
#[derive(Debug, Clone)]
pub struct ConfigurationGroup<'a> {
    kind: ConfigurationKind,
    sessions: Vec<&'a SessionRecord>,
}

impl<'a> ConfigurationGroup<'a> {
    const fn new(kind: ConfigurationKind) -> Self {
        Self {
            kind,
            sessions: Vec::new(),
        }
    }

    /// Configuration this group holds.
    #[must_use]
    pub const fn kind(&self) -> ConfigurationKind {
        self.kind
    }

    /// Sessions in input order.
    #[must_use]
    pub fn sessions(&self) -> &[&'a SessionRecord] {
        &self.sessions
    }

    /// Number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the group holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// The three configuration groups plus the records the classifier refused.
#[derive(Debug, Clone)]
pub struct ConfigurationGroups<'a> {
    groups: [ConfigurationGroup<'a>; 3],
    rejected: Vec<Rejection>,
}

impl<'a> ConfigurationGroups<'a> {
    /// Group for `kind`.
    #[must_use]
    pub const fn get(&self, kind: ConfigurationKind) -> &ConfigurationGroup<'a> {
        &self.groups[kind.slot()]
    }

    /// Groups in report order (full, argmax_ucb, byte_mutation_only).
    pub fn iter(&self) -> impl Iterator<Item = &ConfigurationGroup<'a>> {
        self.groups.iter()
    }

    /// Session count per configuration, in report order.
    #[must_use]
    pub fn counts(&self) -> Vec<(ConfigurationKind, usize)> {
        self.groups.iter().map(|g| (g.kind, g.len())).collect()
    }

    /// Every classified session, group by group.
    pub fn all_sessions(&self) -> impl Iterator<Item = &'a SessionRecord> + '_ {
        self.groups.iter().flat_map(|g| g.sessions.iter().copied())
    }

    /// Total number of classified sessions.
    #[must_use]
    pub fn classified_count(&self) -> usize {
        self.groups.iter().map(ConfigurationGroup::len).sum()
    }

    /// Records excluded from every group.
    #[must_use]
    pub fn rejected(&self) -> &[Rejection] {
        &self.rejected
    }
}

/// Partition sessions into the three configuration groups.
///
/// A session with both selectors set is reported and placed in no group;
/// every other session lands in exactly one group, keeping input order.
#[must_use]
pub fn classify<'a, I>(sessions: I) -> ConfigurationGroups<'a>
where
    I: IntoIterator<Item = &'a SessionRecord>,
{
    let mut groups = ConfigurationKind::ALL.map(ConfigurationGroup::new);
    let mut rejected = Vec::new();

    for session in sessions {
        let kind = match (session.argmax_ucb(), session.byte_mutation_only()) {
            (true, true) => {
                let error = Error::MalformedInput(format!(
                    "{}: both argmax_ucb and byte_mutation_only are enabled",
                    session.label()
                ));
                warn!(session = session.label(), "{error}");
                rejected.push(Rejection::from_error(session.label(), &error));
                continue;
            }
            (true, false) => ConfigurationKind::ArgmaxUcb,
            (false, true) => ConfigurationKind::ByteMutationOnly,
            (false, false) => ConfigurationKind::Full,
        };
        groups[kind.slot()].sessions.push(session);
    }

    for group in &groups {
        info!(configuration = %group.kind, sessions = group.len(), "{}: {} sessions", group.kind, group.len());
    }

    ConfigurationGroups { groups, rejected }
}
