//! Loading collaborator - session and matrix JSON files to typed records
//!
//! Session files are the fuzzer's stats dumps:
//!
//! ```json
//! {
//!   "argmax_ucb": false,
//!   "byte_mutation_only": false,
//!   "iterations": [
//!     {"input_count": 500, "corpus_size": 12, "incons_count": 410, "seconds_used": 61.2}
//!   ],
//!   "consistent_pairs": [["7z", "libzip"], ["go", "rust-zip"]]
//! }
//! ```
//!
//! Missing selectors default to `false`, missing `iterations` to empty, and
//! every numeric iteration field other than `seconds_used` becomes a metric.
//! Parser references may be indices or names; names are interned through a
//! [`ParserCatalog`] shared by the whole batch.
//!
//! The matrix file is a row-major list of
//! `{"parsers": [a, b], "inconsistency_types": [..]}` entries.

use crate::error::{Error, Rejection, Result};
use crate::matrix::PairwiseMatrix;
use crate::session::{IterationSnapshot, ParserIndex, ParserPair, SessionRecord};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Name-to-index table for parsers referenced by name.
///
/// Indices are handed out in first-seen order, so a batch loaded in the same
/// file order always maps names identically. Name indices start at `0` and
/// share the space of raw integer references; a batch using both styles is
/// flagged and logged once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserCatalog {
    by_name: BTreeMap<String, ParserIndex>,
    names: Vec<String>,
    saw_indices: bool,
    mixed: bool,
}

impl ParserCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with `names` pre-assigned to indices `0..`.
    #[must_use]
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self::new();
        for name in names {
            catalog.intern(&name.into());
        }
        catalog
    }

    /// Index for `name`, assigning the next free one if unseen.
    pub fn intern(&mut self, name: &str) -> ParserIndex {
        if let Some(&index) = self.by_name.get(name) {
            return index;
        }
        #[allow(clippy::cast_possible_truncation)]
        let index = ParserIndex(self.names.len() as u32);
        self.by_name.insert(name.to_string(), index);
        self.names.push(name.to_string());
        index
    }

    /// Name registered for `index`, if any.
    #[must_use]
    pub fn name(&self, index: ParserIndex) -> Option<&str> {
        self.names.get(index.0 as usize).map(String::as_str)
    }

    /// Number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no names are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether the batch referenced parsers both by name and by raw index.
    #[must_use]
    pub const fn mixes_reference_styles(&self) -> bool {
        self.mixed
    }

    fn note_index(&mut self, index: ParserIndex) {
        self.saw_indices = true;
        if !self.names.is_empty() {
            self.flag_mixed(index);
        }
    }

    fn flag_mixed(&mut self, index: ParserIndex) {
        if self.mixed {
            return;
        }
        self.mixed = true;
        warn!(
            index = %index,
            names = self.names.len(),
            "parser names and raw indices are mixed; name indices overlap raw indices"
        );
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ParserRef {
    Index(u32),
    Name(String),
}

#[derive(Debug, Deserialize)]
struct RawIteration {
    seconds_used: Option<f64>,
    #[serde(flatten)]
    fields: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawSession {
    #[serde(default)]
    argmax_ucb: bool,
    #[serde(default)]
    byte_mutation_only: bool,
    #[serde(default)]
    iterations: Vec<RawIteration>,
    consistent_pairs: Option<Vec<(ParserRef, ParserRef)>>,
}

/// Parse one session document.
///
/// `catalog` is only updated if the whole document is valid.
///
/// # Errors
///
/// Returns `Json` for undecodable input and `MalformedInput` for a missing
/// `consistent_pairs`, a missing or invalid `seconds_used`, decreasing
/// timestamps or non-finite metrics.
pub fn read_session<R: Read>(
    reader: R,
    label: &str,
    catalog: &mut ParserCatalog,
) -> Result<SessionRecord> {
    let raw: RawSession = serde_json::from_reader(reader)?;

    let raw_pairs = raw.consistent_pairs.ok_or_else(|| {
        Error::MalformedInput(format!("{label}: missing `consistent_pairs`"))
    })?;

    let iterations = raw
        .iterations
        .into_iter()
        .enumerate()
        .map(|(index, it)| {
            let seconds_used = it.seconds_used.ok_or_else(|| {
                Error::MalformedInput(format!("{label}: iteration {index} has no `seconds_used`"))
            })?;
            let snapshot = it
                .fields
                .into_iter()
                .filter_map(|(name, value)| match value.as_f64() {
                    Some(v) => Some((name, v)),
                    None => {
                        debug!(session = label, field = %name, "ignoring non-numeric iteration field");
                        None
                    }
                })
                .fold(IterationSnapshot::new(seconds_used), |s, (name, v)| {
                    s.with_metric(name, v)
                });
            Ok(snapshot)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut staged = catalog.clone();
    let pairs: Vec<ParserPair> = raw_pairs
        .into_iter()
        .map(|(a, b)| ParserPair::from_indices(resolve(&mut staged, a), resolve(&mut staged, b)))
        .collect();

    let session = SessionRecord::builder(label)
        .argmax_ucb(raw.argmax_ucb)
        .byte_mutation_only(raw.byte_mutation_only)
        .iterations(iterations)
        .consistent_pairs(pairs)
        .build()?;

    *catalog = staged;
    Ok(session)
}

fn resolve(catalog: &mut ParserCatalog, parser: ParserRef) -> ParserIndex {
    match parser {
        ParserRef::Index(i) => {
            let index = ParserIndex(i);
            catalog.note_index(index);
            index
        }
        ParserRef::Name(name) => {
            let index = catalog.intern(&name);
            if catalog.saw_indices {
                catalog.flag_mixed(index);
            }
            index
        }
    }
}

/// Load one session file, labelled with its path.
///
/// # Errors
///
/// See [`read_session`]; also returns `Io` if the file cannot be opened.
pub fn load_session_file<P: AsRef<Path>>(path: P, catalog: &mut ParserCatalog) -> Result<SessionRecord> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_session(BufReader::new(file), &path.display().to_string(), catalog)
}

/// Sessions that loaded, plus the files that did not.
#[derive(Debug, Clone, Default)]
pub struct LoadedSessions {
    /// Valid sessions in file order.
    pub sessions: Vec<SessionRecord>,
    /// Files that were reported and skipped.
    pub rejected: Vec<Rejection>,
}

/// Load every file in `paths`, skipping (and reporting) the ones that fail.
#[must_use]
pub fn load_session_files<I, P>(paths: I, catalog: &mut ParserCatalog) -> LoadedSessions
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut loaded = LoadedSessions::default();
    for path in paths {
        let path = path.as_ref();
        match load_session_file(path, catalog) {
            Ok(session) => {
                info!(file = %path.display(), "loaded session");
                loaded.sessions.push(session);
            }
            Err(error) => {
                warn!(file = %path.display(), "skipping session file: {error}");
                loaded
                    .rejected
                    .push(Rejection::from_error(path.display().to_string(), &error));
            }
        }
    }
    loaded
}

#[derive(Debug, Deserialize)]
struct RawMatrixCell {
    #[serde(default)]
    inconsistency_types: BTreeSet<String>,
}

/// Parse a row-major pairwise matrix document.
///
/// With `dimension = None` the side length is inferred from the entry count.
///
/// # Errors
///
/// Returns `EmptyInput` for an empty list, `MalformedInput` for a non-square
/// entry count or a mismatch with `dimension`, and `Json` for undecodable input.
pub fn read_matrix<R: Read>(reader: R, dimension: Option<usize>) -> Result<PairwiseMatrix> {
    let raw: Vec<RawMatrixCell> = serde_json::from_reader(reader)?;
    if raw.is_empty() {
        return Err(Error::EmptyInput("matrix file has no entries".to_string()));
    }

    let n = match dimension {
        Some(n) => n,
        None => square_side(raw.len()).ok_or_else(|| {
            Error::MalformedInput(format!("{} matrix entries do not form a square", raw.len()))
        })?,
    };

    PairwiseMatrix::new(n, raw.into_iter().map(|c| c.inconsistency_types).collect())
}

/// Load a pairwise matrix file.
///
/// # Errors
///
/// See [`read_matrix`]; also returns `Io` if the file cannot be opened.
pub fn load_matrix_file<P: AsRef<Path>>(path: P, dimension: Option<usize>) -> Result<PairwiseMatrix> {
    let file = File::open(path.as_ref())?;
    read_matrix(BufReader::new(file), dimension)
}

fn square_side(len: usize) -> Option<usize> {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let guess = (len as f64).sqrt().round() as usize;
    (guess.checked_mul(guess) == Some(len)).then_some(guess)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_minimal_session() {
        let json = r#"{"consistent_pairs": []}"#;
        let mut catalog = ParserCatalog::new();
        let session = read_session(json.as_bytes(), "s", &mut catalog).unwrap();
        assert!(!session.argmax_ucb());
        assert!(!session.byte_mutation_only());
        assert!(session.iterations().is_empty());
    }

    #[test]
    fn test_iteration_fields_become_metrics() {
        let json = r#"{
            "iterations": [{"input_count": 5, "incons_count": 2, "seconds_used": 1.5, "note": "x"}],
            "consistent_pairs": []
        }"#;
        let session = read_session(json.as_bytes(), "s", &mut ParserCatalog::new()).unwrap();
        let it = &session.iterations()[0];
        assert!((it.seconds_used() - 1.5).abs() < f64::EPSILON);
        assert!((it.metric("incons_count") - 2.0).abs() < f64::EPSILON);
        assert!((it.metric("input_count") - 5.0).abs() < f64::EPSILON);
        assert!(it.metric_opt("note").is_none());
        assert!(it.metric_opt("seconds_used").is_none());
    }

    #[test]
    fn test_names_interned_in_first_seen_order() {
        let json = r#"{"consistent_pairs": [["zip", "7z"], ["7z", "go"]]}"#;
        let mut catalog = ParserCatalog::new();
        let session = read_session(json.as_bytes(), "s", &mut catalog).unwrap();
        assert_eq!(catalog.name(ParserIndex(0)), Some("zip"));
        assert_eq!(catalog.name(ParserIndex(1)), Some("7z"));
        assert!(session.consistent_pairs().contains(&ParserPair::new(1, 0)));
        assert!(session.consistent_pairs().contains(&ParserPair::new(1, 2)));
    }

    #[test]
    fn test_index_refs_pass_through() {
        let json = r#"{"consistent_pairs": [[4, 2]]}"#;
        let mut catalog = ParserCatalog::new();
        let session = read_session(json.as_bytes(), "s", &mut catalog).unwrap();
        assert!(session.consistent_pairs().contains(&ParserPair::new(2, 4)));
        assert!(catalog.is_empty());
        assert!(!catalog.mixes_reference_styles());
    }

    #[test]
    fn test_mixed_reference_styles_are_flagged() {
        let mut catalog = ParserCatalog::new();
        read_session(r#"{"consistent_pairs": [["zip", "7z"]]}"#.as_bytes(), "named", &mut catalog)
            .unwrap();
        assert!(!catalog.mixes_reference_styles());

        let session =
            read_session(r#"{"consistent_pairs": [[0, 5]]}"#.as_bytes(), "raw", &mut catalog)
                .unwrap();
        assert!(catalog.mixes_reference_styles());
        // "zip" and raw 0 share an index
        assert_eq!(catalog.name(ParserIndex(0)), Some("zip"));
        assert!(session.consistent_pairs().contains(&ParserPair::new(0, 5)));
    }

    #[test]
    fn test_names_after_indices_are_flagged() {
        let json = r#"{"consistent_pairs": [[3, 1], ["go", "zip"]]}"#;
        let mut catalog = ParserCatalog::new();
        read_session(json.as_bytes(), "s", &mut catalog).unwrap();
        assert!(catalog.mixes_reference_styles());
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_missing_pairs_is_malformed() {
        let json = r#"{"iterations": []}"#;
        let err = read_session(json.as_bytes(), "s", &mut ParserCatalog::new()).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn test_missing_seconds_is_malformed() {
        let json = r#"{"iterations": [{"incons_count": 1}], "consistent_pairs": []}"#;
        let err = read_session(json.as_bytes(), "s", &mut ParserCatalog::new()).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn test_failed_session_leaves_catalog_untouched() {
        let json = r#"{
            "iterations": [{"seconds_used": 2.0}, {"seconds_used": 1.0}],
            "consistent_pairs": [["a", "b"]]
        }"#;
        let mut catalog = ParserCatalog::new();
        assert!(read_session(json.as_bytes(), "s", &mut catalog).is_err());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_invalid_json_is_json_error() {
        let err = read_session("{".as_bytes(), "s", &mut ParserCatalog::new()).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_read_matrix_infers_dimension() {
        let json = r#"[
            {"parsers": ["a", "a"], "inconsistency_types": []},
            {"parsers": ["a", "b"], "inconsistency_types": ["a1", "c2"]},
            {"parsers": ["b", "a"], "inconsistency_types": ["a1", "c2"]},
            {"parsers": ["b", "b"], "inconsistency_types": []}
        ]"#;
        let matrix = read_matrix(json.as_bytes(), None).unwrap();
        assert_eq!(matrix.dimension(), 2);
        assert_eq!(matrix.cell(0, 1).map(BTreeSet::len), Some(2));
    }

    #[test]
    fn test_read_matrix_rejects_non_square() {
        let json = r#"[{"inconsistency_types": []}, {"inconsistency_types": []}]"#;
        assert!(matches!(
            read_matrix(json.as_bytes(), None),
            Err(Error::MalformedInput(_))
        ));
        assert!(matches!(
            read_matrix(json.as_bytes(), Some(3)),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn test_read_matrix_empty() {
        assert!(matches!(
            read_matrix("[]".as_bytes(), None),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn test_square_side() {
        assert_eq!(square_side(2500), Some(50));
        assert_eq!(square_side(1), Some(1));
        assert_eq!(square_side(3), None);
    }
}
