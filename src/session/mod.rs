//! Session records and configuration classification
//!
//! ## Schema Overview
//!
//! ```text
//! SessionRecord (1) ──< IterationSnapshot (N) [time-series, chronological]
//!        │
//!        └── consistent_pairs: {ParserPair}
//!
//! classify(&[SessionRecord]) ──> ConfigurationGroups
//!                                  ├── full
//!                                  ├── argmax_ucb
//!                                  └── byte_mutation_only
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use fuzz_stats::session::{classify, ConfigurationKind, IterationSnapshot, ParserPair, SessionRecord};
//!
//! let session = SessionRecord::builder("run-1")
//!     .argmax_ucb(true)
//!     .iteration(IterationSnapshot::new(10.0).with_metric("incons_count", 4.0))
//!     .consistent_pair(ParserPair::new(0, 1))
//!     .build()?;
//!
//! let sessions = [session];
//! let groups = classify(&sessions);
//! assert_eq!(groups.get(ConfigurationKind::ArgmaxUcb).len(), 1);
//! # Ok::<(), fuzz_stats::Error>(())
//! ```

mod classify;
mod record;

pub use classify::{classify, ConfigurationGroup, ConfigurationGroups, ConfigurationKind};
pub use record::{IterationSnapshot, ParserIndex, ParserPair, SessionRecord, SessionRecordBuilder};
