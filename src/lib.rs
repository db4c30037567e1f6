//! # fuzz-stats: Statistical Reduction for Differential Fuzzing Campaigns
//!
//! Differential fuzzing campaigns compare a fixed set of parser
//! implementations and record, per session, a progress time-series and the
//! set of parser pairs that never disagreed. fuzz-stats reduces many such
//! sessions into comparable aggregates:
//!
//! - time-normalised median progress curves per experimental configuration
//! - per-configuration and global agreement statistics over parser pairs
//! - per-cell counts and totals for a pairwise inconsistency-type matrix
//!
//! ## Pipeline
//!
//! ```text
//! session files ─load─> SessionRecord ─classify─> ConfigurationGroups
//!                                                   ├─ interpolate + median ─> AggregateCurve
//!                                                   └─ intersect            ─> ConsistencyReport
//! matrix file ─load─> PairwiseMatrix ─reduce─> MatrixSummary
//! ```
//!
//! Everything is a pure function over data already in memory; identical
//! inputs produce bit-identical curves and identical pair sets.
//!
//! ## Example Usage
//!
//! ```rust
//! use fuzz_stats::session::{IterationSnapshot, ParserPair, SessionRecord};
//! use fuzz_stats::{pipeline, StatsConfig};
//!
//! let session = SessionRecord::builder("run-1")
//!     .iteration(IterationSnapshot::new(0.0).with_metric("incons_count", 10.0))
//!     .iteration(IterationSnapshot::new(10.0).with_metric("incons_count", 20.0))
//!     .consistent_pair(ParserPair::new(0, 1))
//!     .build()?;
//!
//! let config = StatsConfig::builder().horizon_seconds(20.0).grid_points(5).build()?;
//! let report = pipeline::run(&[session], &config)?;
//! assert_eq!(report.total_pairs, 21);
//! # Ok::<(), fuzz_stats::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod consistency;
pub mod error;
pub mod export;
pub mod load;
pub mod matrix;
pub mod outcome;
pub mod pipeline;
pub mod series;
pub mod session;

pub use config::StatsConfig;
pub use error::{Error, Rejection, RejectionKind, Result};
pub use outcome::Outcome;
