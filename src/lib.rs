// SPDX-License-Identifier: Apache-2.0

//! Multiline log aggregation for tailed files.
//!
//! Physical lines are grouped into logical records using a boundary regex.
//! Reading happens in bounded cycles that never wait for data; a record that
//! is still open when a cycle ends is rolled back and re-read on the next one.

pub mod aggregator;
pub mod buffer;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod init;
pub mod input;
pub mod pattern;
pub mod poller;
pub mod sink;
pub mod source;
pub mod state;

pub use aggregator::{CycleSummary, MultilineReader};
pub use config::{LineDialect, Limits, MatchMode, MultilineConfig};
pub use error::{Error, Result};
pub use sink::{Record, RecordSink};
pub use source::LogSource;
pub use state::SourceState;
