// SPDX-License-Identifier: Apache-2.0

//! Structured reports of malformed input.
//!
//! What happened is captured in a [`Diagnostic`]; how loudly it is logged is
//! decided by `first_occurrence_in_cycle`. The first occurrence of a kind in a
//! cycle is escalated, repeats are demoted to debug.

use std::sync::Arc;
use tracing::{debug, error, warn};

/// Kind of malformed input encountered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A line containing zero bytes was dropped
    CorruptedLine {
        /// Bytes before the first zero byte
        valid: usize,
        /// Line length without terminator
        total: usize,
    },
    /// A line exceeded the maximum line length or overflowed the record buffer
    Oversized {
        /// Bytes read for the offending line
        length: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub source: Arc<str>,
    /// Bounded prefix of the offending content
    pub preview: String,
    pub first_occurrence_in_cycle: bool,
}

impl Diagnostic {
    /// Log the diagnostic at the severity its occurrence calls for
    pub fn emit(&self) {
        match (self.kind, self.first_occurrence_in_cycle) {
            (DiagnosticKind::Oversized { length }, true) => error!(
                source = %self.source,
                length,
                "Large message size from file: '{}'",
                self.preview
            ),
            (DiagnosticKind::Oversized { length }, false) => debug!(
                source = %self.source,
                length,
                "Large message size from file: '{}'",
                self.preview
            ),
            (DiagnosticKind::CorruptedLine { valid, total }, true) => warn!(
                source = %self.source,
                valid,
                total,
                "Line contains zero-bytes, dropping line"
            ),
            (DiagnosticKind::CorruptedLine { valid, total }, false) => debug!(
                source = %self.source,
                valid,
                total,
                "Line contains zero-bytes, dropping line"
            ),
        }
    }
}

/// Tracks which diagnostic kinds were already reported in the current cycle.
#[derive(Debug, Default)]
pub(crate) struct OccurrenceTracker {
    corrupted: bool,
    oversized: bool,
}

impl OccurrenceTracker {
    /// Returns true the first time a kind is seen
    pub(crate) fn first(&mut self, kind: &DiagnosticKind) -> bool {
        let seen = match kind {
            DiagnosticKind::CorruptedLine { .. } => &mut self.corrupted,
            DiagnosticKind::Oversized { .. } => &mut self.oversized,
        };
        !std::mem::replace(seen, true)
    }
}

/// Render at most `max` bytes of content for logging, marking cut content with `...`
pub fn preview(content: &[u8], max: usize) -> String {
    if content.len() > max {
        format!("{}...", String::from_utf8_lossy(&content[..max]))
    } else {
        String::from_utf8_lossy(content).into_owned()
    }
}
