// SPDX-License-Identifier: Apache-2.0

//! Multiline read cycle.
//!
//! A cycle reads physical lines from a stream, classifies each one against the
//! boundary pattern and accumulates them into records that are handed to a
//! sink once complete. A cycle never blocks: it ends at end of input, on a
//! partial line or when the line cap is reached.
//!
//! ## Cursor handling
//!
//! Two cursors bracket the loop:
//! - the rollback point, advanced past every consumed line, restored when a
//!   line is still being written
//! - `SourceState::pending_flush_cursor`, the last position where the buffer
//!   was known to be flushable. A record still open at the end of the cycle
//!   is rolled back to it and re-read on the next cycle. If the previous cycle
//!   already rolled back and no flush happened since, the record is stale and
//!   is flushed as is.

use std::sync::Arc;
use tracing::debug;

use crate::buffer::RecordBuffer;
use crate::config::MultilineConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, OccurrenceTracker, preview};
use crate::error::Result;
use crate::input::{LineRead, LineReader, LineStream};
use crate::pattern::{Boundary, BoundaryClassifier, BoundaryPattern};
use crate::sink::{Record, RecordSink};
use crate::state::SourceState;

/// What happened during one read cycle
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    /// Physical lines read, dropped and skipped lines included
    pub lines_read: usize,
    /// Records handed to the sink
    pub records_delivered: usize,
    /// Records discarded because output is dropped
    pub records_dropped: usize,
    /// Lines dropped for containing zero bytes
    pub corrupted_lines: usize,
    /// Too-long lines and buffer overflows
    pub oversized: usize,
    /// The cycle stopped on a line that is still being written
    pub partial_read: bool,
    /// A record carried over from the previous cycle was flushed as stale
    pub stale_flush: bool,
    /// An open record was rolled back for the next cycle
    pub rolled_back: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl CycleSummary {
    /// Records flushed in this cycle, delivered or dropped
    pub fn records_flushed(&self) -> usize {
        self.records_delivered + self.records_dropped
    }
}

/// Reassembles multiline records from a stream, one cycle at a time.
///
/// The reader holds configuration and scratch memory only; everything that
/// must survive between cycles lives in the caller's [`SourceState`].
pub struct MultilineReader {
    classifier: BoundaryClassifier,
    line_reader: LineReader,
    buffer: RecordBuffer,
    max_lines_per_cycle: usize,
    drop_output: bool,
    sample_log_length: usize,
}

/// Per-cycle context for flushing the record buffer
struct Flush<'a, K: ?Sized> {
    source: &'a Arc<str>,
    sink: &'a mut K,
    drop_output: bool,
    sample_log_length: usize,
}

impl<K: RecordSink + ?Sized> Flush<'_, K> {
    fn dispatch(
        &mut self,
        buffer: &mut RecordBuffer,
        state: &mut SourceState,
        summary: &mut CycleSummary,
    ) -> Result<()> {
        let body = buffer.take();
        debug!(
            source = %self.source,
            "Reading message: '{}'",
            preview(&body, self.sample_log_length)
        );

        if self.drop_output {
            summary.records_dropped += 1;
        } else {
            self.sink.deliver(Record::new(self.source.clone(), body))?;
            summary.records_delivered += 1;
        }

        // The record has been emitted during this cycle
        state.has_unflushed_carryover = false;
        Ok(())
    }
}

impl MultilineReader {
    /// Create a reader from configuration, compiling the boundary pattern
    pub fn new(config: &MultilineConfig) -> Result<Self> {
        config.validate()?;
        let pattern = config.build_pattern()?;
        Self::with_pattern(config, Box::new(pattern))
    }

    /// Create a reader using a custom boundary pattern. `config.pattern` is ignored.
    pub fn with_pattern(
        config: &MultilineConfig,
        pattern: Box<dyn BoundaryPattern>,
    ) -> Result<Self> {
        config.limits.validate()?;
        Ok(Self {
            classifier: BoundaryClassifier::new(pattern, config.negate, config.mode),
            line_reader: LineReader::new(config.limits, config.dialect),
            buffer: RecordBuffer::new(config.limits.max_record_bytes()),
            max_lines_per_cycle: config.max_lines_per_cycle,
            drop_output: config.drop_output,
            sample_log_length: config.sample_log_length,
        })
    }

    pub fn drop_output(&self) -> bool {
        self.drop_output
    }

    /// Discard records instead of delivering them. State tracking is unaffected.
    pub fn set_drop_output(&mut self, drop_output: bool) {
        self.drop_output = drop_output;
    }

    /// Run one read cycle.
    ///
    /// Only stream and sink failures are returned as errors. Malformed input is
    /// dropped or resynchronized and reported through the summary diagnostics.
    pub fn read_cycle<S, K>(
        &mut self,
        source: &Arc<str>,
        stream: &mut S,
        state: &mut SourceState,
        sink: &mut K,
    ) -> Result<CycleSummary>
    where
        S: LineStream + ?Sized,
        K: RecordSink + ?Sized,
    {
        let Self {
            classifier,
            line_reader,
            buffer,
            max_lines_per_cycle,
            drop_output,
            sample_log_length,
        } = self;
        let max_lines = *max_lines_per_cycle;
        let sample = *sample_log_length;

        let mut flush = Flush {
            source,
            sink,
            drop_output: *drop_output,
            sample_log_length: sample,
        };
        let mut summary = CycleSummary::default();
        let mut occurrences = OccurrenceTracker::default();
        buffer.clear();

        let mut rollback = stream.cursor();
        state.pending_flush_cursor = rollback;

        loop {
            if max_lines > 0 && summary.lines_read >= max_lines {
                break;
            }

            let line = match line_reader.read_line(stream)? {
                LineRead::Eof => break,
                LineRead::Partial(partial) => {
                    debug!(
                        source = %source,
                        "Message not complete, trying again: '{}'",
                        preview(partial, sample)
                    );
                    stream.restore(rollback)?;
                    summary.partial_read = true;
                    break;
                }
                LineRead::Corrupted { text, valid, total } => {
                    summary.lines_read += 1;
                    summary.corrupted_lines += 1;
                    let kind = DiagnosticKind::CorruptedLine { valid, total };
                    let diagnostic = Diagnostic {
                        kind,
                        source: source.clone(),
                        preview: preview(&text[..valid], sample),
                        first_occurrence_in_cycle: occurrences.first(&kind),
                    };
                    diagnostic.emit();
                    summary.diagnostics.push(diagnostic);
                    continue;
                }
                LineRead::Skipped { .. } => {
                    summary.lines_read += 1;
                    rollback = stream.cursor();
                    continue;
                }
                LineRead::Line(line) => line,
            };
            summary.lines_read += 1;

            let overflow = match classifier.classify(line.text) {
                Boundary::Starts => {
                    if !buffer.is_empty() {
                        flush.dispatch(buffer, state, &mut summary)?;
                        // Position before this line, the end of the flushed record
                        state.pending_flush_cursor = rollback;
                    }
                    buffer.append(line.text)
                }
                Boundary::Closes => {
                    let overflow = buffer.append(line.text);
                    flush.dispatch(buffer, state, &mut summary)?;
                    state.pending_flush_cursor = stream.cursor();
                    overflow
                }
                Boundary::Continues => buffer.append(line.text),
            };

            debug!(
                source = %source,
                "Reading log line: '{}'",
                preview(line.text, sample)
            );

            if overflow || line.is_too_long() {
                summary.oversized += 1;
                let kind = DiagnosticKind::Oversized {
                    length: line.bytes_read,
                };
                let diagnostic = Diagnostic {
                    kind,
                    source: source.clone(),
                    preview: preview(line.text, sample),
                    first_occurrence_in_cycle: occurrences.first(&kind),
                };
                diagnostic.emit();
                summary.diagnostics.push(diagnostic);

                // Resynchronize on the next terminator. After a too-long read this
                // skips the rest of the physical line, after an overflow of a
                // terminated line it discards the line that follows.
                let drained = line_reader.drain(stream)?;
                debug!(source = %source, drained, "Discarded input after oversized message");
            }

            rollback = stream.cursor();
        }

        if !buffer.is_empty() {
            if state.has_unflushed_carryover {
                // Left behind by the previous cycle and still not closed
                flush.dispatch(buffer, state, &mut summary)?;
                summary.stale_flush = true;
            } else {
                // Re-read the open record next cycle, flush it then at the latest
                buffer.clear();
                stream.restore(state.pending_flush_cursor)?;
                state.has_unflushed_carryover = true;
                summary.rolled_back = true;
            }
        }

        debug!(
            source = %source,
            lines = summary.lines_read,
            records = summary.records_flushed(),
            "Read lines from file"
        );
        Ok(summary)
    }
}
