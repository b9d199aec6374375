// SPDX-License-Identifier: Apache-2.0

use std::io;

use super::stream::LineStream;
use crate::config::{LineDialect, Limits};

/// How a physical line ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// The line ended with `\n`, which has been stripped
    Newline,
    /// No `\n` within the maximum line length; the read was cut there
    TooLong,
}

/// A physical line borrowed from the reader's scratch buffer
#[derive(Debug, PartialEq, Eq)]
pub struct Line<'a> {
    /// Line content without terminator
    pub text: &'a [u8],
    /// Bytes consumed from the stream, terminator included
    pub bytes_read: usize,
    pub terminator: Terminator,
}

impl Line<'_> {
    pub fn is_too_long(&self) -> bool {
        self.terminator == Terminator::TooLong
    }
}

/// Outcome of a single line read
#[derive(Debug, PartialEq, Eq)]
pub enum LineRead<'a> {
    /// A line ready for classification
    Line(Line<'a>),
    /// A terminated line containing zero bytes. `valid` is the length up to
    /// the first zero byte, `total` the length without terminator.
    Corrupted {
        text: &'a [u8],
        valid: usize,
        total: usize,
    },
    /// A line consumed but ignored by the dialect (empty or comment line)
    Skipped { bytes_read: usize },
    /// End of input reached before a terminator; the producer is still
    /// writing this line. The bytes were consumed from the stream and the
    /// caller is expected to roll back.
    Partial(&'a [u8]),
    /// Nothing left to read
    Eof,
}

/// Reads and classifies one physical line at a time.
///
/// The reader owns a scratch buffer that is reused between reads, so a
/// [`Line`] is only valid until the next call.
pub struct LineReader {
    scratch: Vec<u8>,
    max_line_bytes: usize,
    dialect: LineDialect,
}

impl LineReader {
    pub fn new(limits: Limits, dialect: LineDialect) -> Self {
        Self {
            scratch: Vec::new(),
            max_line_bytes: limits.max_line_bytes(),
            dialect,
        }
    }

    /// Maximum bytes consumed by a single read
    pub fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    /// Read the next physical line from the stream
    pub fn read_line<S: LineStream + ?Sized>(&mut self, stream: &mut S) -> io::Result<LineRead<'_>> {
        self.scratch.clear();
        let bytes_read = stream.read_bounded_line(&mut self.scratch, self.max_line_bytes)?;
        if bytes_read == 0 {
            return Ok(LineRead::Eof);
        }

        let terminator = if self.scratch.last() == Some(&b'\n') {
            self.scratch.pop();
            if let Some(valid) = self.scratch.iter().position(|b| *b == 0) {
                return Ok(LineRead::Corrupted {
                    text: &self.scratch,
                    valid,
                    total: self.scratch.len(),
                });
            }
            Terminator::Newline
        } else if bytes_read == self.max_line_bytes {
            // Cut as if terminated, the last byte read gives way to the terminator
            self.scratch.pop();
            Terminator::TooLong
        } else {
            return Ok(LineRead::Partial(&self.scratch));
        };

        if self.dialect == LineDialect::Windows {
            if self.scratch.last() == Some(&b'\r') {
                self.scratch.pop();
            }
            if bytes_read <= 2 || self.scratch.first() == Some(&b'#') {
                return Ok(LineRead::Skipped { bytes_read });
            }
        }

        Ok(LineRead::Line(Line {
            text: &self.scratch,
            bytes_read,
            terminator,
        }))
    }

    /// Resynchronize on the next line terminator.
    ///
    /// Reads until a read ends with `\n` or the stream is exhausted and
    /// returns the number of bytes discarded. At least one read is made, so
    /// when the previous read was terminated the whole next line is dropped.
    pub fn drain<S: LineStream + ?Sized>(&mut self, stream: &mut S) -> io::Result<usize> {
        let mut drained = 0;
        loop {
            self.scratch.clear();
            let bytes_read = stream.read_bounded_line(&mut self.scratch, self.max_line_bytes)?;
            if bytes_read == 0 {
                break;
            }
            drained += bytes_read;
            if self.scratch.last() == Some(&b'\n') {
                break;
            }
        }
        Ok(drained)
    }
}
