// SPDX-License-Identifier: Apache-2.0

//! Boundary classification of physical lines.

use regex::bytes::Regex;

use crate::config::MatchMode;
use crate::error::{Error, Result};

/// A predicate deciding whether a line is a record boundary.
pub trait BoundaryPattern: Send + Sync {
    fn is_match(&self, line: &[u8]) -> bool;
}

/// A boundary pattern backed by a regular expression.
///
/// Matching runs over raw bytes so lines that are not valid UTF-8 are still
/// classified.
#[derive(Debug, Clone)]
pub struct RegexPattern {
    regex: Regex,
}

impl RegexPattern {
    /// Compile a new pattern from a regex string
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| Error::Regex(format!("invalid multiline pattern: {}", e)))?;
        Ok(Self { regex })
    }

    /// Get the pattern source
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl BoundaryPattern for RegexPattern {
    fn is_match(&self, line: &[u8]) -> bool {
        self.regex.is_match(line)
    }
}

/// What a line means for the record being accumulated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Flush the current record, then start a new one with this line
    Starts,
    /// Append this line, then flush the record
    Closes,
    /// Append this line without flushing
    Continues,
}

/// Applies a pattern, negation and match mode to classify lines.
pub struct BoundaryClassifier {
    pattern: Box<dyn BoundaryPattern>,
    negate: bool,
    mode: MatchMode,
}

impl BoundaryClassifier {
    pub fn new(pattern: Box<dyn BoundaryPattern>, negate: bool, mode: MatchMode) -> Self {
        Self {
            pattern,
            negate,
            mode,
        }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Whether the line is a boundary line: `match XOR negate`.
    pub fn is_boundary(&self, line: &[u8]) -> bool {
        self.pattern.is_match(line) ^ self.negate
    }

    pub fn classify(&self, line: &[u8]) -> Boundary {
        if !self.is_boundary(line) {
            return Boundary::Continues;
        }
        match self.mode {
            MatchMode::MatchAfter => Boundary::Starts,
            MatchMode::MatchBefore => Boundary::Closes,
        }
    }
}
