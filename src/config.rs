// SPDX-License-Identifier: Apache-2.0

//! Configuration for multiline aggregation.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::pattern::RegexPattern;

/// Default size of a message on the wire, header included.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 65536;

/// Default number of bytes reserved for the message header.
pub const DEFAULT_HEADER_RESERVE: usize = 256;

/// Default number of bytes of a line or record included in log previews.
pub const DEFAULT_SAMPLE_LOG_LENGTH: usize = 64;

/// How a boundary line relates to the record it belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Non-matching lines are aggregated with the line before them. A boundary
    /// line flushes the current record and starts a new one.
    #[default]
    MatchAfter,
    /// Non-matching lines are aggregated with the line after them. A boundary
    /// line closes the current record and is flushed with it.
    MatchBefore,
}

/// Line ending dialect of the file being read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineDialect {
    /// Lines end with `\n`, nothing is skipped.
    #[default]
    Unix,
    /// Lines end with `\r\n`. Empty lines and `#` comment lines are skipped.
    Windows,
}

/// Size limits derived from the downstream message size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum size of a message handed downstream, header included
    pub max_message_size: usize,
    /// Bytes reserved for the message header
    pub header_reserve: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            header_reserve: DEFAULT_HEADER_RESERVE,
        }
    }
}

impl Limits {
    pub fn new(max_message_size: usize, header_reserve: usize) -> Self {
        Self {
            max_message_size,
            header_reserve,
        }
    }

    /// Maximum number of bytes consumed by a single physical line read,
    /// terminator included. A read that fills this without a terminator is
    /// treated as a too-long line.
    pub fn max_line_bytes(&self) -> usize {
        self.max_message_size - self.header_reserve - 1
    }

    /// Capacity of the record buffer.
    pub fn max_record_bytes(&self) -> usize {
        self.max_message_size - self.header_reserve - 2
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_message_size <= self.header_reserve + 2 {
            return Err(Error::Config(format!(
                "max_message_size ({}) must be larger than header_reserve + 2 ({})",
                self.max_message_size,
                self.header_reserve + 2
            )));
        }
        Ok(())
    }
}

/// Configuration for a multiline reader
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MultilineConfig {
    /// Boundary regex applied to every line
    pub pattern: String,
    /// Invert the boundary match
    pub negate: bool,
    /// Whether a boundary starts or closes a record
    pub mode: MatchMode,
    /// Maximum physical lines read per cycle, 0 for unbounded
    pub max_lines_per_cycle: usize,
    /// Discard records instead of delivering them (state is still tracked)
    pub drop_output: bool,
    /// Line ending dialect
    pub dialect: LineDialect,
    /// Preview length used in log messages and diagnostics
    pub sample_log_length: usize,
    pub limits: Limits,
}

impl Default for MultilineConfig {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            negate: false,
            mode: MatchMode::MatchAfter,
            max_lines_per_cycle: 0,
            drop_output: false,
            dialect: LineDialect::Unix,
            sample_log_length: DEFAULT_SAMPLE_LOG_LENGTH,
            limits: Limits::default(),
        }
    }
}

impl MultilineConfig {
    /// Create a config with the given boundary pattern and defaults for everything else
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_negate(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    pub fn with_max_lines_per_cycle(mut self, max_lines: usize) -> Self {
        self.max_lines_per_cycle = max_lines;
        self
    }

    pub fn with_drop_output(mut self, drop_output: bool) -> Self {
        self.drop_output = drop_output;
        self
    }

    pub fn with_dialect(mut self, dialect: LineDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.pattern.is_empty() {
            return Err(Error::Config(
                "a multiline boundary pattern must be specified".to_string(),
            ));
        }
        if self.sample_log_length == 0 {
            return Err(Error::Config(
                "sample_log_length must be greater than zero".to_string(),
            ));
        }
        self.limits.validate()
    }

    /// Compile the configured boundary pattern
    pub fn build_pattern(&self) -> Result<RegexPattern> {
        RegexPattern::new(&self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_line_bytes(), 65279);
        assert_eq!(limits.max_record_bytes(), 65278);
    }

    #[test]
    fn test_validate_requires_pattern() {
        let config = MultilineConfig::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = MultilineConfig::new("^\\d");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_small_limits() {
        let config = MultilineConfig::new("^x").with_limits(Limits::new(10, 8));
        assert!(config.validate().is_err());

        let config = MultilineConfig::new("^x").with_limits(Limits::new(16, 8));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: MultilineConfig = serde_json::from_str(
            r#"{"pattern": "^\\[", "mode": "match_before", "dialect": "windows"}"#,
        )
        .unwrap();

        assert_eq!(config.pattern, "^\\[");
        assert_eq!(config.mode, MatchMode::MatchBefore);
        assert_eq!(config.dialect, LineDialect::Windows);
        assert!(!config.negate);
        assert_eq!(config.max_lines_per_cycle, 0);
        assert_eq!(config.sample_log_length, DEFAULT_SAMPLE_LOG_LENGTH);
        assert_eq!(config.limits, Limits::default());
    }

    #[test]
    fn test_build_pattern_invalid() {
        let config = MultilineConfig::new("(unclosed");
        assert!(matches!(config.build_pattern(), Err(Error::Regex(_))));
    }
}
