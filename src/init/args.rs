// SPDX-License-Identifier: Apache-2.0

use clap::{Args, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    DEFAULT_HEADER_RESERVE, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_SAMPLE_LOG_LENGTH, LineDialect,
    Limits, MatchMode, MultilineConfig,
};
use crate::input::StartAt;

/// Which side of a record the boundary line belongs to
#[derive(Copy, Clone, Debug, Default, ValueEnum, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchArg {
    /// A boundary line starts a new record
    #[default]
    After,
    /// A boundary line closes the current record
    Before,
}

impl From<MatchArg> for MatchMode {
    fn from(m: MatchArg) -> Self {
        match m {
            MatchArg::After => MatchMode::MatchAfter,
            MatchArg::Before => MatchMode::MatchBefore,
        }
    }
}

/// Line ending dialect of the tailed file
#[derive(Copy, Clone, Debug, Default, ValueEnum, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DialectArg {
    #[default]
    Unix,
    /// Strip `\r`, skip blank and `#` comment lines
    Windows,
}

impl From<DialectArg> for LineDialect {
    fn from(d: DialectArg) -> Self {
        match d {
            DialectArg::Unix => LineDialect::Unix,
            DialectArg::Windows => LineDialect::Windows,
        }
    }
}

/// Where to start reading the file
#[derive(Copy, Clone, Debug, Default, ValueEnum, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StartAtArg {
    /// Start at the beginning of the file
    Beginning,
    /// Start at the end of the file (tail mode)
    #[default]
    End,
}

impl From<StartAtArg> for StartAt {
    fn from(s: StartAtArg) -> Self {
        match s {
            StartAtArg::Beginning => StartAt::Beginning,
            StartAtArg::End => StartAt::End,
        }
    }
}

#[derive(Debug, Clone, Args, Deserialize)]
#[serde(default)]
pub struct MultilineArgs {
    /// File to tail
    #[arg(long, env = "ROTEL_MULTILINE_PATH")]
    pub path: PathBuf,

    /// Boundary regex applied to every line
    #[arg(long, env = "ROTEL_MULTILINE_PATTERN")]
    pub pattern: String,

    /// Invert the boundary match
    #[arg(long, env = "ROTEL_MULTILINE_NEGATE", default_value = "false")]
    pub negate: bool,

    /// Whether a boundary line starts (after) or closes (before) a record
    #[arg(
        long = "match",
        value_enum,
        env = "ROTEL_MULTILINE_MATCH",
        default_value = "after"
    )]
    pub match_mode: MatchArg,

    /// Maximum physical lines read per cycle, 0 for unbounded
    #[arg(long, env = "ROTEL_MULTILINE_MAX_LINES", default_value = "0")]
    pub max_lines: usize,

    /// Line ending dialect
    #[arg(
        long,
        value_enum,
        env = "ROTEL_MULTILINE_DIALECT",
        default_value = "unix"
    )]
    pub dialect: DialectArg,

    /// Where to start reading the file
    #[arg(
        long,
        value_enum,
        env = "ROTEL_MULTILINE_START_AT",
        default_value = "end"
    )]
    pub start_at: StartAtArg,

    /// Interval in milliseconds between read cycles
    #[arg(long, env = "ROTEL_MULTILINE_POLL_INTERVAL_MS", default_value = "250")]
    pub poll_interval_ms: u64,

    /// Discard records instead of writing them out
    #[arg(long, env = "ROTEL_MULTILINE_DROP_OUTPUT", default_value = "false")]
    pub drop_output: bool,

    /// Maximum size of a single message, including the header reserve
    #[arg(
        long,
        env = "ROTEL_MULTILINE_MAX_MESSAGE_SIZE",
        default_value_t = DEFAULT_MAX_MESSAGE_SIZE
    )]
    pub max_message_size: usize,

    /// Bytes of the message size kept back for the header
    #[arg(
        long,
        env = "ROTEL_MULTILINE_HEADER_RESERVE",
        default_value_t = DEFAULT_HEADER_RESERVE
    )]
    pub header_reserve: usize,

    /// Number of bytes of a line shown in diagnostics
    #[arg(
        long,
        env = "ROTEL_MULTILINE_SAMPLE_LOG_LENGTH",
        default_value_t = DEFAULT_SAMPLE_LOG_LENGTH
    )]
    pub sample_log_length: usize,

    /// Capacity of the channel between the reader and the output writer
    #[arg(long, env = "ROTEL_MULTILINE_CHANNEL_SIZE", default_value = "1000")]
    pub channel_size: usize,
}

impl Default for MultilineArgs {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            pattern: String::new(),
            negate: false,
            match_mode: MatchArg::After,
            max_lines: 0,
            dialect: DialectArg::Unix,
            start_at: StartAtArg::End,
            poll_interval_ms: 250,
            drop_output: false,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            header_reserve: DEFAULT_HEADER_RESERVE,
            sample_log_length: DEFAULT_SAMPLE_LOG_LENGTH,
            channel_size: 1000,
        }
    }
}

impl MultilineArgs {
    /// Build the reader config from command line args
    pub fn build_config(&self) -> MultilineConfig {
        MultilineConfig {
            pattern: self.pattern.clone(),
            negate: self.negate,
            mode: self.match_mode.into(),
            max_lines_per_cycle: self.max_lines,
            drop_output: self.drop_output,
            dialect: self.dialect.into(),
            sample_log_length: self.sample_log_length,
            limits: Limits::new(self.max_message_size, self.header_reserve),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
