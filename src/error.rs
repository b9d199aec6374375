// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors that abort a read cycle or prevent a source from being built.
///
/// Malformed input (corrupted or oversized lines, partial reads) never
/// surfaces here; the reader degrades to dropping or resynchronizing instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Regex error: {0}")]
    Regex(String),

    #[error("Channel send error")]
    ChannelSend,

    #[error("Task join error: {0}")]
    TaskJoin(String),
}

pub type Result<T> = std::result::Result<T, Error>;
