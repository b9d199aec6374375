// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::input::Cursor;

/// Per-source state carried between read cycles.
///
/// The caller keeps this alongside the open stream and hands it to every
/// cycle. Nothing else survives a cycle: a record still open at the end of a
/// cycle is re-read from `pending_flush_cursor` on the next one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceState {
    /// Last cursor at which the record buffer was known to be flushable
    pub pending_flush_cursor: Cursor,
    /// The previous cycle ended with an unflushed record and rolled back to re-read it
    pub has_unflushed_carryover: bool,
}

impl SourceState {
    pub fn new() -> Self {
        Self::default()
    }
}
