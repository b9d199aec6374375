// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::sync::Arc;

use crate::aggregator::{CycleSummary, MultilineReader};
use crate::config::MultilineConfig;
use crate::error::Result;
use crate::input::{FileStream, LineStream, StartAt};
use crate::sink::RecordSink;
use crate::state::SourceState;

/// A stream being tailed, together with its reader and cross-cycle state.
///
/// Created when the file is opened and dropped when it is closed or rotated.
pub struct LogSource<S> {
    id: Arc<str>,
    stream: S,
    reader: MultilineReader,
    state: SourceState,
}

impl LogSource<FileStream> {
    /// Open a file as a source, using its path as the source id
    pub fn open(
        path: impl AsRef<Path>,
        config: &MultilineConfig,
        start_at: StartAt,
    ) -> Result<Self> {
        let path = path.as_ref();
        let reader = MultilineReader::new(config)?;
        let stream = FileStream::open(path, start_at)?;
        Ok(Self::new(path.display().to_string(), stream, reader))
    }
}

impl<S: LineStream> LogSource<S> {
    pub fn new(id: impl Into<Arc<str>>, stream: S, reader: MultilineReader) -> Self {
        Self {
            id: id.into(),
            stream,
            reader,
            state: SourceState::default(),
        }
    }

    /// Resume from previously saved state
    pub fn with_state(mut self, state: SourceState) -> Self {
        self.state = state;
        self
    }

    /// Resume from a checkpoint, moving the stream back to where the saved
    /// state expects the next cycle to start reading
    pub fn resume(mut self, state: SourceState) -> Result<Self> {
        self.stream.restore(state.pending_flush_cursor)?;
        Ok(self.with_state(state))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Run one read cycle, delivering completed records to `sink`
    pub fn read_cycle<K: RecordSink + ?Sized>(&mut self, sink: &mut K) -> Result<CycleSummary> {
        self.reader
            .read_cycle(&self.id, &mut self.stream, &mut self.state, sink)
    }
}
