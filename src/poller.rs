// SPDX-License-Identifier: Apache-2.0

//! Polling driver that runs read cycles on an interval.
//!
//! A cycle never waits for data, so something has to call it again. The
//! poller does that from a tokio interval and runs each cycle on the blocking
//! pool, since file reads and channel sends block.

use std::time::Duration;
use tokio::select;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::input::LineStream;
use crate::sink::RecordSink;
use crate::source::LogSource;

/// Totals across all cycles run by a poller
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollStats {
    pub cycles: u64,
    pub lines_read: u64,
    pub records_flushed: u64,
}

pub struct Poller<S, K> {
    source: LogSource<S>,
    sink: K,
    poll_interval: Duration,
}

impl<S, K> Poller<S, K>
where
    S: LineStream + Send + 'static,
    K: RecordSink + Send + 'static,
{
    pub fn new(source: LogSource<S>, sink: K, poll_interval: Duration) -> Self {
        Self {
            source,
            sink,
            poll_interval,
        }
    }

    /// Poll until cancelled or until a cycle fails.
    ///
    /// Returns the source and sink so the caller can keep or close them.
    pub async fn run(
        self,
        cancel: CancellationToken,
    ) -> Result<(LogSource<S>, K, PollStats)> {
        let Poller {
            mut source,
            mut sink,
            poll_interval,
        } = self;
        let mut stats = PollStats::default();

        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(source = %source.id(), ?poll_interval, "Starting multiline poller");

        loop {
            select! {
                _ = cancel.cancelled() => {
                    info!(
                        source = %source.id(),
                        offset = source.stream().cursor().offset(),
                        carryover = source.state().has_unflushed_carryover,
                        "Multiline poller cancelled"
                    );
                    break;
                }
                _ = interval.tick() => {
                    let (returned_source, returned_sink, result) =
                        tokio::task::spawn_blocking(move || {
                            let result = source.read_cycle(&mut sink);
                            (source, sink, result)
                        })
                        .await
                        .map_err(|e| Error::TaskJoin(e.to_string()))?;
                    source = returned_source;
                    sink = returned_sink;

                    let summary = result?;
                    stats.cycles += 1;
                    stats.lines_read += summary.lines_read as u64;
                    stats.records_flushed += summary.records_flushed() as u64;
                    if summary.lines_read > 0 {
                        debug!(
                            source = %source.id(),
                            lines = summary.lines_read,
                            records = summary.records_flushed(),
                            "Finished read cycle"
                        );
                    }
                }
            }
        }

        Ok((source, sink, stats))
    }
}
