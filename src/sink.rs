// SPDX-License-Identifier: Apache-2.0

//! Destinations for completed records.

use serde::Serialize;
use std::io::Write;
use std::sync::Arc;

use crate::error::{Error, Result};

/// A complete logical record read from a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Identifier of the source the record was read from
    pub source: Arc<str>,
    /// Record content, physical lines joined by `\n`
    pub body: Vec<u8>,
}

impl Record {
    pub fn new(source: Arc<str>, body: Vec<u8>) -> Self {
        Self { source, body }
    }

    /// Length of the record body in bytes
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// The body as text, with invalid UTF-8 replaced
    pub fn body_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Push-style receiver of completed records, called once per record in file order.
pub trait RecordSink {
    fn deliver(&mut self, record: Record) -> Result<()>;
}

impl RecordSink for Vec<Record> {
    fn deliver(&mut self, record: Record) -> Result<()> {
        self.push(record);
        Ok(())
    }
}

impl<T: RecordSink + ?Sized> RecordSink for &mut T {
    fn deliver(&mut self, record: Record) -> Result<()> {
        (**self).deliver(record)
    }
}

/// Sending half of a bounded record channel.
///
/// Delivery blocks while the channel is full, so it must be used from a
/// blocking context (a dedicated thread or `spawn_blocking`).
#[derive(Clone)]
pub struct ChannelSink {
    tx: flume::Sender<Record>,
}

/// Receiving half of a bounded record channel
#[derive(Clone)]
pub struct RecordReceiver {
    rx: flume::Receiver<Record>,
}

/// Create a bounded channel for handing records to a downstream task
pub fn record_channel(size: usize) -> (ChannelSink, RecordReceiver) {
    let (tx, rx) = flume::bounded(size);
    (ChannelSink { tx }, RecordReceiver { rx })
}

impl ChannelSink {
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

impl RecordSink for ChannelSink {
    fn deliver(&mut self, record: Record) -> Result<()> {
        self.tx.send(record).map_err(|_| Error::ChannelSend)
    }
}

impl RecordReceiver {
    /// Wait for the next record, None once all senders are dropped
    pub async fn next(&mut self) -> Option<Record> {
        self.rx.recv_async().await.ok()
    }

    /// Blocking receive, None once all senders are dropped
    pub fn recv_blocking(&self) -> Option<Record> {
        self.rx.recv().ok()
    }

    /// Non-blocking receive
    pub fn try_recv(&self) -> Option<Record> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    source: &'a str,
    len: usize,
    body: &'a str,
}

/// Writes each record as a single JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn deliver(&mut self, record: Record) -> Result<()> {
        let body = record.body_lossy();
        let json = JsonRecord {
            source: &record.source,
            len: record.len(),
            body: &body,
        };
        serde_json::to_writer(&mut self.writer, &json)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
