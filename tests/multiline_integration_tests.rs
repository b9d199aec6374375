// SPDX-License-Identifier: Apache-2.0

//! Multiline Integration Tests
//!
//! Tail real files on disk while they are being appended to and check that
//! records come out whole and in order across read cycles.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use rotel_multiline::config::{LineDialect, MatchMode, MultilineConfig};
use rotel_multiline::input::StartAt;
use rotel_multiline::poller::Poller;
use rotel_multiline::sink::{JsonLinesSink, Record, record_channel};
use rotel_multiline::{LogSource, SourceState};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn append(path: &Path, data: &str) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(data.as_bytes()).unwrap();
    file.flush().unwrap();
}

fn bodies(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| String::from_utf8(r.body.clone()).unwrap())
        .collect()
}

#[test]
fn test_tail_growing_file_match_after() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, "2024-01-01 first\n  at frame one\n");

    let config = MultilineConfig::new(r"^\d{4}-\d{2}-\d{2}");
    let mut source = LogSource::open(&path, &config, StartAt::Beginning).unwrap();
    let mut sink: Vec<Record> = Vec::new();

    // The only record is still open, so it is held back
    let summary = source.read_cycle(&mut sink).unwrap();
    assert!(sink.is_empty());
    assert!(summary.rolled_back);

    append(&path, "  at frame two\n2024-01-01 second\n");
    source.read_cycle(&mut sink).unwrap();
    assert_eq!(
        bodies(&sink),
        vec!["2024-01-01 first\n  at frame one\n  at frame two"]
    );

    // Nothing new arrives, the open record goes out as stale
    let summary = source.read_cycle(&mut sink).unwrap();
    assert!(summary.stale_flush);
    assert_eq!(bodies(&sink)[1], "2024-01-01 second");

    // Nothing left afterwards
    let summary = source.read_cycle(&mut sink).unwrap();
    assert_eq!(summary.lines_read, 0);
    assert_eq!(sink.len(), 2);
}

#[test]
fn test_tail_partial_write() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, "[1] one\n[2] par");

    let config = MultilineConfig::new(r"^\[");
    let mut source = LogSource::open(&path, &config, StartAt::Beginning).unwrap();
    let mut sink: Vec<Record> = Vec::new();

    let summary = source.read_cycle(&mut sink).unwrap();
    assert!(summary.partial_read);
    assert!(sink.is_empty());

    append(&path, "tial\n");
    source.read_cycle(&mut sink).unwrap();
    assert_eq!(bodies(&sink), vec!["[1] one"]);

    source.read_cycle(&mut sink).unwrap();
    assert_eq!(bodies(&sink), vec!["[1] one", "[2] partial"]);
}

#[test]
fn test_tail_match_before_windows_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, "# header\r\nBEGIN a\r\n\r\nEND\r\nBEGIN b\r\n");

    let config = MultilineConfig::new("^END$")
        .with_mode(MatchMode::MatchBefore)
        .with_dialect(LineDialect::Windows);
    let mut source = LogSource::open(&path, &config, StartAt::Beginning).unwrap();
    let mut sink: Vec<Record> = Vec::new();

    source.read_cycle(&mut sink).unwrap();
    assert_eq!(bodies(&sink), vec!["BEGIN a\nEND"]);

    append(&path, "END\r\n");
    source.read_cycle(&mut sink).unwrap();
    assert_eq!(bodies(&sink), vec!["BEGIN a\nEND", "BEGIN b\nEND"]);
}

#[test]
fn test_start_at_end_skips_existing_content() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, "[old] one\n[old] two\n");

    let config = MultilineConfig::new(r"^\[");
    let mut source = LogSource::open(&path, &config, StartAt::End).unwrap();
    let mut sink: Vec<Record> = Vec::new();

    let summary = source.read_cycle(&mut sink).unwrap();
    assert_eq!(summary.lines_read, 0);

    append(&path, "[new] one\n[new] two\n");
    source.read_cycle(&mut sink).unwrap();
    assert_eq!(bodies(&sink), vec!["[new] one"]);
}

#[test]
fn test_resume_from_saved_state() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, "[1] a\n  b\n[2] c\n");

    let config = MultilineConfig::new(r"^\[");
    let mut source = LogSource::open(&path, &config, StartAt::Beginning).unwrap();
    let mut sink: Vec<Record> = Vec::new();
    source.read_cycle(&mut sink).unwrap();
    assert_eq!(bodies(&sink), vec!["[1] a\n  b"]);

    // Persist state, reopen at the saved cursor
    let saved = serde_json::to_string(&source.state()).unwrap();
    drop(source);
    let state: SourceState = serde_json::from_str(&saved).unwrap();
    assert!(state.has_unflushed_carryover);

    let mut source = LogSource::open(&path, &config, StartAt::Beginning)
        .unwrap()
        .resume(state)
        .unwrap();

    let summary = source.read_cycle(&mut sink).unwrap();
    assert!(summary.stale_flush);
    assert_eq!(bodies(&sink), vec!["[1] a\n  b", "[2] c"]);
}

#[test]
fn test_json_lines_output() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, "ERROR boom\n  caused by x\nINFO ok\n");

    let config = MultilineConfig::new(r"^\s").with_negate(true);
    let mut source = LogSource::open(&path, &config, StartAt::Beginning).unwrap();
    let mut out = JsonLinesSink::new(Vec::new());
    source.read_cycle(&mut out).unwrap();

    let written = String::from_utf8(out.into_inner()).unwrap();
    let lines: Vec<serde_json::Value> = written
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["body"], "ERROR boom\n  caused by x");
    assert_eq!(lines[0]["len"], 24);
    assert_eq!(lines[0]["source"], path.display().to_string());
}

#[tokio::test]
async fn test_poller_tails_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    append(&path, "");

    let config = MultilineConfig::new(r"^\[");
    let source = LogSource::open(&path, &config, StartAt::Beginning).unwrap();
    let (tx, mut rx) = record_channel(16);

    let cancel = CancellationToken::new();
    let poller = Poller::new(source, tx, Duration::from_millis(10));
    let handle = tokio::spawn(poller.run(cancel.clone()));

    append(&path, "[1] start\n  more\n");
    append(&path, "[2] next\n");

    let first = tokio::time::timeout(Duration::from_secs(5), rx.next())
        .await
        .unwrap()
        .unwrap();
    let second = tokio::time::timeout(Duration::from_secs(5), rx.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.body, b"[1] start\n  more");
    assert_eq!(second.body, b"[2] next");

    cancel.cancel();
    let (_source, _sink, stats) = handle.await.unwrap().unwrap();
    assert_eq!(stats.records_flushed, 2);
}
