// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

/// Where to start reading when a file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartAt {
    /// Start reading from the beginning of the file
    Beginning,
    /// Start reading from the end of the file (only new content)
    #[default]
    End,
}

/// A saved position in a byte stream that can be reapplied verbatim.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Cursor(u64);

impl Cursor {
    pub fn new(offset: u64) -> Self {
        Self(offset)
    }

    /// Byte offset from the start of the stream
    pub fn offset(&self) -> u64 {
        self.0
    }
}

/// A readable byte stream with a restorable cursor.
pub trait LineStream {
    /// The current read position
    fn cursor(&self) -> Cursor;

    /// Move the read position back (or forward) to a saved cursor
    fn restore(&mut self, cursor: Cursor) -> io::Result<()>;

    /// Append bytes to `buf` up to and including the next `\n`, reading at
    /// most `limit` bytes. Returns the number of bytes read, which is 0 at
    /// end of input. A return value below `limit` without a trailing `\n`
    /// means end of input was reached.
    fn read_bounded_line(&mut self, buf: &mut Vec<u8>, limit: usize) -> io::Result<usize>;
}

/// A [`LineStream`] over any buffered, seekable reader.
///
/// The position is tracked locally so reading never needs a seek; only
/// [`LineStream::restore`] touches the underlying reader's position.
#[derive(Debug)]
pub struct SeekableStream<R> {
    inner: R,
    position: u64,
}

/// A stream over an open file
pub type FileStream = SeekableStream<BufReader<File>>;

impl<R: BufRead + Seek> SeekableStream<R> {
    /// Wrap a reader, starting from its current position
    pub fn new(mut inner: R) -> io::Result<Self> {
        let position = inner.stream_position()?;
        Ok(Self { inner, position })
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl FileStream {
    /// Open a file for reading, positioned according to `start_at`
    pub fn open(path: impl AsRef<Path>, start_at: StartAt) -> io::Result<Self> {
        let mut file = File::open(path)?;
        if start_at == StartAt::End {
            file.seek(SeekFrom::End(0))?;
        }
        Self::new(BufReader::new(file))
    }
}

impl<R: BufRead + Seek> LineStream for SeekableStream<R> {
    fn cursor(&self) -> Cursor {
        Cursor(self.position)
    }

    fn restore(&mut self, cursor: Cursor) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(cursor.0))?;
        self.position = cursor.0;
        Ok(())
    }

    fn read_bounded_line(&mut self, buf: &mut Vec<u8>, limit: usize) -> io::Result<usize> {
        let mut read = 0;
        while read < limit {
            let available = match self.inner.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                break;
            }

            let window = &available[..available.len().min(limit - read)];
            let (used, terminated) = match window.iter().position(|b| *b == b'\n') {
                Some(i) => (i + 1, true),
                None => (window.len(), false),
            };
            buf.extend_from_slice(&window[..used]);
            self.inner.consume(used);
            read += used;

            if terminated {
                break;
            }
        }
        self.position += read as u64;
        Ok(read)
    }
}
