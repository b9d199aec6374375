// SPDX-License-Identifier: Apache-2.0

mod line;
mod stream;

pub use line::{Line, LineRead, LineReader, Terminator};
pub use stream::{Cursor, FileStream, LineStream, SeekableStream, StartAt};
