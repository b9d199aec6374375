// SPDX-License-Identifier: Apache-2.0

/// Accumulates physical lines into a logical record.
///
/// Lines are joined by a single `\n`. The buffer never grows past its
/// capacity: an append that does not fit is truncated at capacity and
/// reported as an overflow.
#[derive(Debug)]
pub struct RecordBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl RecordBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            capacity,
        }
    }

    /// Append a line, returns true if the line did not fit.
    pub fn append(&mut self, line: &[u8]) -> bool {
        let separator = usize::from(!self.data.is_empty());
        let required = self.data.len() + separator + line.len();
        let overflow = required > self.capacity;

        let mut remaining = self.capacity - self.data.len();
        if separator == 1 && remaining > 0 {
            self.data.push(b'\n');
            remaining -= 1;
        }
        let take = line.len().min(remaining);
        self.data.extend_from_slice(&line[..take]);

        overflow
    }

    /// Take the accumulated record, leaving the buffer empty
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_joins_with_newline() {
        let mut buffer = RecordBuffer::new(64);
        assert!(!buffer.append(b"first"));
        assert!(!buffer.append(b"second"));
        assert_eq!(buffer.as_bytes(), b"first\nsecond");
        assert_eq!(buffer.len(), 12);
    }

    #[test]
    fn test_append_empty_line() {
        let mut buffer = RecordBuffer::new(64);
        assert!(!buffer.append(b"a"));
        assert!(!buffer.append(b""));
        assert!(!buffer.append(b"b"));
        assert_eq!(buffer.as_bytes(), b"a\n\nb");
    }

    #[test]
    fn test_append_exactly_at_capacity() {
        let mut buffer = RecordBuffer::new(7);
        assert!(!buffer.append(b"abc"));
        assert!(!buffer.append(b"def"));
        assert_eq!(buffer.len(), 7);
    }

    #[test]
    fn test_append_overflow_truncates() {
        let mut buffer = RecordBuffer::new(8);
        assert!(!buffer.append(b"abcd"));
        assert!(buffer.append(b"efghij"));
        assert_eq!(buffer.as_bytes(), b"abcd\nefg");
        assert_eq!(buffer.len(), buffer.capacity());

        // Once full, further appends overflow without growing
        assert!(buffer.append(b"k"));
        assert_eq!(buffer.len(), 8);
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut buffer = RecordBuffer::new(32);
        let lines: [&[u8]; 6] = [b"0123456789", b"", b"abc", b"0123456789012", b"x", b"yz"];
        let mut expected_len = 0usize;
        for line in lines {
            let sep = usize::from(!buffer.is_empty());
            let overflow = buffer.append(line);
            expected_len += sep + line.len();
            assert_eq!(overflow, expected_len > 32);
            assert!(buffer.len() <= buffer.capacity());
        }
    }

    #[test]
    fn test_take_resets() {
        let mut buffer = RecordBuffer::new(16);
        buffer.append(b"line");
        assert_eq!(buffer.take(), b"line".to_vec());
        assert!(buffer.is_empty());

        buffer.append(b"again");
        assert_eq!(buffer.as_bytes(), b"again");
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
