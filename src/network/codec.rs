use tracing::warn;

/// Upper bound on buffered bytes awaiting a delimiter. A well-behaved peer
/// sends records of a few hundred bytes; anything that outgrows this is
/// discarded up to the next delimiter so the stream can continue.
const MAX_BUFFER: usize = 64 * 1024;

/// Splits an arbitrary-chunked byte stream into newline-delimited text
/// records, buffering partial records across calls.
///
/// Framing is independent of payload parsing: the codec only finds record
/// boundaries. Records that are not valid UTF-8 are dropped here; records
/// that fail to parse as a protocol message are dropped by the caller.
#[derive(Debug, Default)]
pub struct LineCodec {
    buffer: Vec<u8>,
    discarding: bool,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every complete record it finishes, in
    /// arrival order. Empty records (bare delimiters) are skipped.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut records = Vec::new();

        for &byte in chunk {
            if byte == b'\n' {
                if self.discarding {
                    // Tail of an oversized record; resume at this boundary
                    self.discarding = false;
                } else if let Some(record) = self.take_record() {
                    records.push(record);
                }
                continue;
            }

            if self.discarding {
                continue;
            }

            self.buffer.push(byte);
            if self.buffer.len() > MAX_BUFFER {
                warn!(
                    "Dropping record longer than {} bytes without a delimiter",
                    MAX_BUFFER
                );
                self.buffer.clear();
                self.discarding = true;
            }
        }

        records
    }

    fn take_record(&mut self) -> Option<String> {
        let bytes = std::mem::take(&mut self.buffer);
        match String::from_utf8(bytes) {
            Ok(record) => {
                let record = record.trim().to_string();
                if record.is_empty() {
                    None
                } else {
                    Some(record)
                }
            }
            Err(e) => {
                warn!("Dropping non-UTF-8 record: {}", e);
                None
            }
        }
    }

    /// Frame one record for the wire: the record followed by exactly one
    /// delimiter. Records never contain the delimiter themselves.
    pub fn encode(record: &str) -> String {
        format!("{}\n", record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut LineCodec, bytes: &[u8]) -> Vec<String> {
        codec.feed(bytes)
    }

    #[test]
    fn test_single_record() {
        let mut codec = LineCodec::new();
        let records = decode_all(&mut codec, b"hello\n");
        assert_eq!(records, vec!["hello".to_string()]);
    }

    #[test]
    fn test_partial_record_buffered_across_feeds() {
        let mut codec = LineCodec::new();
        assert!(codec.feed(b"hel").is_empty());
        assert!(codec.feed(b"lo").is_empty());
        assert_eq!(codec.feed(b"\nworld\n"), vec!["hello", "world"]);
    }

    #[test]
    fn test_chunk_boundaries_do_not_change_output() {
        let stream = b"{\"a\":1}\n{\"b\":2}\n{\"c\":3}\n";

        let mut whole = LineCodec::new();
        let expected = whole.feed(stream);
        assert_eq!(expected.len(), 3);

        // Split the stream at every possible boundary
        for split in 0..=stream.len() {
            let mut codec = LineCodec::new();
            let mut records = codec.feed(&stream[..split]);
            records.extend(codec.feed(&stream[split..]));
            assert_eq!(records, expected, "split at {}", split);
        }

        // And one byte at a time
        let mut codec = LineCodec::new();
        let mut records = Vec::new();
        for byte in stream {
            records.extend(codec.feed(&[*byte]));
        }
        assert_eq!(records, expected);
    }

    #[test]
    fn test_empty_records_skipped() {
        let mut codec = LineCodec::new();
        assert_eq!(codec.feed(b"\n\na\n  \nb\n"), vec!["a", "b"]);
    }

    #[test]
    fn test_non_utf8_record_dropped_stream_continues() {
        let mut codec = LineCodec::new();
        // 0xFF 0xFE is not valid UTF-8; only that record is invalidated
        assert!(codec.feed(b"\xff\xfe\n").is_empty());
        assert_eq!(codec.feed(b"ok\n"), vec!["ok"]);

        // Same when the garbage and a valid record arrive in one chunk
        let mut codec = LineCodec::new();
        assert_eq!(codec.feed(b"\xff\xfe\nok\n"), vec!["ok"]);
    }

    #[test]
    fn test_oversized_record_dropped_stream_continues() {
        let mut codec = LineCodec::new();
        let big = vec![b'x'; MAX_BUFFER + 10];
        assert!(codec.feed(&big).is_empty());
        // The oversized record's tail and delimiter are swallowed, the
        // following record comes through intact
        assert_eq!(codec.feed(b"tail\nnext\n"), vec!["next"]);
    }

    #[test]
    fn test_encode_appends_one_delimiter() {
        assert_eq!(LineCodec::encode("{\"sync\":1}"), "{\"sync\":1}\n");
    }
}
