//! Line-oriented device adapter: one integer movement value per line.

use crate::source::types::{parse_reading, Reading, ReadingSource};
use std::io::BufRead;

/// Reads movement values from any buffered reader (serial device, pipe, file).
pub struct LineSource<R> {
    reader: R,
    buffer: String,
    ready: bool,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::new(),
            ready: true,
        }
    }
}

impl<R: BufRead> ReadingSource for LineSource<R> {
    fn next_value(&mut self) -> Reading {
        if !self.ready {
            return Reading::EndOfStream;
        }

        self.buffer.clear();
        match self.reader.read_line(&mut self.buffer) {
            Ok(0) => {
                self.ready = false;
                Reading::EndOfStream
            }
            Ok(_) => {
                let reading = parse_reading(&self.buffer);
                match reading {
                    Reading::Value(value) => tracing::debug!("Read movement value: {value}"),
                    Reading::Invalid(ref reason) => tracing::warn!("Bad device reading: {reason}"),
                    Reading::EndOfStream => {}
                }
                reading
            }
            Err(e) => {
                tracing::warn!("Device read failed, closing source: {e}");
                self.ready = false;
                Reading::EndOfStream
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_line_source_sequence() {
        let mut source = LineSource::new(Cursor::new("3\n\n12\nnoise\n0\n"));

        assert_eq!(source.next_value(), Reading::Value(3));
        assert!(matches!(source.next_value(), Reading::Invalid(_)));
        assert_eq!(source.next_value(), Reading::Value(12));
        assert!(matches!(source.next_value(), Reading::Invalid(_)));
        assert_eq!(source.next_value(), Reading::Value(0));
        assert!(source.is_ready());
        assert_eq!(source.next_value(), Reading::EndOfStream);
        assert!(!source.is_ready());
        assert_eq!(source.next_value(), Reading::EndOfStream);
    }
}
