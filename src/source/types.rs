//! The pull interface every reading source implements.

/// One pull from a reading source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reading {
    /// A well-formed movement value
    Value(u32),
    /// The source produced something that is not a movement value
    Invalid(String),
    /// The source is exhausted or disconnected
    EndOfStream,
}

/// A blocking, pull-based source of movement readings.
pub trait ReadingSource {
    /// Block until the next reading is available.
    fn next_value(&mut self) -> Reading;

    /// Whether further readings may still arrive.
    fn is_ready(&self) -> bool;
}

/// Parse one raw device line into a reading.
pub fn parse_reading(line: &str) -> Reading {
    let raw = line.trim();
    if raw.is_empty() {
        return Reading::Invalid("empty reading".to_string());
    }
    match raw.parse::<u32>() {
        Ok(value) => Reading::Value(value),
        Err(_) => Reading::Invalid(format!("not a movement value: '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reading() {
        assert_eq!(parse_reading("12\r\n"), Reading::Value(12));
        assert_eq!(parse_reading(" 0 "), Reading::Value(0));
        assert!(matches!(parse_reading(""), Reading::Invalid(_)));
        assert!(matches!(parse_reading("-5"), Reading::Invalid(_)));
        assert!(matches!(parse_reading("abc"), Reading::Invalid(_)));
    }
}
