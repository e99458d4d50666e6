//! Session identifier type and generator.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Local};

use crate::error::ShellError;

/// Unique identifier for a shell session.
///
/// An identifier pairs the creation timestamp (milliseconds since the Unix
/// epoch) with a sequence number drawn from a monotonic counter, so two
/// sessions created within the same millisecond still differ. Identifiers
/// order by timestamp first, then sequence. Displayed as `sh-<millis>-<seq>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId {
    stamp: u64,
    seq: u32,
}

impl SessionId {
    /// Build an identifier from its raw parts.
    ///
    /// This is primarily for testing and parsing.
    pub fn from_parts(stamp: u64, seq: u32) -> Self {
        Self { stamp, seq }
    }

    /// Millisecond timestamp component.
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    /// Sequence component.
    pub fn seq(&self) -> u32 {
        self.seq
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sh-{}-{}", self.stamp, self.seq)
    }
}

impl FromStr for SessionId {
    type Err = ShellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("sh-")
            .and_then(|rest| rest.split_once('-'))
            .and_then(|(stamp, seq)| Some(Self::from_parts(stamp.parse().ok()?, seq.parse().ok()?)))
            .ok_or_else(|| ShellError::InvalidSessionId(s.into()))
    }
}

/// Generates session identifiers from a timestamp and a monotonic counter.
///
/// The counter never resets, so identifiers from one generator are unique
/// even when the clock stands still.
#[derive(Debug)]
pub struct IdGenerator {
    counter: AtomicU32,
}

impl IdGenerator {
    /// Create a generator whose first sequence number is 1.
    pub fn new() -> Self {
        Self {
            counter: AtomicU32::new(1),
        }
    }

    /// Produce the next identifier for a session created at `at`.
    pub fn next(&self, at: DateTime<Local>) -> SessionId {
        let stamp = u64::try_from(at.timestamp_millis()).unwrap_or(0);
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        SessionId::from_parts(stamp, seq)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn instant() -> DateTime<Local> {
        Local.timestamp_millis_opt(1_700_000_000_123).unwrap()
    }

    #[test]
    fn test_same_millisecond_uniqueness() {
        let ids = IdGenerator::new();
        let at = instant();

        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let id = ids.next(at);
            assert_eq!(id.stamp(), 1_700_000_000_123);
            assert!(seen.insert(id), "Duplicate ID generated: {}", id);
        }
    }

    #[test]
    fn test_ids_are_ordered() {
        let ids = IdGenerator::new();
        let first = ids.next(instant());
        let second = ids.next(instant());
        assert!(first < second);
    }

    #[test]
    fn test_display_format() {
        let id = SessionId::from_parts(1_700_000_000_123, 7);
        assert_eq!(id.to_string(), "sh-1700000000123-7");
    }

    #[test]
    fn test_parse_valid() {
        let id: SessionId = "sh-42-3".parse().unwrap();
        assert_eq!(id.stamp(), 42);
        assert_eq!(id.seq(), 3);
    }

    #[test]
    fn test_parse_invalid() {
        assert!("42-3".parse::<SessionId>().is_err());
        assert!("sess-42-3".parse::<SessionId>().is_err());
        assert!("sh-42".parse::<SessionId>().is_err());
        assert!("sh-x-3".parse::<SessionId>().is_err());
        assert!("".parse::<SessionId>().is_err());
    }

    #[test]
    fn test_roundtrip() {
        let original = IdGenerator::new().next(instant());
        let parsed: SessionId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }
}
