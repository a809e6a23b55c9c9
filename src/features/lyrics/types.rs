//! Lyrics data types

use serde::{Deserialize, Serialize};

/// A single timed lyric line
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LyricLine {
    /// Start time in seconds
    pub time: f64,
    pub text: String,
}

impl LyricLine {
    pub fn new(time: f64, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
        }
    }
}

/// Index of the line that `position` (seconds) falls in.
///
/// Picks the last line whose time is at or before `position`; a position
/// before the first line maps to the first line. `None` only for an empty
/// track.
pub fn find_current_line(lines: &[LyricLine], position: f64) -> Option<usize> {
    if lines.is_empty() {
        return None;
    }
    let after = lines.partition_point(|line| line.time <= position);
    Some(after.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Vec<LyricLine> {
        vec![
            LyricLine::new(0.0, "a"),
            LyricLine::new(5.0, "b"),
            LyricLine::new(10.0, "c"),
        ]
    }

    #[test]
    fn test_find_current_line() {
        let lines = track();
        assert_eq!(find_current_line(&lines, 0.0), Some(0));
        assert_eq!(find_current_line(&lines, 4.99), Some(0));
        assert_eq!(find_current_line(&lines, 5.0), Some(1));
        assert_eq!(find_current_line(&lines, 7.0), Some(1));
        assert_eq!(find_current_line(&lines, 12.0), Some(2));
    }

    #[test]
    fn test_find_current_line_before_first() {
        let lines = vec![LyricLine::new(3.0, "late start"), LyricLine::new(6.0, "x")];
        assert_eq!(find_current_line(&lines, 1.0), Some(0));
        assert_eq!(find_current_line(&[], 1.0), None);
    }

    #[test]
    fn test_find_current_line_duplicate_times() {
        let lines = vec![
            LyricLine::new(1.0, "a"),
            LyricLine::new(2.0, "b"),
            LyricLine::new(2.0, "b again"),
            LyricLine::new(3.0, "c"),
        ];
        assert_eq!(find_current_line(&lines, 2.5), Some(2));
    }
}
