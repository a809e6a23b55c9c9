//! Standard LRC format parser
//!
//! Supports the common [mm:ss.xx]text format with line-level synchronization.

use lazy_static::lazy_static;
use regex::Regex;

use super::types::LyricLine;

lazy_static! {
    static ref TAG: Regex = Regex::new(r"^\s*\[([^\[\]]*)\]").unwrap();
}

fn digits(src: &str) -> Option<u64> {
    if src.is_empty() || !src.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    src.parse().ok()
}

/// Parse the inside of a time tag: `mm:ss`, `mm:ss.xx` or `mm:ss:xx`.
///
/// Returns seconds. Metadata tags such as `ar:Artist` yield `None`.
pub fn parse_time_tag(tag: &str) -> Option<f64> {
    let parts: Vec<&str> = tag.trim().split([':', '.']).collect();

    let (min, sec, frac) = match parts.as_slice() {
        [min, sec] => (digits(min)?, digits(sec)?, None),
        [min, sec, frac] => (digits(min)?, digits(sec)?, Some(*frac)),
        _ => return None,
    };

    let mut time = min.checked_mul(60)?.checked_add(sec)? as f64;
    if let Some(frac) = frac {
        // Precision varies: .5, .50 and .500 all mean half a second
        let value = digits(frac)?;
        time += value as f64 / 10f64.powi(frac.len() as i32);
    }
    Some(time)
}

/// Parse a single LRC line, which may have multiple timestamps
fn parse_line(line: &str) -> Vec<LyricLine> {
    let mut times = Vec::new();
    let mut rest = line;

    while let Some(caps) = TAG.captures(rest) {
        if let Some(time) = parse_time_tag(&caps[1]) {
            times.push(time);
        }
        rest = &rest[caps[0].len()..];
    }

    let text = rest.trim();
    times
        .into_iter()
        .map(|time| LyricLine::new(time, text))
        .collect()
}

/// Parse LRC content into lyric lines, sorted by time
pub fn parse_lrc(src: &str) -> Vec<LyricLine> {
    let mut result: Vec<LyricLine> = src.lines().flat_map(parse_line).collect();

    // Stable, so lines sharing a timestamp keep file order
    result.sort_by(|a, b| a.time.total_cmp(&b.time));

    result
}

/// Format seconds as an `mm:ss` badge label
pub fn format_timestamp(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}
