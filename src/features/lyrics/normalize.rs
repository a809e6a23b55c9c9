//! Lyric normalization
//!
//! The embedded player keeps lyrics in whatever shape its source handed
//! over: `[time, text]` pairs, objects with loosely named fields, an
//! object wrapping either of those, or a raw LRC blob. Everything is
//! funnelled into one ascending `Vec<LyricLine>`.

use serde_json::Value;

use super::lrc::parse_lrc;
use super::types::LyricLine;

/// Keys probed on the player's lyric state, in priority order
const CANDIDATE_KEYS: [&str; 6] = ["current", "lines", "parsed", "lrc", "lyric", "lyrics"];

/// Keys under which a wrapper object nests the real lyric data
const WRAPPER_KEYS: [&str; 3] = ["lines", "parsed", "lrc"];

const TIME_FIELDS: [&str; 3] = ["time", "t", "start"];
const TEXT_FIELDS: [&str; 3] = ["text", "txt", "content"];

/// Times above this are assumed to be milliseconds when all of them are
const MILLIS_THRESHOLD: f64 = 1000.0;

/// Wrappers nested deeper than this are ignored
const MAX_WRAP_DEPTH: usize = 4;

/// A recognized lyric source shape
#[derive(Debug, Clone, PartialEq)]
pub enum LyricSource<'a> {
    /// `[[time, text], ...]`
    Pairs(&'a [Value]),
    /// `[{time|t|start, text|txt|content}, ...]`
    Objects(&'a [Value]),
    /// `{lines|parsed|lrc: <source>}`
    Wrapped(Box<LyricSource<'a>>),
    /// `[mm:ss.xx]text` lines
    RawText(&'a str),
}

impl<'a> LyricSource<'a> {
    /// Work out which shape `value` has, if any
    pub fn classify(value: &'a Value) -> Option<Self> {
        Self::classify_at(value, 0)
    }

    fn classify_at(value: &'a Value, depth: usize) -> Option<Self> {
        match value {
            Value::String(text) if !text.trim().is_empty() => Some(Self::RawText(text)),
            Value::Array(items) => match items.iter().find(|v| !v.is_null())? {
                Value::Array(_) => Some(Self::Pairs(items)),
                Value::Object(_) => Some(Self::Objects(items)),
                _ => None,
            },
            Value::Object(map) if depth < MAX_WRAP_DEPTH => WRAPPER_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(|inner| Self::classify_at(inner, depth + 1))
                .map(|inner| Self::Wrapped(Box::new(inner))),
            _ => None,
        }
    }

    /// Extract entries in source order, times still in source units
    pub fn entries(&self) -> Vec<LyricLine> {
        match self {
            Self::Pairs(items) => items.iter().filter_map(pair_entry).collect(),
            Self::Objects(items) => items.iter().filter_map(object_entry).collect(),
            Self::Wrapped(inner) => inner.entries(),
            Self::RawText(text) => parse_lrc(text),
        }
    }
}

fn as_time(value: &Value) -> Option<f64> {
    let time = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (time.is_finite() && time >= 0.0).then_some(time)
}

fn pair_entry(value: &Value) -> Option<LyricLine> {
    let pair = value.as_array()?;
    let time = as_time(pair.first()?)?;
    let text = pair.get(1)?.as_str()?;
    Some(LyricLine::new(time, text))
}

fn object_entry(value: &Value) -> Option<LyricLine> {
    let object = value.as_object()?;
    let time = TIME_FIELDS
        .iter()
        .find_map(|key| object.get(*key).and_then(as_time))?;
    let text = TEXT_FIELDS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))?;
    Some(LyricLine::new(time, text))
}

/// Millisecond correction and chronological ordering
fn finish(mut lines: Vec<LyricLine>) -> Vec<LyricLine> {
    if lines.iter().all(|line| line.time > MILLIS_THRESHOLD) {
        for line in lines.iter_mut() {
            line.time /= 1000.0;
        }
    }
    lines.sort_by(|a, b| a.time.total_cmp(&b.time));
    lines
}

/// Candidate lyric sources held by a player's lyric state
fn candidates(raw: &Value) -> Vec<&Value> {
    match raw {
        Value::Object(map) => {
            let mut found: Vec<&Value> = CANDIDATE_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .collect();
            // The state itself may be a bare wrapper
            found.push(raw);
            found
        }
        _ => vec![raw],
    }
}

/// Normalize lyric data of unknown shape.
///
/// Returns `None` when no candidate yields at least one valid line.
pub fn normalize(raw: &Value) -> Option<Vec<LyricLine>> {
    candidates(raw)
        .into_iter()
        .filter_map(LyricSource::classify)
        .map(|source| source.entries())
        .find(|entries| !entries.is_empty())
        .map(finish)
}
