//! Widget error taxonomy
//!
//! None of these ever reach the host: entry points log them at debug
//! level and leave the previous state in place.

/// Why a widget operation did nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetError {
    /// Input that can't be used: short or non-numeric ids, unknown lyric shapes
    MalformedInput(String),
    /// An element or player state the operation needs isn't there (yet)
    MissingAnchor(&'static str),
    /// Fetch or image load failed
    Network(String),
    Unexpected(String),
}

impl std::fmt::Display for WidgetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WidgetError::MalformedInput(e) => write!(f, "Malformed input: {}", e),
            WidgetError::MissingAnchor(what) => write!(f, "Missing anchor: {}", what),
            WidgetError::Network(e) => write!(f, "Network error: {}", e),
            WidgetError::Unexpected(e) => write!(f, "Unexpected error: {}", e),
        }
    }
}

impl std::error::Error for WidgetError {}

/// Keeps a `WidgetError` that travelled through an `anyhow` chain;
/// anything else came from the transport.
impl From<anyhow::Error> for WidgetError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<WidgetError>() {
            Ok(e) => e,
            Err(e) => WidgetError::Network(e.to_string()),
        }
    }
}
