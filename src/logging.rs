//! Logging setup

use tracing::Level;

/// Install the global fmt subscriber.
///
/// Debug output (swallowed failures, cover diagnostics) only shows with
/// `debug` set. Safe to call more than once; later calls are ignored.
pub fn init(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    if tracing_subscriber::fmt()
        .with_max_level(level)
        .try_init()
        .is_ok()
    {
        tracing::debug!("Debug logging enabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice() {
        init(true);
        init(false);
    }
}
