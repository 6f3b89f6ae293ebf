//! Multi-line diagnostics from chained failures.
//!
//! Renders the top-level message and then each `source()` link on its own
//! indented line, bounded by a depth limit so users get a readable
//! diagnostic instead of a stack dump. Timeout chains carry no useful
//! causes, so they get a tighter bound.

use tracing::{debug, error};

use crate::error::RunError;

/// Default maximum number of chain links rendered.
pub const CHAIN_DEPTH: usize = 5;

/// Depth for timeout-class failures; their chains are uninformative.
pub const TIMEOUT_CHAIN_DEPTH: usize = 2;

/// Log a run failure: top-level message plus indented causes.
/// `debug_mode` additionally dumps the full error detail.
pub fn report(err: &RunError, debug_mode: bool) {
    let depth = if err.is_timeout() {
        TIMEOUT_CHAIN_DEPTH
    } else {
        CHAIN_DEPTH
    };
    for (level, message) in chain_messages(err, depth).into_iter().enumerate() {
        if level == 0 {
            error!("{message}");
        } else {
            error!("{:indent$}caused by: {message}", "", indent = level * 2);
        }
    }
    if debug_mode {
        debug!("full error detail: {err:?}");
    }
}

/// Walk the cause chain, collecting at most `max_depth` messages.
fn chain_messages(err: &(dyn std::error::Error + 'static), max_depth: usize) -> Vec<String> {
    let mut messages = Vec::new();
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(link) = current {
        if messages.len() >= max_depth {
            break;
        }
        messages.push(link.to_string());
        current = link.source();
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn nested_error(depth: usize) -> RunError {
        // Build an anyhow chain with `depth` context layers.
        let mut err = anyhow::anyhow!("root cause");
        for level in 1..depth {
            err = err.context(format!("layer {level}"));
        }
        RunError::Other(err)
    }

    #[test]
    fn chain_stops_at_first_missing_link() {
        let err = RunError::Configuration("Invalid credentials".to_string());
        let messages = chain_messages(&err, CHAIN_DEPTH);
        assert_eq!(messages, vec!["Invalid credentials".to_string()]);
    }

    #[test]
    fn chain_is_bounded_by_depth() {
        let err = nested_error(10);
        let messages = chain_messages(&err, CHAIN_DEPTH);
        assert_eq!(messages.len(), CHAIN_DEPTH);
        assert_eq!(messages[0], "layer 9");
    }

    #[test]
    fn full_chain_is_rendered_when_shorter_than_bound() {
        let err = nested_error(3);
        let messages = chain_messages(&err, CHAIN_DEPTH);
        assert_eq!(
            messages,
            vec![
                "layer 2".to_string(),
                "layer 1".to_string(),
                "root cause".to_string()
            ]
        );
    }

    #[test]
    fn timeouts_use_the_tighter_bound() {
        let err = RunError::timeout("logging in", Duration::from_secs(30));
        assert!(err.is_timeout());
        // One message, well under even the tight bound.
        let messages = chain_messages(&err, TIMEOUT_CHAIN_DEPTH);
        assert_eq!(messages.len(), 1);
    }
}
