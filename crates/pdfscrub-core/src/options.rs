//! Execution context configuration.

use crate::fault::DEFAULT_FRAME_CAPACITY;

/// Default byte capacity of error and warning messages.
pub const DEFAULT_MESSAGE_CAPACITY: usize = 256;

/// Configuration for a [`Context`](crate::Context).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextOptions {
    /// Exception frames available to nested protected scopes.
    pub max_scope_depth: usize,
    /// Bytes kept from each error or warning message.
    pub message_capacity: usize,
    /// Report every recorded error as an `error:` line.
    pub echo_errors: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            max_scope_depth: DEFAULT_FRAME_CAPACITY,
            message_capacity: DEFAULT_MESSAGE_CAPACITY,
            echo_errors: true,
        }
    }
}

impl ContextOptions {
    /// Quiet options: errors are still recorded but not echoed.
    pub fn quiet() -> Self {
        Self {
            echo_errors: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = ContextOptions::default();
        assert_eq!(opts.max_scope_depth, 256);
        assert_eq!(opts.message_capacity, 256);
        assert!(opts.echo_errors);
    }

    #[test]
    fn quiet_only_changes_echo() {
        let opts = ContextOptions::quiet();
        assert!(!opts.echo_errors);
        assert_eq!(opts.max_scope_depth, 256);
    }
}
