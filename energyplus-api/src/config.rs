//! Runtime adapter configuration
//!
//! The adapter needs very little configuration: everything about the
//! simulation itself lives in the run directory and is owned by the engine.
//! These options only govern how callback failures and unexpected threads
//! are handled at the binding boundary.

use serde::{Deserialize, Serialize};

/// Options for a [`Runtime`](crate::Runtime) adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeOptions {
    /// What to do with the rest of the run once a handler has panicked
    #[serde(default)]
    pub callback_panic_policy: CallbackPanicPolicy,

    /// Log a warning if the library fires a hook from a thread other than
    /// the one that called `run_energyplus`
    #[serde(default = "default_true")]
    pub warn_on_foreign_thread: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            callback_panic_policy: CallbackPanicPolicy::default(),
            warn_on_foreign_thread: true,
        }
    }
}

/// Handling of the handlers that follow a panic within the same run
///
/// Either way the run still finishes inside the engine and the panic is
/// reported once it returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackPanicPolicy {
    /// Stop invoking handlers for the remainder of the run
    #[default]
    SkipRemaining,
    /// Keep invoking handlers as if nothing happened
    KeepInvoking,
}

impl RuntimeOptions {
    /// Create options with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the callback panic policy
    pub fn with_panic_policy(mut self, policy: CallbackPanicPolicy) -> Self {
        self.callback_panic_policy = policy;
        self
    }

    /// Builder method: enable or disable the foreign-thread warning
    pub fn with_foreign_thread_warning(mut self, enabled: bool) -> Self {
        self.warn_on_foreign_thread = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RuntimeOptions::new();
        assert_eq!(options.callback_panic_policy, CallbackPanicPolicy::SkipRemaining);
        assert!(options.warn_on_foreign_thread);
    }

    #[test]
    fn test_builder() {
        let options = RuntimeOptions::new()
            .with_panic_policy(CallbackPanicPolicy::KeepInvoking)
            .with_foreign_thread_warning(false);

        assert_eq!(options.callback_panic_policy, CallbackPanicPolicy::KeepInvoking);
        assert!(!options.warn_on_foreign_thread);
    }

    #[test]
    fn test_options_deserialization() {
        let toml_content = r#"
            callback_panic_policy = "keep_invoking"
            warn_on_foreign_thread = false
        "#;

        let options: RuntimeOptions = toml::from_str(toml_content).unwrap();
        assert_eq!(options.callback_panic_policy, CallbackPanicPolicy::KeepInvoking);
        assert!(!options.warn_on_foreign_thread);
    }

    #[test]
    fn test_empty_table_uses_defaults() {
        let options: RuntimeOptions = toml::from_str("").unwrap();
        assert_eq!(options, RuntimeOptions::default());
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let result: Result<RuntimeOptions, _> =
            toml::from_str(r#"callback_panic_policy = "retry""#);
        assert!(result.is_err());
    }
}
