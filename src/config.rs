//! Runtime configuration

use serde::{Deserialize, Serialize};

use crate::interpreter::gc::DEFAULT_GC_THRESHOLD;

/// Limits and defaults of a runtime.
///
/// Can be loaded from JSON; missing fields take their defaults:
///
/// ```
/// let config: jsrun::RuntimeConfig = serde_json::from_str(r#"{ "max_steps": 1000 }"#).unwrap();
/// assert_eq!(config.max_steps, 1000);
/// assert!(!config.strict);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Nested guest calls allowed before a RangeError is thrown.
    pub max_call_depth: usize,
    /// Evaluation steps allowed per runtime; 0 means unlimited.
    pub max_steps: u64,
    /// Evaluate every top-level script as strict code.
    pub strict: bool,
    /// Allocations between automatic garbage collections; 0 disables them.
    pub gc_threshold: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            max_call_depth: 10_000,
            max_steps: 0,
            strict: false,
            gc_threshold: DEFAULT_GC_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_json() {
        let config = RuntimeConfig {
            max_call_depth: 16,
            max_steps: 50,
            strict: true,
            gc_threshold: 0,
        };
        let text = serde_json::to_string(&config).unwrap();
        let back: RuntimeConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }
}
