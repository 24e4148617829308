//! Mapper configuration.
//!
//! Policy choices that differ between drivers (placeholder syntax, what an
//! empty result means) are grouped here so an adapter or application can pick
//! them once, usually from a JSON config file:
//!
//! ```json
//! { "placeholder": "dollar", "empty_result": "error" }
//! ```

use serde::{Deserialize, Serialize};

use crate::mapper::EmptyResultPolicy;
use crate::query::Placeholder;

/// Policy bundle applied to query templates and result mappers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MapperConfig {
    /// Placeholder syntax written by the query rewriter
    pub placeholder: Placeholder,
    /// Outcome of mapping a result with no rows
    pub empty_result: EmptyResultPolicy,
}

impl MapperConfig {
    /// Configuration for PostgreSQL: `$1`-style placeholders.
    pub fn postgres() -> Self {
        Self {
            placeholder: Placeholder::Dollar,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_defaults_from_empty_object() {
        let config: MapperConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MapperConfig::default());
        assert_eq!(config.placeholder, Placeholder::Question);
        assert_eq!(config.empty_result, EmptyResultPolicy::Succeed);
    }

    #[rstest]
    fn test_parse_snake_case_values() {
        let config: MapperConfig =
            serde_json::from_str(r#"{"placeholder": "dollar", "empty_result": "error"}"#).unwrap();
        assert_eq!(config.placeholder, Placeholder::Dollar);
        assert_eq!(config.empty_result, EmptyResultPolicy::Error);
    }

    #[rstest]
    fn test_unknown_placeholder_is_rejected() {
        let result: Result<MapperConfig, _> = serde_json::from_str(r#"{"placeholder": "colon"}"#);
        assert!(result.is_err());
    }
}
