//! Per-document configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Maximum number of undo entries retained; the oldest are dropped first.
    /// `None` keeps the whole history.
    pub history_limit: Option<usize>,

    /// Deferred binding resolution passes run after a load.
    pub resolve_passes: usize,

    /// Raise change notifications for values restored by a load.
    pub notify_on_load: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            history_limit: None,
            resolve_passes: 2,
            notify_on_load: false,
        }
    }
}

impl DocumentConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg = DocumentConfig::from_json(r#"{"history_limit": 50}"#).unwrap();
        assert_eq!(cfg.history_limit, Some(50));
        assert_eq!(cfg.resolve_passes, 2);
        assert!(!cfg.notify_on_load);
    }

    #[test]
    fn bad_json_is_serialization_error() {
        let err = DocumentConfig::from_json("{").unwrap_err();
        assert_eq!(err.category(), "serialization");
    }
}
