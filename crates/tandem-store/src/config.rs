//! Per-call write options passed through to backends.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::types::Visibility;

/// Options for write-like operations (`write`, `write_stream`,
/// `create_directory`).
///
/// `visibility` and `mime_type` are understood by every backend; anything
/// else lands in `extra` and is left for backends that recognise it. A
/// fallback config supplies values for keys this one does not set, which is
/// how process-wide defaults sit underneath per-call options.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
    #[serde(skip)]
    fallback: Option<Arc<WriteConfig>>,
}

impl WriteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from a TOML document.
    ///
    /// ```toml
    /// visibility = "private"
    /// mime_type = "text/plain"
    /// cache_control = "max-age=60"
    /// ```
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::InvalidConfig(e.to_string()))
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set a backend-specific option.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Use `fallback` for any key this config does not set.
    pub fn with_fallback(mut self, fallback: WriteConfig) -> Self {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    pub fn fallback(&self) -> Option<&WriteConfig> {
        self.fallback.as_deref()
    }

    /// Look up an option by key, consulting the fallback chain.
    pub fn get(&self, key: &str) -> Option<Value> {
        let local = match key {
            "visibility" => self.visibility.map(|v| Value::from(v.as_str())),
            "mime_type" => self.mime_type.clone().map(Value::from),
            _ => self.extra.get(key).cloned(),
        };
        local.or_else(|| self.fallback.as_ref().and_then(|f| f.get(key)))
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn resolved_visibility(&self) -> Option<Visibility> {
        self.visibility
            .or_else(|| self.fallback.as_ref().and_then(|f| f.resolved_visibility()))
    }

    pub fn resolved_mime_type(&self) -> Option<&str> {
        match &self.mime_type {
            Some(m) => Some(m.as_str()),
            None => self.fallback.as_ref().and_then(|f| f.resolved_mime_type()),
        }
    }
}
