// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Serializable mock configuration and its storage port.
//!
//! Only the data part of [`MockSettings`] is serializable; a custom
//! [`DefaultValueProvider`](crate::DefaultValueProvider) is code and must be
//! installed at runtime.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::default_value::DefaultValuePolicy;
use crate::mock::{Mock, MockSettings};

/// Storage port for raw config blobs, keyed by logical name.
pub trait ConfigStore {
    /// Load a raw config blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist a raw config blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Store-specific failure.
    #[error("other: {0}")]
    Other(String),
}

/// Serializable default value policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValueKind {
    /// See [`DefaultValuePolicy::EmptyDefaults`].
    #[default]
    EmptyDefaults,
    /// See [`DefaultValuePolicy::EmptySubstitutes`].
    EmptySubstitutes,
    /// See [`DefaultValuePolicy::Strict`].
    Strict,
}

impl From<DefaultValueKind> for DefaultValuePolicy {
    fn from(kind: DefaultValueKind) -> Self {
        match kind {
            DefaultValueKind::EmptyDefaults => Self::EmptyDefaults,
            DefaultValueKind::EmptySubstitutes => Self::EmptySubstitutes,
            DefaultValueKind::Strict => Self::Strict,
        }
    }
}

/// Mock configuration as stored on disk.
///
/// ```json
/// { "name": "clock", "default_value": "strict" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Diagnostic name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Default value policy.
    pub default_value: DefaultValueKind,
}

impl MockConfig {
    /// Parses JSON. Empty input yields the default configuration.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, ConfigError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Loads the config stored under `key`. Returns `Ok(None)` if missing.
    pub fn load(store: &impl ConfigStore, key: &str) -> Result<Option<Self>, ConfigError> {
        match store.load_raw(key) {
            Ok(bytes) => Self::from_json(&bytes).map(Some),
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Persists the config under `key`.
    pub fn save(&self, store: &impl ConfigStore, key: &str) -> Result<(), ConfigError> {
        store.save_raw(key, &self.to_json()?)
    }

    /// Runtime settings described by this config.
    pub fn into_settings(self) -> MockSettings {
        MockSettings {
            name: self.name,
            default_value: self.default_value.into(),
        }
    }
}

impl Mock {
    /// A mock configured from `config`.
    pub fn from_config(config: MockConfig) -> Self {
        Self::with_settings(config.into_settings())
    }
}
