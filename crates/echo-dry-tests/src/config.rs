// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory [`ConfigStore`] fake for mock configuration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use echo_mock::{ConfigError, ConfigStore};

/// In-memory config store with attempt counters and failure injection.
///
/// Clones share state.
///
/// ```
/// use echo_dry_tests::InMemoryConfigStore;
/// use echo_mock::{DefaultValueKind, MockConfig};
///
/// let store = InMemoryConfigStore::new();
/// let config = MockConfig { name: Some("clock".into()), default_value: DefaultValueKind::Strict };
/// config.save(&store, "clock").unwrap();
/// assert_eq!(MockConfig::load(&store, "clock").unwrap(), Some(config));
/// assert_eq!(store.save_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    inner: Arc<Mutex<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    data: HashMap<String, Vec<u8>>,
    loads: usize,
    saves: usize,
    fail_on_load: bool,
    fail_on_save: bool,
}

impl InMemoryConfigStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` under `key` directly, bypassing the counters.
    pub fn insert(&self, key: &str, data: &[u8]) {
        self.state().data.insert(key.to_owned(), data.to_vec());
    }

    /// Makes every subsequent load fail (or succeed again).
    pub fn set_fail_on_load(&self, fail: bool) {
        self.state().fail_on_load = fail;
    }

    /// Makes every subsequent save fail (or succeed again).
    pub fn set_fail_on_save(&self, fail: bool) {
        self.state().fail_on_save = fail;
    }

    /// Load attempts, including failed ones.
    pub fn load_count(&self) -> usize {
        self.state().loads
    }

    /// Save attempts, including failed ones.
    pub fn save_count(&self) -> usize {
        self.state().saves
    }

    /// Whether `key` holds data.
    pub fn contains_key(&self, key: &str) -> bool {
        self.state().data.contains_key(key)
    }

    fn state(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let mut state = self.state();
        state.loads += 1;
        if state.fail_on_load {
            return Err(ConfigError::Other("injected load failure".into()));
        }
        state.data.get(key).cloned().ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let mut state = self.state();
        state.saves += 1;
        if state.fail_on_save {
            return Err(ConfigError::Other("injected save failure".into()));
        }
        state.data.insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}
