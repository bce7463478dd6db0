// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The mock handle: one setup registry, one invocation ledger, settings.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tracing::trace;

use crate::default_value::DefaultValuePolicy;
use crate::ledger::InvocationLedger;
use crate::registry::SetupRegistry;
use crate::setup::SetupBuilder;
use crate::shape::CallShape;

static NEXT_MOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Runtime settings of a mock.
#[derive(Debug, Clone, Default)]
pub struct MockSettings {
    /// Label used in diagnostics.
    pub name: Option<String>,
    /// Answer for unconfigured calls.
    pub default_value: DefaultValuePolicy,
}

impl MockSettings {
    /// Settings with a diagnostic name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Replaces the default value policy.
    #[must_use]
    pub fn with_default_value(mut self, policy: DefaultValuePolicy) -> Self {
        self.default_value = policy;
        self
    }
}

struct MockInner {
    id: u64,
    settings: RwLock<MockSettings>,
    setups: SetupRegistry,
    invocations: InvocationLedger,
}

/// Shared handle to a mock instance.
///
/// Clones refer to the same instance; equality is identity.
#[derive(Clone)]
pub struct Mock(Arc<MockInner>);

impl Mock {
    /// A permissive mock answering unconfigured calls with empty values.
    pub fn new() -> Self {
        Self::with_settings(MockSettings::default())
    }

    /// A mock that rejects every call without a matching setup.
    pub fn strict() -> Self {
        Self::with_settings(MockSettings::default().with_default_value(DefaultValuePolicy::Strict))
    }

    /// A mock with explicit settings.
    pub fn with_settings(settings: MockSettings) -> Self {
        let id = NEXT_MOCK_ID.fetch_add(1, Ordering::Relaxed);
        trace!(mock = id, name = ?settings.name, "mock created");
        Self(Arc::new(MockInner {
            id,
            settings: RwLock::new(settings),
            setups: SetupRegistry::new(),
            invocations: InvocationLedger::new(),
        }))
    }

    /// Process-unique id.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Diagnostic name, if one was given.
    pub fn name(&self) -> Option<String> {
        self.settings().name
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> MockSettings {
        self.0
            .settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current default value policy.
    pub fn default_value(&self) -> DefaultValuePolicy {
        self.settings().default_value
    }

    /// Switches the default value policy. Affects subsequent calls only.
    pub fn set_default_value(&self, policy: DefaultValuePolicy) {
        self.0
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .default_value = policy;
    }

    /// Non-owning handle, used by outer mocks to reach this one.
    pub fn downgrade(&self) -> WeakMock {
        WeakMock(Arc::downgrade(&self.0))
    }

    /// The setup registry.
    pub fn setups(&self) -> &SetupRegistry {
        &self.0.setups
    }

    /// The invocation ledger.
    pub fn invocations(&self) -> &InvocationLedger {
        &self.0.invocations
    }

    /// Starts configuring a setup for `shape`.
    pub fn setup(&self, shape: CallShape) -> SetupBuilder<'_> {
        SetupBuilder::new(self, shape)
    }

    /// Drops every setup and every recorded invocation.
    pub fn reset(&self) {
        self.0.setups.clear();
        self.0.invocations.clear();
    }

    /// Discards recorded invocations of this mock only.
    pub fn clear_invocations(&self) {
        self.0.invocations.clear();
        self.0.setups.reset_counts();
    }

    /// Discards recorded invocations of this mock and of every inner mock
    /// reachable from it.
    pub fn clear_invocations_including_inner_mocks(&self) {
        for mock in self.transitive() {
            trace!(mock = mock.id(), "invocations cleared");
            mock.clear_invocations();
        }
    }

    /// Live inner mocks returned by this mock's setups.
    pub fn inner_mocks(&self) -> Vec<Mock> {
        self.0
            .setups
            .inner_mock_setups()
            .iter()
            .filter_map(|s| s.inner_mock())
            .collect()
    }

    /// This mock followed by every inner mock reachable from it, each once.
    pub(crate) fn transitive(&self) -> Vec<Mock> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([self.clone()]);
        let mut out = Vec::new();
        while let Some(mock) = queue.pop_front() {
            if !seen.insert(mock.id()) {
                continue;
            }
            queue.extend(mock.inner_mocks());
            out.push(mock);
        }
        out
    }

    /// Opens the setup phase. Calls made through inner mocks while building
    /// setups are discarded when the phase ends.
    pub fn begin_setup(&self) -> SetupPhase<'_> {
        SetupPhase { mock: self }
    }

    pub(crate) fn label(&self) -> String {
        self.to_string()
    }
}

impl Default for Mock {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Mock {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Mock {}

impl fmt::Display for Mock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Mock#{}({name})", self.0.id),
            None => write!(f, "Mock#{}", self.0.id),
        }
    }
}

impl fmt::Debug for Mock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Non-owning mock handle.
#[derive(Clone)]
pub struct WeakMock(Weak<MockInner>);

impl WeakMock {
    /// The mock, if it is still alive.
    pub fn upgrade(&self) -> Option<Mock> {
        self.0.upgrade().map(Mock)
    }
}

impl fmt::Debug for WeakMock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(mock) => write!(f, "WeakMock({mock})"),
            None => f.write_str("WeakMock(<dropped>)"),
        }
    }
}

/// Setup phase guard returned by [`Mock::begin_setup`].
///
/// Ending the phase, by [`commit`](SetupPhase::commit) or by dropping the
/// guard, clears invocations of the mock and its inner mocks.
#[must_use = "dropping the guard ends the setup phase immediately"]
#[derive(Debug)]
pub struct SetupPhase<'m> {
    mock: &'m Mock,
}

impl<'m> SetupPhase<'m> {
    /// The mock being configured.
    pub fn mock(&self) -> &'m Mock {
        self.mock
    }

    /// Ends the setup phase and returns the mock, ready for the code under
    /// test.
    pub fn commit(self) -> &'m Mock {
        self.mock
    }
}

impl Drop for SetupPhase<'_> {
    fn drop(&mut self) {
        self.mock.clear_invocations_including_inner_mocks();
    }
}
