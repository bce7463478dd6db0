// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Setups: a call shape plus configured behavior.
//!
//! A setup is assembled by [`SetupBuilder`] and published to the registry as
//! an immutable `Arc<Setup>`; only its bookkeeping (absorbed calls, the
//! overridden flag) changes afterwards.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::call::Call;
use crate::error::ShapeError;
use crate::frame::{CallFrame, Fault};
use crate::member::ReturnType;
use crate::mock::{Mock, WeakMock};
use crate::shape::CallShape;
use crate::times::Times;
use crate::value::{MockValue, Value};

/// Callback run when a setup matches. It may rewrite by-reference slots.
pub type CallbackFn = dyn Fn(&mut CallFrame<'_>) -> Result<(), Fault> + Send + Sync;

/// Computes a return value from the call (arguments, type arguments).
pub type ReturnFn = dyn Fn(&CallFrame<'_>) -> Result<Value, Fault> + Send + Sync;

#[derive(Clone)]
pub(crate) enum Action {
    Callback(Arc<CallbackFn>),
    ReturnValue(Value),
    ReturnWith(Arc<ReturnFn>),
    Throw(Fault),
}

impl Action {
    fn is_response(&self) -> bool {
        !matches!(self, Self::Callback(_))
    }
}

/// Where a setup came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOrigin {
    /// Registered through [`Mock::setup`].
    Explicit,
    /// Registered by the engine to cache a substitute inner mock.
    InnerMock,
}

/// A registered expectation.
pub struct Setup {
    seq: u64,
    shape: CallShape,
    actions: Vec<Action>,
    verifiable: bool,
    expected: Option<Times>,
    origin: SetupOrigin,
    inner_mock: Option<WeakMock>,
    absorbed: AtomicUsize,
    overridden: AtomicBool,
}

impl Setup {
    pub(crate) fn from_draft(seq: u64, draft: SetupDraft) -> Self {
        Self {
            seq,
            shape: draft.shape,
            actions: draft.actions,
            verifiable: draft.verifiable,
            expected: draft.expected,
            origin: draft.origin,
            inner_mock: draft.inner_mock,
            absorbed: AtomicUsize::new(0),
            overridden: AtomicBool::new(false),
        }
    }

    /// Insertion sequence number (unique per mock, increasing).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The shape this setup is filed under.
    pub fn shape(&self) -> &CallShape {
        &self.shape
    }

    /// Whether [`Mock::verify_all`] checks this setup.
    pub fn is_verifiable(&self) -> bool {
        self.verifiable
    }

    /// Expected number of matches, when one was configured.
    pub fn expected_times(&self) -> Option<Times> {
        self.expected
    }

    /// Explicit or engine-registered.
    pub fn origin(&self) -> SetupOrigin {
        self.origin
    }

    /// Number of calls this setup has absorbed since the last clear.
    pub fn absorbed(&self) -> usize {
        self.absorbed.load(Ordering::SeqCst)
    }

    /// True once a later setup with an equal shape was registered.
    pub fn is_overridden(&self) -> bool {
        self.overridden.load(Ordering::SeqCst)
    }

    /// True when a return value or exception is configured.
    pub fn has_response(&self) -> bool {
        self.actions.iter().any(Action::is_response)
    }

    /// The inner mock this setup returns, while it is alive.
    pub fn inner_mock(&self) -> Option<Mock> {
        self.inner_mock.as_ref().and_then(WeakMock::upgrade)
    }

    pub(crate) fn has_inner_mock(&self) -> bool {
        self.inner_mock.is_some()
    }

    /// Whether `call` falls under this setup's shape.
    pub fn matches(&self, call: &Call) -> bool {
        self.shape.matches(call)
    }

    pub(crate) fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// The fixed value this setup returns, if it was configured with one.
    pub(crate) fn fixed_value(&self) -> Option<Value> {
        self.actions.iter().rev().find_map(|action| match action {
            Action::ReturnValue(value) => Some(value.clone()),
            _ => None,
        })
    }

    pub(crate) fn absorb(&self) -> usize {
        self.absorbed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn reset_absorbed(&self) {
        self.absorbed.store(0, Ordering::SeqCst);
    }

    pub(crate) fn mark_overridden(&self) {
        self.overridden.store(true, Ordering::SeqCst);
    }
}

impl fmt::Debug for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setup")
            .field("seq", &self.seq)
            .field("shape", &self.shape.to_string())
            .field("verifiable", &self.verifiable)
            .field("absorbed", &self.absorbed())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.seq, self.shape)
    }
}

/// Everything a setup needs except its sequence number.
pub(crate) struct SetupDraft {
    pub(crate) shape: CallShape,
    pub(crate) actions: Vec<Action>,
    pub(crate) verifiable: bool,
    pub(crate) expected: Option<Times>,
    pub(crate) origin: SetupOrigin,
    pub(crate) inner_mock: Option<WeakMock>,
}

impl SetupDraft {
    pub(crate) fn new(shape: CallShape) -> Self {
        Self {
            shape,
            actions: Vec::new(),
            verifiable: false,
            expected: None,
            origin: SetupOrigin::Explicit,
            inner_mock: None,
        }
    }

    /// Installs `action` as the response, replacing any earlier one in place
    /// so callbacks keep their position relative to it.
    fn set_response(&mut self, action: Action) {
        if let Some(slot) = self.actions.iter_mut().find(|a| a.is_response()) {
            *slot = action;
        } else {
            self.actions.push(action);
        }
    }
}

/// Fluent configuration of a setup; nothing happens until
/// [`register`](SetupBuilder::register).
///
/// Callbacks and the response run in configuration order: callbacks added
/// before `returns` run before the value is computed, callbacks added after it
/// run afterwards. A `throws` response stops the sequence.
#[must_use = "a setup does nothing until it is registered"]
pub struct SetupBuilder<'m> {
    mock: &'m Mock,
    draft: SetupDraft,
}

impl<'m> SetupBuilder<'m> {
    pub(crate) fn new(mock: &'m Mock, shape: CallShape) -> Self {
        Self {
            mock,
            draft: SetupDraft::new(shape),
        }
    }

    /// Runs `callback` when the setup matches.
    pub fn callback(
        mut self,
        callback: impl Fn(&mut CallFrame<'_>) -> Result<(), Fault> + Send + Sync + 'static,
    ) -> Self {
        self.draft.actions.push(Action::Callback(Arc::new(callback)));
        self
    }

    /// Returns `value` from every matching call.
    pub fn returns<T: MockValue>(self, value: T) -> Self {
        self.returns_value(Value::new(value))
    }

    /// Returns an already-erased value. When the value is a [`Mock`] handle it
    /// is tracked as an inner mock.
    ///
    /// The setup keeps the value alive, so a returned `Mock` is a strong
    /// reference. Two mocks returning each other form a cycle that is only
    /// released by [`Mock::reset`] on one of them.
    pub fn returns_value(mut self, value: Value) -> Self {
        self.draft.inner_mock = value.as_mock().map(|m| m.downgrade());
        self.draft.set_response(Action::ReturnValue(value));
        self
    }

    /// Returns `object`, a proxy backed by `inner`, and tracks `inner` for
    /// recursive clearing and verification.
    pub fn returns_inner_mock(mut self, inner: &Mock, object: Value) -> Self {
        self.draft.set_response(Action::ReturnValue(object));
        self.draft.inner_mock = Some(inner.downgrade());
        self
    }

    /// Computes the return value per call.
    pub fn returns_with(
        mut self,
        produce: impl Fn(&CallFrame<'_>) -> Result<Value, Fault> + Send + Sync + 'static,
    ) -> Self {
        self.draft.inner_mock = None;
        self.draft.set_response(Action::ReturnWith(Arc::new(produce)));
        self
    }

    /// Raises `fault` from every matching call.
    pub fn throws(mut self, fault: Fault) -> Self {
        self.draft.inner_mock = None;
        self.draft.set_response(Action::Throw(fault));
        self
    }

    /// Marks the setup for [`Mock::verify_all`] (expected: at least once).
    pub fn verifiable(mut self) -> Self {
        self.draft.verifiable = true;
        self
    }

    /// Marks the setup for [`Mock::verify_all`] with an explicit expectation.
    pub fn verifiable_times(mut self, times: Times) -> Self {
        self.draft.verifiable = true;
        self.draft.expected = Some(times);
        self
    }

    /// Publishes the setup. From now on it shadows every earlier setup whose
    /// shape overlaps it.
    ///
    /// # Errors
    /// Returns [`ShapeError::ReturnOnVoidMember`] when a return value was
    /// configured for a member that returns nothing.
    pub fn register(self) -> Result<Arc<Setup>, ShapeError> {
        let returns_value = self
            .draft
            .actions
            .iter()
            .any(|a| matches!(a, Action::ReturnValue(_) | Action::ReturnWith(_)));
        let member = self.draft.shape.member();
        if returns_value && member.returns() == ReturnType::Void {
            return Err(ShapeError::ReturnOnVoidMember {
                member: member.to_string(),
            });
        }
        Ok(self.mock.setups().add(self.draft))
    }
}

impl fmt::Debug for SetupBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupBuilder")
            .field("mock", self.mock)
            .field("shape", &self.draft.shape.to_string())
            .finish_non_exhaustive()
    }
}
