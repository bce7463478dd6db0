// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dispatch: turn one intercepted call into a disposition.
//!
//! Order of work for a call:
//! 1. validate the descriptor against its member (malformed calls are not
//!    recorded);
//! 2. look up the most recent matching setup;
//! 3. append the invocation to the ledger (always, before any action runs);
//! 4. run the setup's actions in configuration order, or fall back to the
//!    mock's default value policy.
//!
//! No engine lock is held while actions run.

use std::sync::Arc;

use tracing::debug;

use crate::call::Call;
use crate::error::MockError;
use crate::frame::{CallFrame, Fault, WriteBack};
use crate::mock::{Mock, MockSettings};
use crate::setup::{Action, Setup, SetupDraft, SetupOrigin};
use crate::shape::CallShape;
use crate::value::{TypeRef, Value};

/// What the proxy should do with the call.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Return normally. `None` for void members, or when the policy knows no
    /// value for the return type.
    Returned(Option<Value>),
    /// Raise the fault.
    Raised(Fault),
}

/// Result of dispatching a call.
#[derive(Debug, Clone)]
pub struct Disposition {
    /// Return or raise.
    pub outcome: Outcome,
    /// By-reference slots rewritten by callbacks, in argument order. They
    /// are reported even when the call raises.
    pub write_backs: Vec<WriteBack>,
}

impl Disposition {
    fn returned_value(value: Option<Value>) -> Self {
        Self {
            outcome: Outcome::Returned(value),
            write_backs: Vec::new(),
        }
    }

    /// The outcome as a `Result`.
    pub fn into_result(self) -> Result<Option<Value>, Fault> {
        match self.outcome {
            Outcome::Returned(value) => Ok(value),
            Outcome::Raised(fault) => Err(fault),
        }
    }

    /// The returned value, if the call returned one.
    pub fn returned(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Returned(value) => value.as_ref(),
            Outcome::Raised(_) => None,
        }
    }

    /// The raised fault, if any.
    pub fn raised(&self) -> Option<&Fault> {
        match &self.outcome {
            Outcome::Raised(fault) => Some(fault),
            Outcome::Returned(_) => None,
        }
    }

    /// New contents of the by-reference slot at `index`, if it was written.
    pub fn write_back(&self, index: usize) -> Option<&Value> {
        self.write_backs
            .iter()
            .find(|w| w.index == index)
            .map(|w| &w.value)
    }
}

enum Response {
    Value(Value),
    Raise(Fault),
    Unset,
}

impl Mock {
    /// Dispatches an intercepted call.
    ///
    /// # Errors
    /// * [`MockError::MalformedCall`] / [`MockError::UnknownTypeParameter`]
    ///   when the descriptor does not fit its member.
    /// * [`MockError::UnexpectedCall`] when a strict mock has no matching
    ///   setup.
    /// * [`MockError::ReturnValueRequired`] when a strict mock matched a setup
    ///   that configures no return value for a value-returning member.
    ///
    /// In the last two cases the invocation is still recorded.
    pub fn dispatch(&self, call: Call) -> Result<Disposition, MockError> {
        call.check()?;
        match self.setups().find_best_match(&call) {
            Some(setup) => self.dispatch_matched(call, setup),
            None => self.dispatch_unmatched(call),
        }
    }

    fn dispatch_matched(&self, call: Call, setup: Arc<Setup>) -> Result<Disposition, MockError> {
        let absorbed = setup.absorb();
        let invocation = self.invocations().record(call, Some(Arc::clone(&setup)));
        let call = invocation.call();
        debug!(mock = %self, call = %call, setup = setup.seq(), absorbed, "call matched");

        let mut frame = CallFrame::new(call);
        let mut response = Response::Unset;
        for action in setup.actions() {
            match action {
                Action::Callback(callback) => {
                    if let Err(fault) = (**callback)(&mut frame) {
                        response = Response::Raise(fault);
                        break;
                    }
                }
                Action::ReturnValue(value) => response = Response::Value(value.clone()),
                Action::ReturnWith(produce) => match (**produce)(&frame) {
                    Ok(value) => response = Response::Value(value),
                    Err(fault) => {
                        response = Response::Raise(fault);
                        break;
                    }
                },
                Action::Throw(fault) => {
                    response = Response::Raise(fault.clone());
                    break;
                }
            }
        }
        let write_backs = frame.into_write_backs();

        let outcome = match response {
            Response::Value(value) => Outcome::Returned(Some(value)),
            Response::Raise(fault) => {
                debug!(mock = %self, call = %call, fault = %fault, "setup raised");
                Outcome::Raised(fault)
            }
            Response::Unset => match call.return_type() {
                None => Outcome::Returned(None),
                Some(_) if self.default_value().is_strict() => {
                    return Err(MockError::ReturnValueRequired {
                        mock: self.label(),
                        setup: setup.seq(),
                        call: call.to_string(),
                    });
                }
                Some(ty) => Outcome::Returned(self.default_for(&ty, call).map(|(v, _)| v)),
            },
        };
        Ok(Disposition {
            outcome,
            write_backs,
        })
    }

    fn dispatch_unmatched(&self, call: Call) -> Result<Disposition, MockError> {
        let settings = self.settings();
        if settings.default_value.is_strict() {
            let call_text = call.to_string();
            self.invocations().record(call, None);
            debug!(mock = %self, call = %call_text, "unexpected call on strict mock");
            return Err(MockError::UnexpectedCall {
                mock: self.label(),
                call: call_text,
            });
        }
        let Some(ty) = call.return_type() else {
            self.invocations().record(call, None);
            return Ok(Disposition::returned_value(None));
        };
        match self.default_for(&ty, &call) {
            Some((value, Some(inner))) => {
                // Later identical calls get the same substitute. A thread
                // that loses the race drops its own and answers with the
                // winner's.
                let mut draft = SetupDraft::new(CallShape::exact(&call));
                draft.actions.push(Action::ReturnValue(value.clone()));
                draft.origin = SetupOrigin::InnerMock;
                draft.inner_mock = Some(inner.downgrade());
                let (setup, created) = self.setups().add_if_absent(draft);
                setup.absorb();
                let value = if created {
                    debug!(
                        mock = %self,
                        call = %call,
                        inner = %inner,
                        "substitute inner mock created"
                    );
                    value
                } else {
                    debug!(
                        mock = %self,
                        call = %call,
                        setup = setup.seq(),
                        "substitute inner mock reused"
                    );
                    setup.fixed_value().unwrap_or(value)
                };
                self.invocations().record(call, Some(setup));
                Ok(Disposition::returned_value(Some(value)))
            }
            produced => {
                debug!(
                    mock = %self,
                    call = %call,
                    produced = produced.is_some(),
                    "unmatched call answered by default value"
                );
                self.invocations().record(call, None);
                Ok(Disposition::returned_value(produced.map(|(v, _)| v)))
            }
        }
    }

    /// Default value for `ty`, plus the inner mock backing it when the policy
    /// substituted one.
    fn default_for(&self, ty: &TypeRef, call: &Call) -> Option<(Value, Option<Mock>)> {
        let policy = self.default_value();
        if policy.substitutes(ty) {
            let inner = Mock::with_settings(MockSettings {
                name: None,
                default_value: policy,
            });
            return ty.substitute(&inner).map(|value| (value, Some(inner)));
        }
        policy.empty_value(ty, call).map(|value| (value, None))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::default_value::DefaultValuePolicy;
    use crate::matcher::Matcher;
    use crate::member::{Member, TypeSlot};

    fn add() -> Member {
        Member::method("ICalc", "Add")
            .param("a", TypeSlot::Concrete(TypeRef::of::<i32>()))
            .param("b", TypeSlot::Concrete(TypeRef::of::<i32>()))
            .returns(TypeSlot::Concrete(TypeRef::defaulted::<i32>()))
            .build()
    }

    fn add_call(a: i32, b: i32) -> Call {
        Call::new(add(), vec![], vec![Value::new(a), Value::new(b)])
    }

    fn any_add() -> CallShape {
        CallShape::builder(add())
            .arg(Matcher::any())
            .arg(Matcher::any())
            .build()
            .unwrap()
    }

    #[test]
    fn return_producer_sees_arguments() {
        let mock = Mock::new();
        mock.setup(any_add())
            .returns_with(|frame| {
                let a = frame.arg_as::<i32>(0).copied().unwrap_or_default();
                let b = frame.arg_as::<i32>(1).copied().unwrap_or_default();
                Ok(Value::new(a + b))
            })
            .register()
            .unwrap();
        let out = mock.dispatch(add_call(2, 3)).unwrap();
        assert_eq!(out.returned(), Some(&Value::new(5i32)));
        assert_eq!(mock.invocations().len(), 1);
    }

    #[test]
    fn unmatched_permissive_call_returns_empty_value() {
        let mock = Mock::new();
        let out = mock.dispatch(add_call(1, 1)).unwrap();
        assert_eq!(out.returned(), Some(&Value::new(0i32)));
        assert!(mock.invocations().all()[0].matched_setup().is_none());
    }

    #[test]
    fn strict_mock_rejects_and_still_records() {
        let mock = Mock::strict();
        let err = mock.dispatch(add_call(1, 2)).unwrap_err();
        assert!(matches!(err, MockError::UnexpectedCall { .. }));
        assert_eq!(mock.invocations().len(), 1);
    }

    #[test]
    fn strict_mock_requires_a_return_value() {
        let mock = Mock::with_settings(
            MockSettings::default().with_default_value(DefaultValuePolicy::Strict),
        );
        mock.setup(any_add()).register().unwrap();
        let err = mock.dispatch(add_call(1, 2)).unwrap_err();
        assert!(matches!(err, MockError::ReturnValueRequired { .. }));
    }

    #[test]
    fn throw_stops_later_actions() {
        let mock = Mock::new();
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        mock.setup(any_add())
            .throws(Fault::msg("overflow"))
            .callback(move |_| {
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            })
            .register()
            .unwrap();
        let out = mock.dispatch(add_call(i32::MAX, 1)).unwrap();
        assert_eq!(out.raised().map(ToString::to_string), Some("overflow".into()));
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn malformed_calls_are_not_recorded() {
        let mock = Mock::new();
        let err = mock
            .dispatch(Call::new(add(), vec![], vec![Value::new(1i32)]))
            .unwrap_err();
        assert!(matches!(err, MockError::MalformedCall { .. }));
        assert!(mock.invocations().is_empty());
    }
}
