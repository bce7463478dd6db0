// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! What setup actions see while a call is being dispatched, and what they can
//! raise.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::call::Call;
use crate::member::Member;
use crate::value::{TypeRef, Value};

/// A failure raised on behalf of the mocked member: the configured exception
/// of a setup, or an error returned by one of its callbacks.
///
/// The engine never reinterprets a fault; it becomes the call's outcome.
#[derive(Clone)]
pub struct Fault(Arc<dyn StdError + Send + Sync + 'static>);

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

impl Fault {
    /// Wraps an error.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Arc::new(error))
    }

    /// A fault carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// Borrows the wrapped error as `E`.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    /// True when both handles wrap the same error instance.
    pub fn same_instance(&self, other: &Fault) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fault").field(&self.0).finish()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for Fault {}

/// Misuse of a by-reference slot from inside a callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// The member has no argument at this position.
    #[error("{member} has no argument {index}")]
    OutOfRange {
        /// The member.
        member: String,
        /// Requested position.
        index: usize,
    },
    /// The argument is passed by value and cannot be written back.
    #[error("argument {index} of {member} is not passed by reference")]
    NotByRef {
        /// The member.
        member: String,
        /// Requested position.
        index: usize,
    },
}

impl From<SlotError> for Fault {
    fn from(error: SlotError) -> Self {
        Fault::new(error)
    }
}

/// A by-reference argument rewritten during dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteBack {
    /// Argument position.
    pub index: usize,
    /// New slot contents.
    pub value: Value,
}

/// The in-flight call as seen by setup actions.
///
/// Arguments reflect writes made by earlier callbacks of the same setup, so a
/// callback that rewrites a by-reference slot is observed by the next one.
pub struct CallFrame<'a> {
    call: &'a Call,
    args: Vec<Value>,
    written: Vec<bool>,
}

impl<'a> CallFrame<'a> {
    pub(crate) fn new(call: &'a Call) -> Self {
        Self {
            call,
            args: call.args().to_vec(),
            written: vec![false; call.args().len()],
        }
    }

    /// The call as received from the proxy layer (original arguments).
    pub fn call(&self) -> &'a Call {
        self.call
    }

    /// The called member.
    pub fn member(&self) -> &'a Member {
        self.call.member()
    }

    /// Concrete type arguments of this instantiation.
    pub fn type_args(&self) -> &'a [TypeRef] {
        self.call.type_args()
    }

    /// Concrete type argument at `index`.
    pub fn type_arg(&self, index: usize) -> Option<&'a TypeRef> {
        self.call.type_arg(index)
    }

    /// Current argument values.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Current value of the argument at `index`.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Current value of the argument at `index`, as a `T`.
    pub fn arg_as<T: Any>(&self, index: usize) -> Option<&T> {
        self.arg(index).and_then(Value::downcast_ref::<T>)
    }

    /// Overwrites the by-reference slot at `index`.
    ///
    /// # Errors
    /// Returns [`SlotError`] when there is no such argument or it is passed
    /// by value.
    pub fn set_ref(&mut self, index: usize, value: Value) -> Result<(), SlotError> {
        let member = self.call.member();
        let (Some(param), Some(slot), Some(written)) = (
            member.params().get(index),
            self.args.get_mut(index),
            self.written.get_mut(index),
        ) else {
            return Err(SlotError::OutOfRange {
                member: member.to_string(),
                index,
            });
        };
        if !param.by_ref {
            return Err(SlotError::NotByRef {
                member: member.to_string(),
                index,
            });
        }
        *slot = value;
        *written = true;
        Ok(())
    }

    pub(crate) fn into_write_backs(self) -> Vec<WriteBack> {
        self.args
            .into_iter()
            .zip(self.written)
            .enumerate()
            .filter(|(_, (_, written))| *written)
            .map(|(index, (value, _))| WriteBack { index, value })
            .collect()
    }
}

impl fmt::Debug for CallFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallFrame")
            .field("call", &self.call.to_string())
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::member::TypeSlot;

    fn mixed_call() -> Call {
        let member = Member::method("IW", "Mixed")
            .param("by_value", TypeSlot::Concrete(TypeRef::of::<i32>()))
            .by_ref_param("slot", TypeSlot::Concrete(TypeRef::of::<i32>()))
            .build();
        Call::new(member, vec![], vec![Value::new(1i32), Value::new(2i32)])
    }

    #[test]
    fn writes_are_visible_and_collected() {
        let call = mixed_call();
        let mut frame = CallFrame::new(&call);
        frame.set_ref(1, Value::new(20i32)).unwrap();
        assert_eq!(frame.arg_as::<i32>(1), Some(&20));
        // The original descriptor is untouched.
        assert_eq!(call.arg(1), Some(&Value::new(2i32)));
        let writes = frame.into_write_backs();
        assert_eq!(
            writes,
            vec![WriteBack {
                index: 1,
                value: Value::new(20i32)
            }]
        );
    }

    #[test]
    fn by_value_and_missing_slots_are_rejected() {
        let call = mixed_call();
        let mut frame = CallFrame::new(&call);
        assert!(matches!(
            frame.set_ref(0, Value::new(0i32)),
            Err(SlotError::NotByRef { index: 0, .. })
        ));
        assert!(matches!(
            frame.set_ref(9, Value::new(0i32)),
            Err(SlotError::OutOfRange { index: 9, .. })
        ));
        assert!(frame.into_write_backs().is_empty());
    }

    #[test]
    fn faults_keep_their_source_type() {
        let fault = Fault::from(SlotError::NotByRef {
            member: "IW::Mixed".into(),
            index: 0,
        });
        assert!(fault.downcast_ref::<SlotError>().is_some());
        assert_eq!(Fault::msg("boom").to_string(), "boom");
    }
}
