// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Argument matchers.
//!
//! A matcher decides whether one actual argument satisfies one rule. The
//! "any type" wildcard for generic parameters is *not* a matcher; it lives on
//! the call shape as [`TypeConstraint::AnyType`](crate::TypeConstraint).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::value::{MockValue, TypeRef, Value};

type PredicateFn = dyn Fn(&Value) -> bool + Send + Sync;

/// User-supplied argument predicate with a description for diagnostics.
#[derive(Clone)]
pub struct Predicate {
    description: String,
    test: Arc<PredicateFn>,
}

impl Predicate {
    /// Predicate over the erased value.
    pub fn new(
        description: impl Into<String>,
        test: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            test: Arc::new(test),
        }
    }

    /// Predicate over a concrete `T`; values of any other type never match.
    pub fn typed<T: Any>(
        description: impl Into<String>,
        test: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(description, move |value| {
            value.downcast_ref::<T>().is_some_and(|v| test(v))
        })
    }

    /// The description given at construction.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Evaluates the predicate.
    pub fn test(&self, value: &Value) -> bool {
        (self.test)(value)
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.test), Arc::as_ptr(&other.test))
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.description).finish()
    }
}

/// Rule applied to one argument position of a call shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Matcher {
    /// Any value.
    Any,
    /// Any value whose runtime type is the given type.
    AnyOf(TypeRef),
    /// A value equal to this one.
    Literal(Value),
    /// A value accepted by a user predicate.
    Predicate(Predicate),
    /// Any contents of a by-reference slot.
    RefAny,
    /// A by-reference slot holding this value. With `identity`, the slot
    /// must hold the very same instance rather than an equal one.
    RefLiteral {
        /// Expected contents.
        value: Value,
        /// Compare by reference identity instead of equality.
        identity: bool,
    },
}

impl Matcher {
    /// Shorthand for [`Matcher::Any`].
    pub fn any() -> Self {
        Self::Any
    }

    /// Any value of type `T`.
    pub fn any_of<T: ?Sized + 'static>() -> Self {
        Self::AnyOf(TypeRef::of::<T>())
    }

    /// A value equal to `value`.
    pub fn literal<T: MockValue>(value: T) -> Self {
        Self::Literal(Value::new(value))
    }

    /// A `T` satisfying `test`.
    pub fn is<T: Any>(
        description: impl Into<String>,
        test: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::Predicate(Predicate::typed(description, test))
    }

    /// Shorthand for [`Matcher::RefAny`].
    pub fn ref_any() -> Self {
        Self::RefAny
    }

    /// A by-reference slot holding a value equal to `value`.
    pub fn ref_literal<T: MockValue>(value: T) -> Self {
        Self::RefLiteral {
            value: Value::new(value),
            identity: false,
        }
    }

    /// A by-reference slot holding exactly `value` (same instance).
    pub fn ref_identity(value: Value) -> Self {
        Self::RefLiteral {
            value,
            identity: true,
        }
    }

    /// True for the matchers that only apply to by-reference parameters.
    pub fn is_by_ref(&self) -> bool {
        matches!(self, Self::RefAny | Self::RefLiteral { .. })
    }

    /// The literal this matcher compares against, if any.
    pub fn literal_value(&self) -> Option<&Value> {
        match self {
            Self::Literal(value) | Self::RefLiteral { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Decides whether `actual` satisfies the rule.
    ///
    /// For by-reference parameters `actual` is the slot's current contents.
    pub fn matches(&self, actual: &Value) -> bool {
        match self {
            Self::Any | Self::RefAny => true,
            Self::AnyOf(ty) => ty.describes(actual),
            Self::Literal(expected) => expected == actual,
            Self::Predicate(predicate) => predicate.test(actual),
            Self::RefLiteral {
                value,
                identity: true,
            } => value.same_instance(actual),
            Self::RefLiteral {
                value,
                identity: false,
            } => value == actual,
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::AnyOf(ty) => write!(f, "any {ty}"),
            Self::Literal(value) => write!(f, "{value:?}"),
            Self::Predicate(predicate) => write!(f, "is({})", predicate.description()),
            Self::RefAny => f.write_str("ref any"),
            Self::RefLiteral {
                value,
                identity: false,
            } => write!(f, "ref {value:?}"),
            Self::RefLiteral {
                value,
                identity: true,
            } => write!(f, "ref same {value:?}"),
        }
    }
}
