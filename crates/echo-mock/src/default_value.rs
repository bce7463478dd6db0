// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! How a mock answers calls that no setup configures a return value for.
//!
//! Return types are always resolved against the call's concrete type
//! arguments before a policy sees them, so an open `AnyType` setup never
//! leaks into the produced value: `Method::<Vec<i32>>()` yields an empty
//! `Vec<i32>`.

use std::fmt;
use std::sync::Arc;

use crate::call::Call;
use crate::value::{TypeRef, Value};

/// User-supplied default value source.
pub trait DefaultValueProvider: Send + Sync {
    /// Value for an unconfigured call returning `ty`, or `None` to fall back
    /// to the type's empty value.
    fn produce(&self, ty: &TypeRef, call: &Call) -> Option<Value>;
}

impl<F> DefaultValueProvider for F
where
    F: Fn(&TypeRef, &Call) -> Option<Value> + Send + Sync,
{
    fn produce(&self, ty: &TypeRef, call: &Call) -> Option<Value> {
        self(ty, call)
    }
}

/// Per-mock default value policy.
#[derive(Clone, Default)]
pub enum DefaultValuePolicy {
    /// Empty values: zero, empty string, empty collection; nothing for types
    /// without a known empty value.
    #[default]
    EmptyDefaults,
    /// Like `EmptyDefaults`, but mockable return types are answered with an
    /// object backed by a fresh inner mock, which is then cached per argument
    /// list.
    EmptySubstitutes,
    /// Unconfigured calls fail.
    Strict,
    /// Ask a provider first, then fall back to `EmptyDefaults`.
    Custom(Arc<dyn DefaultValueProvider>),
}

impl DefaultValuePolicy {
    /// Wraps a provider.
    pub fn custom(provider: impl DefaultValueProvider + 'static) -> Self {
        Self::Custom(Arc::new(provider))
    }

    /// True for [`DefaultValuePolicy::Strict`].
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Strict)
    }

    /// True when `ty` should be answered with a substitute inner mock.
    pub(crate) fn substitutes(&self, ty: &TypeRef) -> bool {
        matches!(self, Self::EmptySubstitutes) && ty.is_mockable()
    }

    /// Value-only part of the policy: no inner mocks are created here.
    pub(crate) fn empty_value(&self, ty: &TypeRef, call: &Call) -> Option<Value> {
        match self {
            Self::Custom(provider) => provider.produce(ty, call).or_else(|| ty.empty_value()),
            Self::EmptyDefaults | Self::EmptySubstitutes | Self::Strict => ty.empty_value(),
        }
    }
}

impl fmt::Debug for DefaultValuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDefaults => f.write_str("EmptyDefaults"),
            Self::EmptySubstitutes => f.write_str("EmptySubstitutes"),
            Self::Strict => f.write_str("Strict"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
