// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Type-erased values and runtime type references.
//!
//! Everything that crosses the proxy boundary (arguments, return values,
//! by-ref slots) travels as a [`Value`]. Types are described by [`TypeRef`],
//! which optionally knows how to build an "empty" instance of itself or a
//! substitute backed by a nested mock. The engine never invents types of its
//! own: a `TypeRef` always names a real Rust type supplied by the proxy layer.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::mock::Mock;

/// Object-safe view of a value that can be passed through a mock.
///
/// Implemented for every `'static + Send + Sync + Debug + PartialEq` type;
/// there is no need to implement it by hand.
pub trait MockValue: Any + Send + Sync + fmt::Debug {
    /// Upcast to `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
    /// Equality across erased values. Values of different types are never equal.
    fn eq_dyn(&self, other: &dyn MockValue) -> bool;
    /// `std::any::type_name` of the concrete type.
    fn value_type_name(&self) -> &'static str;
}

impl<T> MockValue for T
where
    T: Any + Send + Sync + fmt::Debug + PartialEq,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_dyn(&self, other: &dyn MockValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A shared, immutable, type-erased value.
///
/// Cloning is cheap (reference counted). Equality delegates to the wrapped
/// type's `PartialEq`; identity is available through [`Value::same_instance`].
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn MockValue>,
}

impl Value {
    /// Wraps `value`.
    ///
    /// Note that wrapping a `Value` produces a nested value, not a copy.
    pub fn new<T: MockValue>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    fn erased(&self) -> &dyn MockValue {
        self.inner.as_ref()
    }

    /// Borrows the wrapped value as `T`, if that is its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.erased().as_any().downcast_ref::<T>()
    }

    /// Returns true when the wrapped value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.erased().as_any().is::<T>()
    }

    /// `TypeId` of the wrapped value's concrete type.
    pub fn runtime_type(&self) -> TypeId {
        self.erased().as_any().type_id()
    }

    /// Full type name of the wrapped value's concrete type.
    pub fn type_name(&self) -> &'static str {
        self.erased().value_type_name()
    }

    /// Reference identity: both handles point at the same allocation.
    pub fn same_instance(&self, other: &Value) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }

    /// Returns the mock handle when this value *is* a [`Mock`].
    pub fn as_mock(&self) -> Option<Mock> {
        self.downcast_ref::<Mock>().cloned()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other) || self.erased().eq_dyn(other.erased())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.erased(), f)
    }
}

#[derive(Clone, Copy)]
enum TypeKind {
    Opaque,
    Defaulted(fn() -> Value),
    Mockable(fn(&Mock) -> Value),
}

/// Runtime description of a concrete type, as supplied by the proxy layer.
///
/// Equality and hashing consider only the underlying [`TypeId`]; the attached
/// factories are capabilities, not identity.
#[derive(Clone, Copy)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
    kind: TypeKind,
}

fn default_of<T: MockValue + Default>() -> Value {
    Value::new(T::default())
}

impl TypeRef {
    /// A type with no known way to produce a default instance.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            kind: TypeKind::Opaque,
        }
    }

    /// A type whose empty value is `T::default()` (zero, empty string, empty
    /// vector, ...).
    pub fn defaulted<T: MockValue + Default>() -> Self {
        Self {
            kind: TypeKind::Defaulted(default_of::<T>),
            ..Self::of::<T>()
        }
    }

    /// An interface-like type that can be substituted by an object backed by
    /// a nested mock. `factory` wraps the nested mock into the proxy object.
    pub fn mockable<T: ?Sized + 'static>(factory: fn(&Mock) -> Value) -> Self {
        Self {
            kind: TypeKind::Mockable(factory),
            ..Self::of::<T>()
        }
    }

    /// Underlying `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name with module paths stripped (`Vec<i32>` rather than
    /// `alloc::vec::Vec<i32>`).
    pub fn short_name(&self) -> String {
        short_type_name(self.name)
    }

    /// True when the type was registered with [`TypeRef::mockable`].
    pub fn is_mockable(&self) -> bool {
        matches!(self.kind, TypeKind::Mockable(_))
    }

    /// True when `value`'s concrete type is this type.
    pub fn describes(&self, value: &Value) -> bool {
        value.runtime_type() == self.id
    }

    /// The type's empty value, when it has one.
    pub fn empty_value(&self) -> Option<Value> {
        match self.kind {
            TypeKind::Defaulted(make) => Some(make()),
            TypeKind::Opaque | TypeKind::Mockable(_) => None,
        }
    }

    /// Wraps `mock` into an instance of this type, when the type is mockable.
    pub fn substitute(&self, mock: &Mock) -> Option<Value> {
        match self.kind {
            TypeKind::Mockable(factory) => Some(factory(mock)),
            TypeKind::Opaque | TypeKind::Defaulted(_) => None,
        }
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl std::hash::Hash for TypeRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeRef").field(&self.name).finish()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

/// Strips module paths from a `std::any::type_name` string.
pub(crate) fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut ident_start = 0;
    let mut chars = full.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            out.truncate(ident_start);
        } else {
            out.push(c);
            if !(c.is_alphanumeric() || c == '_') {
                ident_start = out.len();
            }
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn values_compare_by_wrapped_equality() {
        assert_eq!(Value::new(42i32), Value::new(42i32));
        assert_ne!(Value::new(42i32), Value::new(43i32));
        // Same digits, different types.
        assert_ne!(Value::new(42i32), Value::new(42i64));
        assert_ne!(Value::new(42i32), Value::new(String::from("42")));
    }

    #[test]
    fn identity_is_distinct_from_equality() {
        let a = Value::new(String::from("x"));
        let b = Value::new(String::from("x"));
        let a2 = a.clone();
        assert_eq!(a, b);
        assert!(!a.same_instance(&b));
        assert!(a.same_instance(&a2));
    }

    #[test]
    fn downcast_recovers_the_concrete_value() {
        let v = Value::new(vec![1u8, 2, 3]);
        assert!(v.is::<Vec<u8>>());
        assert_eq!(v.downcast_ref::<Vec<u8>>().unwrap(), &vec![1u8, 2, 3]);
        assert!(v.downcast_ref::<Vec<i8>>().is_none());
        assert_eq!(v.runtime_type(), TypeId::of::<Vec<u8>>());
    }

    #[test]
    fn defaulted_type_produces_empty_value() {
        let ty = TypeRef::defaulted::<Vec<i32>>();
        let empty = ty.empty_value().unwrap();
        assert!(ty.describes(&empty));
        assert!(empty.downcast_ref::<Vec<i32>>().unwrap().is_empty());
        assert!(TypeRef::of::<Vec<i32>>().empty_value().is_none());
    }

    #[test]
    fn type_refs_compare_by_type_id_only() {
        assert_eq!(TypeRef::of::<i32>(), TypeRef::defaulted::<i32>());
        assert_ne!(TypeRef::of::<i32>(), TypeRef::of::<u32>());
    }

    #[test]
    fn short_names_drop_module_paths() {
        assert_eq!(short_type_name("alloc::vec::Vec<i32>"), "Vec<i32>");
        assert_eq!(
            short_type_name("std::collections::hash::map::HashMap<alloc::string::String, u8>"),
            "HashMap<String, u8>"
        );
        assert_eq!(short_type_name("i32"), "i32");
        assert_eq!(TypeRef::of::<String>().to_string(), "String");
    }
}
