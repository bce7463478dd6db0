// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Member descriptors supplied by the proxy layer.
//!
//! A [`Member`] identifies an abstract method of a mocked interface
//! independently of any generic instantiation: `Method<T>(T arg) -> T` is one
//! member whether it is later called at `i32` or at `String`.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::value::TypeRef;

/// Declared type of a parameter or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSlot {
    /// A fixed type.
    Concrete(TypeRef),
    /// The member's generic type parameter at this position.
    Generic(usize),
}

impl TypeSlot {
    /// Resolves the slot against a call's concrete type arguments.
    pub fn resolve(&self, type_args: &[TypeRef]) -> Option<TypeRef> {
        match *self {
            TypeSlot::Concrete(ty) => Some(ty),
            TypeSlot::Generic(index) => type_args.get(index).copied(),
        }
    }
}

/// Declared return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    /// The member returns nothing.
    Void,
    /// The member returns a value of this type.
    Value(TypeSlot),
}

/// One formal parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    /// Parameter name (diagnostics only).
    pub name: &'static str,
    /// Declared type.
    pub ty: TypeSlot,
    /// Whether the argument is passed by reference and may be written back.
    pub by_ref: bool,
}

/// Structural description of a mocked member.
#[derive(Debug, PartialEq, Eq)]
pub struct MemberInfo {
    owner: &'static str,
    name: &'static str,
    type_params: Vec<&'static str>,
    params: Vec<Param>,
    returns: ReturnType,
}

impl MemberInfo {
    /// Name of the interface declaring the member.
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    /// Member name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Generic type parameter names, in declaration order.
    pub fn type_params(&self) -> &[&'static str] {
        &self.type_params
    }

    /// Formal parameters, in declaration order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Declared return type.
    pub fn returns(&self) -> ReturnType {
        self.returns
    }

    /// True when the member has generic type parameters.
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// First `Generic(i)` slot whose index is out of range, if any.
    pub(crate) fn dangling_type_param(&self) -> Option<usize> {
        let arity = self.type_params.len();
        let mut slots = self
            .params
            .iter()
            .map(|p| p.ty)
            .chain(match self.returns {
                ReturnType::Value(slot) => Some(slot),
                ReturnType::Void => None,
            });
        slots.find_map(|slot| match slot {
            TypeSlot::Generic(index) if index >= arity => Some(index),
            _ => None,
        })
    }
}

/// Shared handle to a [`MemberInfo`].
///
/// Two handles are the same member when they point at the same descriptor or
/// describe structurally identical members.
#[derive(Clone)]
pub struct Member(Arc<MemberInfo>);

impl Member {
    /// Starts describing a method `owner::name`.
    pub fn method(owner: &'static str, name: &'static str) -> MemberBuilder {
        MemberBuilder {
            info: MemberInfo {
                owner,
                name,
                type_params: Vec::new(),
                params: Vec::new(),
                returns: ReturnType::Void,
            },
        }
    }
}

impl Deref for Member {
    type Target = MemberInfo;

    fn deref(&self) -> &MemberInfo {
        &self.0
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || *self.0 == *other.0
    }
}

impl Eq for Member {}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Member({self})")
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.name)
    }
}

/// Builder for [`Member`].
///
/// ```
/// use echo_mock::{Member, TypeSlot};
///
/// // T Method<T>(T arg)
/// let member = Member::method("IY", "Method")
///     .type_param("T")
///     .param("arg", TypeSlot::Generic(0))
///     .returns(TypeSlot::Generic(0))
///     .build();
/// assert!(member.is_generic());
/// assert_eq!(member.params().len(), 1);
/// ```
#[derive(Debug)]
pub struct MemberBuilder {
    info: MemberInfo,
}

impl MemberBuilder {
    /// Declares the next generic type parameter.
    pub fn type_param(mut self, name: &'static str) -> Self {
        self.info.type_params.push(name);
        self
    }

    /// Declares a by-value parameter.
    pub fn param(mut self, name: &'static str, ty: TypeSlot) -> Self {
        self.info.params.push(Param {
            name,
            ty,
            by_ref: false,
        });
        self
    }

    /// Declares a by-reference parameter.
    pub fn by_ref_param(mut self, name: &'static str, ty: TypeSlot) -> Self {
        self.info.params.push(Param {
            name,
            ty,
            by_ref: true,
        });
        self
    }

    /// Declares the return type (default: void).
    pub fn returns(mut self, ty: TypeSlot) -> Self {
        self.info.returns = ReturnType::Value(ty);
        self
    }

    /// Finishes the descriptor.
    ///
    /// Generic slot indices are checked later, when a call shape is built
    /// against the member or a call is dispatched to it.
    pub fn build(self) -> Member {
        Member(Arc::new(self.info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_member() -> Member {
        Member::method("IY", "Method")
            .type_param("T")
            .param("arg", TypeSlot::Generic(0))
            .returns(TypeSlot::Generic(0))
            .build()
    }

    #[test]
    fn structurally_equal_members_are_the_same_member() {
        assert_eq!(echo_member(), echo_member());
        let other = Member::method("IY", "ByRefMethod")
            .type_param("T")
            .by_ref_param("arg", TypeSlot::Generic(0))
            .returns(TypeSlot::Generic(0))
            .build();
        assert_ne!(echo_member(), other);
    }

    #[test]
    fn generic_slots_resolve_against_type_arguments() {
        let args = [TypeRef::of::<i32>()];
        assert_eq!(TypeSlot::Generic(0).resolve(&args), Some(TypeRef::of::<i32>()));
        assert_eq!(TypeSlot::Generic(1).resolve(&args), None);
        assert_eq!(
            TypeSlot::Concrete(TypeRef::of::<u8>()).resolve(&[]),
            Some(TypeRef::of::<u8>())
        );
    }

    #[test]
    fn dangling_generic_index_is_reported() {
        let member = Member::method("IX", "Broken")
            .param("arg", TypeSlot::Generic(0))
            .build();
        assert_eq!(member.dangling_type_param(), Some(0));
        assert_eq!(echo_member().dangling_type_param(), None);
    }

    #[test]
    fn display_names_owner_and_member() {
        assert_eq!(echo_member().to_string(), "IY::Method");
    }
}
