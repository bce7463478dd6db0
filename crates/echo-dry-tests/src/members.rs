// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Member descriptors for the fixture interfaces.
//!
//! ```text
//! interface IX       { void Method<T>(); }
//! interface IY       { T Method<T>(T arg); T ByRefMethod<T>(ref T arg); }
//! interface IZ       { T Method<T>(); }
//! interface IService { void Ping(i32 n); String Name(); }
//! interface IFactory { IService Create(String name); }
//! ```
//!
//! Each function builds a fresh descriptor; descriptors compare
//! structurally, so repeated calls name the same member.

use echo_mock::{CallShape, Matcher, Member, ShapeError, TypeRef, TypeSlot};

use crate::proxies::ServiceProxy;

/// `void IX::Method<T>()`.
pub fn generic_void() -> Member {
    Member::method("IX", "Method").type_param("T").build()
}

/// `T IY::Method<T>(T arg)`.
pub fn generic_echo() -> Member {
    Member::method("IY", "Method")
        .type_param("T")
        .param("arg", TypeSlot::Generic(0))
        .returns(TypeSlot::Generic(0))
        .build()
}

/// `T IY::ByRefMethod<T>(ref T arg)`.
pub fn generic_by_ref() -> Member {
    Member::method("IY", "ByRefMethod")
        .type_param("T")
        .by_ref_param("arg", TypeSlot::Generic(0))
        .returns(TypeSlot::Generic(0))
        .build()
}

/// `T IZ::Method<T>()`.
pub fn generic_factory() -> Member {
    Member::method("IZ", "Method")
        .type_param("T")
        .returns(TypeSlot::Generic(0))
        .build()
}

/// `void IService::Ping(i32 n)`.
pub fn service_ping() -> Member {
    Member::method("IService", "Ping")
        .param("n", TypeSlot::Concrete(TypeRef::defaulted::<i32>()))
        .build()
}

/// `String IService::Name()`.
pub fn service_name() -> Member {
    Member::method("IService", "Name")
        .returns(TypeSlot::Concrete(TypeRef::defaulted::<String>()))
        .build()
}

/// `IService IFactory::Create(String name)`.
pub fn factory_create() -> Member {
    Member::method("IFactory", "Create")
        .param("name", TypeSlot::Concrete(TypeRef::defaulted::<String>()))
        .returns(TypeSlot::Concrete(ServiceProxy::type_ref()))
        .build()
}

// --- Shapes ---

/// `IX::Method<AnyType>()`.
pub fn any_void() -> Result<CallShape, ShapeError> {
    CallShape::builder(generic_void()).any_type().build()
}

/// `IY::Method<AnyType>(any)`.
pub fn any_echo() -> Result<CallShape, ShapeError> {
    CallShape::builder(generic_echo())
        .any_type()
        .arg(Matcher::any())
        .build()
}

/// `IY::ByRefMethod<AnyType>(ref any)`.
pub fn any_by_ref() -> Result<CallShape, ShapeError> {
    CallShape::builder(generic_by_ref())
        .any_type()
        .arg(Matcher::ref_any())
        .build()
}

/// `IZ::Method<AnyType>()`.
pub fn any_factory() -> Result<CallShape, ShapeError> {
    CallShape::builder(generic_factory()).any_type().build()
}

/// `IService::Ping(matcher)`.
pub fn ping_with(matcher: Matcher) -> Result<CallShape, ShapeError> {
    CallShape::builder(service_ping()).arg(matcher).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_shapes_are_well_formed() {
        assert!(any_void().is_ok());
        assert!(any_echo().is_ok());
        assert!(any_by_ref().is_ok());
        assert!(any_factory().is_ok());
        assert!(ping_with(Matcher::literal(1i32)).is_ok());
    }

    #[test]
    fn factory_returns_a_mockable_type() {
        let member = factory_create();
        assert!(matches!(
            member.returns(),
            echo_mock::ReturnType::Value(TypeSlot::Concrete(ty)) if ty.is_mockable()
        ));
    }
}
