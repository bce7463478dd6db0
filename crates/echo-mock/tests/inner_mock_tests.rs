// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Inner mocks: mocks returned by other mocks' setups, explicit or
//! substituted by the default value policy.

use echo_dry_tests::members::{self, ping_with};
use echo_dry_tests::{FactoryProxy, ServiceProxy};
use echo_mock::{
    CallShape, DefaultValuePolicy, Matcher, Mock, MockSettings, SetupOrigin, Times, Value,
};

fn substituting_mock() -> Mock {
    Mock::with_settings(
        MockSettings::named("factory").with_default_value(DefaultValuePolicy::EmptySubstitutes),
    )
}

fn create_shape(name: &str) -> CallShape {
    CallShape::builder(members::factory_create())
        .arg(Matcher::literal(name.to_owned()))
        .build()
        .unwrap()
}

#[test]
fn substitutes_are_cached_per_argument_list() {
    let mock = substituting_mock();
    let factory = FactoryProxy::new(mock.clone());

    let a = factory.create("a").unwrap();
    let a_again = factory.create("a").unwrap();
    let b = factory.create("b").unwrap();

    assert_eq!(a, a_again);
    assert_ne!(a, b);
    assert_eq!(mock.inner_mocks().len(), 2);
    let setups = mock.setups().all();
    assert!(setups.iter().all(|s| s.origin() == SetupOrigin::InnerMock));
}

#[test]
fn substitutes_inherit_the_policy() {
    let mock = substituting_mock();
    let service = FactoryProxy::new(mock).create("svc").unwrap();
    assert!(matches!(
        service.mock().default_value(),
        DefaultValuePolicy::EmptySubstitutes
    ));
    assert_eq!(service.name().unwrap(), "");
}

#[test]
fn empty_defaults_do_not_substitute() {
    let factory = FactoryProxy::new(Mock::new());
    let err = factory.create("x").unwrap_err();
    assert!(matches!(err, echo_dry_tests::ProxyError::NoValue { .. }));
}

#[test]
fn substitute_invocations_do_not_need_verification() {
    let mock = substituting_mock();
    let service = FactoryProxy::new(mock.clone()).create("svc").unwrap();
    mock.verify_no_other_calls().unwrap();

    // Calls on the inner mock do.
    service.ping(1).unwrap();
    assert!(mock.verify_no_other_calls().is_err());
    service
        .mock()
        .verify(&ping_with(Matcher::any()).unwrap(), Times::once())
        .unwrap();
    mock.verify_no_other_calls().unwrap();
}

#[test]
fn clearing_recurses_into_inner_mocks() {
    let mock = substituting_mock();
    let factory = FactoryProxy::new(mock.clone());
    let service = factory.create("svc").unwrap();
    service.ping(1).unwrap();
    service.ping(2).unwrap();

    mock.clear_invocations_including_inner_mocks();
    assert!(mock.invocations().is_empty());
    assert!(service.mock().invocations().is_empty());
    mock.verify_no_other_calls().unwrap();

    // The cached substitute survives clearing.
    assert_eq!(factory.create("svc").unwrap(), service);
}

#[test]
fn explicit_inner_mock_is_tracked() {
    let outer = Mock::new();
    let inner = Mock::with_settings(MockSettings::named("service"));
    let service = ServiceProxy::new(inner.clone());
    outer
        .setup(create_shape("svc"))
        .returns_inner_mock(&inner, Value::new(service.clone()))
        .register()
        .unwrap();

    assert_eq!(outer.inner_mocks(), vec![inner.clone()]);
    let produced = FactoryProxy::new(outer.clone()).create("svc").unwrap();
    assert_eq!(produced, service);
}

#[test]
fn returning_a_mock_handle_tracks_it() {
    let outer = Mock::new();
    let inner = Mock::new();
    let shape = CallShape::builder(members::generic_factory())
        .type_of::<Mock>()
        .build()
        .unwrap();
    outer
        .setup(shape)
        .returns_value(Value::new(inner.clone()))
        .register()
        .unwrap();
    assert_eq!(outer.inner_mocks(), vec![inner]);
}

#[test]
fn setup_phase_discards_setup_time_calls() {
    let outer = Mock::new();
    let inner = Mock::new();
    let service = ServiceProxy::new(inner.clone());
    {
        let phase = outer.begin_setup();
        phase
            .mock()
            .setup(create_shape("svc"))
            .returns_inner_mock(&inner, Value::new(service.clone()))
            .register()
            .unwrap();
        // Reaching through the outer mock while configuring it.
        FactoryProxy::new(outer.clone()).create("svc").unwrap();
        inner
            .setup(ping_with(Matcher::any()).unwrap())
            .register()
            .unwrap();
        service.ping(0).unwrap();
        assert_eq!(inner.invocations().len(), 1);
        phase.commit();
    }

    assert!(outer.invocations().is_empty());
    assert!(inner.invocations().is_empty());
    outer.verify_no_other_calls().unwrap();
}

#[test]
fn setup_phase_clears_on_drop() {
    let mock = Mock::new();
    {
        let _phase = mock.begin_setup();
        ServiceProxy::new(mock.clone()).ping(1).unwrap();
    }
    assert!(mock.invocations().is_empty());
}

#[test]
fn verify_all_recurses_into_inner_mocks() {
    let outer = Mock::new();
    let inner = Mock::new();
    inner
        .setup(ping_with(Matcher::any()).unwrap())
        .verifiable()
        .register()
        .unwrap();
    outer
        .setup(create_shape("svc"))
        .returns_inner_mock(&inner, Value::new(ServiceProxy::new(inner.clone())))
        .register()
        .unwrap();

    assert!(outer.verify_all().is_err());
    let service = FactoryProxy::new(outer.clone()).create("svc").unwrap();
    service.ping(3).unwrap();
    outer.verify_all().unwrap();
}

#[test]
fn cyclic_inner_mocks_terminate() {
    let a = Mock::new();
    let b = Mock::new();
    let shape = CallShape::builder(members::generic_factory())
        .type_of::<Mock>()
        .build()
        .unwrap();
    a.setup(shape.clone())
        .returns_value(Value::new(b.clone()))
        .register()
        .unwrap();
    b.setup(shape).returns_value(Value::new(a.clone())).register().unwrap();

    a.clear_invocations_including_inner_mocks();
    a.verify_no_other_calls().unwrap();
    a.verify_all().unwrap();

    // Each setup holds the other mock strongly; resetting one side frees both.
    let weak_b = b.downgrade();
    drop(b);
    assert!(weak_b.upgrade().is_some());
    a.reset();
    assert!(weak_b.upgrade().is_none());
}
