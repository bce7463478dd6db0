// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use echo_dry_tests::members::{any_echo, any_void, ping_with};
use echo_dry_tests::{GenericProxy, ServiceProxy};
use echo_mock::{Bounds, Matcher, Mock, Times, VerificationError};

#[test]
fn exact_count_succeeds_only_at_that_count() {
    let mock = Mock::new();
    let service = ServiceProxy::new(mock.clone());
    let shape = ping_with(Matcher::any()).unwrap();

    for n in 0..3 {
        service.ping(n).unwrap();
    }
    mock.verify(&shape, Times::exactly(3)).unwrap();
    let err = mock.verify(&shape, Times::exactly(2)).unwrap_err();
    match err {
        VerificationError::CallCount {
            expected, actual, ref shape, ..
        } => {
            assert_eq!(expected, Times::exactly(2));
            assert_eq!(actual, 3);
            assert_eq!(shape, "IService::Ping(any)");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failure_message_reports_expectation_and_performed_calls() {
    let mock = Mock::new();
    ServiceProxy::new(mock.clone()).ping(7).unwrap();
    let err = mock
        .verify(&ping_with(Matcher::literal(8i32)).unwrap(), Times::at_least_once())
        .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("IService::Ping(8)"), "{text}");
    assert!(text.contains("at least once"), "{text}");
    assert!(text.contains("called 0 times"), "{text}");
    assert!(text.contains("IService::Ping(7)"), "{text}");
}

#[test]
fn ranges_and_never() {
    let mock = Mock::new();
    let service = ServiceProxy::new(mock.clone());
    let any = ping_with(Matcher::any()).unwrap();
    mock.verify(&any, Times::Never).unwrap();

    service.ping(1).unwrap();
    service.ping(2).unwrap();
    mock.verify(&any, Times::between(1, 3, Bounds::Inclusive)).unwrap();
    mock.verify(&any, Times::between(1, 3, Bounds::Exclusive)).unwrap();
    assert!(mock
        .verify(&any, Times::between(2, 3, Bounds::Exclusive))
        .is_err());
    mock.verify(&any, Times::AtMost(2)).unwrap();
    assert!(mock.verify(&any, Times::Never).is_err());
}

#[test]
fn counting_ignores_shadowing() {
    let mock = Mock::new();
    mock.setup(any_echo().unwrap()).returns(1i32).register().unwrap();
    mock.setup(any_echo().unwrap()).returns(2i32).register().unwrap();
    let proxy = GenericProxy::new(mock.clone());
    proxy.echo(0i32).unwrap();
    proxy.echo(String::new()).unwrap();

    // Both calls were absorbed by the newer setup, but verification only
    // looks at the ledger.
    mock.verify(&any_echo().unwrap(), Times::exactly(2)).unwrap();
}

#[test]
fn no_other_calls_tracks_unaccounted_invocations() {
    let mock = Mock::new();
    let service = ServiceProxy::new(mock.clone());
    service.ping(1).unwrap();
    service.ping(2).unwrap();

    mock.verify(&ping_with(Matcher::literal(1i32)).unwrap(), Times::once())
        .unwrap();
    let err = mock.verify_no_other_calls().unwrap_err();
    match &err {
        VerificationError::UnverifiedInvocations { invocations, .. } => {
            assert_eq!(invocations.len(), 1);
            assert!(invocations[0].ends_with("IService::Ping(2)"));
        }
        other => panic!("unexpected error: {other}"),
    }

    mock.verify(&ping_with(Matcher::literal(2i32)).unwrap(), Times::once())
        .unwrap();
    mock.verify_no_other_calls().unwrap();
}

#[test]
fn verifiable_setups_account_for_their_invocations() {
    let mock = Mock::new();
    mock.setup(ping_with(Matcher::any()).unwrap())
        .verifiable()
        .register()
        .unwrap();
    ServiceProxy::new(mock.clone()).ping(4).unwrap();
    mock.verify_no_other_calls().unwrap();
}

#[test]
fn verify_all_reports_every_unmatched_verifiable_setup() {
    let mock = Mock::new();
    mock.setup(any_void().unwrap()).verifiable().register().unwrap();
    mock.setup(ping_with(Matcher::literal(1i32)).unwrap())
        .verifiable()
        .register()
        .unwrap();
    mock.setup(ping_with(Matcher::literal(2i32)).unwrap())
        .register()
        .unwrap();

    ServiceProxy::new(mock.clone()).ping(1).unwrap();
    let err = mock.verify_all().unwrap_err();
    match &err {
        VerificationError::UnmatchedSetups { failures, .. } => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].contains("IX::Method<AnyType>()"));
        }
        other => panic!("unexpected error: {other}"),
    }

    GenericProxy::new(mock.clone()).method::<u8>().unwrap();
    mock.verify_all().unwrap();
    // The non-verifiable setup was never matched.
    assert!(mock.verify_every_setup().is_err());
}

#[test]
fn overridden_setups_are_not_verified() {
    let mock = Mock::new();
    mock.setup(any_void().unwrap()).verifiable().register().unwrap();
    mock.setup(any_void().unwrap())
        .verifiable_times(Times::once())
        .register()
        .unwrap();
    GenericProxy::new(mock.clone()).method::<i8>().unwrap();
    // The older, overridden setup matched nothing and is ignored.
    mock.verify_all().unwrap();
}

#[test]
fn clear_invocations_resets_counts() {
    let mock = Mock::new();
    let setup = mock
        .setup(ping_with(Matcher::any()).unwrap())
        .verifiable_times(Times::once())
        .register()
        .unwrap();
    let service = ServiceProxy::new(mock.clone());
    service.ping(1).unwrap();
    service.ping(1).unwrap();
    assert!(mock.verify_all().is_err());

    mock.clear_invocations();
    assert_eq!(setup.absorbed(), 0);
    assert!(mock.invocations().is_empty());
    service.ping(1).unwrap();
    mock.verify_all().unwrap();
}
