// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Verification: replay the ledger against expectations.
//!
//! Counting ignores shadowing: every recorded invocation whose call matches
//! the shape counts, whichever setup handled it (if any). Invocations are
//! marked verified only when the check succeeds.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::ledger::Invocation;
use crate::mock::Mock;
use crate::setup::Setup;
use crate::shape::CallShape;
use crate::times::Times;

fn bullets(lines: &[String]) -> String {
    if lines.is_empty() {
        return "\n  (none)".to_owned();
    }
    lines.iter().map(|l| format!("\n  {l}")).collect()
}

/// An explicit verification failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The number of matching invocations is outside the expected range.
    #[error(
        "{mock}: expected {shape} to be called {expected}, but it was called {actual} times\nperformed invocations:{}",
        bullets(.performed)
    )]
    CallCount {
        /// Mock label.
        mock: String,
        /// The verified shape.
        shape: String,
        /// Expected cardinality.
        expected: Times,
        /// Matching invocations found.
        actual: usize,
        /// Every recorded invocation of the mock.
        performed: Vec<String>,
    },
    /// One or more setups were not matched the expected number of times.
    #[error(
        "{mock}: setups not matched as expected:{}\nperformed invocations:{}",
        bullets(.failures),
        bullets(.performed)
    )]
    UnmatchedSetups {
        /// Label of the mock verification started from.
        mock: String,
        /// One line per failing setup.
        failures: Vec<String>,
        /// Every recorded invocation, including inner mocks.
        performed: Vec<String>,
    },
    /// Some invocations were neither verified nor expected by a verifiable
    /// setup.
    #[error("{mock}: unverified invocations:{}", bullets(.invocations))]
    UnverifiedInvocations {
        /// Label of the mock verification started from.
        mock: String,
        /// The unaccounted invocations.
        invocations: Vec<String>,
    },
}

fn describe(mock: &Mock, invocations: &[Arc<Invocation>]) -> Vec<String> {
    invocations
        .iter()
        .map(|i| format!("{mock}: {i}"))
        .collect()
}

impl Mock {
    /// Checks that `shape` was called a number of times accepted by `times`.
    ///
    /// # Errors
    /// [`VerificationError::CallCount`] with the actual count and every
    /// performed invocation.
    #[instrument(skip(self, shape), fields(mock = %self, shape = %shape))]
    pub fn verify(&self, shape: &CallShape, times: Times) -> Result<(), VerificationError> {
        let invocations = self.invocations().all();
        let matching: Vec<&Arc<Invocation>> = invocations
            .iter()
            .filter(|i| shape.matches(i.call()))
            .collect();
        if !times.accepts(matching.len()) {
            debug!(expected = %times, actual = matching.len(), "call count mismatch");
            return Err(VerificationError::CallCount {
                mock: self.label(),
                shape: shape.to_string(),
                expected: times,
                actual: matching.len(),
                performed: describe(self, &invocations),
            });
        }
        for invocation in matching {
            invocation.mark_verified();
        }
        Ok(())
    }

    /// Checks every verifiable setup, here and in inner mocks, against its
    /// expected times (at least once unless configured otherwise).
    ///
    /// # Errors
    /// [`VerificationError::UnmatchedSetups`] listing each failing setup.
    #[instrument(skip(self), fields(mock = %self))]
    pub fn verify_all(&self) -> Result<(), VerificationError> {
        self.verify_setups(|m| m.setups().all_verifiable())
    }

    /// Like [`verify_all`](Mock::verify_all), but over every explicit setup
    /// regardless of the verifiable flag.
    ///
    /// # Errors
    /// [`VerificationError::UnmatchedSetups`] listing each failing setup.
    #[instrument(skip(self), fields(mock = %self))]
    pub fn verify_every_setup(&self) -> Result<(), VerificationError> {
        self.verify_setups(|m| m.setups().all_explicit())
    }

    fn verify_setups(
        &self,
        select: impl Fn(&Mock) -> Vec<Arc<Setup>>,
    ) -> Result<(), VerificationError> {
        let mocks = self.transitive();
        let mut failures = Vec::new();
        let mut checked = Vec::new();
        for mock in &mocks {
            for setup in select(mock) {
                let expected = setup.expected_times().unwrap_or_else(Times::at_least_once);
                let actual = setup.absorbed();
                if !expected.accepts(actual) {
                    failures.push(format!(
                        "{mock}: {setup} expected {expected}, matched {actual} times"
                    ));
                }
                checked.push(setup);
            }
        }
        if !failures.is_empty() {
            debug!(failures = failures.len(), "setup verification failed");
            let performed = mocks
                .iter()
                .flat_map(|m| describe(m, &m.invocations().all()))
                .collect();
            return Err(VerificationError::UnmatchedSetups {
                mock: self.label(),
                failures,
                performed,
            });
        }
        for mock in &mocks {
            for invocation in mock.invocations().all() {
                let covered = invocation
                    .matched_setup()
                    .is_some_and(|m| checked.iter().any(|s| Arc::ptr_eq(s, m)));
                if covered {
                    invocation.mark_verified();
                }
            }
        }
        Ok(())
    }

    /// Checks that every invocation, here and in inner mocks, was verified
    /// or absorbed by a verifiable setup.
    ///
    /// # Errors
    /// [`VerificationError::UnverifiedInvocations`] listing the rest.
    #[instrument(skip(self), fields(mock = %self))]
    pub fn verify_no_other_calls(&self) -> Result<(), VerificationError> {
        let unverified: Vec<String> = self
            .transitive()
            .iter()
            .flat_map(|m| describe(m, &m.invocations().unverified()))
            .collect();
        if unverified.is_empty() {
            return Ok(());
        }
        debug!(unverified = unverified.len(), "unverified invocations remain");
        Err(VerificationError::UnverifiedInvocations {
            mock: self.label(),
            invocations: unverified,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::call::Call;
    use crate::matcher::Matcher;
    use crate::member::{Member, TypeSlot};
    use crate::value::{TypeRef, Value};

    fn ping() -> Member {
        Member::method("IService", "Ping")
            .param("n", TypeSlot::Concrete(TypeRef::of::<i32>()))
            .build()
    }

    fn ping_shape(m: Matcher) -> CallShape {
        CallShape::builder(ping()).arg(m).build().unwrap()
    }

    fn ping_call(mock: &Mock, n: i32) {
        mock.dispatch(Call::new(ping(), vec![], vec![Value::new(n)]))
            .unwrap();
    }

    #[test]
    fn counts_are_compared_and_reported() {
        let mock = Mock::new();
        ping_call(&mock, 1);
        ping_call(&mock, 2);
        assert!(mock.verify(&ping_shape(Matcher::any()), Times::exactly(2)).is_ok());
        let err = mock
            .verify(&ping_shape(Matcher::literal(1i32)), Times::exactly(2))
            .unwrap_err();
        assert!(matches!(err, VerificationError::CallCount { actual: 1, .. }));
        let text = err.to_string();
        assert!(text.contains("exactly 2 times"));
        assert!(text.contains("IService::Ping(2)"));
    }

    #[test]
    fn failed_verification_leaves_invocations_unverified() {
        let mock = Mock::new();
        ping_call(&mock, 1);
        assert!(mock.verify(&ping_shape(Matcher::any()), Times::Never).is_err());
        assert!(mock.verify_no_other_calls().is_err());
        assert!(mock.verify(&ping_shape(Matcher::any()), Times::once()).is_ok());
        assert!(mock.verify_no_other_calls().is_ok());
    }

    #[test]
    fn verify_all_uses_expected_times() {
        let mock = Mock::new();
        mock.setup(ping_shape(Matcher::any()))
            .verifiable_times(Times::exactly(2))
            .register()
            .unwrap();
        ping_call(&mock, 1);
        assert!(matches!(
            mock.verify_all(),
            Err(VerificationError::UnmatchedSetups { .. })
        ));
        ping_call(&mock, 1);
        assert!(mock.verify_all().is_ok());
    }

    #[test]
    fn verify_every_setup_ignores_the_verifiable_flag() {
        let mock = Mock::new();
        mock.setup(ping_shape(Matcher::any())).register().unwrap();
        assert!(mock.verify_all().is_ok());
        assert!(mock.verify_every_setup().is_err());
        ping_call(&mock, 3);
        assert!(mock.verify_every_setup().is_ok());
        assert!(mock.verify_no_other_calls().is_ok());
    }
}
