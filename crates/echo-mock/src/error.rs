// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types for dispatch and setup construction.

use thiserror::Error;

/// Errors surfaced by [`Mock::dispatch`](crate::Mock::dispatch).
///
/// These are distinct from a [`Fault`](crate::Fault) raised by a setup: a
/// fault is the configured outcome of a call, a `MockError` means the engine
/// could not produce an outcome at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MockError {
    /// A strict mock received a call no setup matches.
    #[error("{mock}: unexpected call {call}; a strict mock needs a matching setup for every call")]
    UnexpectedCall {
        /// Mock label.
        mock: String,
        /// The rejected call.
        call: String,
    },
    /// A strict mock matched a setup that has no return action for a
    /// member that returns a value.
    #[error("{mock}: setup #{setup} matched {call} but configures no return value")]
    ReturnValueRequired {
        /// Mock label.
        mock: String,
        /// Sequence number of the matched setup.
        setup: u64,
        /// The call.
        call: String,
    },
    /// The call descriptor does not fit its member descriptor.
    #[error("malformed call to {member}: expected {expected} {what}, got {actual}")]
    MalformedCall {
        /// The member being called.
        member: String,
        /// What was miscounted ("type arguments" or "arguments").
        what: &'static str,
        /// Count declared by the member.
        expected: usize,
        /// Count supplied by the call.
        actual: usize,
    },
    /// The member descriptor refers to a generic parameter it does not declare.
    #[error("{member} refers to undeclared type parameter #{index}")]
    UnknownTypeParameter {
        /// The member.
        member: String,
        /// Offending generic index.
        index: usize,
    },
}

/// A call shape or setup was rejected before entering the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// Type constraint count differs from the member's generic arity.
    #[error("{member}: expected {expected} type constraints, got {actual}")]
    TypeConstraintCount {
        /// The member.
        member: String,
        /// Generic arity of the member.
        expected: usize,
        /// Constraints supplied.
        actual: usize,
    },
    /// Matcher count differs from the member's parameter count.
    #[error("{member}: expected {expected} argument matchers, got {actual}")]
    MatcherCount {
        /// The member.
        member: String,
        /// Formal parameter count.
        expected: usize,
        /// Matchers supplied.
        actual: usize,
    },
    /// A by-reference matcher was applied to a by-value parameter.
    #[error("{member}: argument {index} ({param}) is not passed by reference")]
    RefMatcherOnValueParam {
        /// The member.
        member: String,
        /// Parameter position.
        index: usize,
        /// Parameter name.
        param: &'static str,
    },
    /// A literal's type contradicts the concrete type fixed for its parameter.
    #[error("{member}: argument {index} is fixed to {expected} but the literal is {actual}")]
    LiteralTypeMismatch {
        /// The member.
        member: String,
        /// Parameter position.
        index: usize,
        /// Type fixed by the shape.
        expected: String,
        /// Type of the literal.
        actual: String,
    },
    /// The member descriptor refers to a generic parameter it does not declare.
    #[error("{member} refers to undeclared type parameter #{index}")]
    UnknownTypeParameter {
        /// The member.
        member: String,
        /// Offending generic index.
        index: usize,
    },
    /// A return action was configured for a member that returns nothing.
    #[error("{member} returns nothing; it cannot be set up to return a value")]
    ReturnOnVoidMember {
        /// The member.
        member: String,
    },
}
