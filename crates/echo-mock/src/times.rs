// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Expected call counts.

use std::fmt;

/// Whether the bounds of [`Times::Between`] are part of the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bounds {
    /// `from..=to`.
    Inclusive,
    /// `from+1..=to-1`.
    Exclusive,
}

/// Cardinality expectation for verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Times {
    /// Exactly `n` calls.
    Exactly(usize),
    /// `n` or more calls.
    AtLeast(usize),
    /// `n` or fewer calls.
    AtMost(usize),
    /// A range of calls.
    Between {
        /// Lower bound.
        from: usize,
        /// Upper bound.
        to: usize,
        /// Whether the bounds are included.
        bounds: Bounds,
    },
    /// No calls at all.
    Never,
}

impl Times {
    /// Exactly one call.
    pub fn once() -> Self {
        Self::Exactly(1)
    }

    /// One or more calls.
    pub fn at_least_once() -> Self {
        Self::AtLeast(1)
    }

    /// Zero or one call.
    pub fn at_most_once() -> Self {
        Self::AtMost(1)
    }

    /// Exactly `n` calls.
    pub fn exactly(n: usize) -> Self {
        Self::Exactly(n)
    }

    /// `from..=to` (inclusive) or `from+1..=to-1` (exclusive).
    pub fn between(from: usize, to: usize, bounds: Bounds) -> Self {
        Self::Between { from, to, bounds }
    }

    /// Inclusive `(min, max)` accepted counts. An empty range has `min > max`.
    pub fn range(&self) -> (usize, usize) {
        match *self {
            Self::Exactly(n) => (n, n),
            Self::AtLeast(n) => (n, usize::MAX),
            Self::AtMost(n) => (0, n),
            Self::Never => (0, 0),
            Self::Between {
                from,
                to,
                bounds: Bounds::Inclusive,
            } => (from, to),
            Self::Between {
                from,
                to,
                bounds: Bounds::Exclusive,
            } => match to.checked_sub(1) {
                Some(max) => (from.saturating_add(1), max),
                None => (1, 0),
            },
        }
    }

    /// Whether `count` calls satisfy the expectation.
    pub fn accepts(&self, count: usize) -> bool {
        let (min, max) = self.range();
        (min..=max).contains(&count)
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        "time"
    } else {
        "times"
    }
}

impl fmt::Display for Times {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Never | Self::Exactly(0) => f.write_str("never"),
            Self::Exactly(1) => f.write_str("exactly once"),
            Self::Exactly(n) => write!(f, "exactly {n} times"),
            Self::AtLeast(1) => f.write_str("at least once"),
            Self::AtLeast(n) => write!(f, "at least {n} {}", plural(n)),
            Self::AtMost(1) => f.write_str("at most once"),
            Self::AtMost(n) => write!(f, "at most {n} {}", plural(n)),
            Self::Between { from, to, bounds } => {
                let kind = match bounds {
                    Bounds::Inclusive => "inclusive",
                    Bounds::Exclusive => "exclusive",
                };
                write!(f, "between {from} and {to} times ({kind})")
            }
        }
    }
}
