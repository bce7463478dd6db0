// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Append-only record of intercepted calls.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

use crate::call::Call;
use crate::setup::{Setup, SetupOrigin};

/// One recorded call.
pub struct Invocation {
    seq: u64,
    call: Call,
    matched: Option<Arc<Setup>>,
    verified: AtomicBool,
}

impl Invocation {
    /// Arrival position within the ledger (unique, increasing).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The call exactly as dispatched.
    pub fn call(&self) -> &Call {
        &self.call
    }

    /// The setup that handled the call, if any.
    pub fn matched_setup(&self) -> Option<&Arc<Setup>> {
        self.matched.as_ref()
    }

    /// True once an explicit verification counted this invocation.
    pub fn is_verified(&self) -> bool {
        self.verified.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_verified(&self) {
        self.verified.store(true, Ordering::SeqCst);
    }

    /// Verified, absorbed by a verifiable setup, or absorbed by a setup the
    /// engine registered for a substitute inner mock.
    pub fn is_accounted_for(&self) -> bool {
        self.is_verified()
            || self
                .matched
                .as_ref()
                .is_some_and(|s| s.is_verifiable() || s.origin() == SetupOrigin::InnerMock)
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("seq", &self.seq)
            .field("call", &self.call.to_string())
            .field("matched", &self.matched.as_ref().map(|s| s.seq()))
            .field("verified", &self.is_verified())
            .finish()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.call)
    }
}

#[derive(Default)]
struct LedgerState {
    entries: Vec<Arc<Invocation>>,
    next_seq: u64,
}

/// Calls in arrival order. Concurrent appends each get a distinct position.
#[derive(Default)]
pub struct InvocationLedger {
    state: Mutex<LedgerState>,
}

impl InvocationLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a call and the setup it matched.
    pub fn record(&self, call: Call, matched: Option<Arc<Setup>>) -> Arc<Invocation> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = state.next_seq;
        state.next_seq += 1;
        trace!(
            invocation = seq,
            call = %call,
            matched = ?matched.as_ref().map(|s| s.seq()),
            "invocation recorded"
        );
        let invocation = Arc::new(Invocation {
            seq,
            call,
            matched,
            verified: AtomicBool::new(false),
        });
        state.entries.push(Arc::clone(&invocation));
        invocation
    }

    /// Snapshot of every invocation in arrival order.
    pub fn all(&self) -> Vec<Arc<Invocation>> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clone()
    }

    /// Invocations not yet accounted for by verification.
    pub fn unverified(&self) -> Vec<Arc<Invocation>> {
        self.all()
            .into_iter()
            .filter(|i| !i.is_accounted_for())
            .collect()
    }

    /// Drops every entry at once.
    pub fn clear(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clear();
    }

    /// Number of recorded invocations.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// True when nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for InvocationLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationLedger")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::Member;

    fn call() -> Call {
        Call::new(Member::method("IService", "Ping").build(), vec![], vec![])
    }

    #[test]
    fn positions_increase_and_survive_clear() {
        let ledger = InvocationLedger::new();
        let a = ledger.record(call(), None);
        let b = ledger.record(call(), None);
        assert!(b.seq() > a.seq());
        ledger.clear();
        assert!(ledger.is_empty());
        let c = ledger.record(call(), None);
        assert!(c.seq() > b.seq());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn unmatched_invocations_start_unaccounted() {
        let ledger = InvocationLedger::new();
        let inv = ledger.record(call(), None);
        assert_eq!(ledger.unverified().len(), 1);
        inv.mark_verified();
        assert!(ledger.unverified().is_empty());
    }

    #[test]
    fn concurrent_appends_get_distinct_positions() {
        let ledger = Arc::new(InvocationLedger::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        ledger.record(call(), None);
                    }
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().is_ok());
        }
        let mut seqs: Vec<u64> = ledger.all().iter().map(|i| i.seq()).collect();
        assert_eq!(seqs.len(), 800);
        seqs.sort_unstable();
        seqs.dedup();
        assert_eq!(seqs.len(), 800);
    }
}
