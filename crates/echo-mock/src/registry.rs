// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-mock setup registry.
//!
//! Lookup policy: the most recently registered setup whose shape accepts the
//! call wins. There is no specificity ranking; registration order decides.
//! Earlier setups are never removed, only shadowed, so setups whose shapes do
//! not overlap keep working side by side.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

use crate::call::Call;
use crate::setup::{Setup, SetupDraft, SetupOrigin};

#[derive(Default)]
struct RegistryState {
    setups: Vec<Arc<Setup>>,
    next_seq: u64,
}

/// Ordered, concurrently accessible collection of setups.
#[derive(Default)]
pub struct SetupRegistry {
    state: RwLock<RegistryState>,
}

impl SetupRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a fully built setup and marks earlier setups with an equal
    /// shape as overridden.
    pub(crate) fn add(&self, draft: SetupDraft) -> Arc<Setup> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        Self::publish(&mut state, draft)
    }

    /// Publishes `draft` unless a live setup with the same origin and an
    /// equal shape is already registered. Returns the published (or
    /// existing) setup and whether `draft` was the one published.
    ///
    /// Lookup and insert share one write lock, so two threads racing on the
    /// same shape end up with the same setup.
    pub(crate) fn add_if_absent(&self, draft: SetupDraft) -> (Arc<Setup>, bool) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let existing = state
            .setups
            .iter()
            .rev()
            .find(|s| {
                !s.is_overridden() && s.origin() == draft.origin && *s.shape() == draft.shape
            })
            .cloned();
        match existing {
            Some(setup) => (setup, false),
            None => (Self::publish(&mut state, draft), true),
        }
    }

    fn publish(state: &mut RegistryState, draft: SetupDraft) -> Arc<Setup> {
        let seq = state.next_seq;
        state.next_seq += 1;
        for earlier in &state.setups {
            if !earlier.is_overridden() && *earlier.shape() == draft.shape {
                earlier.mark_overridden();
                trace!(setup = earlier.seq(), by = seq, "setup overridden");
            }
        }
        let setup = Arc::new(Setup::from_draft(seq, draft));
        trace!(setup = seq, shape = %setup.shape(), "setup registered");
        state.setups.push(Arc::clone(&setup));
        setup
    }

    /// Most recently registered setup matching `call`, if any.
    ///
    /// Candidates are snapshotted before matching so user predicates run
    /// without the registry lock held and may register setups themselves.
    pub fn find_best_match(&self, call: &Call) -> Option<Arc<Setup>> {
        let candidates: Vec<Arc<Setup>> = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            state
                .setups
                .iter()
                .filter(|s| s.shape().member() == call.member())
                .cloned()
                .collect()
        };
        candidates.into_iter().rev().find(|s| s.matches(call))
    }

    /// All setups in insertion order (including overridden ones).
    pub fn all(&self) -> Vec<Arc<Setup>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .setups
            .clone()
    }

    /// Non-overridden setups marked verifiable.
    pub fn all_verifiable(&self) -> Vec<Arc<Setup>> {
        self.live(|s| s.is_verifiable())
    }

    /// Non-overridden explicit setups, verifiable or not.
    pub fn all_explicit(&self) -> Vec<Arc<Setup>> {
        self.live(|s| s.origin() == SetupOrigin::Explicit)
    }

    /// Non-overridden setups that return an inner mock.
    pub fn inner_mock_setups(&self) -> Vec<Arc<Setup>> {
        self.live(|s| s.has_inner_mock())
    }

    fn live(&self, keep: impl Fn(&Setup) -> bool) -> Vec<Arc<Setup>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .setups
            .iter()
            .filter(|s| !s.is_overridden() && keep(s))
            .cloned()
            .collect()
    }

    /// Number of registered setups (including overridden ones).
    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .setups
            .len()
    }

    /// True when nothing was registered (or everything was cleared).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every setup. Sequence numbers keep increasing.
    pub fn clear(&self) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .setups
            .clear();
    }

    /// Resets every setup's absorbed-call counter.
    pub fn reset_counts(&self) {
        for setup in self.all() {
            setup.reset_absorbed();
        }
    }
}

impl std::fmt::Debug for SetupRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupRegistry")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::matcher::Matcher;
    use crate::member::{Member, TypeSlot};
    use crate::shape::CallShape;
    use crate::value::{TypeRef, Value};

    fn ping() -> Member {
        Member::method("IService", "Ping")
            .param("n", TypeSlot::Concrete(TypeRef::of::<i32>()))
            .returns(TypeSlot::Concrete(TypeRef::of::<i32>()))
            .build()
    }

    fn shape(matcher: Matcher) -> CallShape {
        CallShape::builder(ping()).arg(matcher).build().unwrap()
    }

    fn call(n: i32) -> Call {
        Call::new(ping(), vec![], vec![Value::new(n)])
    }

    #[test]
    fn later_overlapping_setup_wins() {
        let registry = SetupRegistry::new();
        let first = registry.add(SetupDraft::new(shape(Matcher::any())));
        let second = registry.add(SetupDraft::new(shape(Matcher::literal(1i32))));

        assert_eq!(registry.find_best_match(&call(1)).unwrap().seq(), second.seq());
        // Non-overlapping calls still reach the earlier setup.
        assert_eq!(registry.find_best_match(&call(2)).unwrap().seq(), first.seq());
    }

    #[test]
    fn earlier_broader_setup_is_shadowed_by_nothing_narrower() {
        let registry = SetupRegistry::new();
        registry.add(SetupDraft::new(shape(Matcher::literal(1i32))));
        let broad = registry.add(SetupDraft::new(shape(Matcher::any())));
        // The broad setup is newer, so it wins even for the literal's value.
        assert_eq!(registry.find_best_match(&call(1)).unwrap().seq(), broad.seq());
    }

    #[test]
    fn equal_shapes_mark_the_earlier_setup_overridden() {
        let registry = SetupRegistry::new();
        let old = registry.add(SetupDraft::new(shape(Matcher::literal(3i32))));
        let other = registry.add(SetupDraft::new(shape(Matcher::literal(4i32))));
        let new = registry.add(SetupDraft::new(shape(Matcher::literal(3i32))));
        assert!(old.is_overridden());
        assert!(!other.is_overridden());
        assert!(!new.is_overridden());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn unmatched_calls_find_nothing() {
        let registry = SetupRegistry::new();
        registry.add(SetupDraft::new(shape(Matcher::literal(1i32))));
        assert!(registry.find_best_match(&call(9)).is_none());
    }

    #[test]
    fn clear_keeps_sequence_monotonic() {
        let registry = SetupRegistry::new();
        let a = registry.add(SetupDraft::new(shape(Matcher::any())));
        registry.clear();
        assert!(registry.is_empty());
        let b = registry.add(SetupDraft::new(shape(Matcher::any())));
        assert!(b.seq() > a.seq());
    }

    #[test]
    fn verifiable_listing_skips_overridden_setups() {
        let registry = SetupRegistry::new();
        let mut draft = SetupDraft::new(shape(Matcher::any()));
        draft.verifiable = true;
        registry.add(draft);
        let mut draft = SetupDraft::new(shape(Matcher::any()));
        draft.verifiable = true;
        let newest = registry.add(draft);
        let listed = registry.all_verifiable();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].seq(), newest.seq());
    }

    #[test]
    fn add_if_absent_reuses_a_live_setup_of_the_same_origin() {
        let registry = SetupRegistry::new();
        let mut draft = SetupDraft::new(shape(Matcher::literal(5i32)));
        draft.origin = SetupOrigin::InnerMock;
        let (first, created) = registry.add_if_absent(draft);
        assert!(created);

        let mut draft = SetupDraft::new(shape(Matcher::literal(5i32)));
        draft.origin = SetupOrigin::InnerMock;
        let (again, created) = registry.add_if_absent(draft);
        assert!(!created);
        assert_eq!(again.seq(), first.seq());
        assert!(!first.is_overridden());
        assert_eq!(registry.len(), 1);

        // An explicit setup with the same shape is a different entry.
        let (explicit, created) =
            registry.add_if_absent(SetupDraft::new(shape(Matcher::literal(5i32))));
        assert!(created);
        assert_ne!(explicit.seq(), first.seq());
    }
}
