// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Capture cells and counters for setup callbacks.
//!
//! Cloning a cell shares its contents, so a clone can be moved into a
//! callback while the test keeps the original for assertions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use echo_mock::{CallFrame, Fault, TypeRef, Value};

/// Thread-safe list of captured items.
///
/// ```
/// use echo_dry_tests::Capture;
/// use echo_mock::Value;
///
/// let capture = Capture::<Value>::new();
/// capture.push(Value::new(42i32));
/// assert_eq!(capture.values(), vec![Value::new(42i32)]);
/// ```
pub struct Capture<T> {
    items: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Capture<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Default for Capture<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone> Capture<T> {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item.
    pub fn push(&self, item: T) {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(item);
    }

    /// Snapshot of the captured items, oldest first.
    pub fn values(&self) -> Vec<T> {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of captured items.
    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True when nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Capture<Value> {
    /// Callback capturing the current value of argument `index`.
    pub fn arg(
        &self,
        index: usize,
    ) -> impl Fn(&mut CallFrame<'_>) -> Result<(), Fault> + Send + Sync + 'static {
        let cell = self.clone();
        move |frame: &mut CallFrame<'_>| {
            if let Some(value) = frame.arg(index) {
                cell.push(value.clone());
            }
            Ok(())
        }
    }
}

impl Capture<TypeRef> {
    /// Callback capturing the concrete type argument at `index`.
    pub fn type_arg(
        &self,
        index: usize,
    ) -> impl Fn(&mut CallFrame<'_>) -> Result<(), Fault> + Send + Sync + 'static {
        let cell = self.clone();
        move |frame: &mut CallFrame<'_>| {
            if let Some(ty) = frame.type_arg(index) {
                cell.push(*ty);
            }
            Ok(())
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Capture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        f.debug_tuple("Capture").field(&*items).finish()
    }
}

/// Counts callback invocations.
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    count: Arc<AtomicUsize>,
}

impl CallCounter {
    /// A counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback incrementing the counter.
    pub fn callback(
        &self,
    ) -> impl Fn(&mut CallFrame<'_>) -> Result<(), Fault> + Send + Sync + 'static {
        let count = Arc::clone(&self.count);
        move |_: &mut CallFrame<'_>| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Current count.
    pub fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}
