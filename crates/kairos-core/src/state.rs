//! Type-keyed shared state.
//!
//! State is registered on scopes while the application is being assembled
//! ([`StateMap`]) and frozen into a [`StateStore`] per scope when the
//! application is built. Nested scopes layer their own bindings over their
//! parent's store, so a child sees every parent value it does not shadow.
//!
//! # Example
//!
//! ```rust
//! use kairos_core::state::{StateMap, StateStore};
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let mut root = StateMap::new();
//! root.insert(Database { url: "postgres://primary".into() });
//! let root = StateStore::layer(&StateStore::empty(), &root);
//!
//! let mut reporting = StateMap::new();
//! reporting.insert(Database { url: "postgres://replica".into() });
//! let reporting = StateStore::layer(&root, &reporting);
//!
//! assert_eq!(root.require::<Database>().unwrap().url, "postgres://primary");
//! assert_eq!(reporting.require::<Database>().unwrap().url, "postgres://replica");
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::StateError;

type Value = Arc<dyn Any + Send + Sync>;

/// Mutable, registration-time state bindings for a single scope.
#[derive(Default, Clone)]
pub struct StateMap {
    values: HashMap<TypeId, Value>,
}

impl StateMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` under its type, replacing any previous binding.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.insert_arc(Arc::new(value));
    }

    /// Binds an already shared value.
    pub fn insert_arc<T: Send + Sync + 'static>(&mut self, value: Arc<T>) {
        self.values.insert(TypeId::of::<T>(), value);
    }

    /// Looks up a binding made directly on this map.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        downcast(self.values.get(&TypeId::of::<T>())?)
    }

    /// Checks whether `T` is bound on this map.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for StateMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMap")
            .field("value_count", &self.values.len())
            .finish()
    }
}

/// Frozen state visible to requests of one scope.
///
/// Cloning is a reference count increment. The store itself is never mutated
/// after construction, so concurrent reads need no locking; interior
/// mutability of a stored value is that value's own concern.
#[derive(Clone, Default)]
pub struct StateStore {
    values: Arc<HashMap<TypeId, Value>>,
}

impl StateStore {
    /// A store with no bindings.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a child store: every binding of `parent` plus those in `own`,
    /// with `own` shadowing the parent on conflicts.
    #[must_use]
    pub fn layer(parent: &Self, own: &StateMap) -> Self {
        if own.is_empty() {
            return parent.clone();
        }
        let mut values = HashMap::with_capacity(parent.values.len() + own.values.len());
        values.extend(parent.values.iter().map(|(k, v)| (*k, Arc::clone(v))));
        values.extend(own.values.iter().map(|(k, v)| (*k, Arc::clone(v))));
        Self {
            values: Arc::new(values),
        }
    }

    /// Looks up the value bound for `T`.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        downcast(self.values.get(&TypeId::of::<T>())?)
    }

    /// Looks up the value bound for `T`, failing when it was never registered.
    pub fn require<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, StateError> {
        self.get::<T>().ok_or_else(StateError::missing::<T>)
    }

    /// Checks whether `T` is bound.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    /// Number of visible bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("value_count", &self.values.len())
            .finish()
    }
}

fn downcast<T: Send + Sync + 'static>(value: &Value) -> Option<Arc<T>> {
    Arc::clone(value).downcast::<T>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    struct Name(&'static str);

    struct Counter(AtomicUsize);

    #[test]
    fn test_map_insert_and_get() {
        let mut map = StateMap::new();
        assert!(map.is_empty());

        map.insert(Name("a"));
        assert!(map.contains::<Name>());
        assert_eq!(map.len(), 1);
        assert_eq!(*map.get::<Name>().unwrap(), Name("a"));
        assert!(map.get::<u32>().is_none());
    }

    #[test]
    fn test_map_insert_replaces() {
        let mut map = StateMap::new();
        map.insert(Name("a"));
        map.insert(Name("b"));
        assert_eq!(map.len(), 1);
        assert_eq!(*map.get::<Name>().unwrap(), Name("b"));
    }

    #[test]
    fn test_store_require_missing() {
        let store = StateStore::empty();
        let err = store.require::<Name>().unwrap_err();
        assert!(err.to_string().contains("Name"));
    }

    #[test]
    fn test_layer_inherits_and_shadows() {
        let mut root = StateMap::new();
        root.insert(Name("root"));
        root.insert(7_u32);
        let root = StateStore::layer(&StateStore::empty(), &root);

        let mut child = StateMap::new();
        child.insert(Name("child"));
        let child = StateStore::layer(&root, &child);

        let grandchild = StateStore::layer(&child, &StateMap::new());

        assert_eq!(*root.require::<Name>().unwrap(), Name("root"));
        assert_eq!(*child.require::<Name>().unwrap(), Name("child"));
        assert_eq!(*child.require::<u32>().unwrap(), 7);
        assert_eq!(*grandchild.require::<Name>().unwrap(), Name("child"));
    }

    #[test]
    fn test_siblings_are_isolated() {
        let root = StateStore::empty();

        let mut left = StateMap::new();
        left.insert(Name("left"));
        let mut right = StateMap::new();
        right.insert(Name("right"));

        let left = StateStore::layer(&root, &left);
        let right = StateStore::layer(&root, &right);

        assert_eq!(*left.require::<Name>().unwrap(), Name("left"));
        assert_eq!(*right.require::<Name>().unwrap(), Name("right"));
        assert!(root.get::<Name>().is_none());
    }

    #[test]
    fn test_values_are_shared_not_copied() {
        let mut map = StateMap::new();
        map.insert(Counter(AtomicUsize::new(0)));
        let store = StateStore::layer(&StateStore::empty(), &map);
        let clone = store.clone();

        store.require::<Counter>().unwrap().0.fetch_add(1, Ordering::SeqCst);
        clone.require::<Counter>().unwrap().0.fetch_add(1, Ordering::SeqCst);

        assert_eq!(map.get::<Counter>().unwrap().0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StateStore>();
    }
}
