//! Per-method endpoint table for a single trie leaf.

use http::Method;

/// Maps HTTP methods to values for one path shape.
///
/// Entries are kept in a stable order (standard methods first, then
/// extension methods alphabetically) so that `Allow` headers are
/// deterministic.
///
/// # Example
///
/// ```rust
/// use kairos_router::MethodTable;
/// use http::Method;
///
/// let mut table = MethodTable::new();
/// table.insert(Method::POST, "create").unwrap();
/// table.insert(Method::GET, "list").unwrap();
///
/// assert_eq!(table.get(&Method::GET), Some(&"list"));
/// assert_eq!(table.get(&Method::HEAD), Some(&"list"));
/// assert_eq!(table.get(&Method::DELETE), None);
/// assert_eq!(table.allowed_methods(), vec![Method::GET, Method::HEAD, Method::POST]);
/// ```
#[derive(Debug, Clone)]
pub struct MethodTable<E> {
    entries: Vec<(Method, E)>,
}

impl<E> Default for MethodTable<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E> MethodTable<E> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value for `method`.
    ///
    /// # Errors
    ///
    /// Returns the value already registered for `method`.
    pub fn insert(&mut self, method: Method, value: E) -> Result<(), &E> {
        match self.position(&method) {
            Ok(index) => Err(&self.entries[index].1),
            Err(index) => {
                self.entries.insert(index, (method, value));
                Ok(())
            }
        }
    }

    /// Looks up the value for `method`.
    ///
    /// `HEAD` falls back to the `GET` entry when no explicit `HEAD` entry exists.
    #[must_use]
    pub fn get(&self, method: &Method) -> Option<&E> {
        if let Ok(index) = self.position(method) {
            return Some(&self.entries[index].1);
        }
        if method == Method::HEAD {
            return self.position(&Method::GET).ok().map(|i| &self.entries[i].1);
        }
        None
    }

    /// Returns true if no method is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over `(method, value)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&Method, &E)> {
        self.entries.iter().map(|(m, e)| (m, e))
    }

    /// Returns the methods this table answers, including implied `HEAD`.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        let mut out = Vec::with_capacity(self.entries.len() + 1);
        self.extend_allowed(&mut out);
        out
    }

    pub(crate) fn extend_allowed(&self, out: &mut Vec<Method>) {
        for (method, _) in &self.entries {
            push_unique(out, method.clone());
            if method == Method::GET {
                push_unique(out, Method::HEAD);
            }
        }
        out.sort_by(compare_methods);
    }

    fn position(&self, method: &Method) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|(m, _)| compare_methods(m, method))
    }
}

fn push_unique(out: &mut Vec<Method>, method: Method) {
    if !out.contains(&method) {
        out.push(method);
    }
}

fn rank(method: &Method) -> u8 {
    match *method {
        Method::GET => 0,
        Method::HEAD => 1,
        Method::POST => 2,
        Method::PUT => 3,
        Method::PATCH => 4,
        Method::DELETE => 5,
        Method::OPTIONS => 6,
        Method::TRACE => 7,
        Method::CONNECT => 8,
        _ => u8::MAX,
    }
}

fn compare_methods(a: &Method, b: &Method) -> std::cmp::Ordering {
    rank(a)
        .cmp(&rank(b))
        .then_with(|| a.as_str().cmp(b.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut table = MethodTable::new();
        table.insert(Method::GET, 1).unwrap();
        table.insert(Method::DELETE, 2).unwrap();

        assert_eq!(table.get(&Method::GET), Some(&1));
        assert_eq!(table.get(&Method::DELETE), Some(&2));
        assert_eq!(table.get(&Method::PUT), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_duplicate_method_returns_existing() {
        let mut table = MethodTable::new();
        table.insert(Method::GET, "first").unwrap();
        assert_eq!(table.insert(Method::GET, "second"), Err(&"first"));
    }

    #[test]
    fn test_head_falls_back_to_get() {
        let mut table = MethodTable::new();
        table.insert(Method::GET, "get").unwrap();
        assert_eq!(table.get(&Method::HEAD), Some(&"get"));

        table.insert(Method::HEAD, "head").unwrap();
        assert_eq!(table.get(&Method::HEAD), Some(&"head"));
    }

    #[test]
    fn test_allowed_methods_order() {
        let mut table = MethodTable::new();
        let purge = Method::from_bytes(b"PURGE").unwrap();
        table.insert(purge.clone(), ()).unwrap();
        table.insert(Method::OPTIONS, ()).unwrap();
        table.insert(Method::POST, ()).unwrap();
        table.insert(Method::GET, ()).unwrap();

        assert_eq!(
            table.allowed_methods(),
            vec![Method::GET, Method::HEAD, Method::POST, Method::OPTIONS, purge]
        );
    }

    #[test]
    fn test_empty_table() {
        let table: MethodTable<()> = MethodTable::new();
        assert!(table.is_empty());
        assert!(table.allowed_methods().is_empty());
    }
}
