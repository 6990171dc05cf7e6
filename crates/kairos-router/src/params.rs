//! Path parameter storage.
//!
//! Bound values live in a small inline vector, so routes with up to four
//! bindings never allocate for the container itself. Names are shared with
//! the compiled route; only the decoded values are allocated per request.

use std::sync::Arc;

use smallvec::SmallVec;

/// Maximum number of parameters stored inline (stack allocated).
const INLINE_PARAMS: usize = 4;

/// Path parameters bound by a route match, in pattern order.
///
/// # Example
///
/// ```rust
/// use kairos_router::Params;
///
/// let mut params = Params::new();
/// params.push("userId", "123");
/// params.push("action", "view");
///
/// assert_eq!(params.get("userId"), Some("123"));
/// assert_eq!(params.get("action"), Some("view"));
/// assert_eq!(params.get("unknown"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(Arc<str>, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates a new empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parameter set with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: SmallVec::with_capacity(capacity),
        }
    }

    /// Adds a parameter.
    pub fn push(&mut self, name: impl Into<Arc<str>>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value bound under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first bound value, if any.
    #[must_use]
    pub fn first(&self) -> Option<(&str, &str)> {
        self.inner.first().map(|(n, v)| (n.as_ref(), v.as_str()))
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_ref(), v.as_str()))
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (Arc<str>, String)>,
        fn(&'a (Arc<str>, String)) -> (&'a str, &'a str),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter().map(|(n, v)| (n.as_ref(), v.as_str()))
    }
}

impl<N, V> FromIterator<(N, V)> for Params
where
    N: Into<Arc<str>>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

/// Percent-decodes a bound segment. Invalid UTF-8 is replaced lossily.
pub(crate) fn decode(raw: &str) -> String {
    if !raw.contains('%') {
        return raw.to_owned();
    }
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_new() {
        let params = Params::new();
        assert!(params.is_empty());
        assert_eq!(params.len(), 0);
        assert!(params.first().is_none());
    }

    #[test]
    fn test_params_push_and_get() {
        let mut params = Params::new();
        params.push("id", "123");
        params.push("name", "test");

        assert_eq!(params.get("id"), Some("123"));
        assert_eq!(params.get("name"), Some("test"));
        assert_eq!(params.get("missing"), None);
        assert_eq!(params.first(), Some(("id", "123")));
    }

    #[test]
    fn test_params_iter_preserves_order() {
        let params: Params = vec![("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        let collected: Vec<_> = params.iter().collect();
        assert_eq!(collected, vec![("a", "1"), ("b", "2"), ("c", "3")]);

        let by_ref: Vec<_> = (&params).into_iter().map(|(n, _)| n).collect();
        assert_eq!(by_ref, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_params_spill_to_heap() {
        let mut params = Params::with_capacity(2);
        for i in 0..10 {
            params.push(format!("p{i}"), i.to_string());
        }
        assert_eq!(params.len(), 10);
        assert_eq!(params.get("p9"), Some("9"));
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode("plain"), "plain");
        assert_eq!(decode("hello%20world"), "hello world");
        assert_eq!(decode("caf%C3%A9"), "café");
        assert_eq!(decode("bad%FF"), "bad\u{FFFD}");
    }
}
