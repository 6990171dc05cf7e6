//! Router construction and matching.

use std::fmt;
use std::sync::Arc;

use http::Method;
use smallvec::SmallVec;

use crate::error::InsertError;
use crate::node::{Capture, Captures, Endpoint, Node};
use crate::params::{decode, Params};
use crate::pattern::CompiledPattern;

/// Outcome of [`Router::match_route`].
#[derive(Debug)]
pub enum MatchResult<'r, T> {
    /// A route answers this method and path.
    Matched {
        /// The value registered for the route.
        route: &'r T,
        /// Bound, percent-decoded parameters.
        params: Params,
        /// Canonical pattern of the matched route.
        pattern: &'r str,
    },
    /// No route matches the path under any method.
    NotFound,
    /// The path matches, but only under other methods.
    MethodNotAllowed {
        /// The methods that would match, in `Allow` header order.
        allowed: Vec<Method>,
    },
}

impl<'r, T> MatchResult<'r, T> {
    /// Returns `true` for [`MatchResult::Matched`].
    #[must_use]
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    /// Returns the route value and parameters of a successful match.
    #[must_use]
    pub fn matched(self) -> Option<(&'r T, Params)> {
        match self {
            Self::Matched { route, params, .. } => Some((route, params)),
            _ => None,
        }
    }
}

/// Accumulates routes before freezing them into a [`Router`].
///
/// # Example
///
/// ```rust
/// use kairos_router::{CompiledPattern, MatchResult, Router};
/// use http::Method;
///
/// let mut builder = Router::builder();
/// builder.insert(Method::GET, &CompiledPattern::compile("/users/me").unwrap(), "me").unwrap();
/// builder.insert(Method::GET, &CompiledPattern::compile("/users/{id}").unwrap(), "user").unwrap();
/// let router = builder.build();
///
/// let (route, _) = router.match_route(&Method::GET, "/users/me").matched().unwrap();
/// assert_eq!(*route, "me");
///
/// let (route, params) = router.match_route(&Method::GET, "/users/42").matched().unwrap();
/// assert_eq!(*route, "user");
/// assert_eq!(params.get("id"), Some("42"));
/// ```
pub struct RouterBuilder<T> {
    root: Node<T>,
}

impl<T> Default for RouterBuilder<T> {
    fn default() -> Self {
        Self {
            root: Node::default(),
        }
    }
}

impl<T> RouterBuilder<T> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` for `method` and `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`InsertError::DuplicateRoute`] when a route with the same
    /// method and the same structure is already registered. Parameter names
    /// do not distinguish routes: `/a/{x}` and `/a/{y}` conflict.
    pub fn insert(
        &mut self,
        method: Method,
        pattern: &CompiledPattern,
        value: T,
    ) -> Result<(), InsertError> {
        let endpoint = Endpoint {
            value,
            pattern: Arc::clone(pattern.canonical()),
            bindings: pattern.bindings().cloned().collect(),
        };

        self.root
            .insert(pattern.segments(), method.clone(), endpoint)
            .map_err(|existing| InsertError::DuplicateRoute {
                method,
                pattern: pattern.as_str().to_string(),
                existing: existing.to_string(),
            })
    }

    /// Freezes the routes into an immutable [`Router`].
    #[must_use]
    pub fn build(self) -> Router<T> {
        let routes = self.root.count();
        Router {
            root: self.root,
            routes,
        }
    }
}

/// An immutable route table.
///
/// A `Router` has no mutating methods; it is shared between worker threads
/// behind an `Arc` and read without locks.
pub struct Router<T> {
    root: Node<T>,
    routes: usize,
}

impl<T> Router<T> {
    /// Starts building a router.
    #[must_use]
    pub fn builder() -> RouterBuilder<T> {
        RouterBuilder::new()
    }

    /// Matches a method and path.
    ///
    /// Anything after `?` is ignored. Empty segments are skipped, so a
    /// trailing slash does not change the result.
    pub fn match_route(&self, method: &Method, path: &str) -> MatchResult<'_, T> {
        let path = path.split_once('?').map_or(path, |(p, _)| p);
        let segments: SmallVec<[&str; 8]> = path.split('/').filter(|s| !s.is_empty()).collect();

        let mut captures = Captures::new();
        if let Some(endpoint) = self.root.lookup(&segments, method, &mut captures) {
            return MatchResult::Matched {
                route: &endpoint.value,
                params: bind(&endpoint.bindings, &captures),
                pattern: &endpoint.pattern,
            };
        }

        let mut allowed = Vec::new();
        self.root.collect_allowed(&segments, &mut allowed);
        if allowed.is_empty() {
            MatchResult::NotFound
        } else {
            MatchResult::MethodNotAllowed { allowed }
        }
    }

    /// Returns the number of registered `(method, pattern)` routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes == 0
    }

    /// Lists every route as `(method, pattern, value)`.
    pub fn routes(&self) -> Vec<(&Method, &str, &T)> {
        let mut out = Vec::with_capacity(self.routes);
        self.root
            .visit(&mut |method, endpoint| out.push((method, endpoint.pattern.as_ref(), &endpoint.value)));
        out
    }
}

impl<T> fmt::Debug for Router<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routes: Vec<String> = self
            .routes()
            .into_iter()
            .map(|(method, pattern, _)| format!("{method} {pattern}"))
            .collect();
        f.debug_struct("Router").field("routes", &routes).finish()
    }
}

fn bind(names: &[Arc<str>], captures: &Captures<'_>) -> Params {
    let mut params = Params::with_capacity(names.len());
    for (name, capture) in names.iter().zip(captures.iter()) {
        let value = match capture {
            Capture::One(segment) => decode(segment),
            Capture::Rest(segments) => decode(&segments.join("/")),
        };
        params.push(Arc::clone(name), value);
    }
    params
}
