//! Segment trie used by the router.
//!
//! Each node owns its literal children (sorted for binary search), at most one
//! parameter child, and at most one wildcard leaf. Binding names are stored on
//! the endpoint rather than the node, so routes for different methods may name
//! the same position differently.

use std::sync::Arc;

use http::Method;
use smallvec::SmallVec;

use crate::method_router::MethodTable;
use crate::pattern::Segment;

/// A registered route at a trie leaf.
#[derive(Debug)]
pub(crate) struct Endpoint<T> {
    pub(crate) value: T,
    pub(crate) pattern: Arc<str>,
    pub(crate) bindings: Box<[Arc<str>]>,
}

/// A raw capture collected while walking the trie.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Capture<'p> {
    /// One segment bound by a parameter.
    One(&'p str),
    /// The remaining segments bound by a wildcard.
    Rest(&'p [&'p str]),
}

pub(crate) type Captures<'p> = SmallVec<[Capture<'p>; 4]>;

#[derive(Debug)]
pub(crate) struct Node<T> {
    statics: Vec<(Box<str>, Node<T>)>,
    param: Option<Box<Node<T>>>,
    wildcard: Option<Box<MethodTable<Endpoint<T>>>>,
    endpoints: MethodTable<Endpoint<T>>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            statics: Vec::new(),
            param: None,
            wildcard: None,
            endpoints: MethodTable::new(),
        }
    }
}

impl<T> Node<T> {
    /// Inserts an endpoint; on conflict returns the pattern already stored.
    pub(crate) fn insert(
        &mut self,
        segments: &[Segment],
        method: Method,
        endpoint: Endpoint<T>,
    ) -> Result<(), Arc<str>> {
        match segments.split_first() {
            None => self
                .endpoints
                .insert(method, endpoint)
                .map_err(|existing| Arc::clone(&existing.pattern)),
            Some((Segment::Literal(text), rest)) => {
                let index = match self.find_static(text) {
                    Ok(index) => index,
                    Err(index) => {
                        self.statics.insert(index, (text.clone(), Node::default()));
                        index
                    }
                };
                self.statics[index].1.insert(rest, method, endpoint)
            }
            Some((Segment::Param(_), rest)) => self
                .param
                .get_or_insert_with(Box::default)
                .insert(rest, method, endpoint),
            // The pattern compiler guarantees the wildcard is last.
            Some((Segment::Wildcard(_), _)) => self
                .wildcard
                .get_or_insert_with(Box::default)
                .insert(method, endpoint)
                .map_err(|existing| Arc::clone(&existing.pattern)),
        }
    }

    /// Finds the highest-priority endpoint for `method`.
    ///
    /// At every position literal children are tried first, then the parameter
    /// child, then the wildcard. A failed branch leaves `captures` unchanged.
    pub(crate) fn lookup<'n, 'p>(
        &'n self,
        segments: &'p [&'p str],
        method: &Method,
        captures: &mut Captures<'p>,
    ) -> Option<&'n Endpoint<T>> {
        let Some((first, rest)) = segments.split_first() else {
            if let Some(endpoint) = self.endpoints.get(method) {
                return Some(endpoint);
            }
            let endpoint = self.wildcard.as_ref()?.get(method)?;
            captures.push(Capture::Rest(segments));
            return Some(endpoint);
        };

        if let Ok(index) = self.find_static(first) {
            if let Some(endpoint) = self.statics[index].1.lookup(rest, method, captures) {
                return Some(endpoint);
            }
        }

        if let Some(param) = &self.param {
            captures.push(Capture::One(first));
            if let Some(endpoint) = param.lookup(rest, method, captures) {
                return Some(endpoint);
            }
            captures.pop();
        }

        let endpoint = self.wildcard.as_ref()?.get(method)?;
        captures.push(Capture::Rest(segments));
        Some(endpoint)
    }

    /// Collects every method registered on any route matching `segments`.
    pub(crate) fn collect_allowed(&self, segments: &[&str], out: &mut Vec<Method>) {
        if let Some(wildcard) = &self.wildcard {
            wildcard.extend_allowed(out);
        }

        let Some((first, rest)) = segments.split_first() else {
            self.endpoints.extend_allowed(out);
            return;
        };

        if let Ok(index) = self.find_static(first) {
            self.statics[index].1.collect_allowed(rest, out);
        }
        if let Some(param) = &self.param {
            param.collect_allowed(rest, out);
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.endpoints.len()
            + self.wildcard.as_ref().map_or(0, |w| w.len())
            + self.param.as_ref().map_or(0, |p| p.count())
            + self.statics.iter().map(|(_, n)| n.count()).sum::<usize>()
    }

    pub(crate) fn visit<'n>(&'n self, f: &mut impl FnMut(&'n Method, &'n Endpoint<T>)) {
        for (method, endpoint) in self.endpoints.iter() {
            f(method, endpoint);
        }
        for (_, child) in &self.statics {
            child.visit(f);
        }
        if let Some(param) = &self.param {
            param.visit(f);
        }
        if let Some(wildcard) = &self.wildcard {
            for (method, endpoint) in wildcard.iter() {
                f(method, endpoint);
            }
        }
    }

    fn find_static(&self, segment: &str) -> Result<usize, usize> {
        self.statics
            .binary_search_by(|(key, _)| key.as_ref().cmp(segment))
    }
}
