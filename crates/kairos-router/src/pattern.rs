//! Route pattern compilation.
//!
//! A pattern is a `/`-delimited template. Each non-empty segment is one of:
//!
//! - a literal, matched byte for byte (`users`)
//! - a parameter, binding exactly one segment (`{id}`)
//! - a wildcard, binding the rest of the path (`*` or `*path`)
//!
//! Empty segments are dropped, so `/users/` and `//users` compile to the
//! same pattern as `/users`. A wildcard may only appear last, and every
//! binding name must be unique within a pattern.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::CompileError;

/// Binding name used by a wildcard written without a name.
pub const UNNAMED_WILDCARD: &str = "*";

/// One classified segment of a [`CompiledPattern`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Matches only an identical segment.
    Literal(Box<str>),
    /// Matches any single segment and binds it under this name.
    Param(Arc<str>),
    /// Matches all remaining segments and binds them under this name.
    Wildcard(Arc<str>),
}

impl Segment {
    /// Returns the binding name for parameters and wildcards.
    #[must_use]
    pub fn binding(&self) -> Option<&Arc<str>> {
        match self {
            Self::Literal(_) => None,
            Self::Param(name) | Self::Wildcard(name) => Some(name),
        }
    }

    /// Returns `true` for literal segments.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Returns `true` for wildcard segments.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => f.write_str(text),
            Self::Param(name) => write!(f, "{{{name}}}"),
            Self::Wildcard(name) if name.as_ref() == UNNAMED_WILDCARD => f.write_str("*"),
            Self::Wildcard(name) => write!(f, "*{name}"),
        }
    }
}

/// A validated route pattern.
///
/// # Example
///
/// ```rust
/// use kairos_router::CompiledPattern;
///
/// let pattern = CompiledPattern::compile("/users/{id}/files/*path").unwrap();
/// assert_eq!(pattern.segments().len(), 4);
/// assert_eq!(pattern.as_str(), "/users/{id}/files/*path");
///
/// assert!(CompiledPattern::compile("/assets/*/x").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompiledPattern {
    segments: Vec<Segment>,
    canonical: Arc<str>,
}

impl CompiledPattern {
    /// Compiles a pattern string.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidPattern`] when the pattern is empty,
    /// a wildcard is not the final segment, a binding name repeats, or a
    /// segment is malformed.
    pub fn compile(pattern: &str) -> Result<Self, CompileError> {
        if pattern.is_empty() {
            return Err(CompileError::invalid(pattern, "pattern is empty"));
        }

        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|raw| parse_segment(pattern, raw))
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_segments(pattern, segments)
    }

    /// The pattern matching only `/`.
    #[must_use]
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
            canonical: Arc::from("/"),
        }
    }

    /// Appends `suffix` to this pattern and validates the result again.
    ///
    /// # Errors
    ///
    /// Fails when the concatenation places a wildcard before other segments
    /// or repeats a binding name.
    pub fn join(&self, suffix: &Self) -> Result<Self, CompileError> {
        let mut segments = Vec::with_capacity(self.segments.len() + suffix.segments.len());
        segments.extend(self.segments.iter().cloned());
        segments.extend(suffix.segments.iter().cloned());

        let source = if self.is_root() {
            suffix.as_str().to_string()
        } else if suffix.is_root() {
            self.as_str().to_string()
        } else {
            format!("{}{}", self.as_str(), suffix.as_str())
        };
        Self::from_segments(&source, segments)
    }

    fn from_segments(source: &str, segments: Vec<Segment>) -> Result<Self, CompileError> {
        let last = segments.len().saturating_sub(1);
        let mut seen: Vec<&str> = Vec::new();

        for (index, segment) in segments.iter().enumerate() {
            if segment.is_wildcard() && index != last {
                return Err(CompileError::invalid(
                    source,
                    "wildcard must be the final segment",
                ));
            }
            if let Some(name) = segment.binding() {
                if seen.contains(&name.as_ref()) {
                    return Err(CompileError::invalid(
                        source,
                        format!("binding `{name}` appears more than once"),
                    ));
                }
                seen.push(name);
            }
        }

        let canonical = render(&segments);
        Ok(Self {
            segments,
            canonical: Arc::from(canonical),
        })
    }

    /// Returns the classified segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the canonical form, e.g. `/users/{id}`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    pub(crate) fn canonical(&self) -> &Arc<str> {
        &self.canonical
    }

    /// Returns the binding names in segment order.
    pub fn bindings(&self) -> impl Iterator<Item = &Arc<str>> {
        self.segments.iter().filter_map(Segment::binding)
    }

    /// Returns `true` if the pattern ends in a wildcard.
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.segments.last().is_some_and(Segment::is_wildcard)
    }

    /// Returns `true` for the pattern `/`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the shape of the pattern with binding names erased.
    ///
    /// Two patterns with equal keys match exactly the same paths.
    #[must_use]
    pub fn structural_key(&self) -> String {
        let mut key = String::new();
        for segment in &self.segments {
            key.push('/');
            match segment {
                Segment::Literal(text) => key.push_str(text),
                Segment::Param(_) => key.push_str("{}"),
                Segment::Wildcard(_) => key.push('*'),
            }
        }
        if key.is_empty() {
            key.push('/');
        }
        key
    }
}

impl FromStr for CompiledPattern {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl fmt::Display for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

fn parse_segment(pattern: &str, raw: &str) -> Result<Segment, CompileError> {
    if let Some(inner) = raw.strip_prefix('{') {
        let name = inner.strip_suffix('}').ok_or_else(|| {
            CompileError::invalid(pattern, format!("unterminated parameter in `{raw}`"))
        })?;
        validate_name(pattern, raw, name)?;
        return Ok(Segment::Param(Arc::from(name)));
    }

    if let Some(name) = raw.strip_prefix('*') {
        if name.is_empty() {
            return Ok(Segment::Wildcard(Arc::from(UNNAMED_WILDCARD)));
        }
        validate_name(pattern, raw, name)?;
        return Ok(Segment::Wildcard(Arc::from(name)));
    }

    if raw.contains(['{', '}']) {
        return Err(CompileError::invalid(
            pattern,
            format!("braces must enclose a whole segment, found `{raw}`"),
        ));
    }

    Ok(Segment::Literal(Box::from(raw)))
}

fn validate_name(pattern: &str, raw: &str, name: &str) -> Result<(), CompileError> {
    if name.is_empty() {
        return Err(CompileError::invalid(
            pattern,
            format!("empty binding name in `{raw}`"),
        ));
    }
    if name.contains(['{', '}', '*']) {
        return Err(CompileError::invalid(
            pattern,
            format!("invalid binding name in `{raw}`"),
        ));
    }
    Ok(())
}

fn render(segments: &[Segment]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(&segment.to_string());
    }
    out
}
