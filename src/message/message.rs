use std::fmt;

/// One component of a message path: a map key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    #[must_use]
    pub fn key(name: impl Into<String>) -> Self {
        PathSegment::Key(name.into())
    }

    #[must_use]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            PathSegment::Key(k) => Some(k),
            PathSegment::Index(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{k}"),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

/// A resolved, rendered validation message.
///
/// Failure messages always surface; hint messages are supplementary and
/// only attach next to a failure at the same path.
#[derive(Debug, Clone)]
pub struct Message {
    pub(crate) predicate: String,
    pub(crate) path: Vec<PathSegment>,
    pub(crate) text: String,
    pub(crate) tokens: Vec<(String, String)>,
    pub(crate) rule: Option<String>,
    pub(crate) each: bool,
    pub(crate) hint: bool,
}

impl Message {
    #[must_use]
    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    #[must_use]
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn rule(&self) -> Option<&str> {
        self.rule.as_deref()
    }

    /// True when this message came from an each-scoped rule.
    #[must_use]
    pub fn is_each(&self) -> bool {
        self.each
    }

    #[must_use]
    pub fn is_hint(&self) -> bool {
        self.hint
    }

    /// Deduplication key: predicate, rendered curried arguments, and the
    /// path with each-indices stripped, so a hint (which carries neither an
    /// index nor the runtime input) matches the failures it annotates.
    pub(crate) fn signature(&self) -> Signature {
        Signature {
            predicate: self.predicate.clone(),
            args: self
                .tokens
                .iter()
                .filter(|(k, _)| k != "input")
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(","),
            path: self.index_path(),
        }
    }

    /// The path with index segments collapsed, used to correlate hints
    /// with failure slots.
    pub(crate) fn index_path(&self) -> Vec<PathSegment> {
        self.path
            .iter()
            .filter(|seg| matches!(seg, PathSegment::Key(_)))
            .cloned()
            .collect()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Signature {
    predicate: String,
    args: String,
    path: Vec<PathSegment>,
}
