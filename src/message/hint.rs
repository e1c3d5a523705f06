use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::types::node::Node;

use super::backend::MessageBackend;
use super::compiler::{MessageCompiler, MessageKind, Options};
use super::error::MessageError;
use super::message::Message;

/// Predicates never surfaced as hints: presence and type checks are
/// structural, not informative guidance.
pub(crate) const EXCLUDED_FROM_HINTS: &[&str] = &[
    "key?", "none?", "filled?", "str?", "int?", "float?", "bool?", "hash?", "array?",
];

/// Compiles "not yet checked" guidance by walking the static rule ASTs,
/// independent of what evaluation reached.
pub(crate) struct HintCompiler<'a> {
    backend: &'a dyn MessageBackend,
}

impl<'a> HintCompiler<'a> {
    pub(crate) fn new(backend: &'a dyn MessageBackend) -> Self {
        Self { backend }
    }

    pub(crate) fn call(
        &self,
        rules: &[(String, Node)],
        locale: &str,
        full: bool,
    ) -> Result<Vec<Message>, MessageError> {
        let compiler = MessageCompiler::new(self.backend, MessageKind::Hint);
        let mut out = Vec::new();
        for (name, node) in rules {
            let opts = Options::new(locale, full).with_rule(name);
            out.extend(compiler.call(node, &opts)?);
        }
        Ok(out)
    }
}

/// Memoized hint sets per (locale, full-mode) combination.
///
/// Hint compilation is pure, so a race that computes the same entry twice
/// is harmless; the map itself must stay coherent under concurrent calls.
#[derive(Debug, Default)]
pub(crate) struct HintCache {
    entries: RwLock<HashMap<HintKey, Arc<Vec<Message>>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HintKey {
    locale: String,
    full: bool,
}

impl HintCache {
    pub(crate) fn get_or_compute<F>(
        &self,
        locale: &str,
        full: bool,
        compute: F,
    ) -> Result<Arc<Vec<Message>>, MessageError>
    where
        F: FnOnce() -> Result<Vec<Message>, MessageError>,
    {
        let key = HintKey {
            locale: locale.to_owned(),
            full,
        };
        if let Some(hit) = self
            .entries
            .read()
            .expect("hint cache poisoned")
            .get(&key)
        {
            return Ok(Arc::clone(hit));
        }
        let computed = Arc::new(compute()?);
        let mut entries = self.entries.write().expect("hint cache poisoned");
        Ok(Arc::clone(entries.entry(key).or_insert(computed)))
    }
}
