use std::sync::Arc;

use crate::evaluate::evaluate;
use crate::message::{
    default_messages, HintCache, HintCompiler, Message, MessageBackend, MessageCompiler,
    MessageError, MessageKind, MessageSet, Options,
};

use super::error::{CompileError, EvalError};
use super::node::{check, each, key, pred, Arg, Node, SchemaRef};
use super::predicate::Registry;
use super::result::RuleResult;
use super::rule::CompiledRule;
use super::value::Value;

/// Builder for a [`Schema`].
///
/// Rule definitions are collected as AST nodes and compiled into an
/// immutable, thread-safe schema. "Inheriting" a schema is explicit
/// composition via [`extending`](SchemaBuilder::extending).
///
/// # Example
///
/// ```
/// use validus::{filled, size, str_, SchemaBuilder, Value};
///
/// let schema = SchemaBuilder::new()
///     .require("name", filled().and(str_().and(size(2..=4))))
///     .compile()
///     .unwrap();
///
/// let input = Value::map(vec![("name", "jo")]);
/// assert!(schema.call(&input).unwrap().success());
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    defs: Vec<(String, Node)>,
    registry: Option<Registry>,
    backend: Option<Arc<dyn MessageBackend>>,
    locale: String,
    full: bool,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            defs: Vec::new(),
            registry: None,
            backend: None,
            locale: "en".to_owned(),
            full: false,
        }
    }

    /// Start from an existing schema's rule definitions and configuration.
    #[must_use]
    pub fn extending(schema: &Schema) -> Self {
        Self {
            defs: schema.defs.clone(),
            registry: Some(schema.registry.clone()),
            backend: Some(Arc::clone(&schema.backend)),
            locale: schema.locale.clone(),
            full: schema.full,
        }
    }

    /// A key that must be present; `node` applies to its value.
    #[must_use]
    pub fn require(self, name: &str, node: Node) -> Self {
        let rule = key(name, node);
        self.rule(name, rule)
    }

    /// A key that may be absent; when present, `node` applies to its value.
    #[must_use]
    pub fn optional(self, name: &str, node: Node) -> Self {
        let presence = pred("key?", vec![("name", Arg::val(name))]);
        let rule = presence.then(key(name, node));
        self.rule(name, rule)
    }

    /// A required array-valued key; `node` applies to every element.
    #[must_use]
    pub fn each(self, name: &str, node: Node) -> Self {
        let rule = each(name, node);
        self.rule(name, rule)
    }

    /// A cross-field rule over `keys`, reported under `name`.
    #[must_use]
    pub fn check(self, name: &str, keys: Vec<&str>, node: Node) -> Self {
        let rule = check(name, keys, node);
        self.rule(name, rule)
    }

    /// A required key validated by a nested schema.
    #[must_use]
    pub fn nested(self, name: &str, schema: &Arc<Schema>) -> Self {
        let rule = key(name, Node::Schema(SchemaRef(Arc::clone(schema))));
        self.rule(name, rule)
    }

    /// Register a raw rule AST under a name.
    #[must_use]
    pub fn rule(mut self, name: &str, node: Node) -> Self {
        self.defs.push((name.to_owned(), node));
        self
    }

    /// Use a custom predicate registry instead of the built-in set.
    #[must_use]
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use a custom message backend.
    #[must_use]
    pub fn messages(mut self, backend: Arc<dyn MessageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    #[must_use]
    pub fn locale(mut self, locale: &str) -> Self {
        self.locale = locale.to_owned();
        self
    }

    /// Prefix rendered messages with the rule's display name.
    #[must_use]
    pub fn full_messages(mut self, full: bool) -> Self {
        self.full = full;
        self
    }

    /// Compile the collected definitions into an immutable `Schema`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] if validation of the definitions fails.
    pub fn compile(self) -> Result<Schema, CompileError> {
        let registry = self
            .registry
            .unwrap_or_else(|| Registry::global().clone());
        let compiled = crate::compile::compile(&self.defs, &registry)?;
        Ok(Schema {
            defs: self.defs,
            compiled,
            registry,
            backend: self
                .backend
                .unwrap_or_else(|| default_messages() as Arc<dyn MessageBackend>),
            locale: self.locale,
            full: self.full,
            hints: HintCache::default(),
        })
    }
}

/// A compiled, immutable schema. Thread-safe and designed to live behind
/// `Arc`; compiled once and reused across all invocations.
#[derive(Debug)]
pub struct Schema {
    defs: Vec<(String, Node)>,
    compiled: Vec<CompiledRule>,
    registry: Registry,
    backend: Arc<dyn MessageBackend>,
    locale: String,
    full: bool,
    hints: HintCache,
}

impl Schema {
    /// Apply every rule to the input.
    ///
    /// # Errors
    ///
    /// Propagates [`EvalError`] from predicate internals unmodified; a
    /// predicate returning `false` is data, never an error.
    pub fn call(&self, input: &Value) -> Result<Validation<'_>, EvalError> {
        let mut results = Vec::with_capacity(self.compiled.len());
        for ((name, _), rule) in self.defs.iter().zip(&self.compiled) {
            let node = evaluate(rule, input, input)?;
            results.push((
                name.clone(),
                RuleResult {
                    value: input.clone(),
                    node,
                },
            ));
        }
        Ok(Validation {
            schema: self,
            output: input.clone(),
            results,
        })
    }

    /// Rule names in definition order.
    #[must_use]
    pub fn rule_names(&self) -> Vec<&str> {
        self.defs.iter().map(|(n, _)| n.as_str()).collect()
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// The rule definitions, as `(name, ast)` pairs in definition order.
    ///
    /// The ASTs are immutable; external consumers (e.g. a coercion
    /// pipeline) read them without affecting evaluation.
    pub fn rules(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.defs.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub(crate) fn rule_count(&self) -> usize {
        self.defs.len()
    }

    /// Evaluate against `input` and project the failing rules into message
    /// ASTs. Used by nested-schema delegation.
    pub(crate) fn project_failures(&self, input: &Value) -> Result<Vec<Node>, EvalError> {
        let mut out = Vec::new();
        for rule in &self.compiled {
            let node = evaluate(rule, input, input)?;
            if !node.success() {
                out.push(node.project());
            }
        }
        Ok(out)
    }

    pub(crate) fn hint_messages(&self) -> Result<Arc<Vec<Message>>, MessageError> {
        self.hints.get_or_compute(&self.locale, self.full, || {
            HintCompiler::new(self.backend.as_ref()).call(&self.defs, &self.locale, self.full)
        })
    }
}

/// Outcome of applying a schema to one input.
///
/// Holds the validated value and per-rule results; message sets are
/// compiled on demand.
#[derive(Debug)]
#[must_use]
pub struct Validation<'a> {
    schema: &'a Schema,
    output: Value,
    results: Vec<(String, RuleResult)>,
}

impl Validation<'_> {
    #[must_use]
    pub fn success(&self) -> bool {
        self.results.iter().all(|(_, r)| r.success())
    }

    /// The validated input value.
    #[must_use]
    pub fn output(&self) -> &Value {
        &self.output
    }

    /// The result of a single named rule.
    #[must_use]
    pub fn result(&self, rule: &str) -> Option<&RuleResult> {
        self.results
            .iter()
            .find(|(name, _)| name == rule)
            .map(|(_, r)| r)
    }

    /// Failure messages only.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError`] when a failing predicate has no message
    /// mapping (a configuration bug).
    pub fn errors(&self) -> Result<MessageSet, MessageError> {
        let compiler = MessageCompiler::new(self.schema.backend.as_ref(), MessageKind::Failure);
        let mut messages = Vec::new();
        for (name, result) in &self.results {
            if let Some(ast) = result.to_ast() {
                let opts =
                    Options::new(&self.schema.locale, self.schema.full).with_rule(name);
                messages.extend(compiler.call(&ast, &opts)?);
            }
        }
        Ok(MessageSet::new(messages))
    }

    /// Failure messages with hints merged into their buckets.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError`] on a missing message mapping.
    pub fn messages(&self) -> Result<MessageSet, MessageError> {
        let errors = self.errors()?;
        if errors.is_empty() {
            return Ok(errors);
        }
        let hints = self.schema.hint_messages()?;
        Ok(errors.with_hints(&hints))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::node::{filled, gt, int_, none, size, str_};

    #[test]
    fn builder_collects_rules() {
        let schema = SchemaBuilder::new()
            .require("name", filled())
            .optional("age", int_())
            .compile()
            .unwrap();
        assert_eq!(schema.rule_names(), vec!["name", "age"]);
    }

    #[test]
    fn require_fails_on_missing_key() {
        let schema = SchemaBuilder::new()
            .require("name", filled())
            .compile()
            .unwrap();
        let result = schema.call(&Value::map(vec![("other", 1_i64)])).unwrap();
        assert!(!result.success());
    }

    #[test]
    fn optional_passes_on_missing_key() {
        let schema = SchemaBuilder::new()
            .optional("age", int_().and(gt(18_i64)))
            .compile()
            .unwrap();
        let result = schema.call(&Value::map(vec![("name", "jane")])).unwrap();
        assert!(result.success());
    }

    #[test]
    fn optional_validates_when_present() {
        let schema = SchemaBuilder::new()
            .optional("age", int_().and(gt(18_i64)))
            .compile()
            .unwrap();
        let result = schema.call(&Value::map(vec![("age", 17_i64)])).unwrap();
        assert!(!result.success());
    }

    #[test]
    fn extending_copies_rules_and_config() {
        let base = SchemaBuilder::new()
            .require("name", filled())
            .locale("de")
            .compile()
            .unwrap();
        let extended = SchemaBuilder::extending(&base)
            .require("age", int_())
            .compile()
            .unwrap();
        assert_eq!(extended.rule_names(), vec!["name", "age"]);
        assert_eq!(extended.locale(), "de");
        // the base schema is untouched
        assert_eq!(base.rule_names(), vec!["name"]);
    }

    #[test]
    fn custom_registry_predicates_are_usable() {
        let mut registry = Registry::with_builtins();
        registry
            .register("answer?", &["input"], |args| {
                Ok(matches!(args.last(), Some(Value::Int(42))))
            })
            .unwrap();
        let schema = SchemaBuilder::new()
            .require("answer", pred("answer?", vec![]))
            .registry(registry)
            .compile()
            .unwrap();
        assert!(schema
            .call(&Value::map(vec![("answer", 42_i64)]))
            .unwrap()
            .success());
    }

    #[test]
    fn compile_requires_rules() {
        assert!(matches!(
            SchemaBuilder::new().compile(),
            Err(CompileError::NoRules)
        ));
    }

    #[test]
    fn maybe_pattern_with_none_or() {
        let schema = SchemaBuilder::new()
            .rule(
                "age",
                crate::types::node::val("age", none().or(int_().and(gt(18_i64)))),
            )
            .compile()
            .unwrap();
        assert!(schema
            .call(&Value::map(vec![("name", "jane")]))
            .unwrap()
            .success());
        assert!(schema
            .call(&Value::map(vec![("age", 21_i64)]))
            .unwrap()
            .success());
        assert!(!schema
            .call(&Value::map(vec![("age", 17_i64)]))
            .unwrap()
            .success());
    }

    #[test]
    fn validation_exposes_named_results() {
        let schema = SchemaBuilder::new()
            .require("name", filled())
            .require("age", int_())
            .compile()
            .unwrap();
        let result = schema
            .call(&Value::map(vec![("name", ""), ("age", "x")]))
            .unwrap();
        assert!(!result.result("name").unwrap().success());
        assert!(!result.result("age").unwrap().success());
        assert!(result.result("missing").is_none());
    }

    #[test]
    fn size_hint_uses_string_context() {
        let schema = SchemaBuilder::new()
            .require("name", filled().and(str_().and(size(2..=4))))
            .compile()
            .unwrap();
        let hints = schema.hint_messages().unwrap();
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].text(), "length must be within 2 - 4");
    }
}
