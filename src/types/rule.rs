use std::fmt;
use std::sync::Arc;

use super::error::EvalError;
use super::node::Arg;
use super::predicate::{Predicate, PredicateFn};
use super::schema::Schema;
use super::value::Value;

/// A predicate bound to its implementation and curried argument list.
///
/// Binding happens once at compilation; invocation fills the `input`
/// placeholder (and any dynamic arguments) and calls through.
#[derive(Clone)]
pub(crate) struct BoundPredicate {
    name: String,
    args: Vec<(String, Arg)>,
    func: PredicateFn,
}

impl BoundPredicate {
    pub(crate) fn new(predicate: &Predicate, args: Vec<(String, Arg)>) -> Self {
        Self {
            name: predicate.name().to_owned(),
            args,
            func: predicate.func(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Fill placeholders and invoke. Returns the filled argument list
    /// alongside the outcome so results can carry concrete values.
    pub(crate) fn invoke(
        &self,
        input: &Value,
        root: &Value,
    ) -> Result<(Vec<(String, Value)>, bool), EvalError> {
        let filled = self.fill(input, root);
        let values: Vec<Value> = filled.iter().map(|(_, v)| v.clone()).collect();
        let passed = (self.func)(&values)?;
        Ok((filled, passed))
    }

    /// Invoke with the `input` placeholders filled positionally from
    /// `subjects` (cross-field checks).
    pub(crate) fn invoke_across(
        &self,
        subjects: &[Value],
        root: &Value,
    ) -> Result<(Vec<(String, Value)>, bool), EvalError> {
        let mut next = subjects.iter();
        let filled: Vec<(String, Value)> = self
            .args
            .iter()
            .map(|(name, arg)| {
                let value = match arg {
                    Arg::Value(v) => v.clone(),
                    Arg::Input => next.next().cloned().unwrap_or(Value::Null),
                    Arg::Dynamic(d) => d.resolve(root),
                };
                (name.clone(), value)
            })
            .collect();
        let values: Vec<Value> = filled.iter().map(|(_, v)| v.clone()).collect();
        let passed = (self.func)(&values)?;
        Ok((filled, passed))
    }

    fn fill(&self, input: &Value, root: &Value) -> Vec<(String, Value)> {
        self.args
            .iter()
            .map(|(name, arg)| {
                let value = match arg {
                    Arg::Value(v) => v.clone(),
                    Arg::Input => input.clone(),
                    Arg::Dynamic(d) => d.resolve(root),
                };
                (name.clone(), value)
            })
            .collect()
    }
}

impl fmt::Debug for BoundPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundPredicate({})", self.name)
    }
}

/// Executable counterpart of a rule AST node.
///
/// Compiled rules are immutable, `Send + Sync`, built once per schema and
/// shared across all invocations. Composition happens at this level (not
/// by wrapping ASTs) so that disjunction keeps its short-circuit laziness.
#[derive(Debug, Clone)]
pub(crate) enum CompiledRule {
    /// A bare predicate applied to the current value.
    Predicate(BoundPredicate),
    /// Presence-checked keyed rule: a missing key short-circuits to a
    /// synthetic `key?` failure without invoking `inner`.
    Key { name: String, inner: Box<CompiledRule> },
    /// Keyed rule without a presence check; a missing key yields `Null`.
    Val { name: String, inner: Box<CompiledRule> },
    /// Applies `inner` to every element of an array value.
    Each { inner: Box<CompiledRule> },
    /// Applies every member to the same value, collecting all outcomes.
    Set { members: Vec<CompiledRule> },
    /// Left then right; right is not evaluated when left fails.
    Conjunction(Box<CompiledRule>, Box<CompiledRule>),
    /// Left, then right only when left fails.
    Disjunction(Box<CompiledRule>, Box<CompiledRule>),
    /// Exactly one side must hold; both sides are always evaluated.
    ExclusiveDisjunction(Box<CompiledRule>, Box<CompiledRule>),
    Negation(Box<CompiledRule>),
    /// Consequence is evaluated only when the condition holds.
    Implication(Box<CompiledRule>, Box<CompiledRule>),
    /// Cross-field rule over the named keys, reported under `name`.
    Check {
        name: String,
        keys: Vec<String>,
        predicate: BoundPredicate,
    },
    /// Delegation to a nested compiled schema.
    Nested { schema: Arc<Schema> },
}

impl CompiledRule {
    #[must_use]
    pub(crate) fn and(self, other: CompiledRule) -> CompiledRule {
        CompiledRule::Conjunction(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub(crate) fn or(self, other: CompiledRule) -> CompiledRule {
        CompiledRule::Disjunction(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub(crate) fn xor(self, other: CompiledRule) -> CompiledRule {
        CompiledRule::ExclusiveDisjunction(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub(crate) fn negate(self) -> CompiledRule {
        CompiledRule::Negation(Box::new(self))
    }

    #[must_use]
    pub(crate) fn then(self, other: CompiledRule) -> CompiledRule {
        CompiledRule::Implication(Box::new(self), Box::new(other))
    }
}
