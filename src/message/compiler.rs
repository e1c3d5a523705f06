use std::collections::HashSet;

use crate::types::node::{Arg, Node};
use crate::types::value::Value;

use super::backend::{LookupOptions, MessageBackend};
use super::error::MessageError;
use super::hint::EXCLUDED_FROM_HINTS;
use super::message::{Message, PathSegment};

/// Which message role a compiler run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageKind {
    /// Messages for predicates that actually failed.
    Failure,
    /// "Not yet checked" guidance derived from the static rule AST.
    Hint,
}

/// Immutable context threaded through the visitation. Branches receive
/// copies, so siblings of `and`/`or` never leak state into each other.
#[derive(Debug, Clone)]
pub(crate) struct Options {
    pub(crate) path: Vec<PathSegment>,
    pub(crate) rule: Option<String>,
    pub(crate) locale: String,
    pub(crate) full: bool,
    pub(crate) negated: bool,
    pub(crate) each: bool,
    /// Type context inferred from sibling type predicates, used when the
    /// subject value is not available (hint compilation).
    pub(crate) val_type: Option<&'static str>,
}

impl Options {
    pub(crate) fn new(locale: &str, full: bool) -> Self {
        Self {
            path: Vec::new(),
            rule: None,
            locale: locale.to_owned(),
            full,
            negated: false,
            each: false,
            val_type: None,
        }
    }

    pub(crate) fn with_rule(&self, rule: &str) -> Self {
        let mut next = self.clone();
        next.rule = Some(rule.to_owned());
        next
    }

    fn push_key(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.path.push(PathSegment::key(name));
        next
    }

    fn push_index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.path.push(PathSegment::Index(index));
        next.each = true;
        next
    }

    fn toggle_negated(&self) -> Self {
        let mut next = self.clone();
        next.negated = !next.negated;
        next
    }

    fn with_each(&self) -> Self {
        let mut next = self.clone();
        next.each = true;
        next
    }

    fn with_val_type(&self, val_type: &'static str) -> Self {
        let mut next = self.clone();
        next.val_type = Some(val_type);
        next
    }

    fn for_check(&self, name: &str) -> Self {
        let mut next = self.with_rule(name);
        next.path = vec![PathSegment::key(name)];
        next
    }
}

/// Visitor over result/rule ASTs producing flat, path-tagged messages.
pub(crate) struct MessageCompiler<'a> {
    backend: &'a dyn MessageBackend,
    kind: MessageKind,
}

impl<'a> MessageCompiler<'a> {
    pub(crate) fn new(backend: &'a dyn MessageBackend, kind: MessageKind) -> Self {
        Self { backend, kind }
    }

    pub(crate) fn call(
        &self,
        node: &Node,
        opts: &Options,
    ) -> Result<Vec<Message>, MessageError> {
        self.visit(node, opts)
    }

    fn visit(&self, node: &Node, opts: &Options) -> Result<Vec<Message>, MessageError> {
        match node {
            Node::Predicate { name, args } => self.visit_predicate(name, args, opts),
            Node::And(left, right) | Node::Xor(left, right) => {
                let mut out = self.visit(left, opts)?;
                // a leading type check narrows the subject type for its
                // right-hand siblings
                let right_opts = match type_hint(left) {
                    Some(t) => opts.with_val_type(t),
                    None => opts.clone(),
                };
                out.extend(self.visit(right, &right_opts)?);
                Ok(out)
            }
            Node::Or(left, right) => self.visit_or(left, right, opts),
            Node::Not(inner) => self.visit(inner, &opts.toggle_negated()),
            Node::Implication(_, consequence) => self.visit(consequence, opts),
            Node::Key { name, node } | Node::Val { name, node } => {
                self.visit(node, &opts.push_key(name))
            }
            Node::Each { name, node } => {
                self.visit(node, &opts.push_key(name).with_each())
            }
            Node::Set { name, nodes } => {
                let scoped = opts.push_key(name);
                let mut out = Vec::new();
                for node in nodes {
                    out.extend(self.visit(node, &scoped)?);
                }
                Ok(out)
            }
            Node::Schema(schema) => {
                let mut out = Vec::new();
                for (rule, ast) in schema.0.rules() {
                    out.extend(self.visit(ast, &opts.with_rule(rule))?);
                }
                Ok(out)
            }
            Node::Check { name, node, .. } => self.visit(node, &opts.for_check(name)),
            Node::Index { index, node } => self.visit(node, &opts.push_index(*index)),
            Node::Hint(inner) => self.visit(inner, opts),
        }
    }

    /// Disjunction: when every message across both failing branches lands
    /// on exactly one path, they collapse into a single "a or b" message.
    /// With more than one distinct path (e.g. an each fan-out) the branch
    /// messages pass through unchanged. A bare `none?` alternative is
    /// structural and suppressed in favour of the substantive branch.
    fn visit_or(
        &self,
        left: &Node,
        right: &Node,
        opts: &Options,
    ) -> Result<Vec<Message>, MessageError> {
        let lm = self.visit(left, opts)?;
        let rm = self.visit(right, opts)?;
        if lm.is_empty() {
            return Ok(rm);
        }
        if rm.is_empty() {
            return Ok(lm);
        }
        if self.kind == MessageKind::Hint {
            // hints are advisory, not exclusive: both sides surface
            let mut out = lm;
            out.extend(rm);
            return Ok(out);
        }
        let substantive = |msgs: &[Message]| {
            msgs.iter()
                .filter(|m| m.predicate != "none?")
                .cloned()
                .collect::<Vec<_>>()
        };
        let lf = substantive(&lm);
        let rf = substantive(&rm);
        match (lf.is_empty(), rf.is_empty()) {
            (true, false) => Ok(rf),
            (false, true) => Ok(lf),
            (true, true) => {
                let mut out = lm;
                out.extend(rm);
                Ok(out)
            }
            (false, false) => {
                let paths: HashSet<&[PathSegment]> = lf
                    .iter()
                    .chain(rf.iter())
                    .map(|m| m.path.as_slice())
                    .collect();
                if paths.len() == 1 {
                    Ok(vec![or_message(lf, rf)])
                } else {
                    let mut out = lf;
                    out.extend(rf);
                    Ok(out)
                }
            }
        }
    }

    fn visit_predicate(
        &self,
        name: &str,
        args: &[(String, Arg)],
        opts: &Options,
    ) -> Result<Vec<Message>, MessageError> {
        if self.kind == MessageKind::Hint {
            // a non-literal argument (dynamic resolver, or a cross-field
            // input slot) cannot be previewed without evaluating
            let unpreviewable = args
                .iter()
                .any(|(n, a)| n != "input" && !matches!(a, Arg::Value(_)));
            if EXCLUDED_FROM_HINTS.contains(&name) || unpreviewable {
                return Ok(Vec::new());
            }
        }

        let tokens = build_tokens(args);
        let val_type = args
            .iter()
            .find(|(n, _)| n == "input")
            .and_then(|(_, a)| match a {
                Arg::Value(v) => Some(v.type_name()),
                _ => None,
            })
            .or(opts.val_type);
        let arg_type = args
            .iter()
            .find(|(n, a)| n != "input" && matches!(a, Arg::Value(_)))
            .and_then(|(_, a)| match a {
                Arg::Value(v) => Some(v.type_name()),
                _ => None,
            });

        let lookup = LookupOptions {
            locale: &opts.locale,
            rule: opts.rule.as_deref(),
            val_type,
            arg_type,
            negated: opts.negated,
        };
        let template = self.backend.lookup(name, &lookup).ok_or_else(|| {
            MessageError::MissingTemplate {
                predicate: name.to_owned(),
                locale: opts.locale.clone(),
            }
        })?;
        let mut text = interpolate(&template, &tokens, name)?;

        if opts.full {
            let subject = opts
                .path
                .iter()
                .rev()
                .find_map(PathSegment::as_key)
                .map(str::to_owned)
                .or_else(|| opts.rule.clone());
            if let Some(subject) = subject {
                let display = self
                    .backend
                    .rule_name(&subject, &opts.locale)
                    .unwrap_or(subject);
                text = format!("{display} {text}");
            }
        }

        Ok(vec![Message {
            predicate: name.to_owned(),
            path: opts.path.clone(),
            text,
            tokens,
            rule: opts.rule.clone(),
            each: opts.each,
            hint: self.kind == MessageKind::Hint,
        }])
    }
}

/// Predicate names mapping to a value-type context for their right-hand
/// siblings in a conjunction.
fn type_hint(node: &Node) -> Option<&'static str> {
    match node {
        Node::Predicate { name, .. } => match name.as_str() {
            "str?" => Some("string"),
            "int?" => Some("int"),
            "float?" => Some("float"),
            "bool?" => Some("bool"),
            "hash?" => Some("hash"),
            "array?" => Some("array"),
            _ => None,
        },
        Node::And(a, b) => type_hint(b).or_else(|| type_hint(a)),
        _ => None,
    }
}

fn build_tokens(args: &[(String, Arg)]) -> Vec<(String, String)> {
    let mut tokens = Vec::new();
    for (name, arg) in args {
        let Arg::Value(value) = arg else { continue };
        match value {
            Value::Range(left, right) => {
                tokens.push((format!("{name}_left"), left.to_string()));
                tokens.push((format!("{name}_right"), right.to_string()));
            }
            other => tokens.push((name.clone(), token_string(other))),
        }
    }
    tokens
}

/// Render a token value for display: strings unquoted, lists joined with
/// a comma.
fn token_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(token_string)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Fill `%{name}` placeholders. An unknown token is a configuration error;
/// a dangling `%{` is left verbatim.
fn interpolate(
    template: &str,
    tokens: &[(String, String)],
    predicate: &str,
) -> Result<String, MessageError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("%{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        let name = &after[..end];
        match tokens.iter().find(|(k, _)| k == name) {
            Some((_, value)) => out.push_str(value),
            None => {
                return Err(MessageError::MissingToken {
                    predicate: predicate.to_owned(),
                    token: name.to_owned(),
                })
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn or_message(left: Vec<Message>, right: Vec<Message>) -> Message {
    let all: Vec<Message> = left.into_iter().chain(right).collect();
    let text = all
        .iter()
        .map(|m| m.text.as_str())
        .collect::<Vec<_>>()
        .join(" or ");
    let predicate = all
        .iter()
        .map(|m| m.predicate.as_str())
        .collect::<Vec<_>>()
        .join("|");
    let tokens = all.iter().flat_map(|m| m.tokens.clone()).collect();
    let first = &all[0];
    Message {
        predicate,
        path: first.path.clone(),
        text,
        tokens,
        rule: first.rule.clone(),
        each: first.each,
        hint: false,
    }
}
