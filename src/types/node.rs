use std::fmt;
use std::ops::Not;
use std::sync::Arc;

use super::schema::Schema;
use super::value::Value;

/// One argument in a predicate application.
#[derive(Debug, Clone)]
pub enum Arg {
    /// A literal argument value, bound at schema-definition time.
    Value(Value),
    /// Placeholder for the subject value, filled at evaluation time.
    Input,
    /// A lazily resolved argument. Resolved against the root input at
    /// evaluation time and excluded from hint compilation.
    Dynamic(DynamicArg),
}

impl Arg {
    /// A literal argument.
    pub fn val(value: impl Into<Value>) -> Arg {
        Arg::Value(value.into())
    }

    /// A lazily resolved argument with a display name.
    pub fn dynamic(
        name: impl Into<String>,
        resolver: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) -> Arg {
        Arg::Dynamic(DynamicArg {
            name: name.into(),
            resolver: Arc::new(resolver),
        })
    }
}

impl PartialEq for Arg {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Arg::Value(a), Arg::Value(b)) => a == b,
            (Arg::Input, Arg::Input) => true,
            (Arg::Dynamic(a), Arg::Dynamic(b)) => a.name == b.name,
            _ => false,
        }
    }
}

/// A named resolver for a late-bound predicate argument.
#[derive(Clone)]
pub struct DynamicArg {
    name: String,
    resolver: Arc<dyn Fn(&Value) -> Value + Send + Sync>,
}

impl DynamicArg {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn resolve(&self, root: &Value) -> Value {
        (self.resolver)(root)
    }
}

impl fmt::Debug for DynamicArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DynamicArg({})", self.name)
    }
}

/// A reference to a compiled sub-schema, compared by identity.
#[derive(Clone)]
pub struct SchemaRef(pub(crate) Arc<Schema>);

impl PartialEq for SchemaRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaRef({} rules)", self.0.rule_count())
    }
}

/// Rule AST node: a tagged tree of predicates and their combinators.
///
/// Nodes are immutable once constructed; every composition method returns a
/// new node. The `Index` and `Hint` variants are produced downstream by
/// result projection and hint compilation and are never valid inside a
/// schema definition -- compiling one is a configuration error.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A named predicate with its curried argument list.
    Predicate { name: String, args: Vec<(String, Arg)> },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Xor(Box<Node>, Box<Node>),
    Not(Box<Node>),
    /// `condition.then(consequence)`; a failed condition is vacuous success.
    Implication(Box<Node>, Box<Node>),
    /// Check presence of `name` before applying `node` to the keyed-out value.
    Key { name: String, node: Box<Node> },
    /// Apply `node` to the value under `name` with no presence check.
    Val { name: String, node: Box<Node> },
    /// Apply `node` to every element of the array under `name`.
    Each { name: String, node: Box<Node> },
    /// A conjunction of rules scoped under one name.
    Set { name: String, nodes: Vec<Node> },
    /// Delegate to a nested compiled schema.
    Schema(SchemaRef),
    /// A cross-field rule over the named keys, reported under `name`.
    Check {
        name: String,
        keys: Vec<String>,
        node: Box<Node>,
    },
    /// Wrapper marking an each-element result with its index.
    Index { index: usize, node: Box<Node> },
    /// Wrapper marking a node as hint material.
    Hint(Box<Node>),
}

impl Node {
    /// The tag name, used in diagnostics.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Node::Predicate { .. } => "predicate",
            Node::And(_, _) => "and",
            Node::Or(_, _) => "or",
            Node::Xor(_, _) => "xor",
            Node::Not(_) => "not",
            Node::Implication(_, _) => "implication",
            Node::Key { .. } => "key",
            Node::Val { .. } => "val",
            Node::Each { .. } => "each",
            Node::Set { .. } => "set",
            Node::Schema(_) => "schema",
            Node::Check { .. } => "check",
            Node::Index { .. } => "index",
            Node::Hint(_) => "hint",
        }
    }

    #[must_use]
    pub fn and(self, other: Node) -> Node {
        Node::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: Node) -> Node {
        Node::Or(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn xor(self, other: Node) -> Node {
        Node::Xor(Box::new(self), Box::new(other))
    }

    /// Implication: when `self` holds, `other` must hold too.
    #[must_use]
    pub fn then(self, other: Node) -> Node {
        Node::Implication(Box::new(self), Box::new(other))
    }
}

impl Not for Node {
    type Output = Node;

    fn not(self) -> Node {
        Node::Not(Box::new(self))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Predicate { name, args } => {
                write!(f, "({name}")?;
                for (arg_name, arg) in args {
                    match arg {
                        Arg::Value(v) => write!(f, " {arg_name}={v}")?,
                        Arg::Input => write!(f, " {arg_name}=?")?,
                        Arg::Dynamic(d) => write!(f, " {arg_name}=<{}>", d.name())?,
                    }
                }
                write!(f, ")")
            }
            Node::And(a, b) => write!(f, "(and {a} {b})"),
            Node::Or(a, b) => write!(f, "(or {a} {b})"),
            Node::Xor(a, b) => write!(f, "(xor {a} {b})"),
            Node::Not(inner) => write!(f, "(not {inner})"),
            Node::Implication(a, b) => write!(f, "(then {a} {b})"),
            Node::Key { name, node } => write!(f, "(key {name} {node})"),
            Node::Val { name, node } => write!(f, "(val {name} {node})"),
            Node::Each { name, node } => write!(f, "(each {name} {node})"),
            Node::Set { name, nodes } => {
                write!(f, "(set {name}")?;
                for node in nodes {
                    write!(f, " {node}")?;
                }
                write!(f, ")")
            }
            Node::Schema(_) => write!(f, "(schema)"),
            Node::Check { name, keys, node } => {
                write!(f, "(check {name} [{}] {node})", keys.join(", "))
            }
            Node::Index { index, node } => write!(f, "(index {index} {node})"),
            Node::Hint(inner) => write!(f, "(hint {inner})"),
        }
    }
}

/// A predicate application. The subject placeholder is appended
/// automatically when the argument list does not carry one.
#[must_use]
pub fn pred(name: &str, args: Vec<(&str, Arg)>) -> Node {
    let mut args: Vec<(String, Arg)> = args
        .into_iter()
        .map(|(n, a)| (n.to_owned(), a))
        .collect();
    if !args.iter().any(|(_, a)| matches!(a, Arg::Input)) {
        args.push(("input".to_owned(), Arg::Input));
    }
    Node::Predicate {
        name: name.to_owned(),
        args,
    }
}

#[must_use]
pub fn key(name: &str, node: Node) -> Node {
    Node::Key {
        name: name.to_owned(),
        node: Box::new(node),
    }
}

#[must_use]
pub fn val(name: &str, node: Node) -> Node {
    Node::Val {
        name: name.to_owned(),
        node: Box::new(node),
    }
}

#[must_use]
pub fn each(name: &str, node: Node) -> Node {
    Node::Each {
        name: name.to_owned(),
        node: Box::new(node),
    }
}

/// A conjunction of rules scoped under one name. A single-member set
/// degenerates to that member wrapped as a [`val`] rule.
#[must_use]
pub fn set(name: &str, mut nodes: Vec<Node>) -> Node {
    if nodes.len() == 1 {
        return val(name, nodes.remove(0));
    }
    Node::Set {
        name: name.to_owned(),
        nodes,
    }
}

/// Delegate to a nested compiled schema.
#[must_use]
pub fn subschema(schema: &Arc<Schema>) -> Node {
    Node::Schema(SchemaRef(Arc::clone(schema)))
}

#[must_use]
pub fn check(name: &str, keys: Vec<&str>, node: Node) -> Node {
    Node::Check {
        name: name.to_owned(),
        keys: keys.into_iter().map(str::to_owned).collect(),
        node: Box::new(node),
    }
}

// Constructors for the built-in predicates.

#[must_use]
pub fn filled() -> Node {
    pred("filled?", vec![])
}

#[must_use]
pub fn none() -> Node {
    pred("none?", vec![])
}

#[must_use]
pub fn empty() -> Node {
    pred("empty?", vec![])
}

#[must_use]
pub fn str_() -> Node {
    pred("str?", vec![])
}

#[must_use]
pub fn int_() -> Node {
    pred("int?", vec![])
}

#[must_use]
pub fn float_() -> Node {
    pred("float?", vec![])
}

#[must_use]
pub fn bool_() -> Node {
    pred("bool?", vec![])
}

#[must_use]
pub fn hash_() -> Node {
    pred("hash?", vec![])
}

#[must_use]
pub fn array_() -> Node {
    pred("array?", vec![])
}

#[must_use]
pub fn eql(value: impl Into<Value>) -> Node {
    pred("eql?", vec![("left", Arg::val(value))])
}

#[must_use]
pub fn gt(num: impl Into<Value>) -> Node {
    pred("gt?", vec![("num", Arg::val(num))])
}

#[must_use]
pub fn gteq(num: impl Into<Value>) -> Node {
    pred("gteq?", vec![("num", Arg::val(num))])
}

#[must_use]
pub fn lt(num: impl Into<Value>) -> Node {
    pred("lt?", vec![("num", Arg::val(num))])
}

#[must_use]
pub fn lteq(num: impl Into<Value>) -> Node {
    pred("lteq?", vec![("num", Arg::val(num))])
}

/// Exact or ranged size check: `size(3)` or `size(2..=4)`.
#[must_use]
pub fn size(size: impl Into<Value>) -> Node {
    pred("size?", vec![("size", Arg::val(size))])
}

#[must_use]
pub fn min_size(num: i64) -> Node {
    pred("min_size?", vec![("num", Arg::val(num))])
}

#[must_use]
pub fn max_size(num: i64) -> Node {
    pred("max_size?", vec![("num", Arg::val(num))])
}

#[must_use]
pub fn included_in<V, I>(list: I) -> Node
where
    V: Into<Value>,
    I: IntoIterator<Item = V>,
{
    pred("included_in?", vec![("list", Arg::val(Value::array(list)))])
}

#[must_use]
pub fn excluded_from<V, I>(list: I) -> Node
where
    V: Into<Value>,
    I: IntoIterator<Item = V>,
{
    pred(
        "excluded_from?",
        vec![("list", Arg::val(Value::array(list)))],
    )
}

#[must_use]
pub fn format(pattern: &str) -> Node {
    pred("format?", vec![("regex", Arg::val(pattern))])
}

#[must_use]
pub fn odd() -> Node {
    pred("odd?", vec![])
}

#[must_use]
pub fn even() -> Node {
    pred("even?", vec![])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pred_appends_input_placeholder() {
        let node = gt(18_i64);
        match &node {
            Node::Predicate { name, args } => {
                assert_eq!(name, "gt?");
                assert_eq!(args.len(), 2);
                assert_eq!(args[0].0, "num");
                assert_eq!(args[0].1, Arg::Value(Value::Int(18)));
                assert_eq!(args[1].0, "input");
                assert_eq!(args[1].1, Arg::Input);
            }
            other => panic!("expected Predicate, got {other:?}"),
        }
    }

    #[test]
    fn and_chaining_is_left_associative() {
        let node = str_().and(size(2..=4)).and(filled());
        match &node {
            Node::And(left, right) => {
                assert_eq!(right.tag(), "predicate");
                assert_eq!(left.tag(), "and");
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn composition_does_not_mutate() {
        let base = int_();
        let composed = base.clone().and(gt(0_i64));
        assert_eq!(base, int_());
        assert_ne!(composed, base);
    }

    #[test]
    fn not_wraps() {
        let node = !eql("banned");
        assert_eq!(node.tag(), "not");
    }

    #[test]
    fn then_builds_implication() {
        let node = int_().then(gt(0_i64));
        assert_eq!(node.tag(), "implication");
    }

    #[test]
    fn single_member_set_degenerates() {
        let node = set("address", vec![filled()]);
        match &node {
            Node::Val { name, node } => {
                assert_eq!(name, "address");
                assert_eq!(node.tag(), "predicate");
            }
            other => panic!("expected Val, got {other:?}"),
        }
    }

    #[test]
    fn multi_member_set_stays_a_set() {
        let node = set("address", vec![filled(), str_()]);
        assert_eq!(node.tag(), "set");
    }

    #[test]
    fn dynamic_args_compare_by_name() {
        let a = Arg::dynamic("today", |_| Value::Int(1));
        let b = Arg::dynamic("today", |_| Value::Int(2));
        assert_eq!(a, b);
    }

    #[test]
    fn display_renders_s_expression() {
        let node = key("age", int_().and(gt(18_i64)));
        assert_eq!(
            node.to_string(),
            "(key age (and (int? input=?) (gt? num=18 input=?)))"
        );
    }
}
