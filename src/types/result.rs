use super::node::{Arg, Node};
use super::value::Value;

/// Outcome of applying one compiled rule to an input value.
///
/// The node mirrors the rule's combinator structure; [`success`] is true
/// iff no predicate failed anywhere in the nested outcome.
///
/// [`success`]: RuleResult::success
#[derive(Debug, Clone)]
pub struct RuleResult {
    pub(crate) value: Value,
    pub(crate) node: ResultNode,
}

impl RuleResult {
    #[must_use]
    pub fn success(&self) -> bool {
        self.node.success()
    }

    /// The input value the rule was applied to.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Project the failing portion of this result into a message-consumable
    /// AST. `None` when the rule succeeded.
    pub(crate) fn to_ast(&self) -> Option<Node> {
        if self.node.success() {
            None
        } else {
            Some(self.node.project())
        }
    }
}

/// Recursive evaluation outcome, one variant per compiled-rule shape.
#[derive(Debug, Clone)]
pub(crate) enum ResultNode {
    Predicate {
        name: String,
        args: Vec<(String, Value)>,
        success: bool,
    },
    /// `right` is `None` when the left side failed and the right was skipped.
    And {
        left: Box<ResultNode>,
        right: Option<Box<ResultNode>>,
    },
    /// `right` is `None` when the left side succeeded (short-circuit).
    Or {
        left: Box<ResultNode>,
        right: Option<Box<ResultNode>>,
    },
    Xor {
        left: Box<ResultNode>,
        right: Box<ResultNode>,
    },
    Not {
        inner: Box<ResultNode>,
    },
    /// `consequence` is `None` when the condition failed (vacuous success).
    Implication {
        condition: Box<ResultNode>,
        consequence: Option<Box<ResultNode>>,
    },
    /// `inner` is `None` when the key was absent.
    Key {
        name: String,
        inner: Option<Box<ResultNode>>,
    },
    Val {
        name: String,
        inner: Box<ResultNode>,
    },
    /// Per-element outcomes in element order.
    Each {
        elements: Vec<ResultNode>,
    },
    Set {
        members: Vec<ResultNode>,
    },
    Check {
        name: String,
        keys: Vec<String>,
        inner: Box<ResultNode>,
    },
    /// Pre-projected failure ASTs from a nested schema.
    Nested {
        failures: Vec<Node>,
    },
}

impl ResultNode {
    pub(crate) fn success(&self) -> bool {
        match self {
            ResultNode::Predicate { success, .. } => *success,
            ResultNode::And { right, .. } => {
                right.as_ref().map_or(false, |r| r.success())
            }
            ResultNode::Or { right, .. } => {
                right.as_ref().map_or(true, |r| r.success())
            }
            ResultNode::Xor { left, right } => left.success() ^ right.success(),
            ResultNode::Not { inner } => !inner.success(),
            ResultNode::Implication { consequence, .. } => {
                consequence.as_ref().map_or(true, |c| c.success())
            }
            ResultNode::Key { inner, .. } => {
                inner.as_ref().map_or(false, |i| i.success())
            }
            ResultNode::Val { inner, .. } => inner.success(),
            ResultNode::Each { elements } => elements.iter().all(ResultNode::success),
            ResultNode::Set { members } => members.iter().all(ResultNode::success),
            ResultNode::Check { inner, .. } => inner.success(),
            ResultNode::Nested { failures } => failures.is_empty(),
        }
    }

    /// Project the failing portion into a message AST. Must only be called
    /// on a failing node.
    pub(crate) fn project(&self) -> Node {
        match self {
            ResultNode::Predicate { name, args, .. } => predicate_ast(name, args),
            ResultNode::And { left, right } => match right {
                // left succeeded, right failed
                Some(r) if !r.success() => r.project(),
                // left failed, right skipped
                _ => left.project(),
            },
            ResultNode::Or { left, right } => match right {
                // a failing disjunction has both sides failed
                Some(r) => Node::Or(Box::new(left.project()), Box::new(r.project())),
                None => left.project(),
            },
            ResultNode::Xor { left, right } => {
                if left.success() && right.success() {
                    // exactly-one violated by both holding: report both, negated
                    Node::Not(Box::new(Node::Or(
                        Box::new(left.project_any()),
                        Box::new(right.project_any()),
                    )))
                } else {
                    Node::Xor(Box::new(left.project()), Box::new(right.project()))
                }
            }
            ResultNode::Not { inner } => Node::Not(Box::new(inner.project_any())),
            ResultNode::Implication {
                condition,
                consequence,
            } => match consequence {
                Some(c) => c.project(),
                None => condition.project_any(),
            },
            ResultNode::Key { name, inner } => match inner {
                Some(i) => Node::Key {
                    name: name.clone(),
                    node: Box::new(i.project()),
                },
                None => Node::Key {
                    name: name.clone(),
                    node: Box::new(missing_key_ast(name)),
                },
            },
            ResultNode::Val { name, inner } => Node::Val {
                name: name.clone(),
                node: Box::new(inner.project()),
            },
            ResultNode::Each { elements } => fold_and(
                elements
                    .iter()
                    .enumerate()
                    .filter(|(_, el)| !el.success())
                    .map(|(index, el)| Node::Index {
                        index,
                        node: Box::new(el.project()),
                    })
                    .collect(),
            ),
            ResultNode::Set { members } => fold_and(
                members
                    .iter()
                    .filter(|m| !m.success())
                    .map(ResultNode::project)
                    .collect(),
            ),
            ResultNode::Check { name, keys, inner } => Node::Check {
                name: name.clone(),
                keys: keys.clone(),
                node: Box::new(inner.project()),
            },
            ResultNode::Nested { failures } => fold_and(failures.clone()),
        }
    }

    /// Project regardless of success, preserving structure and filled args.
    /// Used for negation, where the succeeded inner node is what failed.
    fn project_any(&self) -> Node {
        match self {
            ResultNode::Predicate { name, args, .. } => predicate_ast(name, args),
            ResultNode::And { left, right } | ResultNode::Or { left, right } => {
                match right {
                    Some(r) => {
                        let pair = (
                            Box::new(left.project_any()),
                            Box::new(r.project_any()),
                        );
                        if matches!(self, ResultNode::And { .. }) {
                            Node::And(pair.0, pair.1)
                        } else {
                            Node::Or(pair.0, pair.1)
                        }
                    }
                    None => left.project_any(),
                }
            }
            ResultNode::Xor { left, right } => Node::Xor(
                Box::new(left.project_any()),
                Box::new(right.project_any()),
            ),
            ResultNode::Not { inner } => Node::Not(Box::new(inner.project_any())),
            ResultNode::Implication {
                condition,
                consequence,
            } => match consequence {
                Some(c) => c.project_any(),
                None => condition.project_any(),
            },
            ResultNode::Key { name, inner } => match inner {
                Some(i) => Node::Key {
                    name: name.clone(),
                    node: Box::new(i.project_any()),
                },
                None => Node::Key {
                    name: name.clone(),
                    node: Box::new(missing_key_ast(name)),
                },
            },
            ResultNode::Val { name, inner } => Node::Val {
                name: name.clone(),
                node: Box::new(inner.project_any()),
            },
            ResultNode::Each { elements } => fold_and(
                elements
                    .iter()
                    .enumerate()
                    .map(|(index, el)| Node::Index {
                        index,
                        node: Box::new(el.project_any()),
                    })
                    .collect(),
            ),
            ResultNode::Set { members } => {
                fold_and(members.iter().map(ResultNode::project_any).collect())
            }
            ResultNode::Check { name, keys, inner } => Node::Check {
                name: name.clone(),
                keys: keys.clone(),
                node: Box::new(inner.project_any()),
            },
            ResultNode::Nested { failures } => fold_and(failures.clone()),
        }
    }
}

fn predicate_ast(name: &str, args: &[(String, Value)]) -> Node {
    Node::Predicate {
        name: name.to_owned(),
        args: args
            .iter()
            .map(|(n, v)| (n.clone(), Arg::Value(v.clone())))
            .collect(),
    }
}

fn missing_key_ast(name: &str) -> Node {
    Node::Predicate {
        name: "key?".to_owned(),
        args: vec![(
            "name".to_owned(),
            Arg::Value(Value::String(name.to_owned())),
        )],
    }
}

/// Left-fold a non-empty node list into a conjunction chain.
fn fold_and(nodes: Vec<Node>) -> Node {
    nodes
        .into_iter()
        .reduce(Node::and)
        .expect("projection of a failing node yields at least one child")
}
