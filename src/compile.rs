use std::collections::HashSet;
use std::sync::Arc;

use crate::types::node::{Arg, Node};
use crate::types::predicate::{Registry, RESERVED};
use crate::types::rule::{BoundPredicate, CompiledRule};
use crate::CompileError;

/// Compile named rule definitions into executable rules.
///
/// Dispatches on the node tag; an AST-level `and`/`or` becomes composition
/// at the executable level so that disjunction keeps its short-circuit
/// laziness.
pub(crate) fn compile(
    rules: &[(String, Node)],
    registry: &Registry,
) -> Result<Vec<CompiledRule>, CompileError> {
    if rules.is_empty() {
        return Err(CompileError::NoRules);
    }
    check_duplicates(rules)?;
    rules
        .iter()
        .map(|(_, node)| compile_node(node, registry, false))
        .collect()
}

fn check_duplicates(rules: &[(String, Node)]) -> Result<(), CompileError> {
    let mut seen = HashSet::new();
    for (name, _) in rules {
        if !seen.insert(name) {
            return Err(CompileError::DuplicateRule { name: name.clone() });
        }
    }
    Ok(())
}

/// `reserved_ok` permits the synthetic `key?` predicate inside an
/// implication condition, where the `optional` sugar places it.
fn compile_node(
    node: &Node,
    registry: &Registry,
    reserved_ok: bool,
) -> Result<CompiledRule, CompileError> {
    match node {
        Node::Predicate { name, args } => {
            compile_predicate(name, args, registry, reserved_ok)
        }
        Node::And(a, b) => Ok(compile_node(a, registry, reserved_ok)?
            .and(compile_node(b, registry, reserved_ok)?)),
        Node::Or(a, b) => Ok(compile_node(a, registry, reserved_ok)?
            .or(compile_node(b, registry, reserved_ok)?)),
        Node::Xor(a, b) => Ok(compile_node(a, registry, reserved_ok)?
            .xor(compile_node(b, registry, reserved_ok)?)),
        Node::Not(inner) => Ok(compile_node(inner, registry, reserved_ok)?.negate()),
        Node::Implication(condition, consequence) => {
            Ok(compile_node(condition, registry, true)?
                .then(compile_node(consequence, registry, false)?))
        }
        Node::Key { name, node } => Ok(CompiledRule::Key {
            name: name.clone(),
            inner: Box::new(compile_node(node, registry, false)?),
        }),
        Node::Val { name, node } => Ok(CompiledRule::Val {
            name: name.clone(),
            inner: Box::new(compile_node(node, registry, false)?),
        }),
        Node::Each { name, node } => Ok(CompiledRule::Key {
            name: name.clone(),
            inner: Box::new(CompiledRule::Each {
                inner: Box::new(compile_node(node, registry, false)?),
            }),
        }),
        Node::Set { name, nodes } => {
            if nodes.is_empty() {
                return Err(CompileError::EmptySet { name: name.clone() });
            }
            let members = nodes
                .iter()
                .map(|n| compile_node(n, registry, false))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(CompiledRule::Val {
                name: name.clone(),
                inner: Box::new(CompiledRule::Set { members }),
            })
        }
        Node::Schema(schema) => Ok(CompiledRule::Nested {
            schema: Arc::clone(&schema.0),
        }),
        Node::Check { name, keys, node } => compile_check(name, keys, node, registry),
        Node::Index { .. } | Node::Hint(_) => {
            Err(CompileError::InvalidNode { tag: node.tag() })
        }
    }
}

fn compile_predicate(
    name: &str,
    args: &[(String, Arg)],
    registry: &Registry,
    reserved_ok: bool,
) -> Result<CompiledRule, CompileError> {
    if !reserved_ok && RESERVED.contains(&name) {
        return Err(CompileError::ReservedPredicate {
            name: name.to_owned(),
        });
    }
    let predicate = registry
        .lookup(name)
        .ok_or_else(|| CompileError::UnknownPredicate {
            name: name.to_owned(),
        })?;
    if args.len() != predicate.arity() {
        return Err(CompileError::ArityMismatch {
            predicate: name.to_owned(),
            expected: predicate.arity(),
            given: args.len(),
        });
    }
    Ok(CompiledRule::Predicate(BoundPredicate::new(
        predicate,
        args.to_vec(),
    )))
}

/// Cross-field checks carry a single predicate whose `input` placeholders
/// are filled positionally from the named keys.
fn compile_check(
    name: &str,
    keys: &[String],
    node: &Node,
    registry: &Registry,
) -> Result<CompiledRule, CompileError> {
    let Node::Predicate {
        name: pred_name,
        args,
    } = node
    else {
        return Err(CompileError::InvalidNode { tag: node.tag() });
    };
    let compiled = compile_predicate(pred_name, args, registry, false)?;
    let CompiledRule::Predicate(predicate) = compiled else {
        unreachable!("compile_predicate returns a predicate rule");
    };
    let slots = args
        .iter()
        .filter(|(_, a)| matches!(a, Arg::Input))
        .count();
    if slots != keys.len() {
        return Err(CompileError::ArityMismatch {
            predicate: pred_name.clone(),
            expected: slots,
            given: keys.len(),
        });
    }
    Ok(CompiledRule::Check {
        name: name.to_owned(),
        keys: keys.to_vec(),
        predicate,
    })
}
