use crate::types::result::ResultNode;
use crate::types::rule::CompiledRule;
use crate::types::value::Value;
use crate::EvalError;

/// Apply one compiled rule to an input value.
///
/// `root` is the original input handed to the schema; dynamic arguments
/// resolve against it. Evaluation errors from predicate internals (e.g. an
/// ordering comparison on an incompatible type) propagate unmodified.
pub(crate) fn evaluate(
    rule: &CompiledRule,
    input: &Value,
    root: &Value,
) -> Result<ResultNode, EvalError> {
    match rule {
        CompiledRule::Predicate(p) => {
            let (args, success) = p.invoke(input, root)?;
            Ok(ResultNode::Predicate {
                name: p.name().to_owned(),
                args,
                success,
            })
        }
        CompiledRule::Key { name, inner } => match input.get(name) {
            Some(value) => Ok(ResultNode::Key {
                name: name.clone(),
                inner: Some(Box::new(evaluate(inner, value, root)?)),
            }),
            None => Ok(ResultNode::Key {
                name: name.clone(),
                inner: None,
            }),
        },
        CompiledRule::Val { name, inner } => {
            let value = input.get(name).cloned().unwrap_or(Value::Null);
            Ok(ResultNode::Val {
                name: name.clone(),
                inner: Box::new(evaluate(inner, &value, root)?),
            })
        }
        CompiledRule::Each { inner } => match input {
            Value::Array(items) => {
                let mut elements = Vec::with_capacity(items.len());
                for item in items {
                    elements.push(evaluate(inner, item, root)?);
                }
                Ok(ResultNode::Each { elements })
            }
            other => Ok(ResultNode::Predicate {
                name: "array?".to_owned(),
                args: vec![("input".to_owned(), other.clone())],
                success: false,
            }),
        },
        CompiledRule::Set { members } => {
            let mut results = Vec::with_capacity(members.len());
            for member in members {
                results.push(evaluate(member, input, root)?);
            }
            Ok(ResultNode::Set { members: results })
        }
        CompiledRule::Conjunction(left, right) => {
            let l = evaluate(left, input, root)?;
            if l.success() {
                let r = evaluate(right, input, root)?;
                Ok(ResultNode::And {
                    left: Box::new(l),
                    right: Some(Box::new(r)),
                })
            } else {
                Ok(ResultNode::And {
                    left: Box::new(l),
                    right: None,
                })
            }
        }
        CompiledRule::Disjunction(left, right) => {
            let l = evaluate(left, input, root)?;
            if l.success() {
                Ok(ResultNode::Or {
                    left: Box::new(l),
                    right: None,
                })
            } else {
                let r = evaluate(right, input, root)?;
                Ok(ResultNode::Or {
                    left: Box::new(l),
                    right: Some(Box::new(r)),
                })
            }
        }
        CompiledRule::ExclusiveDisjunction(left, right) => Ok(ResultNode::Xor {
            left: Box::new(evaluate(left, input, root)?),
            right: Box::new(evaluate(right, input, root)?),
        }),
        CompiledRule::Negation(inner) => Ok(ResultNode::Not {
            inner: Box::new(evaluate(inner, input, root)?),
        }),
        CompiledRule::Implication(condition, consequence) => {
            let c = evaluate(condition, input, root)?;
            if c.success() {
                let q = evaluate(consequence, input, root)?;
                Ok(ResultNode::Implication {
                    condition: Box::new(c),
                    consequence: Some(Box::new(q)),
                })
            } else {
                Ok(ResultNode::Implication {
                    condition: Box::new(c),
                    consequence: None,
                })
            }
        }
        CompiledRule::Check {
            name,
            keys,
            predicate,
        } => {
            let subjects: Vec<Value> = keys
                .iter()
                .map(|k| input.get(k).cloned().unwrap_or(Value::Null))
                .collect();
            let (args, success) = predicate.invoke_across(&subjects, root)?;
            Ok(ResultNode::Check {
                name: name.clone(),
                keys: keys.clone(),
                inner: Box::new(ResultNode::Predicate {
                    name: predicate.name().to_owned(),
                    args,
                    success,
                }),
            })
        }
        CompiledRule::Nested { schema } => Ok(ResultNode::Nested {
            failures: schema.project_failures(input)?,
        }),
    }
}
