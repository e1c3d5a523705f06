use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::{CompileError, EvalError};
use super::value::Value;

/// Predicate names that cannot be registered or used directly in a schema.
/// `key?` is synthesized by the engine for presence checks.
pub(crate) const RESERVED: &[&str] = &["key?"];

/// An opaque boolean-returning predicate function.
pub type PredicateFn = Arc<dyn Fn(&[Value]) -> Result<bool, EvalError> + Send + Sync>;

/// A named predicate with declared parameters. The final parameter is
/// always `input`, the subject value.
#[derive(Clone)]
pub struct Predicate {
    name: String,
    params: Vec<String>,
    func: PredicateFn,
}

impl Predicate {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub(crate) fn call(&self, args: &[Value]) -> Result<bool, EvalError> {
        (self.func)(args)
    }

    pub(crate) fn func(&self) -> PredicateFn {
        Arc::clone(&self.func)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({} /{})", self.name, self.params.len())
    }
}

/// Explicit registration map from predicate name to implementation.
///
/// Arity and name validity are checked at registration time, not at call
/// time. The registry is immutable once handed to a schema builder.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    predicates: HashMap<String, Predicate>,
}

static DEFAULT: Lazy<Registry> = Lazy::new(Registry::with_builtins);

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared registry holding the built-in predicate set.
    #[must_use]
    pub fn global() -> &'static Registry {
        &DEFAULT
    }

    /// Register a predicate under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] for reserved or duplicate names, and when
    /// the parameter list does not end with the `input` placeholder.
    pub fn register<F>(
        &mut self,
        name: &str,
        params: &[&str],
        func: F,
    ) -> Result<(), CompileError>
    where
        F: Fn(&[Value]) -> Result<bool, EvalError> + Send + Sync + 'static,
    {
        if RESERVED.contains(&name) {
            return Err(CompileError::ReservedPredicate {
                name: name.to_owned(),
            });
        }
        self.insert(name, params, Arc::new(func))
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Predicate> {
        self.predicates.get(name)
    }

    fn insert(
        &mut self,
        name: &str,
        params: &[&str],
        func: PredicateFn,
    ) -> Result<(), CompileError> {
        if params.last().map(|p| *p != "input").unwrap_or(true) {
            return Err(CompileError::MissingInputParam {
                name: name.to_owned(),
            });
        }
        if self.predicates.contains_key(name) {
            return Err(CompileError::DuplicatePredicate {
                name: name.to_owned(),
            });
        }
        self.predicates.insert(
            name.to_owned(),
            Predicate {
                name: name.to_owned(),
                params: params.iter().map(|p| (*p).to_owned()).collect(),
                func,
            },
        );
        Ok(())
    }

    /// A registry holding the standard predicate set.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut reg = Registry::new();
        builtins::install(&mut reg);
        reg
    }
}

fn incomparable(predicate: &str, value: &Value) -> EvalError {
    EvalError::IncomparableTypes {
        predicate: predicate.to_owned(),
        value_type: value.type_name(),
    }
}

mod builtins {
    use super::*;
    use std::cmp::Ordering;

    // Compiled patterns are reused across calls; format? arguments are
    // schema constants in practice.
    static PATTERNS: Lazy<RwLock<HashMap<String, Regex>>> =
        Lazy::new(|| RwLock::new(HashMap::new()));

    pub(super) fn install(reg: &mut Registry) {
        // `key?` bypasses the reserved-name check: it is engine-internal.
        reg.insert("key?", &["name", "input"], Arc::new(key))
            .expect("builtin registration");
        let entries: Vec<(
            &str,
            &[&str],
            fn(&[Value]) -> Result<bool, EvalError>,
        )> = vec![
            ("none?", &["input"], none),
            ("filled?", &["input"], filled),
            ("empty?", &["input"], is_empty),
            ("str?", &["input"], is_str),
            ("int?", &["input"], is_int),
            ("float?", &["input"], is_float),
            ("bool?", &["input"], is_bool),
            ("hash?", &["input"], is_hash),
            ("array?", &["input"], is_array),
            ("eql?", &["left", "input"], eql),
            ("gt?", &["num", "input"], gt),
            ("gteq?", &["num", "input"], gteq),
            ("lt?", &["num", "input"], lt),
            ("lteq?", &["num", "input"], lteq),
            ("size?", &["size", "input"], size),
            ("min_size?", &["num", "input"], min_size),
            ("max_size?", &["num", "input"], max_size),
            ("included_in?", &["list", "input"], included_in),
            ("excluded_from?", &["list", "input"], excluded_from),
            ("format?", &["regex", "input"], format),
            ("odd?", &["input"], odd),
            ("even?", &["input"], even),
        ];
        for (name, params, func) in entries {
            reg.insert(name, params, Arc::new(func))
                .expect("builtin registration");
        }
    }

    fn key(args: &[Value]) -> Result<bool, EvalError> {
        let [name, input] = args else { return Ok(false) };
        match (name, input) {
            (Value::String(name), Value::Map(map)) => Ok(map.contains_key(name)),
            _ => Ok(false),
        }
    }

    fn none(args: &[Value]) -> Result<bool, EvalError> {
        Ok(matches!(args.last(), Some(Value::Null)))
    }

    fn filled(args: &[Value]) -> Result<bool, EvalError> {
        let [input] = args else { return Ok(false) };
        Ok(!input.is_empty())
    }

    fn is_empty(args: &[Value]) -> Result<bool, EvalError> {
        let [input] = args else { return Ok(false) };
        Ok(input.is_empty())
    }

    fn is_str(args: &[Value]) -> Result<bool, EvalError> {
        Ok(matches!(args.last(), Some(Value::String(_))))
    }

    fn is_int(args: &[Value]) -> Result<bool, EvalError> {
        Ok(matches!(args.last(), Some(Value::Int(_))))
    }

    fn is_float(args: &[Value]) -> Result<bool, EvalError> {
        Ok(matches!(args.last(), Some(Value::Float(_))))
    }

    fn is_bool(args: &[Value]) -> Result<bool, EvalError> {
        Ok(matches!(args.last(), Some(Value::Bool(_))))
    }

    fn is_hash(args: &[Value]) -> Result<bool, EvalError> {
        Ok(matches!(args.last(), Some(Value::Map(_))))
    }

    fn is_array(args: &[Value]) -> Result<bool, EvalError> {
        Ok(matches!(args.last(), Some(Value::Array(_))))
    }

    fn eql(args: &[Value]) -> Result<bool, EvalError> {
        let [left, input] = args else { return Ok(false) };
        Ok(left == input)
    }

    fn ordered(
        predicate: &str,
        args: &[Value],
        accept: fn(Ordering) -> bool,
    ) -> Result<bool, EvalError> {
        let [num, input] = args else { return Ok(false) };
        input
            .compare(num)
            .map(accept)
            .ok_or_else(|| incomparable(predicate, input))
    }

    fn gt(args: &[Value]) -> Result<bool, EvalError> {
        ordered("gt?", args, |ord| ord == Ordering::Greater)
    }

    fn gteq(args: &[Value]) -> Result<bool, EvalError> {
        ordered("gteq?", args, |ord| ord != Ordering::Less)
    }

    fn lt(args: &[Value]) -> Result<bool, EvalError> {
        ordered("lt?", args, |ord| ord == Ordering::Less)
    }

    fn lteq(args: &[Value]) -> Result<bool, EvalError> {
        ordered("lteq?", args, |ord| ord != Ordering::Greater)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn measured(predicate: &str, input: &Value) -> Result<i64, EvalError> {
        input
            .len()
            .map(|n| n as i64)
            .ok_or_else(|| incomparable(predicate, input))
    }

    fn size(args: &[Value]) -> Result<bool, EvalError> {
        let [size, input] = args else { return Ok(false) };
        let len = measured("size?", input)?;
        match size {
            Value::Int(n) => Ok(len == *n),
            Value::Range(left, right) => Ok(*left <= len && len <= *right),
            other => Err(incomparable("size?", other)),
        }
    }

    fn min_size(args: &[Value]) -> Result<bool, EvalError> {
        let [num, input] = args else { return Ok(false) };
        match num {
            Value::Int(n) => Ok(measured("min_size?", input)? >= *n),
            other => Err(incomparable("min_size?", other)),
        }
    }

    fn max_size(args: &[Value]) -> Result<bool, EvalError> {
        let [num, input] = args else { return Ok(false) };
        match num {
            Value::Int(n) => Ok(measured("max_size?", input)? <= *n),
            other => Err(incomparable("max_size?", other)),
        }
    }

    fn included_in(args: &[Value]) -> Result<bool, EvalError> {
        let [list, input] = args else { return Ok(false) };
        match list {
            Value::Array(items) => Ok(items.contains(input)),
            other => Err(incomparable("included_in?", other)),
        }
    }

    fn excluded_from(args: &[Value]) -> Result<bool, EvalError> {
        included_in(args).map(|found| !found)
    }

    fn format(args: &[Value]) -> Result<bool, EvalError> {
        let [pattern, input] = args else { return Ok(false) };
        let (Value::String(pattern), Value::String(subject)) = (pattern, input) else {
            return Err(incomparable("format?", input));
        };
        if let Some(re) = PATTERNS
            .read()
            .expect("pattern cache poisoned")
            .get(pattern)
        {
            return Ok(re.is_match(subject));
        }
        let re = Regex::new(pattern).map_err(|_| EvalError::InvalidPattern {
            pattern: pattern.clone(),
        })?;
        let matched = re.is_match(subject);
        PATTERNS
            .write()
            .expect("pattern cache poisoned")
            .insert(pattern.clone(), re);
        Ok(matched)
    }

    fn parity(predicate: &str, args: &[Value], rem: i64) -> Result<bool, EvalError> {
        let [input] = args else { return Ok(false) };
        match input {
            Value::Int(n) => Ok(n.rem_euclid(2) == rem),
            other => Err(incomparable(predicate, other)),
        }
    }

    fn odd(args: &[Value]) -> Result<bool, EvalError> {
        parity("odd?", args, 1)
    }

    fn even(args: &[Value]) -> Result<bool, EvalError> {
        parity("even?", args, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Value>) -> Result<bool, EvalError> {
        Registry::global()
            .lookup(name)
            .expect("builtin present")
            .call(&args)
    }

    #[test]
    fn builtin_type_checks() {
        assert!(call("str?", vec!["x".into()]).unwrap());
        assert!(!call("str?", vec![Value::Int(1)]).unwrap());
        assert!(call("int?", vec![Value::Int(1)]).unwrap());
        assert!(call("hash?", vec![Value::map(vec![("a", 1_i64)])]).unwrap());
        assert!(call("array?", vec![Value::Array(vec![])]).unwrap());
        assert!(call("none?", vec![Value::Null]).unwrap());
    }

    #[test]
    fn filled_rejects_empty_and_null() {
        assert!(!call("filled?", vec!["".into()]).unwrap());
        assert!(!call("filled?", vec![Value::Null]).unwrap());
        assert!(call("filled?", vec!["x".into()]).unwrap());
        assert!(call("filled?", vec![Value::Int(0)]).unwrap());
    }

    #[test]
    fn ordering_predicates() {
        assert!(call("gt?", vec![Value::Int(18), Value::Int(19)]).unwrap());
        assert!(!call("gt?", vec![Value::Int(18), Value::Int(18)]).unwrap());
        assert!(call("gteq?", vec![Value::Int(18), Value::Int(18)]).unwrap());
        assert!(call("lt?", vec![Value::Int(18), Value::Float(17.5)]).unwrap());
        assert!(call("lteq?", vec![Value::Int(18), Value::Int(18)]).unwrap());
    }

    #[test]
    fn ordering_on_mismatched_type_is_an_error() {
        let err = call("gt?", vec![Value::Int(18), "17".into()]).unwrap_err();
        assert!(matches!(
            err,
            EvalError::IncomparableTypes { value_type: "string", .. }
        ));
    }

    #[test]
    fn size_exact_and_range() {
        assert!(call("size?", vec![Value::Int(3), "abc".into()]).unwrap());
        assert!(call("size?", vec![Value::Range(2, 4), "abc".into()]).unwrap());
        assert!(!call("size?", vec![Value::Range(2, 4), "abcde".into()]).unwrap());
        assert!(call("size?", vec![Value::Range(1, 2), Value::array(vec![1_i64])]).unwrap());
    }

    #[test]
    fn size_on_scalar_is_an_error() {
        assert!(call("size?", vec![Value::Range(2, 4), Value::Int(7)]).is_err());
    }

    #[test]
    fn membership_predicates() {
        let list = Value::array(vec!["cc", "wire"]);
        assert!(call("included_in?", vec![list.clone(), "cc".into()]).unwrap());
        assert!(!call("included_in?", vec![list.clone(), "cash".into()]).unwrap());
        assert!(call("excluded_from?", vec![list, "cash".into()]).unwrap());
    }

    #[test]
    fn format_matches_and_caches() {
        let pat = Value::from(r"^\d+$");
        assert!(call("format?", vec![pat.clone(), "123".into()]).unwrap());
        assert!(!call("format?", vec![pat.clone(), "12a".into()]).unwrap());
        // second call goes through the cache
        assert!(call("format?", vec![pat, "99".into()]).unwrap());
    }

    #[test]
    fn format_invalid_pattern_is_an_error() {
        let err = call("format?", vec![Value::from("("), "x".into()]).unwrap_err();
        assert!(matches!(err, EvalError::InvalidPattern { .. }));
    }

    #[test]
    fn parity_predicates() {
        assert!(call("odd?", vec![Value::Int(3)]).unwrap());
        assert!(call("even?", vec![Value::Int(-4)]).unwrap());
        assert!(call("odd?", vec![Value::Int(-3)]).unwrap());
        assert!(call("odd?", vec![Value::Float(3.0)]).is_err());
    }

    #[test]
    fn key_checks_presence() {
        let input = Value::map(vec![("name", "jane")]);
        assert!(call("key?", vec!["name".into(), input.clone()]).unwrap());
        assert!(!call("key?", vec!["age".into(), input]).unwrap());
        assert!(!call("key?", vec!["name".into(), Value::Int(1)]).unwrap());
    }

    #[test]
    fn register_rejects_reserved_name() {
        let mut reg = Registry::new();
        let result = reg.register("key?", &["name", "input"], |_| Ok(true));
        assert!(matches!(
            result,
            Err(CompileError::ReservedPredicate { .. })
        ));
    }

    #[test]
    fn register_rejects_duplicates() {
        let mut reg = Registry::new();
        reg.register("custom?", &["input"], |_| Ok(true)).unwrap();
        let result = reg.register("custom?", &["input"], |_| Ok(false));
        assert!(matches!(
            result,
            Err(CompileError::DuplicatePredicate { .. })
        ));
    }

    #[test]
    fn register_requires_input_param() {
        let mut reg = Registry::new();
        let result = reg.register("custom?", &["num"], |_| Ok(true));
        assert!(matches!(
            result,
            Err(CompileError::MissingInputParam { .. })
        ));
    }

    #[test]
    fn registered_predicate_is_callable() {
        let mut reg = Registry::new();
        reg.register("answer?", &["input"], |args| {
            Ok(matches!(args.last(), Some(Value::Int(42))))
        })
        .unwrap();
        let p = reg.lookup("answer?").unwrap();
        assert_eq!(p.arity(), 1);
        assert!(p.call(&[Value::Int(42)]).unwrap());
    }
}
