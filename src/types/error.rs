use thiserror::Error;

/// Configuration errors raised while compiling a schema definition.
///
/// These are programmer errors: they surface immediately and are never
/// retried or swallowed.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unknown predicate '{name}'")]
    UnknownPredicate { name: String },

    #[error("predicate '{predicate}' expects {expected} arguments, got {given}")]
    ArityMismatch {
        predicate: String,
        expected: usize,
        given: usize,
    },

    #[error("predicate name '{name}' is reserved")]
    ReservedPredicate { name: String },

    #[error("node tag '{tag}' is not valid in a schema definition")]
    InvalidNode { tag: &'static str },

    #[error("duplicate rule name '{name}'")]
    DuplicateRule { name: String },

    #[error("duplicate predicate '{name}' in registry")]
    DuplicatePredicate { name: String },

    #[error("predicate '{name}' must declare a trailing 'input' parameter")]
    MissingInputParam { name: String },

    #[error("set '{name}' has no member rules")]
    EmptySet { name: String },

    #[error("no rules defined; a schema requires at least one rule")]
    NoRules,
}

/// Errors raised by predicate functions during evaluation.
///
/// These propagate uncaught to the caller: guarding with type predicates
/// (`int_().and(gt(18))`) is the schema author's responsibility, which is
/// why conjunction ordering and short-circuit are contractual.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("predicate '{predicate}' cannot be applied to a {value_type} value")]
    IncomparableTypes {
        predicate: String,
        value_type: &'static str,
    },

    #[error("invalid regex '{pattern}' in format? predicate")]
    InvalidPattern { pattern: String },
}
