mod compile;
mod error;
mod evaluate;
mod message;
mod types;

pub use error::ValidusError;
pub use message::{
    LookupOptions, Message, MessageBackend, MessageError, MessageSet, MessageTree, PathSegment,
    StaticMessages,
};
pub use types::{
    array_, bool_, check, each, empty, eql, even, excluded_from, filled, float_, format, gt,
    gteq, hash_, included_in, int_, key, lt, lteq, max_size, min_size, none, odd, pred, set,
    size, str_, subschema, val, Arg, CompileError, DynamicArg, EvalError, Node, Predicate,
    PredicateFn, Registry, RuleResult, Schema, SchemaBuilder, SchemaRef, Validation, Value,
};
