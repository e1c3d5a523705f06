pub(crate) mod error;
pub(crate) mod node;
pub(crate) mod predicate;
pub(crate) mod result;
pub(crate) mod rule;
pub(crate) mod schema;
pub(crate) mod value;

pub use error::{CompileError, EvalError};
pub use node::{
    array_, bool_, check, each, empty, eql, even, excluded_from, filled, float_, format, gt,
    gteq, hash_, included_in, int_, key, lt, lteq, max_size, min_size, none, odd, pred, set,
    size, str_, subschema, val, Arg, DynamicArg, Node, SchemaRef,
};
pub use predicate::{Predicate, PredicateFn, Registry};
pub use result::RuleResult;
pub use schema::{Schema, SchemaBuilder, Validation};
pub use value::Value;
