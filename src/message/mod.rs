mod backend;
mod compiler;
mod error;
mod hint;
mod message;
mod set;

pub use backend::{LookupOptions, MessageBackend, StaticMessages};
pub use error::MessageError;
pub use message::{Message, PathSegment};
pub use set::{MessageSet, MessageTree};

pub(crate) use backend::default_messages;
pub(crate) use compiler::{MessageCompiler, MessageKind, Options};
pub(crate) use hint::{HintCache, HintCompiler};
