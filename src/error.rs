use thiserror::Error;

use crate::message::MessageError;
use crate::types::error::{CompileError, EvalError};

/// Unified error type covering schema compilation, evaluation, and
/// message resolution.
#[derive(Debug, Error)]
pub enum ValidusError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Message(#[from] MessageError),
}
