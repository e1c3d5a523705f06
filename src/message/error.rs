use thiserror::Error;

/// Configuration errors raised during message resolution.
///
/// A schema that references a predicate with no message mapping is a
/// configuration bug, surfaced immediately rather than silently swallowed.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("no message template for predicate '{predicate}' (locale '{locale}')")]
    MissingTemplate { predicate: String, locale: String },

    #[error("template for '{predicate}' references unknown token '{token}'")]
    MissingToken { predicate: String, token: String },
}
