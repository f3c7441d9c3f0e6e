use thiserror::Error;

/// Errors produced while building values and paths.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("unresolved reference '{reference}' at {at}")]
    UnresolvedReference { reference: String, at: String },

    #[error("reference '{0}' must point to a record, list, or map")]
    ReferenceToScalar(String),

    #[error("unsupported JSON value: {0}")]
    UnsupportedJson(String),
}
