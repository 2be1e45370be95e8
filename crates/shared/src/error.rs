use thiserror::Error;

use crate::protocol::Action;

/// Why an inbound payload could not be read as a structured instruction.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not well-formed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("{action:?} instruction is missing `{field}`")]
    MissingField { action: Action, field: &'static str },
    #[error("{action:?} instruction has an invalid `{field}`: {source}")]
    InvalidField {
        action: Action,
        field: &'static str,
        source: serde_json::Error,
    },
}
