use thiserror::Error;

/// Errors raised by layer construction and forward/backward calls.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayerError {
    #[error("Shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        got: String,
    },

    #[error("Uninitialized state: {0}")]
    UninitializedState(&'static str),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl LayerError {
    pub(crate) fn shape(
        context: &'static str,
        expected: impl ToString,
        got: impl ToString,
    ) -> Self {
        LayerError::ShapeMismatch {
            context,
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LayerError>;
