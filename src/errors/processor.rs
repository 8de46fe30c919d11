use thiserror::Error;

/// Failure reported by a task body.
///
/// The numeric `code` is exposed to `expect` expressions of dependent
/// vertices as `RET_CODE_<vertex id>`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{code}] {message}")]
pub struct ProcessorError {
    pub code: i64,
    pub message: String,
}

impl ProcessorError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Misuse of a port from inside a task body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    #[error("no port named '{field}'")]
    UnknownField { field: String },

    #[error("port '{field}' carries '{declared}', not '{requested}'")]
    TypeMismatch {
        field: String,
        declared: &'static str,
        requested: &'static str,
    },
}

impl From<PortError> for ProcessorError {
    fn from(err: PortError) -> Self {
        ProcessorError::new(-1, err.to_string())
    }
}
