//! Error types for the engine
//!
//! Every fallible operation returns `Result<T, JsError>`. Catchable variants
//! are turned into guest exception objects when they cross into script code;
//! `Internal` and `StepLimitExceeded` are fatal and unwind straight to the host.

use thiserror::Error;

use crate::value::JsValue;

/// Source location information for error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One early error found by static analysis of a source text.
#[derive(Debug, Clone, PartialEq)]
pub struct EarlyError {
    pub message: String,
    pub location: SourceLocation,
}

impl std::fmt::Display for EarlyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.message, self.location)
    }
}

/// The native error constructors an engine error maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Error,
    TypeError,
    ReferenceError,
    RangeError,
    SyntaxError,
    EvalError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::Error,
        ErrorKind::TypeError,
        ErrorKind::ReferenceError,
        ErrorKind::RangeError,
        ErrorKind::SyntaxError,
        ErrorKind::EvalError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::EvalError => "EvalError",
        }
    }
}

/// Main error type for the engine
#[derive(Debug, Clone, Error)]
pub enum JsError {
    #[error("SyntaxError: {message} at {location}")]
    SyntaxError {
        message: String,
        location: SourceLocation,
    },

    /// All early errors of one source text, reported together.
    #[error("SyntaxError: {}", format_early_errors(.0))]
    EarlyErrors(Vec<EarlyError>),

    #[error("TypeError: {message}")]
    TypeError { message: String },

    #[error("ReferenceError: {message}")]
    ReferenceError { message: String },

    #[error("RangeError: {message}")]
    RangeError { message: String },

    #[error("EvalError: {message}")]
    EvalError { message: String },

    #[error("ModuleError: {message}")]
    ModuleError { message: String },

    /// A guest value was thrown. `description` is filled in when the error
    /// leaves the engine, so hosts get a readable message.
    #[error("Uncaught {description}")]
    Thrown { value: JsValue, description: String },

    /// A broken engine invariant. Never observable by guest code.
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Execution step limit of {0} exceeded")]
    StepLimitExceeded(u64),
}

fn format_early_errors(errors: &[EarlyError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl JsError {
    pub fn syntax_error(message: impl Into<String>, line: u32, column: u32) -> Self {
        JsError::SyntaxError {
            message: message.into(),
            location: SourceLocation { line, column },
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        JsError::TypeError {
            message: message.into(),
        }
    }

    pub fn reference_error(message: impl Into<String>) -> Self {
        JsError::ReferenceError {
            message: message.into(),
        }
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        JsError::RangeError {
            message: message.into(),
        }
    }

    pub fn module_error(message: impl Into<String>) -> Self {
        JsError::ModuleError {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        JsError::Internal(message.into())
    }

    pub fn thrown(value: JsValue) -> Self {
        JsError::Thrown {
            value,
            description: String::new(),
        }
    }

    /// Whether guest code may observe this error through `catch`.
    pub fn is_catchable(&self) -> bool {
        !matches!(self, JsError::Internal(_) | JsError::StepLimitExceeded(_))
    }

    /// The native error kind and message for engine-raised errors.
    /// `None` for thrown guest values and fatal errors.
    pub fn kind_and_message(&self) -> Option<(ErrorKind, String)> {
        match self {
            JsError::SyntaxError { message, .. } => Some((ErrorKind::SyntaxError, message.clone())),
            JsError::EarlyErrors(errors) => {
                Some((ErrorKind::SyntaxError, format_early_errors(errors)))
            }
            JsError::TypeError { message } => Some((ErrorKind::TypeError, message.clone())),
            JsError::ReferenceError { message } => {
                Some((ErrorKind::ReferenceError, message.clone()))
            }
            JsError::RangeError { message } => Some((ErrorKind::RangeError, message.clone())),
            JsError::EvalError { message } => Some((ErrorKind::EvalError, message.clone())),
            JsError::ModuleError { message } => Some((ErrorKind::Error, message.clone())),
            JsError::Thrown { .. } | JsError::Internal(_) | JsError::StepLimitExceeded(_) => None,
        }
    }
}

/// Result type alias used throughout the engine.
pub type JsResult<T> = Result<T, JsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_early_errors_render_as_one_batch() {
        let err = JsError::EarlyErrors(vec![
            EarlyError {
                message: "Duplicate declaration 'x'".into(),
                location: SourceLocation { line: 1, column: 5 },
            },
            EarlyError {
                message: "Illegal break statement".into(),
                location: SourceLocation { line: 2, column: 1 },
            },
        ]);
        let text = err.to_string();
        assert!(text.starts_with("SyntaxError: "));
        assert!(text.contains("Duplicate declaration 'x' at 1:5"));
        assert!(text.contains("Illegal break statement at 2:1"));
    }

    #[test]
    fn test_fatal_errors_are_not_catchable() {
        assert!(!JsError::internal("broken").is_catchable());
        assert!(!JsError::StepLimitExceeded(10).is_catchable());
        assert!(JsError::type_error("x").is_catchable());
        assert!(JsError::thrown(JsValue::Null).is_catchable());
    }
}
