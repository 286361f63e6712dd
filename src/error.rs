//! Error types for sqlbind.

use thiserror::Error;

/// The main error type for sqlbind operations.
#[derive(Debug, Error)]
pub enum SqlbindError {
    /// An unmarked template reached the checked constructor.
    #[error("prefixed template required: expected a template starting with '{marker}'")]
    MarkerRequired { marker: String },

    /// Failed to parse a template body.
    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        offset: usize,
        line: usize,
        column: usize,
        message: String,
    },

    /// The template marker itself is unusable.
    #[error("Invalid marker '{0}': must be non-empty and must not contain braces")]
    InvalidMarker(String),

    /// A scope pattern failed validation.
    #[error("Invalid scope pattern '{pattern}': {reason}")]
    InvalidPattern {
        pattern: String,
        reason: &'static str,
    },

    /// A value of this kind cannot be written into SQL text.
    #[error("Invalid type: cannot inline {kind} value as a SQL literal")]
    UnsupportedLiteral { kind: &'static str },

    /// A placeholder expression had no value at evaluation time.
    #[error("Unbound placeholder '{expression}' at line {line}, column {column}")]
    Unbound {
        expression: String,
        line: usize,
        column: usize,
    },

    /// Formatting metadata that cannot be honoured at render time.
    #[error("Unsupported format spec '{spec}' on placeholder '{expression}'")]
    FormatSpec { expression: String, spec: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed TOML configuration.
    #[error("Configuration error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Query execution error reported by an executor.
    #[error("Execution error: {0}")]
    Execution(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SqlbindError {
    /// Create a parse error at the given byte offset of `source`.
    pub fn parse(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_column(source, offset);
        Self::Parse {
            offset,
            line,
            column,
            message: message.into(),
        }
    }

    /// Create an unbound-placeholder error.
    pub fn unbound(expression: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Unbound {
            expression: expression.into(),
            line,
            column,
        }
    }

    /// Create an invalid-pattern error.
    pub fn pattern(pattern: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason,
        }
    }
}

/// 1-based line and column (in chars) of a byte offset.
pub(crate) fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let prefix = &source[..offset];
    let line = prefix.matches('\n').count() + 1;
    let line_start = prefix.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = prefix[line_start..].chars().count() + 1;
    (line, column)
}

/// Result type alias for sqlbind operations.
pub type SqlbindResult<T> = Result<T, SqlbindError>;
