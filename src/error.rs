use thiserror::Error;

use crate::{lex, parser};

/// Every stage of the pipeline reports failures through this type. The HTTP
///  layer decides how to present them; see [Error::status_code].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed token stream or grammar violation.
    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// A well-formed expression referencing unknown properties or functions,
    ///  calling a function with the wrong arguments, or repeating an alias.
    #[error("invalid expression: {detail}")]
    Validation { detail: String },

    /// Valid input with no translation for the requested dialect.
    #[error("unsupported operation: {detail}")]
    UnsupportedOperation { detail: String },

    /// Dialect names come from configuration, so this is fatal rather than a
    ///  client error.
    #[error("unknown SQL dialect '{0}'")]
    UnknownDialect(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Validation,
    UnsupportedOperation,
    Configuration,
}

/// How [Error::UnsupportedOperation] maps to a status code. Some deployments
///  treat a missing translation as the client's problem, others as ours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnsupportedPolicy {
    #[default]
    BadRequest,
    NotImplemented,
}

impl Error {
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation {
            detail: detail.into(),
        }
    }

    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            Self::UnknownDialect(_) => ErrorKind::Configuration,
        }
    }

    pub fn status_code(&self, policy: UnsupportedPolicy) -> u16 {
        match (self.kind(), policy) {
            (ErrorKind::Syntax | ErrorKind::Validation, _) => 400,
            (ErrorKind::UnsupportedOperation, UnsupportedPolicy::BadRequest) => 400,
            (ErrorKind::UnsupportedOperation, UnsupportedPolicy::NotImplemented) => 501,
            (ErrorKind::Configuration, _) => 500,
        }
    }
}

impl From<lex::Error> for Error {
    fn from(value: lex::Error) -> Self {
        Self::Syntax {
            position: value.position(),
            message: value.to_string(),
        }
    }
}

impl From<parser::Error> for Error {
    fn from(value: parser::Error) -> Self {
        match value {
            parser::Error::Lexical(e) => e.into(),
            other => Self::Syntax {
                position: other.position(),
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
