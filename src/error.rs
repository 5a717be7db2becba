//! Error types.
use std::borrow::Cow;
use std::io::Error as IoError;
use thiserror::Error;

/// Convenient return type for functions.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Generic I/O error.
    #[error("i/o: {0}")]
    Io(#[from] IoError),

    /// The native driver reported a protocol-level failure.
    #[error("driver: {0}")]
    Driver(Cow<'static, str>),

    /// Custom error for driver implementers.
    #[error("custom: {0}")]
    Custom(Box<dyn std::error::Error + Send + Sync>),

    #[error("{context}: {error}")]
    WithContext {
        context: Cow<'static, str>,
        #[source]
        error: Box<Self>,
    },
}

impl Error {
    /// A protocol-level failure reported by the native driver.
    pub fn driver(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Driver(msg.into())
    }

    pub(crate) fn with_context(self, context: impl Into<Cow<'static, str>>) -> Self {
        Self::WithContext {
            context: context.into(),
            error: Box::new(self),
        }
    }
}
