// Copyright © 2024 Pathway

use std::any::Any;
use std::error;
use std::result;

use crate::env::Error as EnvError;

#[allow(clippy::module_name_repetitions)]
pub type DynError = Box<dyn error::Error + Send + Sync>;
pub type DynResult<T> = result::Result<T, DynError>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{name} must not be negative, got {hours}h")]
    NegativeDuration { name: &'static str, hours: f64 },

    #[error("{name} must be a finite number of hours, got {hours}")]
    NonFiniteDuration { name: &'static str, hours: f64 },

    #[error("icon radius of {variable} must be at least one pixel")]
    ZeroCellSize { variable: &'static str },

    #[error("{name} must be finite, got {value}")]
    NonFiniteBound { name: String, value: f64 },

    #[error("off-screen margin must be a non-negative number of pixels, got {0}")]
    InvalidMargin(f64),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("worker panic: {0}")]
    WorkerPanic(String),

    #[error(transparent)]
    EnvError(#[from] EnvError),

    #[error(transparent)]
    Other(DynError),
}

impl Error {
    pub fn from_panic_payload(panic_payload: Box<dyn Any + Send + 'static>) -> Self {
        let message = match panic_payload.downcast::<&'static str>() {
            Ok(message) => message.to_string(),
            Err(panic_payload) => match panic_payload.downcast::<String>() {
                Ok(message) => *message,
                Err(panic_payload) => format!("{panic_payload:?}"),
            },
        };
        Self::WorkerPanic(message)
    }
}

impl From<DynError> for Error {
    fn from(value: DynError) -> Self {
        match value.downcast::<Self>() {
            Ok(this) => *this,
            Err(other) => Self::Other(other),
        }
    }
}

pub type Result<T, E = Error> = result::Result<T, E>;
