//! Persistence errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<PersistenceError> for fixline_core::Error {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(what) => fixline_core::Error::NotFound(what),
            other => fixline_core::Error::Persistence(other.to_string()),
        }
    }
}
