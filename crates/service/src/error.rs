//! Service-layer error taxonomy.

use thiserror::Error;

use common::Sku;
use domain::{DomainError, ErrorKind};
use message_bus::BusError;
use product_store::StoreError;

/// Response class the edge maps an error onto: NotFound → 404-class,
/// UnprocessableInput and Conflict → 400-class, Internal → 500-class with
/// details suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    UnprocessableInput,
    Conflict,
    Internal,
}

/// Errors surfaced by command handlers.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A batch or product operation rejected the request.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// No batch could satisfy the order line.
    ///
    /// Raised after the unit of work committed and the `OutOfStock` event
    /// was published: the outcome is recorded, the caller still gets an
    /// error.
    #[error("out of stock for sku {sku}")]
    OutOfStock { sku: Sku },

    /// The persistence boundary failed (including commit-time conflicts).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Publishing collected events failed.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// A handler received a message it is not wired for.
    #[error("handler {handler} cannot handle message {message}")]
    UnexpectedMessage {
        handler: &'static str,
        message: String,
    },
}

impl ServiceError {
    /// Returns the response class for this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            ServiceError::Domain(error) => match error.kind() {
                ErrorKind::NotFound => ErrorClass::NotFound,
                ErrorKind::UnprocessableInput => ErrorClass::UnprocessableInput,
            },
            ServiceError::OutOfStock { .. } => ErrorClass::UnprocessableInput,
            ServiceError::Store(error) if error.is_conflict() => ErrorClass::Conflict,
            ServiceError::Store(_) => ErrorClass::NotFound,
            ServiceError::Bus(_) | ServiceError::UnexpectedMessage { .. } => ErrorClass::Internal,
        }
    }
}
