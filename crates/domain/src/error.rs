//! Domain error types.

use thiserror::Error;

use common::{BatchRef, OrderId, Sku};

/// Classification of a domain error.
///
/// The edge maps failures onto responses by class: a missing referent versus
/// a well-formed request that violates a business rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced entity, sku, or batch does not exist.
    NotFound,
    /// The request is well-formed but violates a business rule.
    UnprocessableInput,
}

/// Errors produced by batch and product operations.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// The order line names a sku this batch does not hold.
    #[error("cannot allocate order {order_id} to batch {reference}: unknown sku {sku}")]
    UnknownSku {
        reference: BatchRef,
        order_id: OrderId,
        sku: Sku,
    },

    /// This exact order line is already allocated to the batch.
    #[error("order {order_id} is already allocated to batch {reference}")]
    AlreadyAllocated {
        reference: BatchRef,
        order_id: OrderId,
    },

    /// The batch does not have enough available quantity for the line.
    #[error(
        "not enough stock in batch {reference} for order {order_id}: \
         requested {requested}, available {available}"
    )]
    InsufficientStock {
        reference: BatchRef,
        order_id: OrderId,
        requested: u32,
        available: i64,
    },

    /// The order line is not currently allocated to the batch.
    #[error("order {order_id} is not allocated to batch {reference}")]
    LineNotAllocated {
        reference: BatchRef,
        order_id: OrderId,
    },

    /// The sku on the incoming line or batch does not match the product.
    #[error("sku {actual} does not match product {expected}")]
    SkuMismatch { expected: Sku, actual: Sku },

    /// No batch with this reference exists on the product.
    #[error("batch {reference} not found on product {sku}")]
    BatchNotFound { sku: Sku, reference: BatchRef },
}

impl DomainError {
    /// Returns the error class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::UnknownSku { .. }
            | DomainError::LineNotAllocated { .. }
            | DomainError::BatchNotFound { .. } => ErrorKind::NotFound,
            DomainError::AlreadyAllocated { .. }
            | DomainError::InsufficientStock { .. }
            | DomainError::SkuMismatch { .. } => ErrorKind::UnprocessableInput,
        }
    }
}
