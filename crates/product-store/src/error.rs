use thiserror::Error;

use common::{BatchRef, Sku, Version};

/// Errors that can occur at the persistence boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A concurrent transaction committed a change to the same product
    /// between this transaction's load and its commit.
    #[error("concurrent update on product {sku}: expected version {expected}, found {actual}")]
    Conflict {
        sku: Sku,
        expected: Version,
        actual: Version,
    },

    /// A concurrent transaction created the product this transaction was
    /// about to create.
    #[error("product {sku} was created concurrently")]
    CreatedConcurrently { sku: Sku },

    /// No product exists for the sku.
    #[error("product not found for sku {sku}")]
    ProductNotFound { sku: Sku },

    /// No product owns a batch with this reference.
    #[error("no product owns batch {reference}")]
    BatchNotFound { reference: BatchRef },
}

impl StoreError {
    /// Returns true for commit-time concurrency conflicts.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict { .. } | StoreError::CreatedConcurrently { .. }
        )
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
