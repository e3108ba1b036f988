use async_trait::async_trait;

use common::{BatchRef, OrderId, Sku};

use crate::error::Result;

/// One allocation fact in the denormalized view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRow {
    pub order_id: OrderId,
    pub sku: Sku,
    pub batch_reference: BatchRef,
}

/// Read-model port for allocation lookups.
///
/// Updated eventually by event handlers; a query may briefly trail the
/// aggregate state.
#[async_trait]
pub trait AllocationsReadModel: Send + Sync {
    /// Records an allocation.
    async fn add(&self, row: AllocationRow) -> Result<()>;

    /// Removes the allocation of an order line for a sku.
    async fn remove(&self, order_id: &OrderId, sku: &Sku) -> Result<()>;

    /// Returns every allocation recorded for an order.
    async fn allocations_for_order(&self, order_id: &OrderId) -> Result<Vec<AllocationRow>>;
}
