use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::{OrderId, Sku};

use crate::error::Result;
use crate::read_model::{AllocationRow, AllocationsReadModel};

/// In-memory allocations view.
#[derive(Clone, Default)]
pub struct InMemoryAllocationsView {
    rows: Arc<RwLock<Vec<AllocationRow>>>,
}

impl InMemoryAllocationsView {
    /// Creates a new empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded allocations.
    pub async fn row_count(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl AllocationsReadModel for InMemoryAllocationsView {
    async fn add(&self, row: AllocationRow) -> Result<()> {
        self.rows.write().await.push(row);
        Ok(())
    }

    async fn remove(&self, order_id: &OrderId, sku: &Sku) -> Result<()> {
        self.rows
            .write()
            .await
            .retain(|row| !(&row.order_id == order_id && &row.sku == sku));
        Ok(())
    }

    async fn allocations_for_order(&self, order_id: &OrderId) -> Result<Vec<AllocationRow>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|row| &row.order_id == order_id)
            .cloned()
            .collect())
    }
}
