//! Event handlers that maintain the allocations view.

use std::sync::Arc;

use async_trait::async_trait;

use domain::{Event, Message};
use message_bus::{BusMessage, HandlerError, MessageHandler};

use crate::error::ProjectionError;
use crate::read_model::{AllocationRow, AllocationsReadModel};

/// Records an allocation row for every `Allocated` event.
pub struct AddAllocationToReadModel {
    view: Arc<dyn AllocationsReadModel>,
}

impl AddAllocationToReadModel {
    pub fn new(view: Arc<dyn AllocationsReadModel>) -> Self {
        Self { view }
    }
}

#[async_trait]
impl MessageHandler<Message> for AddAllocationToReadModel {
    fn name(&self) -> &'static str {
        "AddAllocationToReadModel"
    }

    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        match message.as_event() {
            Some(Event::Allocated(event)) => {
                self.view
                    .add(AllocationRow {
                        order_id: event.order_id.clone(),
                        sku: event.sku.clone(),
                        batch_reference: event.batch_reference.clone(),
                    })
                    .await?;
                metrics::counter!("read_model_allocations_added_total").increment(1);
                tracing::debug!(
                    order_id = %event.order_id,
                    batch = %event.batch_reference,
                    "allocation recorded in read model"
                );
                Ok(())
            }
            _ => Err(ProjectionError::UnexpectedEvent {
                view: "allocations",
                event: message.name(),
            }
            .into()),
        }
    }
}

/// Removes the allocation row for every `Deallocated` event.
pub struct RemoveAllocationFromReadModel {
    view: Arc<dyn AllocationsReadModel>,
}

impl RemoveAllocationFromReadModel {
    pub fn new(view: Arc<dyn AllocationsReadModel>) -> Self {
        Self { view }
    }
}

#[async_trait]
impl MessageHandler<Message> for RemoveAllocationFromReadModel {
    fn name(&self) -> &'static str {
        "RemoveAllocationFromReadModel"
    }

    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        match message.as_event() {
            Some(Event::Deallocated(event)) => {
                self.view.remove(&event.order_id, &event.sku).await?;
                metrics::counter!("read_model_allocations_removed_total").increment(1);
                tracing::debug!(
                    order_id = %event.order_id,
                    sku = %event.sku,
                    "allocation removed from read model"
                );
                Ok(())
            }
            _ => Err(ProjectionError::UnexpectedEvent {
                view: "allocations",
                event: message.name(),
            }
            .into()),
        }
    }
}
