//! Command handlers: one per command type.
//!
//! Each handler runs one unit-of-work lifecycle per command: load, mutate,
//! save, commit, publish the collected events on the internal bus. Any error
//! rolls the unit of work back and propagates to the caller of the dispatch;
//! the internal delivery policy deliberately lets it through. Rolling back an
//! already-committed unit of work is a no-op, so errors raised after commit
//! (out of stock) reach the caller with the commit intact.

use std::sync::Arc;

use async_trait::async_trait;

use domain::{AddBatch, Allocate, Batch, ChangeBatchQuantity, Command, Message, OrderLine, Product};
use message_bus::{HandlerError, MessageBus, MessageHandler};
use product_store::{UnitOfWork, UnitOfWorkFactory};

use crate::error::ServiceError;

/// Commits the unit of work, then hands its collected events to the
/// internal bus.
async fn commit_and_publish(
    uow: &mut Box<dyn UnitOfWork>,
    internal_bus: &Arc<dyn MessageBus<Message>>,
) -> Result<(), ServiceError> {
    uow.commit().await?;

    let events = uow.collect_new_events();
    if events.is_empty() {
        return Ok(());
    }

    internal_bus
        .publish_many(events.into_iter().map(Message::event).collect())
        .await?;

    Ok(())
}

async fn rollback_quietly(uow: &mut Box<dyn UnitOfWork>) {
    if let Err(error) = uow.rollback().await {
        tracing::error!(error = %error, "rollback failed");
    }
}

/// Handles `AddBatch`: creates the product on first sight of a sku,
/// otherwise appends the batch to the existing product.
pub struct AddBatchHandler {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    internal_bus: Arc<dyn MessageBus<Message>>,
}

impl AddBatchHandler {
    pub fn new(
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        internal_bus: Arc<dyn MessageBus<Message>>,
    ) -> Self {
        Self {
            uow_factory,
            internal_bus,
        }
    }

    async fn execute(
        &self,
        uow: &mut Box<dyn UnitOfWork>,
        command: &AddBatch,
    ) -> Result<(), ServiceError> {
        let batch = Batch::new(
            command.reference.clone(),
            command.sku.clone(),
            command.purchased_quantity,
            command.eta,
        );

        let product = match uow.find(&command.sku).await? {
            Some(mut product) => {
                product.add_batch(batch)?;
                product
            }
            None => Product::new(command.sku.clone(), vec![batch]),
        };

        uow.save(product).await?;
        commit_and_publish(uow, &self.internal_bus).await?;

        metrics::counter!("batches_added_total").increment(1);
        Ok(())
    }
}

#[async_trait]
impl MessageHandler<Message> for AddBatchHandler {
    fn name(&self) -> &'static str {
        "AddBatchHandler"
    }

    #[tracing::instrument(skip(self, message))]
    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        let command = match message.as_command() {
            Some(Command::AddBatch(command)) => command.clone(),
            _ => {
                return Err(ServiceError::UnexpectedMessage {
                    handler: self.name(),
                    message: format!("{message:?}"),
                }
                .into());
            }
        };

        let mut uow = self.uow_factory.begin().await.map_err(ServiceError::from)?;

        match self.execute(&mut uow, &command).await {
            Ok(()) => Ok(()),
            Err(error) => {
                rollback_quietly(&mut uow).await;
                Err(error.into())
            }
        }
    }
}

/// Handles `Allocate`: the aggregate picks the earliest available batch.
pub struct AllocateHandler {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    internal_bus: Arc<dyn MessageBus<Message>>,
}

impl AllocateHandler {
    pub fn new(
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        internal_bus: Arc<dyn MessageBus<Message>>,
    ) -> Self {
        Self {
            uow_factory,
            internal_bus,
        }
    }

    async fn execute(
        &self,
        uow: &mut Box<dyn UnitOfWork>,
        command: &Allocate,
    ) -> Result<(), ServiceError> {
        let mut product = uow.get(&command.sku).await?;

        let line = OrderLine::new(
            command.order_id.clone(),
            command.sku.clone(),
            command.quantity,
        );
        let allocated_to = product.allocate(line)?;

        uow.save(product).await?;

        // Out of stock is a committed business outcome: the event is
        // published first, then the caller is told.
        commit_and_publish(uow, &self.internal_bus).await?;

        match allocated_to {
            Some(reference) => {
                metrics::counter!("allocations_total").increment(1);
                tracing::info!(
                    order_id = %command.order_id,
                    sku = %command.sku,
                    batch = %reference,
                    "order line allocated"
                );
                Ok(())
            }
            None => {
                metrics::counter!("out_of_stock_total").increment(1);
                Err(ServiceError::OutOfStock {
                    sku: command.sku.clone(),
                })
            }
        }
    }
}

#[async_trait]
impl MessageHandler<Message> for AllocateHandler {
    fn name(&self) -> &'static str {
        "AllocateHandler"
    }

    #[tracing::instrument(skip(self, message))]
    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        let command = match message.as_command() {
            Some(Command::Allocate(command)) => command.clone(),
            _ => {
                return Err(ServiceError::UnexpectedMessage {
                    handler: self.name(),
                    message: format!("{message:?}"),
                }
                .into());
            }
        };

        let mut uow = self.uow_factory.begin().await.map_err(ServiceError::from)?;

        match self.execute(&mut uow, &command).await {
            Ok(()) => Ok(()),
            Err(error) => {
                rollback_quietly(&mut uow).await;
                Err(error.into())
            }
        }
    }
}

/// Handles `ChangeBatchQuantity`: rebalances the batch, displacing the most
/// recently allocated lines until availability converges.
pub struct ChangeBatchQuantityHandler {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    internal_bus: Arc<dyn MessageBus<Message>>,
}

impl ChangeBatchQuantityHandler {
    pub fn new(
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        internal_bus: Arc<dyn MessageBus<Message>>,
    ) -> Self {
        Self {
            uow_factory,
            internal_bus,
        }
    }

    async fn execute(
        &self,
        uow: &mut Box<dyn UnitOfWork>,
        command: &ChangeBatchQuantity,
    ) -> Result<(), ServiceError> {
        let mut product = uow.get_by_batch_reference(&command.batch_reference).await?;

        product.change_batch_quantity(&command.batch_reference, command.quantity)?;

        uow.save(product).await?;
        commit_and_publish(uow, &self.internal_bus).await?;

        metrics::counter!("batch_quantity_changes_total").increment(1);
        Ok(())
    }
}

#[async_trait]
impl MessageHandler<Message> for ChangeBatchQuantityHandler {
    fn name(&self) -> &'static str {
        "ChangeBatchQuantityHandler"
    }

    #[tracing::instrument(skip(self, message))]
    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        let command = match message.as_command() {
            Some(Command::ChangeBatchQuantity(command)) => command.clone(),
            _ => {
                return Err(ServiceError::UnexpectedMessage {
                    handler: self.name(),
                    message: format!("{message:?}"),
                }
                .into());
            }
        };

        let mut uow = self.uow_factory.begin().await.map_err(ServiceError::from)?;

        match self.execute(&mut uow, &command).await {
            Ok(()) => Ok(()),
            Err(error) => {
                rollback_quietly(&mut uow).await;
                Err(error.into())
            }
        }
    }
}
