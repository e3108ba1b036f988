//! Side-effect event handlers and the event→command translation.

use std::sync::Arc;

use async_trait::async_trait;

use domain::{Allocate, Command, Event, Message};
use message_bus::{BusMessage, HandlerError, MessageBus, MessageHandler};

use crate::error::ServiceError;
use crate::notifications::EmailSender;

/// Metadata key marking a message already promoted to the external bus.
pub const PROMOTED_TO_EXTERNAL: &str = "promoted_to_external";

/// Emails the configured recipient when a sku runs out of stock.
pub struct SendOutOfStockEmail {
    email_sender: Arc<dyn EmailSender>,
    recipient: String,
}

impl SendOutOfStockEmail {
    pub fn new(email_sender: Arc<dyn EmailSender>, recipient: impl Into<String>) -> Self {
        Self {
            email_sender,
            recipient: recipient.into(),
        }
    }
}

#[async_trait]
impl MessageHandler<Message> for SendOutOfStockEmail {
    fn name(&self) -> &'static str {
        "SendOutOfStockEmail"
    }

    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        let Some(Event::OutOfStock(event)) = message.as_event() else {
            return Err(ServiceError::UnexpectedMessage {
                handler: self.name(),
                message: format!("{message:?}"),
            }
            .into());
        };

        self.email_sender
            .send_email(&self.recipient, &format!("Out of stock: {}", event.sku))
            .await?;

        Ok(())
    }
}

/// Promotes an internal event to the outside world on the external bus.
///
/// Tags the message's metadata before publishing so the promotion is visible
/// in delivery logs. Depends only on the abstract bus: it cannot tell which
/// transport it is promoting onto.
pub struct PromoteToExternal {
    external_bus: Arc<dyn MessageBus<Message>>,
}

impl PromoteToExternal {
    pub fn new(external_bus: Arc<dyn MessageBus<Message>>) -> Self {
        Self { external_bus }
    }
}

#[async_trait]
impl MessageHandler<Message> for PromoteToExternal {
    fn name(&self) -> &'static str {
        "PromoteToExternal"
    }

    async fn handle(&self, mut message: Message) -> Result<(), HandlerError> {
        message
            .metadata_mut()
            .set(PROMOTED_TO_EXTERNAL, serde_json::json!(true));

        self.external_bus.publish(message).await?;
        Ok(())
    }
}

/// Re-wraps an event as a command and publishes it on the internal bus.
///
/// The standing instance translates `Deallocated` into `Allocate`, re-homing
/// an order line displaced by a quantity reduction onto the next-best batch.
pub struct TranslateEventToCommand {
    label: &'static str,
    internal_bus: Arc<dyn MessageBus<Message>>,
    translate: Box<dyn Fn(&Event) -> Option<Command> + Send + Sync>,
}

impl TranslateEventToCommand {
    pub fn new(
        label: &'static str,
        internal_bus: Arc<dyn MessageBus<Message>>,
        translate: impl Fn(&Event) -> Option<Command> + Send + Sync + 'static,
    ) -> Self {
        Self {
            label,
            internal_bus,
            translate: Box::new(translate),
        }
    }

    /// The reallocation loop: `Deallocated{order_id, sku, quantity}` becomes
    /// `Allocate{order_id, sku, quantity}`.
    pub fn deallocated_to_allocate(internal_bus: Arc<dyn MessageBus<Message>>) -> Self {
        Self::new("TranslateDeallocatedToAllocate", internal_bus, |event| {
            let Event::Deallocated(deallocated) = event else {
                return None;
            };

            Some(Command::Allocate(Allocate {
                order_id: deallocated.order_id.clone(),
                sku: deallocated.sku.clone(),
                quantity: deallocated.quantity,
            }))
        })
    }
}

#[async_trait]
impl MessageHandler<Message> for TranslateEventToCommand {
    fn name(&self) -> &'static str {
        self.label
    }

    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        let command = message.as_event().and_then(|event| (self.translate)(event));

        let Some(command) = command else {
            return Err(ServiceError::UnexpectedMessage {
                handler: self.label,
                message: format!("{message:?}"),
            }
            .into());
        };

        metrics::counter!("events_translated_total").increment(1);
        self.internal_bus.publish(Message::command(command)).await?;
        Ok(())
    }
}
