use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::sync::RwLock;

use crate::bus::{MessageBus, MessageHandler};
use crate::error::{BusError, Result};
use crate::message::BusMessage;

/// In-process message bus with synchronous fan-out.
///
/// Handlers run sequentially in subscription order and a handler error
/// propagates to the publisher. This is the bus internal command dispatch
/// relies on: the caller of `publish` observes the command handler's failure.
#[derive(Default)]
pub struct InMemoryMessageBus<M: BusMessage> {
    subscriptions: RwLock<HashMap<&'static str, Vec<Arc<dyn MessageHandler<M>>>>>,
}

impl<M: BusMessage> InMemoryMessageBus<M> {
    /// Creates a new bus with no subscriptions.
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the number of handlers subscribed to a message type name.
    pub async fn handler_count(&self, name: &str) -> usize {
        self.subscriptions
            .read()
            .await
            .get(name)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl<M: BusMessage> MessageBus<M> for InMemoryMessageBus<M> {
    async fn subscribe(&self, name: &'static str, handler: Arc<dyn MessageHandler<M>>) {
        tracing::info!(
            message = name,
            handler = handler.name(),
            bus = "in-memory",
            "subscribing handler"
        );

        self.subscriptions
            .write()
            .await
            .entry(name)
            .or_default()
            .push(handler);
    }

    async fn publish(&self, message: M) -> Result<()> {
        let name = message.name();
        tracing::info!(
            message = name,
            id = %message.id(),
            metadata = ?message.metadata(),
            bus = "in-memory",
            "publishing message"
        );
        metrics::counter!("bus_messages_published_total", "bus" => "in-memory").increment(1);

        let handlers = match self.subscriptions.read().await.get(name) {
            Some(handlers) => handlers.clone(),
            None => return Ok(()),
        };

        for handler in handlers {
            handler
                .handle(message.clone())
                .await
                .map_err(|source| BusError::Handler {
                    handler: handler.name(),
                    message: name,
                    source,
                })?;
        }

        Ok(())
    }

    async fn publish_many(&self, messages: Vec<M>) -> Result<()> {
        let results = join_all(messages.into_iter().map(|message| self.publish(message))).await;
        results.into_iter().collect()
    }
}
