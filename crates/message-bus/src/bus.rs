use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{HandlerError, Result};
use crate::message::BusMessage;

/// A consumer of messages of type `M`.
///
/// Commands have exactly one handler; events have zero or more. Handlers are
/// wrapped in delivery decorators before they reach the bus, so `handle`
/// reports failures plainly and lets the decorator chain decide what
/// propagates.
#[async_trait]
pub trait MessageHandler<M: BusMessage>: Send + Sync {
    /// Short handler name used in delivery logs.
    ///
    /// Decorators forward the name of the handler they wrap.
    fn name(&self) -> &'static str;

    /// Handles one message.
    async fn handle(&self, message: M) -> std::result::Result<(), HandlerError>;
}

/// Publish/subscribe dispatcher.
///
/// A publish fans out, in subscription order, to every handler registered for
/// the exact message type name. The service wiring depends only on this trait;
/// the dispatch and translation logic never knows whether it is talking to the
/// in-process bus or the durable one.
#[async_trait]
pub trait MessageBus<M: BusMessage>: Send + Sync {
    /// Registers a handler for a message type name.
    async fn subscribe(&self, name: &'static str, handler: Arc<dyn MessageHandler<M>>);

    /// Publishes one message to every handler subscribed to its type name.
    ///
    /// Whether handler failures surface here is implementation- and
    /// decorator-dependent: the in-process bus propagates them, the durable
    /// bus returns once dispatch is initiated.
    async fn publish(&self, message: M) -> Result<()>;

    /// Publishes a batch of messages.
    async fn publish_many(&self, messages: Vec<M>) -> Result<()>;
}
