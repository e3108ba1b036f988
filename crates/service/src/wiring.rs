//! Composition root: subscribes every handler with its delivery policy.

use std::sync::Arc;

use domain::{Message, names};
use message_bus::{
    ChannelMessageBus, DeliveryPolicy, InMemoryMessageBus, MessageBus, MessageHandler,
};
use product_store::{InMemoryProductStore, UnitOfWorkFactory};
use projections::{
    AddAllocationToReadModel, AllocationsReadModel, InMemoryAllocationsView,
    RemoveAllocationFromReadModel,
};

use crate::command_handlers::{AddBatchHandler, AllocateHandler, ChangeBatchQuantityHandler};
use crate::config::Config;
use crate::event_handlers::{PromoteToExternal, SendOutOfStockEmail, TranslateEventToCommand};
use crate::notifications::{EmailSender, LogEmailSender};

/// The wired application: both buses, the persistence boundary, and the
/// collaborator ports.
///
/// Construct with concrete dependencies, then call [`App::start`] once to
/// subscribe every handler. The dispatch logic downstream only ever sees the
/// abstract bus and port traits.
pub struct App {
    pub internal_bus: Arc<dyn MessageBus<Message>>,
    pub external_bus: Arc<dyn MessageBus<Message>>,
    pub uow_factory: Arc<dyn UnitOfWorkFactory>,
    pub email_sender: Arc<dyn EmailSender>,
    pub allocations: Arc<dyn AllocationsReadModel>,
    pub out_of_stock_recipient: String,
}

impl App {
    /// Builds an app over the in-memory store, view, and log email sender.
    ///
    /// Returns the concrete handles alongside the app so tests and the
    /// worker binary can inspect state the ports do not expose.
    pub fn in_memory(config: &Config) -> (Self, InMemoryHandles) {
        let internal_bus = Arc::new(InMemoryMessageBus::new());
        let external_bus = Arc::new(ChannelMessageBus::new());
        let store = InMemoryProductStore::new();
        let view = Arc::new(InMemoryAllocationsView::new());
        let email_sender = Arc::new(LogEmailSender::new());

        let app = Self {
            internal_bus: internal_bus.clone(),
            external_bus: external_bus.clone(),
            uow_factory: Arc::new(store.clone()),
            email_sender: email_sender.clone(),
            allocations: view.clone(),
            out_of_stock_recipient: config.out_of_stock_recipient.clone(),
        };

        let handles = InMemoryHandles {
            store,
            view,
            email_sender,
            external_bus,
        };

        (app, handles)
    }

    /// Subscribes every handler on both buses.
    pub async fn start(&self) {
        self.subscribe_external_commands().await;
        self.subscribe_internal_commands().await;
        self.subscribe_critical_events().await;
        self.subscribe_background_events().await;
    }

    fn add_batch_handler(&self) -> Arc<dyn MessageHandler<Message>> {
        Arc::new(AddBatchHandler::new(
            self.uow_factory.clone(),
            self.internal_bus.clone(),
        ))
    }

    fn allocate_handler(&self) -> Arc<dyn MessageHandler<Message>> {
        Arc::new(AllocateHandler::new(
            self.uow_factory.clone(),
            self.internal_bus.clone(),
        ))
    }

    fn change_batch_quantity_handler(&self) -> Arc<dyn MessageHandler<Message>> {
        Arc::new(ChangeBatchQuantityHandler::new(
            self.uow_factory.clone(),
            self.internal_bus.clone(),
        ))
    }

    /// Commands from outside the trust boundary: the caller has already
    /// disconnected, so execution is best-effort and fire-and-forget.
    async fn subscribe_external_commands(&self) {
        let subscriptions: [(&'static str, Arc<dyn MessageHandler<Message>>); 3] = [
            (names::ADD_BATCH, self.add_batch_handler()),
            (names::ALLOCATE, self.allocate_handler()),
            (
                names::CHANGE_BATCH_QUANTITY,
                self.change_batch_quantity_handler(),
            ),
        ];

        for (name, handler) in subscriptions {
            self.external_bus
                .subscribe(name, DeliveryPolicy::ExternalCommand.decorate(handler))
                .await;
        }
    }

    /// Commands dispatched in process (e.g. mounted behind web routes):
    /// errors must propagate synchronously to the caller.
    async fn subscribe_internal_commands(&self) {
        let subscriptions: [(&'static str, Arc<dyn MessageHandler<Message>>); 2] = [
            (names::ADD_BATCH, self.add_batch_handler()),
            (names::ALLOCATE, self.allocate_handler()),
        ];

        for (name, handler) in subscriptions {
            self.internal_bus
                .subscribe(name, DeliveryPolicy::InternalCommand.decorate(handler))
                .await;
        }
    }

    /// Events that must take effect before the triggering unit of work is
    /// considered done: the read-model updates feeding the synchronous
    /// reallocation loop, and the translation that drives it.
    async fn subscribe_critical_events(&self) {
        let subscriptions: [(&'static str, Arc<dyn MessageHandler<Message>>); 3] = [
            (
                names::ALLOCATED,
                Arc::new(AddAllocationToReadModel::new(self.allocations.clone())),
            ),
            (
                names::DEALLOCATED,
                Arc::new(RemoveAllocationFromReadModel::new(self.allocations.clone())),
            ),
            (
                names::DEALLOCATED,
                Arc::new(TranslateEventToCommand::deallocated_to_allocate(
                    self.internal_bus.clone(),
                )),
            ),
        ];

        for (name, handler) in subscriptions {
            self.internal_bus
                .subscribe(name, DeliveryPolicy::CriticalEvent.decorate(handler))
                .await;
        }
    }

    /// Pure side effects, fully decoupled from the publishing flow.
    async fn subscribe_background_events(&self) {
        let subscriptions: [(&'static str, Arc<dyn MessageHandler<Message>>); 2] = [
            (
                names::OUT_OF_STOCK,
                Arc::new(SendOutOfStockEmail::new(
                    self.email_sender.clone(),
                    self.out_of_stock_recipient.clone(),
                )),
            ),
            (
                names::ALLOCATED,
                Arc::new(PromoteToExternal::new(self.external_bus.clone())),
            ),
        ];

        for (name, handler) in subscriptions {
            self.internal_bus
                .subscribe(name, DeliveryPolicy::BackgroundEvent.decorate(handler))
                .await;
        }
    }
}

/// Concrete handles behind the app's ports, for tests and the binary.
pub struct InMemoryHandles {
    pub store: InMemoryProductStore,
    pub view: Arc<InMemoryAllocationsView>,
    pub email_sender: Arc<LogEmailSender>,
    pub external_bus: Arc<ChannelMessageBus<Message>>,
}
