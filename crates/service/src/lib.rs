//! Service layer for the allocation system.
//!
//! Commands become aggregate mutations inside a unit of work; committed
//! events fan out on the internal bus to the read model, notifications, the
//! external bus, and the event→command translation that closes the
//! reallocation loop.

pub mod command_handlers;
pub mod config;
pub mod error;
pub mod event_handlers;
pub mod notifications;
pub mod wiring;

pub use command_handlers::{AddBatchHandler, AllocateHandler, ChangeBatchQuantityHandler};
pub use config::Config;
pub use error::{ErrorClass, ServiceError};
pub use event_handlers::{
    PROMOTED_TO_EXTERNAL, PromoteToExternal, SendOutOfStockEmail, TranslateEventToCommand,
};
pub use notifications::{EmailSender, LogEmailSender, NotificationError, SentEmail};
pub use wiring::{App, InMemoryHandles};
