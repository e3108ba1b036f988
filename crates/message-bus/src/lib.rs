//! Publish/subscribe message bus for the allocation service.
//!
//! This crate provides the messaging infrastructure:
//! - [`BusMessage`] and [`MessageHandler`] traits for the message vocabulary
//!   and its consumers
//! - [`MessageBus`] trait with two conforming implementations: the in-process
//!   synchronous [`InMemoryMessageBus`] and the durable, channel-backed
//!   [`ChannelMessageBus`]
//! - Composable delivery decorators and the named [`DeliveryPolicy`] presets

pub mod bus;
pub mod channel;
pub mod decorators;
pub mod error;
pub mod in_memory;
pub mod message;

#[cfg(test)]
pub(crate) mod testing;

pub use bus::{MessageBus, MessageHandler};
pub use channel::ChannelMessageBus;
pub use decorators::{DeliveryPolicy, InBackground, Logged, NoFail, Retried};
pub use error::{BusError, HandlerError, Result};
pub use in_memory::InMemoryMessageBus;
pub use message::{BusMessage, Metadata};
