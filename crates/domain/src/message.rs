//! The message envelope carried by both buses.

use common::MessageId;
use message_bus::{BusError, BusMessage, Metadata};

use crate::commands::{AddBatch, Allocate, ChangeBatchQuantity, Command};
use crate::events::{Allocated, Deallocated, Event, OutOfStock};

/// Message type names, used as pub/sub channel keys on both buses.
pub mod names {
    pub const ADD_BATCH: &str = "AddBatch";
    pub const ALLOCATE: &str = "Allocate";
    pub const CHANGE_BATCH_QUANTITY: &str = "ChangeBatchQuantity";

    pub const ALLOCATED: &str = "Allocated";
    pub const DEALLOCATED: &str = "Deallocated";
    pub const OUT_OF_STOCK: &str = "OutOfStock";
}

/// A command or event wrapped for transport.
///
/// Carries a generated [`MessageId`] and a metadata map used to tag delivery
/// provenance. Equality compares the payload only: the id and metadata are a
/// side channel, never part of message identity.
#[derive(Debug, Clone)]
pub struct Message {
    id: MessageId,
    body: Body,
    metadata: Metadata,
}

/// The payload of a message: a command or an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Command(Command),
    Event(Event),
}

impl Message {
    /// Wraps a command for transport.
    pub fn command(command: impl Into<Command>) -> Self {
        Self {
            id: MessageId::new(),
            body: Body::Command(command.into()),
            metadata: Metadata::new(),
        }
    }

    /// Wraps an event for transport.
    pub fn event(event: impl Into<Event>) -> Self {
        Self {
            id: MessageId::new(),
            body: Body::Event(event.into()),
            metadata: Metadata::new(),
        }
    }

    /// Returns the message body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Returns the command payload, if this message is a command.
    pub fn as_command(&self) -> Option<&Command> {
        match &self.body {
            Body::Command(command) => Some(command),
            Body::Event(_) => None,
        }
    }

    /// Returns the event payload, if this message is an event.
    pub fn as_event(&self) -> Option<&Event> {
        match &self.body {
            Body::Event(event) => Some(event),
            Body::Command(_) => None,
        }
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.body == other.body
    }
}

impl Eq for Message {}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Message::command(command)
    }
}

impl From<Event> for Message {
    fn from(event: Event) -> Self {
        Message::event(event)
    }
}

impl BusMessage for Message {
    fn name(&self) -> &'static str {
        match &self.body {
            Body::Command(command) => command.name(),
            Body::Event(event) => event.name(),
        }
    }

    fn id(&self) -> MessageId {
        self.id
    }

    fn payload(&self) -> Result<serde_json::Value, BusError> {
        let payload = match &self.body {
            Body::Command(command) => command.payload(),
            Body::Event(event) => event.payload(),
        };

        payload.map_err(|source| BusError::Payload {
            name: self.name().to_string(),
            source,
        })
    }

    fn from_parts(name: &str, payload: serde_json::Value) -> Result<Self, BusError> {
        let decode_error = |source| BusError::Payload {
            name: name.to_string(),
            source,
        };

        let body = match name {
            names::ADD_BATCH => Body::Command(Command::AddBatch(
                serde_json::from_value::<AddBatch>(payload).map_err(decode_error)?,
            )),
            names::ALLOCATE => Body::Command(Command::Allocate(
                serde_json::from_value::<Allocate>(payload).map_err(decode_error)?,
            )),
            names::CHANGE_BATCH_QUANTITY => Body::Command(Command::ChangeBatchQuantity(
                serde_json::from_value::<ChangeBatchQuantity>(payload).map_err(decode_error)?,
            )),
            names::ALLOCATED => Body::Event(Event::Allocated(
                serde_json::from_value::<Allocated>(payload).map_err(decode_error)?,
            )),
            names::DEALLOCATED => Body::Event(Event::Deallocated(
                serde_json::from_value::<Deallocated>(payload).map_err(decode_error)?,
            )),
            names::OUT_OF_STOCK => Body::Event(Event::OutOfStock(
                serde_json::from_value::<OutOfStock>(payload).map_err(decode_error)?,
            )),
            other => {
                return Err(BusError::UnknownMessage {
                    name: other.to_string(),
                });
            }
        };

        Ok(Self {
            id: MessageId::new(),
            body,
            metadata: Metadata::new(),
        })
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
