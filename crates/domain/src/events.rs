//! Domain events: facts announced after an allocation decision.

use serde::{Deserialize, Serialize};

use common::{BatchRef, OrderId, Sku};

use crate::message::names;

/// An order line was allocated to a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocated {
    pub order_id: OrderId,
    pub sku: Sku,
    pub quantity: u32,
    pub batch_reference: BatchRef,
}

/// An order line was displaced from its batch and needs re-homing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deallocated {
    pub order_id: OrderId,
    pub sku: Sku,
    pub quantity: u32,
}

/// No batch could satisfy an order line for this sku.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfStock {
    pub sku: Sku,
}

/// A message announcing a fact that already occurred; handled by zero or
/// more handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Allocated(Allocated),
    Deallocated(Deallocated),
    OutOfStock(OutOfStock),
}

impl Event {
    /// Returns the event type name.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Allocated(_) => names::ALLOCATED,
            Event::Deallocated(_) => names::DEALLOCATED,
            Event::OutOfStock(_) => names::OUT_OF_STOCK,
        }
    }

    /// Serializes the event's property bag.
    pub fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Event::Allocated(event) => serde_json::to_value(event),
            Event::Deallocated(event) => serde_json::to_value(event),
            Event::OutOfStock(event) => serde_json::to_value(event),
        }
    }
}

impl From<Allocated> for Event {
    fn from(event: Allocated) -> Self {
        Event::Allocated(event)
    }
}

impl From<Deallocated> for Event {
    fn from(event: Deallocated) -> Self {
        Event::Deallocated(event)
    }
}

impl From<OutOfStock> for Event {
    fn from(event: OutOfStock) -> Self {
        Event::OutOfStock(event)
    }
}
