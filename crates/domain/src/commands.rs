//! Commands: requests to change allocation state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use common::{BatchRef, OrderId, Sku};

use crate::message::names;

/// Command to register a purchased batch for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBatch {
    pub reference: BatchRef,
    pub sku: Sku,
    pub purchased_quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<NaiveDate>,
}

/// Command to allocate an order line to the best available batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocate {
    pub order_id: OrderId,
    pub sku: Sku,
    pub quantity: u32,
}

/// Command to change a batch's purchased quantity, rebalancing as needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatchQuantity {
    pub batch_reference: BatchRef,
    pub quantity: u32,
}

/// A message requesting a state change; handled by exactly one handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddBatch(AddBatch),
    Allocate(Allocate),
    ChangeBatchQuantity(ChangeBatchQuantity),
}

impl Command {
    /// Returns the command type name.
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddBatch(_) => names::ADD_BATCH,
            Command::Allocate(_) => names::ALLOCATE,
            Command::ChangeBatchQuantity(_) => names::CHANGE_BATCH_QUANTITY,
        }
    }

    /// Serializes the command's property bag.
    pub fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Command::AddBatch(command) => serde_json::to_value(command),
            Command::Allocate(command) => serde_json::to_value(command),
            Command::ChangeBatchQuantity(command) => serde_json::to_value(command),
        }
    }
}

impl From<AddBatch> for Command {
    fn from(command: AddBatch) -> Self {
        Command::AddBatch(command)
    }
}

impl From<Allocate> for Command {
    fn from(command: Allocate) -> Self {
        Command::Allocate(command)
    }
}

impl From<ChangeBatchQuantity> for Command {
    fn from(command: ChangeBatchQuantity) -> Self {
        Command::ChangeBatchQuantity(command)
    }
}
