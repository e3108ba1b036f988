//! Domain layer for the allocation service.
//!
//! This crate provides the core domain model:
//! - `OrderLine` value object and `Batch` entity
//! - The `Product` aggregate, the sole mutation boundary for allocation
//!   decisions
//! - The message vocabulary (commands, events, and the `Message` envelope
//!   carried by the buses)

pub mod batch;
pub mod commands;
pub mod error;
pub mod events;
pub mod message;
pub mod order_line;
pub mod product;

pub use batch::Batch;
pub use commands::{AddBatch, Allocate, ChangeBatchQuantity, Command};
pub use error::{DomainError, ErrorKind};
pub use events::{Allocated, Deallocated, Event, OutOfStock};
pub use message::{Message, names};
pub use order_line::OrderLine;
pub use product::Product;
