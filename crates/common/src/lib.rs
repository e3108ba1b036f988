//! Shared identifier and version types used across the allocation service.

pub mod types;

pub use types::{BatchRef, MessageId, OrderId, Sku, Version};
