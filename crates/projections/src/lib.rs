//! Query side of the allocation service.
//!
//! The read model lives outside the aggregate's consistency boundary: it is
//! maintained by event handlers subscribed to the internal bus and answers
//! the "which batches hold this order?" lookup without loading aggregates.

pub mod allocations;
pub mod error;
pub mod handlers;
pub mod read_model;

pub use allocations::InMemoryAllocationsView;
pub use error::{ProjectionError, Result};
pub use handlers::{AddAllocationToReadModel, RemoveAllocationFromReadModel};
pub use read_model::{AllocationRow, AllocationsReadModel};
