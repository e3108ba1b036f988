//! Persistence boundary for product aggregates.
//!
//! This crate provides:
//! - [`UnitOfWork`]: the transactional scope around one aggregate mutation,
//!   covering load, save, commit/rollback, and the hand-off of buffered
//!   domain events
//! - [`UnitOfWorkFactory`]: opens a fresh scope per command
//! - [`InMemoryProductStore`]: the in-memory implementation used by tests
//!   and the worker binary, with commit-time write-write conflict detection

pub mod error;
pub mod memory;
pub mod unit_of_work;

pub use error::{Result, StoreError};
pub use memory::InMemoryProductStore;
pub use unit_of_work::{UnitOfWork, UnitOfWorkFactory};
