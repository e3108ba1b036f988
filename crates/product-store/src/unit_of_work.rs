use async_trait::async_trait;

use common::{BatchRef, Sku};
use domain::{Event, Product};

use crate::error::Result;

/// Transactional scope around one aggregate mutation.
///
/// A unit of work tracks the base version of every product it loads, stages
/// writes on `save`, and applies them atomically on `commit`. Commit must
/// surface a write-write conflict against any concurrent transaction that
/// loaded and saved the same sku; the loser fails rather than silently
/// overwriting.
///
/// Saving an aggregate drains its buffered domain events into the unit of
/// work; after a successful commit [`UnitOfWork::collect_new_events`] hands
/// them to the caller for publication.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Loads the product for a sku, or `None` if it does not exist.
    async fn find(&mut self, sku: &Sku) -> Result<Option<Product>>;

    /// Loads the product for a sku, failing if it does not exist.
    async fn get(&mut self, sku: &Sku) -> Result<Product>;

    /// Loads the product owning the batch with this reference.
    async fn get_by_batch_reference(&mut self, reference: &BatchRef) -> Result<Product>;

    /// Stages the product for writing and drains its buffered events.
    async fn save(&mut self, product: Product) -> Result<()>;

    /// Applies every staged write atomically.
    ///
    /// Fails with a conflict error when any staged product's stored version
    /// no longer matches the version observed at load. A unit of work that
    /// already committed or rolled back commits nothing.
    async fn commit(&mut self) -> Result<()>;

    /// Discards staged writes and collected events.
    async fn rollback(&mut self) -> Result<()>;

    /// Returns the events drained from saved aggregates.
    ///
    /// Meaningful after a successful commit; drains the internal buffer.
    fn collect_new_events(&mut self) -> Vec<Event>;
}

/// Opens a fresh [`UnitOfWork`] per command.
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}
