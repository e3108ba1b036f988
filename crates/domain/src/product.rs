//! Product aggregate: the sole mutation boundary for allocation decisions.

use common::{BatchRef, Sku, Version};

use crate::batch::Batch;
use crate::error::DomainError;
use crate::events::{Allocated, Deallocated, Event, OutOfStock};
use crate::order_line::OrderLine;

/// A product and its purchased batches, identified by sku.
///
/// All allocation and quantity-change operations go through the product.
/// Every mutating operation increments `version`, the optimistic-concurrency
/// token checked by the store at commit. Events produced by operations are
/// buffered on the aggregate and drained by the unit of work through
/// [`Product::take_events`].
#[derive(Debug, Clone)]
pub struct Product {
    sku: Sku,
    version: Version,
    /// Kept sorted in allocation priority order: in-stock batches first,
    /// then by ascending eta.
    batches: Vec<Batch>,
    pending_events: Vec<Event>,
}

impl Product {
    /// Creates a product at version 1 owning the given batches.
    ///
    /// Batches are sorted into allocation priority order. Callers are
    /// responsible for only passing batches that carry the product's sku;
    /// [`Product::add_batch`] enforces this for later additions.
    pub fn new(sku: impl Into<Sku>, batches: Vec<Batch>) -> Self {
        Self::with_version(sku, Version::first(), batches)
    }

    /// Recreates a product at a known version (e.g. when loading from a
    /// store that does not retain batch ordering).
    pub fn with_version(sku: impl Into<Sku>, version: Version, mut batches: Vec<Batch>) -> Self {
        batches.sort_by_key(|batch| batch.eta());

        Self {
            sku: sku.into(),
            version,
            batches,
            pending_events: Vec::new(),
        }
    }

    /// Returns the product sku.
    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    /// Returns the current version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns the batches in allocation priority order.
    pub fn batches(&self) -> impl Iterator<Item = &Batch> {
        self.batches.iter()
    }

    /// Returns a batch by reference.
    pub fn batch(&self, reference: &BatchRef) -> Option<&Batch> {
        self.batches
            .iter()
            .find(|batch| batch.reference() == reference)
    }

    /// Returns the events buffered so far without draining them.
    pub fn pending_events(&self) -> &[Event] {
        &self.pending_events
    }

    /// Drains the buffered events for publication.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending_events)
    }

    /// Allocates an order line to the earliest available batch.
    ///
    /// Fails with [`DomainError::SkuMismatch`] when the line is for a
    /// different product, which is a caller error. Running out of stock is a
    /// business outcome, not an error: every batch rejecting the line buffers
    /// one `OutOfStock` event and returns `Ok(None)`.
    pub fn allocate(&mut self, line: OrderLine) -> Result<Option<BatchRef>, DomainError> {
        if line.sku != self.sku {
            return Err(DomainError::SkuMismatch {
                expected: self.sku.clone(),
                actual: line.sku,
            });
        }

        for batch in &mut self.batches {
            if batch.allocate(line.clone()).is_err() {
                continue;
            }

            let reference = batch.reference().clone();
            self.version = self.version.next();
            self.pending_events.push(Event::Allocated(Allocated {
                order_id: line.order_id,
                sku: line.sku,
                quantity: line.quantity,
                batch_reference: reference.clone(),
            }));

            return Ok(Some(reference));
        }

        self.pending_events
            .push(Event::OutOfStock(OutOfStock { sku: line.sku }));

        Ok(None)
    }

    /// Adds a purchased batch to the product.
    pub fn add_batch(&mut self, batch: Batch) -> Result<(), DomainError> {
        if batch.sku() != &self.sku {
            return Err(DomainError::SkuMismatch {
                expected: self.sku.clone(),
                actual: batch.sku().clone(),
            });
        }

        self.batches.push(batch);
        // Stable sort: equal etas keep their insertion order.
        self.batches.sort_by_key(|batch| batch.eta());
        self.version = self.version.next();

        Ok(())
    }

    /// Changes a batch's purchased quantity and rebalances.
    ///
    /// After the quantity write, the batch's most recently allocated lines
    /// are deallocated one by one, buffering one `Deallocated` event each,
    /// until the batch's available quantity is no longer negative. The
    /// version increments once, after convergence.
    pub fn change_batch_quantity(
        &mut self,
        reference: &BatchRef,
        quantity: u32,
    ) -> Result<(), DomainError> {
        let batch = self
            .batches
            .iter_mut()
            .find(|batch| batch.reference() == reference)
            .ok_or_else(|| DomainError::BatchNotFound {
                sku: self.sku.clone(),
                reference: reference.clone(),
            })?;

        batch.change_purchased_quantity(quantity);

        while batch.available_quantity() < 0 {
            let Some(line) = batch.deallocate_latest_order_line() else {
                break;
            };

            self.pending_events.push(Event::Deallocated(Deallocated {
                order_id: line.order_id,
                sku: line.sku,
                quantity: line.quantity,
            }));
        }

        self.version = self.version.next();

        Ok(())
    }
}
