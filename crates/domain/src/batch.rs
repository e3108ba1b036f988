//! Batch entity: a purchased quantity of stock with an optional arrival date.

use chrono::NaiveDate;

use common::{BatchRef, Sku};

use crate::error::DomainError;
use crate::order_line::OrderLine;

/// A purchased batch of stock, identified by its reference.
///
/// Owns the set of order lines allocated against it. Invariant: after any
/// operation returns, the allocated quantity never exceeds the purchased
/// quantity, except transiently inside the product-level rebalance that
/// follows `change_purchased_quantity`.
#[derive(Debug, Clone)]
pub struct Batch {
    reference: BatchRef,
    sku: Sku,
    purchased_quantity: u32,
    /// Allocation order is preserved; the newest line sits at the end.
    allocations: Vec<OrderLine>,
    eta: Option<NaiveDate>,
}

impl Batch {
    /// Creates a new batch with no allocations.
    ///
    /// `eta: None` means the stock is already in the warehouse.
    pub fn new(
        reference: impl Into<BatchRef>,
        sku: impl Into<Sku>,
        purchased_quantity: u32,
        eta: Option<NaiveDate>,
    ) -> Self {
        Self {
            reference: reference.into(),
            sku: sku.into(),
            purchased_quantity,
            allocations: Vec::new(),
            eta,
        }
    }

    /// Returns the batch reference.
    pub fn reference(&self) -> &BatchRef {
        &self.reference
    }

    /// Returns the batch sku.
    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    /// Returns the arrival date, if the batch is still shipping.
    pub fn eta(&self) -> Option<NaiveDate> {
        self.eta
    }

    /// Returns the purchased quantity.
    pub fn purchased_quantity(&self) -> u32 {
        self.purchased_quantity
    }

    /// Returns the order lines currently allocated, oldest first.
    pub fn allocations(&self) -> impl Iterator<Item = &OrderLine> {
        self.allocations.iter()
    }

    /// Returns the total quantity committed to allocated order lines.
    pub fn allocated_quantity(&self) -> u32 {
        self.allocations.iter().map(|line| line.quantity).sum()
    }

    /// Returns the quantity still available for allocation.
    ///
    /// Signed: a purchased-quantity reduction may leave this negative until
    /// the owning product rebalances.
    pub fn available_quantity(&self) -> i64 {
        i64::from(self.purchased_quantity) - i64::from(self.allocated_quantity())
    }

    /// Returns true if this batch arrives after `other`.
    ///
    /// A batch without an eta is already in stock and ranks before every
    /// dated batch; dated batches rank by arrival date.
    pub fn arrives_after(&self, other: &Batch) -> bool {
        self.eta > other.eta
    }

    /// Allocates an order line to this batch.
    pub fn allocate(&mut self, line: OrderLine) -> Result<(), DomainError> {
        if line.sku != self.sku {
            return Err(DomainError::UnknownSku {
                reference: self.reference.clone(),
                order_id: line.order_id,
                sku: line.sku,
            });
        }

        if self.allocations.contains(&line) {
            return Err(DomainError::AlreadyAllocated {
                reference: self.reference.clone(),
                order_id: line.order_id,
            });
        }

        let available = self.available_quantity();
        if i64::from(line.quantity) > available {
            return Err(DomainError::InsufficientStock {
                reference: self.reference.clone(),
                order_id: line.order_id,
                requested: line.quantity,
                available,
            });
        }

        self.allocations.push(line);
        Ok(())
    }

    /// Removes a previously allocated order line.
    pub fn deallocate(&mut self, line: &OrderLine) -> Result<(), DomainError> {
        match self.allocations.iter().position(|allocated| allocated == line) {
            Some(index) => {
                self.allocations.remove(index);
                Ok(())
            }
            None => Err(DomainError::LineNotAllocated {
                reference: self.reference.clone(),
                order_id: line.order_id.clone(),
            }),
        }
    }

    /// Removes and returns the most recently allocated order line.
    ///
    /// Tie-break policy: last-allocated-first, backed by the allocation-order
    /// `Vec`. Used by the product-level rebalance after a purchased-quantity
    /// reduction. Returns `None` when nothing is allocated.
    pub fn deallocate_latest_order_line(&mut self) -> Option<OrderLine> {
        self.allocations.pop()
    }

    /// Sets the purchased quantity.
    ///
    /// May drive `available_quantity` negative; the owning product runs the
    /// rebalance loop before its own operation returns.
    pub fn change_purchased_quantity(&mut self, quantity: u32) {
        self.purchased_quantity = quantity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(quantity: u32) -> Batch {
        Batch::new("batch-001", "SMALL-TABLE", quantity, None)
    }

    fn line(order_id: &str, quantity: u32) -> OrderLine {
        OrderLine::new(order_id, "SMALL-TABLE", quantity)
    }

    #[test]
    fn allocating_reduces_available_quantity() {
        let mut batch = batch(20);
        batch.allocate(line("order-1", 2)).unwrap();
        assert_eq!(batch.available_quantity(), 18);
        assert_eq!(batch.allocated_quantity(), 2);
    }

    #[test]
    fn cannot_allocate_more_than_available() {
        let mut batch = batch(1);
        let result = batch.allocate(line("order-1", 2));

        assert!(matches!(
            result,
            Err(DomainError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            })
        ));
        assert_eq!(batch.available_quantity(), 1);
    }

    #[test]
    fn cannot_allocate_a_different_sku() {
        let mut batch = batch(20);
        let result = batch.allocate(OrderLine::new("order-1", "BLUE-VASE", 1));
        assert!(matches!(result, Err(DomainError::UnknownSku { .. })));
    }

    #[test]
    fn allocating_the_same_line_twice_fails_and_changes_nothing() {
        let mut batch = batch(20);
        batch.allocate(line("order-1", 2)).unwrap();

        let result = batch.allocate(line("order-1", 2));

        assert!(matches!(result, Err(DomainError::AlreadyAllocated { .. })));
        assert_eq!(batch.available_quantity(), 18);
    }

    #[test]
    fn deallocate_removes_an_allocated_line() {
        let mut batch = batch(20);
        batch.allocate(line("order-1", 2)).unwrap();
        batch.deallocate(&line("order-1", 2)).unwrap();
        assert_eq!(batch.available_quantity(), 20);
    }

    #[test]
    fn deallocating_an_unallocated_line_fails() {
        let mut batch = batch(20);
        let result = batch.deallocate(&line("order-1", 2));
        assert!(matches!(result, Err(DomainError::LineNotAllocated { .. })));
    }

    #[test]
    fn latest_order_line_is_the_most_recently_allocated() {
        let mut batch = batch(20);
        batch.allocate(line("order-1", 2)).unwrap();
        batch.allocate(line("order-2", 3)).unwrap();
        batch.allocate(line("order-3", 4)).unwrap();

        assert_eq!(batch.deallocate_latest_order_line(), Some(line("order-3", 4)));
        assert_eq!(batch.deallocate_latest_order_line(), Some(line("order-2", 3)));
        assert_eq!(batch.deallocate_latest_order_line(), Some(line("order-1", 2)));
        assert_eq!(batch.deallocate_latest_order_line(), None);
    }

    #[test]
    fn shrinking_purchased_quantity_can_go_negative() {
        let mut batch = batch(20);
        batch.allocate(line("order-1", 20)).unwrap();

        batch.change_purchased_quantity(5);

        assert_eq!(batch.available_quantity(), -15);
    }

    #[test]
    fn in_stock_batches_rank_before_shipments() {
        let in_stock = Batch::new("in-stock", "SMALL-TABLE", 10, None);
        let shipping = Batch::new(
            "shipping",
            "SMALL-TABLE",
            10,
            Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
        );

        assert!(shipping.arrives_after(&in_stock));
        assert!(!in_stock.arrives_after(&shipping));
    }

    #[test]
    fn earlier_eta_ranks_first() {
        let earlier = Batch::new(
            "earlier",
            "SMALL-TABLE",
            10,
            Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
        );
        let later = Batch::new(
            "later",
            "SMALL-TABLE",
            10,
            Some(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()),
        );

        assert!(later.arrives_after(&earlier));
        assert!(!earlier.arrives_after(&later));
    }
}
