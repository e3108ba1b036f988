//! End-to-end tests for the message-driven allocation loop.
//!
//! Every test wires the full application over the in-memory store and buses,
//! then drives it exclusively through published commands, the way the edge
//! and external services do.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use domain::{
    AddBatch, Allocate, Allocated, ChangeBatchQuantity, Event, Message,
};
use message_bus::{BusError, BusMessage, HandlerError, MessageBus, MessageHandler};
use projections::AllocationsReadModel;
use service::{App, Config, InMemoryHandles, PROMOTED_TO_EXTERNAL, ServiceError};

const SKU: &str = "NOBLE-BOOKSHELF";

async fn started_app() -> (App, InMemoryHandles) {
    let (app, handles) = App::in_memory(&Config::default());
    app.start().await;
    (app, handles)
}

fn add_batch(reference: &str, quantity: u32, eta: Option<NaiveDate>) -> Message {
    Message::command(AddBatch {
        reference: reference.into(),
        sku: SKU.into(),
        purchased_quantity: quantity,
        eta,
    })
}

fn allocate(order_id: &str, quantity: u32) -> Message {
    Message::command(Allocate {
        order_id: order_id.into(),
        sku: SKU.into(),
        quantity,
    })
}

async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if condition().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn allocating_through_the_internal_bus_updates_the_read_model() {
    let (app, handles) = started_app().await;

    app.internal_bus
        .publish(add_batch("batch-001", 100, None))
        .await
        .unwrap();
    app.internal_bus
        .publish(allocate("order-1", 10))
        .await
        .unwrap();

    // Read-model handlers are awaited with the triggering publish, so the
    // view is current as soon as publish returns.
    let rows = handles
        .view
        .allocations_for_order(&"order-1".into())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].batch_reference, "batch-001".into());

    let product = handles.store.snapshot(&SKU.into()).await.unwrap();
    assert_eq!(
        product.batch(&"batch-001".into()).unwrap().available_quantity(),
        90
    );
}

#[tokio::test]
async fn allocation_prefers_the_earliest_available_batch() {
    let (app, handles) = started_app().await;

    let eta = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    app.internal_bus
        .publish(add_batch("shipment", 100, Some(eta)))
        .await
        .unwrap();
    app.internal_bus
        .publish(add_batch("in-stock", 100, None))
        .await
        .unwrap();

    app.internal_bus
        .publish(allocate("order-1", 10))
        .await
        .unwrap();

    let rows = handles
        .view
        .allocations_for_order(&"order-1".into())
        .await
        .unwrap();
    assert_eq!(rows[0].batch_reference, "in-stock".into());
}

#[tokio::test]
async fn out_of_stock_surfaces_to_the_caller_and_notifies_by_email() {
    let (app, handles) = started_app().await;

    app.internal_bus
        .publish(add_batch("batch-001", 5, None))
        .await
        .unwrap();

    let error = app
        .internal_bus
        .publish(allocate("order-1", 10))
        .await
        .unwrap_err();

    // The internal command policy propagates the handler's failure.
    let BusError::Handler { source, .. } = error else {
        panic!("expected a handler error, got {error:?}");
    };
    assert!(matches!(
        source.downcast_ref::<ServiceError>(),
        Some(ServiceError::OutOfStock { .. })
    ));

    // The notification is a detached side effect; wait for it to land.
    let email_sender = handles.email_sender.clone();
    wait_until(|| {
        let email_sender = email_sender.clone();
        async move { !email_sender.sent().await.is_empty() }
    })
    .await;

    let sent = handles.email_sender.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body, format!("Out of stock: {SKU}"));

    // Nothing was allocated.
    let rows = handles
        .view
        .allocations_for_order(&"order-1".into())
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn shrinking_a_batch_reallocates_the_displaced_order_line() {
    let (app, handles) = started_app().await;

    let eta = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    app.internal_bus
        .publish(add_batch("in-stock", 10, None))
        .await
        .unwrap();
    app.internal_bus
        .publish(add_batch("shipment", 10, Some(eta)))
        .await
        .unwrap();

    app.internal_bus
        .publish(allocate("order-1", 10))
        .await
        .unwrap();

    let rows = handles
        .view
        .allocations_for_order(&"order-1".into())
        .await
        .unwrap();
    assert_eq!(rows[0].batch_reference, "in-stock".into());

    // The purchasing system reports the batch shrank below what is promised.
    // External commands are fire-and-forget; the loop runs behind the scenes:
    // Deallocated → Allocate → the line lands on the next-best batch.
    app.external_bus
        .publish(Message::command(ChangeBatchQuantity {
            batch_reference: "in-stock".into(),
            quantity: 5,
        }))
        .await
        .unwrap();

    let view = handles.view.clone();
    wait_until(|| {
        let view = view.clone();
        async move {
            view.allocations_for_order(&"order-1".into())
                .await
                .unwrap()
                .first()
                .is_some_and(|row| row.batch_reference == "shipment".into())
        }
    })
    .await;

    // Exactly one allocation row survives the move.
    let rows = handles
        .view
        .allocations_for_order(&"order-1".into())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    let product = handles.store.snapshot(&SKU.into()).await.unwrap();
    let in_stock = product.batch(&"in-stock".into()).unwrap();
    let shipment = product.batch(&"shipment".into()).unwrap();
    assert_eq!(in_stock.allocated_quantity(), 0);
    assert_eq!(in_stock.purchased_quantity(), 5);
    assert_eq!(shipment.allocated_quantity(), 10);
}

#[tokio::test]
async fn external_commands_are_fire_and_forget() {
    let (app, handles) = started_app().await;

    app.external_bus
        .publish(add_batch("batch-001", 100, None))
        .await
        .unwrap();

    let store = handles.store.clone();
    wait_until(|| {
        let store = store.clone();
        async move { store.product_count().await == 1 }
    })
    .await;
}

struct CaptureAllocated {
    seen: Arc<tokio::sync::Mutex<Vec<Message>>>,
}

#[async_trait]
impl MessageHandler<Message> for CaptureAllocated {
    fn name(&self) -> &'static str {
        "CaptureAllocated"
    }

    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        self.seen.lock().await.push(message);
        Ok(())
    }
}

#[tokio::test]
async fn allocated_events_are_promoted_to_the_external_bus() {
    let (app, handles) = started_app().await;

    let seen = Arc::new(tokio::sync::Mutex::new(Vec::new()));
    handles
        .external_bus
        .subscribe(
            domain::names::ALLOCATED,
            Arc::new(CaptureAllocated { seen: seen.clone() }),
        )
        .await;

    app.internal_bus
        .publish(add_batch("batch-001", 100, None))
        .await
        .unwrap();
    app.internal_bus
        .publish(allocate("order-1", 10))
        .await
        .unwrap();

    let seen_handle = seen.clone();
    wait_until(|| {
        let seen = seen_handle.clone();
        async move { !seen.lock().await.is_empty() }
    })
    .await;

    let seen = seen.lock().await;
    assert_eq!(
        seen[0],
        Message::event(Allocated {
            order_id: "order-1".into(),
            sku: SKU.into(),
            quantity: 10,
            batch_reference: "batch-001".into(),
        })
    );
    // The payload crossed the boundary as serialized text; provenance
    // metadata stays on the publishing side of the wire.
    assert!(!seen[0].metadata().is_flagged(PROMOTED_TO_EXTERNAL));
    assert!(seen[0].as_event().is_some());
    assert!(matches!(seen[0].as_event(), Some(Event::Allocated(_))));
}
