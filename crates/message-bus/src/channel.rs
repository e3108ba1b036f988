use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::sync::{RwLock, mpsc};

use crate::bus::{MessageBus, MessageHandler};
use crate::error::Result;
use crate::message::BusMessage;

/// Durable pub/sub bus keyed by message type name.
///
/// Stand-in for a broker-backed transport: messages cross the boundary as a
/// serialized property bag, each subscription owns a queue drained by its own
/// consumer task, and `publish` returns once dispatch is initiated rather
/// than once handlers complete. Handler failures stay on the consumer side.
///
/// Implements the same [`MessageBus`] interface as the in-process bus, so the
/// wiring cannot tell the two apart.
#[derive(Default)]
pub struct ChannelMessageBus<M: BusMessage> {
    topics: RwLock<HashMap<&'static str, Vec<mpsc::UnboundedSender<serde_json::Value>>>>,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M: BusMessage> ChannelMessageBus<M> {
    /// Creates a new bus with no subscriptions.
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            _marker: std::marker::PhantomData,
        }
    }

    /// Returns the number of live subscriptions for a message type name.
    pub async fn subscription_count(&self, name: &str) -> usize {
        self.topics.read().await.get(name).map_or(0, Vec::len)
    }
}

#[async_trait]
impl<M: BusMessage> MessageBus<M> for ChannelMessageBus<M> {
    async fn subscribe(&self, name: &'static str, handler: Arc<dyn MessageHandler<M>>) {
        tracing::info!(
            message = name,
            handler = handler.name(),
            bus = "channel",
            "subscribing handler"
        );

        let (sender, mut receiver) = mpsc::unbounded_channel::<serde_json::Value>();
        self.topics.write().await.entry(name).or_default().push(sender);

        tokio::spawn(async move {
            while let Some(payload) = receiver.recv().await {
                let message = match M::from_parts(name, payload) {
                    Ok(message) => message,
                    Err(error) => {
                        tracing::warn!(
                            message = name,
                            error = %error,
                            "dropping undecodable message"
                        );
                        continue;
                    }
                };

                if let Err(error) = handler.handle(message).await {
                    tracing::error!(
                        message = name,
                        handler = handler.name(),
                        error = %error,
                        "subscriber failed handling delivered message"
                    );
                }
            }
        });
    }

    async fn publish(&self, message: M) -> Result<()> {
        let name = message.name();
        tracing::info!(
            message = name,
            id = %message.id(),
            metadata = ?message.metadata(),
            bus = "channel",
            "publishing message"
        );
        metrics::counter!("bus_messages_published_total", "bus" => "channel").increment(1);

        let payload = message.payload()?;

        let topics = self.topics.read().await;
        let Some(senders) = topics.get(name) else {
            return Ok(());
        };

        for sender in senders {
            // A closed receiver means the consumer task is gone; delivery is
            // best-effort, so the message is dropped for that subscriber.
            if sender.send(payload.clone()).is_err() {
                tracing::warn!(message = name, "subscriber queue is closed");
            }
        }

        Ok(())
    }

    async fn publish_many(&self, messages: Vec<M>) -> Result<()> {
        let results = join_all(messages.into_iter().map(|message| self.publish(message))).await;
        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{Recorder, TestMessage};

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn delivers_across_the_serialization_boundary() {
        let bus = ChannelMessageBus::new();
        let seen = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        bus.subscribe(
            "Ping",
            Arc::new(Recorder {
                label: "consumer",
                seen: seen.clone(),
            }),
        )
        .await;

        bus.publish(TestMessage::ping("over the wire")).await.unwrap();

        let seen_clone = seen.clone();
        wait_for(move || seen_clone.try_lock().map(|s| !s.is_empty()).unwrap_or(false)).await;
        assert_eq!(
            *seen.lock().await,
            vec![("consumer", "over the wire".to_string())]
        );
    }

    #[tokio::test]
    async fn every_subscriber_gets_its_own_copy() {
        let bus = ChannelMessageBus::new();
        let seen = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        for label in ["a", "b"] {
            bus.subscribe(
                "Ping",
                Arc::new(Recorder {
                    label,
                    seen: seen.clone(),
                }),
            )
            .await;
        }
        assert_eq!(bus.subscription_count("Ping").await, 2);

        bus.publish(TestMessage::ping("fan-out")).await.unwrap();

        let seen_clone = seen.clone();
        wait_for(move || seen_clone.try_lock().map(|s| s.len() == 2).unwrap_or(false)).await;
    }

    #[tokio::test]
    async fn publish_to_unknown_topic_is_dropped() {
        let bus: ChannelMessageBus<TestMessage> = ChannelMessageBus::new();
        bus.publish(TestMessage::pong("nobody listens")).await.unwrap();
    }
}
