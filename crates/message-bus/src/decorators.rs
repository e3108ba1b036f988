//! Composable delivery decorators.
//!
//! A handler is never subscribed raw: the wiring picks a [`DeliveryPolicy`]
//! and the policy wraps the handler in a fixed decorator chain. The chain
//! decides whether failures propagate to the publisher, are retried, or are
//! detached from the publishing flow entirely.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::bus::MessageHandler;
use crate::error::HandlerError;
use crate::message::BusMessage;

/// Logs every delivery before delegating to the wrapped handler.
pub struct Logged<M: BusMessage> {
    inner: Arc<dyn MessageHandler<M>>,
}

impl<M: BusMessage> Logged<M> {
    pub fn new(inner: Arc<dyn MessageHandler<M>>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<M: BusMessage> MessageHandler<M> for Logged<M> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn handle(&self, message: M) -> Result<(), HandlerError> {
        tracing::info!(
            message = message.name(),
            id = %message.id(),
            metadata = ?message.metadata(),
            handler = self.inner.name(),
            "handling message"
        );
        self.inner.handle(message).await
    }
}

/// Re-invokes the wrapped handler on failure, up to a fixed bound.
///
/// Delivery is "try hard, then give up": intermediate failures are logged and
/// retried with exponential backoff, and the final failure is logged and
/// swallowed rather than propagated.
pub struct Retried<M: BusMessage> {
    inner: Arc<dyn MessageHandler<M>>,
    attempts: u32,
    backoff: Duration,
}

impl<M: BusMessage> Retried<M> {
    /// Default bound of 3 attempts with a 50ms initial backoff.
    pub fn new(inner: Arc<dyn MessageHandler<M>>) -> Self {
        Self::with_attempts(inner, 3, Duration::from_millis(50))
    }

    pub fn with_attempts(
        inner: Arc<dyn MessageHandler<M>>,
        attempts: u32,
        backoff: Duration,
    ) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            backoff,
        }
    }
}

#[async_trait]
impl<M: BusMessage> MessageHandler<M> for Retried<M> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn handle(&self, message: M) -> Result<(), HandlerError> {
        let mut delay = self.backoff;

        for attempt in 1..=self.attempts {
            match self.inner.handle(message.clone()).await {
                Ok(()) => return Ok(()),
                Err(error) if attempt == self.attempts => {
                    metrics::counter!("bus_handler_gave_up_total").increment(1);
                    tracing::error!(
                        message = message.name(),
                        id = %message.id(),
                        handler = self.inner.name(),
                        attempts = self.attempts,
                        error = %error,
                        "giving up on message after final attempt"
                    );
                }
                Err(error) => {
                    metrics::counter!("bus_handler_retries_total").increment(1);
                    tracing::warn!(
                        message = message.name(),
                        id = %message.id(),
                        handler = self.inner.name(),
                        attempt,
                        error = %error,
                        "handler attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }

        Ok(())
    }
}

/// Converts any handler failure into a logged no-op.
///
/// Used so one event handler's failure neither aborts sibling handlers nor
/// breaks the publishing flow.
pub struct NoFail<M: BusMessage> {
    inner: Arc<dyn MessageHandler<M>>,
}

impl<M: BusMessage> NoFail<M> {
    pub fn new(inner: Arc<dyn MessageHandler<M>>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<M: BusMessage> MessageHandler<M> for NoFail<M> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn handle(&self, message: M) -> Result<(), HandlerError> {
        let name = message.name();
        let id = message.id();

        if let Err(error) = self.inner.handle(message).await {
            metrics::counter!("bus_handler_failures_total").increment(1);
            tracing::error!(
                message = name,
                id = %id,
                handler = self.inner.name(),
                error = %error,
                "message handler failed"
            );
        }

        Ok(())
    }
}

/// Runs the wrapped handler without awaiting its completion.
///
/// The publish call returns once dispatch is initiated. Spawned work is not
/// tracked: in-flight handlers may be dropped at process shutdown.
pub struct InBackground<M: BusMessage> {
    inner: Arc<dyn MessageHandler<M>>,
}

impl<M: BusMessage> InBackground<M> {
    pub fn new(inner: Arc<dyn MessageHandler<M>>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<M: BusMessage> MessageHandler<M> for InBackground<M> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn handle(&self, message: M) -> Result<(), HandlerError> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let name = message.name();
            if let Err(error) = inner.handle(message).await {
                tracing::error!(
                    message = name,
                    handler = inner.name(),
                    error = %error,
                    "background message handler failed"
                );
            }
        });
        Ok(())
    }
}

/// Named decorator chains, one per delivery situation.
///
/// The chain order is a design policy of the wiring site, not of the bus:
/// the innermost decorator is listed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Commands arriving from outside the trust boundary:
    /// `Logged → Retried → NoFail → InBackground`. The caller has already
    /// disconnected, so delivery is best-effort and fire-and-forget.
    ExternalCommand,

    /// Commands dispatched in process: `Logged` only. Errors must propagate
    /// synchronously to the caller.
    InternalCommand,

    /// Events whose handlers must complete before the triggering flow is
    /// done: `Logged → NoFail`. Awaited, but failure-isolated.
    CriticalEvent,

    /// Pure side-effect events: `Logged → NoFail → InBackground`.
    BackgroundEvent,
}

impl DeliveryPolicy {
    /// Wraps a handler in this policy's decorator chain.
    pub fn decorate<M: BusMessage>(
        self,
        handler: Arc<dyn MessageHandler<M>>,
    ) -> Arc<dyn MessageHandler<M>> {
        let logged: Arc<dyn MessageHandler<M>> = Arc::new(Logged::new(handler));

        match self {
            DeliveryPolicy::InternalCommand => logged,
            DeliveryPolicy::CriticalEvent => Arc::new(NoFail::new(logged)),
            DeliveryPolicy::BackgroundEvent => {
                Arc::new(InBackground::new(Arc::new(NoFail::new(logged))))
            }
            DeliveryPolicy::ExternalCommand => Arc::new(InBackground::new(Arc::new(NoFail::new(
                Arc::new(Retried::new(logged)),
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::sync::Notify;

    use super::*;
    use crate::testing::{Failing, TestMessage};

    struct FailUntil {
        calls: Arc<AtomicU32>,
        succeed_on: u32,
    }

    #[async_trait]
    impl MessageHandler<TestMessage> for FailUntil {
        fn name(&self) -> &'static str {
            "FailUntil"
        }

        async fn handle(&self, _message: TestMessage) -> Result<(), HandlerError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.succeed_on {
                Ok(())
            } else {
                Err("not yet".into())
            }
        }
    }

    struct Waiter {
        entered: Arc<Notify>,
        release: Arc<Notify>,
        done: Arc<AtomicU32>,
    }

    #[async_trait]
    impl MessageHandler<TestMessage> for Waiter {
        fn name(&self) -> &'static str {
            "Waiter"
        }

        async fn handle(&self, _message: TestMessage) -> Result<(), HandlerError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn retried_stops_after_first_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let handler = Retried::with_attempts(
            Arc::new(FailUntil {
                calls: calls.clone(),
                succeed_on: 2,
            }),
            3,
            Duration::from_millis(1),
        );

        handler.handle(TestMessage::ping("x")).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retried_swallows_the_final_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let handler = Retried::with_attempts(
            Arc::new(Failing { calls: calls.clone() }),
            3,
            Duration::from_millis(1),
        );

        let result = handler.handle(TestMessage::ping("x")).await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn no_fail_swallows_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let handler = NoFail::new(Arc::new(Failing { calls: calls.clone() }));

        let result = handler.handle(TestMessage::ping("x")).await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn in_background_returns_before_the_handler_finishes() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let done = Arc::new(AtomicU32::new(0));

        let handler = InBackground::new(Arc::new(Waiter {
            entered: entered.clone(),
            release: release.clone(),
            done: done.clone(),
        }));

        handler.handle(TestMessage::ping("x")).await.unwrap();

        // The publish path already returned; the handler has not completed.
        entered.notified().await;
        assert_eq!(done.load(Ordering::SeqCst), 0);

        release.notify_one();
        tokio::time::timeout(Duration::from_secs(1), async {
            while done.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn internal_command_policy_propagates_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let handler =
            DeliveryPolicy::InternalCommand.decorate(Arc::new(Failing { calls: calls.clone() }));

        let result = handler.handle(TestMessage::ping("x")).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn external_command_policy_retries_then_swallows() {
        let calls = Arc::new(AtomicU32::new(0));
        let handler =
            DeliveryPolicy::ExternalCommand.decorate(Arc::new(Failing { calls: calls.clone() }));

        let result = handler.handle(TestMessage::ping("x")).await;
        assert!(result.is_ok());

        // Fire-and-forget: wait for the background retries to drain.
        tokio::time::timeout(Duration::from_secs(2), async {
            while calls.load(Ordering::SeqCst) < 3 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
