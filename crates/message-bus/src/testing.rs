//! Shared test vocabulary for bus, decorator, and channel tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use common::MessageId;

use crate::bus::MessageHandler;
use crate::error::{BusError, HandlerError, Result};
use crate::message::{BusMessage, Metadata};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ping {
    pub text: String,
}

/// Minimal two-name message vocabulary.
#[derive(Debug, Clone)]
pub struct TestMessage {
    id: MessageId,
    pub ping: Ping,
    pub kind: &'static str,
    metadata: Metadata,
}

impl TestMessage {
    pub fn ping(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            ping: Ping { text: text.into() },
            kind: "Ping",
            metadata: Metadata::new(),
        }
    }

    pub fn pong(text: impl Into<String>) -> Self {
        Self {
            kind: "Pong",
            ..Self::ping(text)
        }
    }
}

impl BusMessage for TestMessage {
    fn name(&self) -> &'static str {
        self.kind
    }

    fn id(&self) -> MessageId {
        self.id
    }

    fn payload(&self) -> Result<serde_json::Value> {
        serde_json::to_value(&self.ping).map_err(|source| BusError::Payload {
            name: self.kind.to_string(),
            source,
        })
    }

    fn from_parts(name: &str, payload: serde_json::Value) -> Result<Self> {
        let kind = match name {
            "Ping" => "Ping",
            "Pong" => "Pong",
            other => {
                return Err(BusError::UnknownMessage {
                    name: other.to_string(),
                });
            }
        };
        let ping: Ping = serde_json::from_value(payload).map_err(|source| BusError::Payload {
            name: name.to_string(),
            source,
        })?;
        Ok(Self {
            id: MessageId::new(),
            ping,
            kind,
            metadata: Metadata::new(),
        })
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Records every message it sees under a label.
pub struct Recorder {
    pub label: &'static str,
    pub seen: Arc<tokio::sync::Mutex<Vec<(&'static str, String)>>>,
}

#[async_trait]
impl MessageHandler<TestMessage> for Recorder {
    fn name(&self) -> &'static str {
        self.label
    }

    async fn handle(&self, message: TestMessage) -> std::result::Result<(), HandlerError> {
        self.seen.lock().await.push((self.label, message.ping.text));
        Ok(())
    }
}

/// Fails every time, counting invocations.
pub struct Failing {
    pub calls: Arc<AtomicU32>,
}

#[async_trait]
impl MessageHandler<TestMessage> for Failing {
    fn name(&self) -> &'static str {
        "Failing"
    }

    async fn handle(&self, _message: TestMessage) -> std::result::Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err("boom".into())
    }
}
