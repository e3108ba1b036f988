use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use common::MessageId;

use crate::error::BusError;

/// Side-channel metadata attached to a message.
///
/// Tags delivery provenance (e.g. that a message has already been promoted to
/// the external bus). Never part of message equality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(HashMap<String, serde_json::Value>);

impl Metadata {
    /// Creates empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a metadata entry.
    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }

    /// Returns a metadata entry.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Returns true if a key is set to boolean `true`.
    pub fn is_flagged(&self, key: &str) -> bool {
        self.get(key).and_then(serde_json::Value::as_bool) == Some(true)
    }

    /// Returns true when no metadata is attached.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A message that can travel on a bus.
///
/// The bus addresses subscriptions by the message *type name* and, for
/// transports that cross a process boundary, moves the message as a
/// `(name, serialized property bag)` pair.
pub trait BusMessage: Clone + Send + Sync + 'static {
    /// The message type name, used as the pub/sub channel key.
    fn name(&self) -> &'static str;

    /// Unique id of this message instance, for logs and provenance.
    fn id(&self) -> MessageId;

    /// Serializes the message's property bag (the payload without envelope).
    fn payload(&self) -> Result<serde_json::Value, BusError>;

    /// Reconstructs a message from a type name and a serialized property bag.
    ///
    /// Fails with [`BusError::UnknownMessage`] for names outside the
    /// vocabulary and [`BusError::Payload`] for malformed payloads.
    fn from_parts(name: &str, payload: serde_json::Value) -> Result<Self, BusError>;

    /// Delivery metadata attached to this message.
    fn metadata(&self) -> &Metadata;

    /// Mutable access to the delivery metadata.
    fn metadata_mut(&mut self) -> &mut Metadata;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_flag_roundtrip() {
        let mut meta = Metadata::new();
        assert!(meta.is_empty());
        assert!(!meta.is_flagged("promoted_to_external"));

        meta.set("promoted_to_external", serde_json::json!(true));
        assert!(meta.is_flagged("promoted_to_external"));
        assert!(!meta.is_empty());
    }

    #[test]
    fn non_boolean_values_are_not_flags() {
        let mut meta = Metadata::new();
        meta.set("origin", serde_json::json!("external"));
        assert!(!meta.is_flagged("origin"));
        assert_eq!(meta.get("origin"), Some(&serde_json::json!("external")));
    }
}
