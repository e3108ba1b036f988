use thiserror::Error;

/// Error produced by a message handler.
///
/// Handlers from different layers fail with different error types; the bus
/// carries them opaquely and callers that need the concrete type downcast.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur when interacting with a message bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// A subscribed handler failed while handling a message.
    ///
    /// Only surfaces on delivery paths that propagate handler errors to the
    /// publisher (internal command dispatch); decorated event handlers
    /// swallow their own failures.
    #[error("handler {handler} failed handling {message}: {source}")]
    Handler {
        handler: &'static str,
        message: &'static str,
        #[source]
        source: HandlerError,
    },

    /// A serialized payload arrived under a message type name the vocabulary
    /// does not know.
    #[error("unknown message type: {name}")]
    UnknownMessage { name: String },

    /// A message payload could not be serialized or deserialized.
    #[error("cannot encode or decode {name} payload: {source}")]
    Payload {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for message bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
