use thiserror::Error;

/// Errors that can occur while maintaining or querying a read model.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// A handler was fed an event it cannot apply to the view.
    #[error("event {event} cannot be applied to the {view} view")]
    UnexpectedEvent {
        view: &'static str,
        event: &'static str,
    },
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
