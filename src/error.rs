//! Error taxonomy for the conversational state engine.
//!
//! The orchestrator is the single place that wraps failures into
//! `ProcessingFailed`; `NotFound` and `UnsupportedPolicy` cross the
//! external boundary unwrapped because callers can act on them.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The referenced conversation does not exist. Recoverable: callers
    /// may start a new conversation instead.
    #[error("conversation '{0}' not found")]
    NotFound(String),

    /// The retention-policy tag is not one of the supported policies.
    /// A programmer or configuration error; fails loudly.
    #[error("unsupported retention policy '{0}' (expected 'recent-window' or 'full-history')")]
    UnsupportedPolicy(String),

    /// A stored value could not be encoded or decoded.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The cache backend reported a failure.
    #[error("cache operation failed: {0}")]
    Cache(String),

    /// The model collaborator failed to produce a reply.
    #[error("model invocation failed: {0}")]
    Model(String),

    /// Wraps any failure inside one orchestration run (see
    /// `SessionOrchestrator::process_message`).
    #[error("failed to process chat message: {source}")]
    ProcessingFailed {
        #[source]
        source: Box<Error>,
    },
}
