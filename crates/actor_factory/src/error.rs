//! Actor Factory error types

use contracts::ActorId;
use thiserror::Error;

/// Actor Factory specific error
#[derive(Debug, Error)]
pub enum ActorFactoryError {
    /// CARLA connection error
    #[error("failed to connect to CARLA: {message}")]
    ConnectionFailed { message: String },

    /// Blueprint lookup error
    #[error("blueprint '{blueprint}' not found")]
    BlueprintNotFound { blueprint: String },

    /// Vehicle or sensor spawn error
    #[error("failed to spawn '{actor}' from '{blueprint}': {message}")]
    SpawnFailed {
        actor: String,
        blueprint: String,
        message: String,
    },

    /// Actor handle not known to the client
    #[error("actor {actor_id} not found")]
    ActorNotFound { actor_id: ActorId },

    /// Destroy error
    #[error("failed to destroy actor {actor_id}: {message}")]
    DestroyFailed { actor_id: ActorId, message: String },

    /// Waiting for the next simulator tick failed
    #[error("failed to wait for tick: {message}")]
    TickFailed { message: String },
}

impl ActorFactoryError {
    /// Create connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Create spawn error
    pub fn spawn(
        actor: impl Into<String>,
        blueprint: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::SpawnFailed {
            actor: actor.into(),
            blueprint: blueprint.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ActorFactoryError>;
