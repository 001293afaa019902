//! Error types for QueueKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using BrokerError
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Unified error type for QueueKV operations
#[derive(Debug, Error)]
pub enum BrokerError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Command Errors
    // -------------------------------------------------------------------------
    #[error("invalid command")]
    InvalidCommand,

    #[error("close current item first")]
    TransactionAlreadyOpen,

    /// A collaborator failure surfaced through a GET sub-command
    #[error("{0}")]
    Command(#[source] Box<BrokerError>),

    // -------------------------------------------------------------------------
    // Queue Errors
    // -------------------------------------------------------------------------
    #[error("queue not found: {0}")]
    QueueNotFound(String),

    #[error("invalid queue name: {0:?}")]
    InvalidQueueName(String),

    #[error("queue full: {0}")]
    QueueFull(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BrokerError {
    /// Wrap a collaborator error as a generic command error
    pub fn command(err: BrokerError) -> Self {
        BrokerError::Command(Box::new(err))
    }

    /// True if the client sent something it should fix before retrying
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BrokerError::TransactionAlreadyOpen | BrokerError::Protocol(_)
        )
    }
}
