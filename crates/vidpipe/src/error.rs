use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VidpipeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Job runner is shutting down")]
    ShuttingDown,

    #[error("Failed to initialise logging: {0}")]
    Logging(String),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid service '{name}': {reason}")]
    InvalidService { name: String, reason: String },
}

/// Errors raised by the cache or durable status stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cache store failure: {0}")]
    Cache(String),

    #[error("Durable store failure: {0}")]
    Durable(#[from] crate::db::DatabaseError),

    #[error("Store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Job '{0}' already exists")]
    AlreadyExists(String),

    #[error("Job '{0}' not found")]
    NotFound(String),

    #[error("Corrupt record for job '{id}': {reason}")]
    Corrupt { id: String, reason: String },
}

/// Failure to obtain a response from a stage collaborator.
///
/// A non-success HTTP status is not a transport error: the response is
/// delivered to the continuation, which decides what it means.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Request to {destination} failed: {reason}")]
    Request { destination: String, reason: String },

    #[error("Request to {destination} timed out")]
    Timeout { destination: String },

    #[error("Unreadable response from {destination}: {reason}")]
    Body { destination: String, reason: String },
}

pub type Result<T> = std::result::Result<T, VidpipeError>;
