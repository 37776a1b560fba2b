// src/error.rs

//! Typed failures for the collaborators the scan workflow talks to.
//!
//! Expected probe conditions (non-200 responses, unreachable hosts) are not
//! errors: they travel as `FetchOutcome` values. Everything here is either a
//! bootstrap failure or a side effect that the result sink logs and isolates.

use thiserror::Error;

/// Rejected construction of a `TargetDescriptor`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("target domain is empty")]
    EmptyDomain,

    #[error("target port is empty")]
    EmptyPort,

    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),
}

/// Failures of the key-value storage collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("storage rejected upsert for {domain}:{port} with status {status}")]
    Rejected {
        domain: String,
        port: String,
        status: u16,
    },

    #[error("invalid storage endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Failures of the alert messaging collaborator.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("no subscriber is listening on the alert channel")]
    NoSubscribers,

    #[error("failed to serialize alert: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write alert: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration value: {field} - {reason}")]
    Invalid { field: String, reason: String },
}
