//! Startup error type
//!
//! Request-time failures never reach here; they become HTTP responses.

use crate::wiki::TemplateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WikiError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid listen address: {0}")]
    Address(String),
    #[error("failed to load templates: {0}")]
    Template(#[from] TemplateError),
    #[error("failed to open pages directory '{path}': {source}")]
    DataDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open log files: {0}")]
    Logger(#[source] std::io::Error),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
