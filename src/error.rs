//! Centralized error types for healthwarden using thiserror.
//!
//! None of these are fatal to the monitor loop: configuration errors fall
//! back to the built-in defaults, evaluation errors skip one rule, delivery
//! errors fail one channel and collection errors skip one tick.

use std::time::Duration;
use thiserror::Error;

/// Errors related to configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config file: {0}")]
    LoadError(String),
    #[error("invalid configuration: {0}")]
    ValidationError(String),
    #[error("invalid template in rule '{rule}': {message}")]
    InvalidTemplate { rule: String, message: String },
    #[error("invalid channel '{name}': {message}")]
    InvalidChannel { name: String, message: String },
    #[error("failed to save config file: {0}")]
    SaveError(String),
}

/// Errors related to alert message rendering.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template render failed: {message}")]
    RenderFailed { message: String },
}

/// Errors raised while evaluating a single rule against a metrics snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("metric '{path}' has type {found}, expected {expected}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: String,
    },
}

/// Errors related to delivering an alert to one channel.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
    #[error("endpoint rejected notification with status {status}")]
    Rejected { status: u16 },
    #[error("failed to send notification: {0}")]
    SendFailed(String),
    #[error("failed to build notification: {0}")]
    Build(String),
}

/// Errors related to fetching a metrics snapshot.
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("metrics request failed: {0}")]
    Request(String),
    #[error("metrics collection timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid metrics payload: {0}")]
    InvalidPayload(String),
    #[error("failed to read metrics file: {0}")]
    Io(String),
}
