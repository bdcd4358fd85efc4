//! Error types for the human-verification client
//!
//! This module provides the error taxonomy with:
//! - Detailed error variants for collector and submission failures
//! - Error codes for programmatic handling
//! - User-facing messages for the host page

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::JsValue;

pub type Result<T> = std::result::Result<T, GateError>;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Collector errors (1xx)
    CollectorUnavailable = 100,
    AudioTimeout = 101,

    // Submission errors (2xx)
    TransportFailed = 200,
    HttpStatus = 201,
    InvalidResponse = 202,
    NoInteractionData = 203,

    // Encoding errors (3xx)
    EncodingFailed = 300,

    // Configuration errors (8xx)
    ConfigError = 800,

    // Internal errors (9xx)
    JsException = 900,
}

/// Main error type for the human-verification client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GateError {
    // ===== Collector Errors =====
    #[error("Entropy source unavailable: {0}")]
    CollectorUnavailable(String),

    #[error("Audio render did not complete within {0} ms")]
    AudioTimeout(u32),

    // ===== Submission Errors =====
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error! Status: {0}")]
    HttpStatus(u16),

    #[error("Invalid verdict response: {0}")]
    InvalidResponse(String),

    #[error("No interaction data to send")]
    NoInteractionData,

    // ===== Encoding Errors =====
    #[error("Encoding error: {0}")]
    Encoding(String),

    // ===== Configuration Errors =====
    #[error("Invalid configuration: {0}")]
    Config(String),

    // ===== Internal Errors =====
    #[error("JavaScript exception: {0}")]
    Js(String),
}

impl GateError {
    /// Get the error code for programmatic handling
    pub fn code(&self) -> ErrorCode {
        match self {
            GateError::CollectorUnavailable(_) => ErrorCode::CollectorUnavailable,
            GateError::AudioTimeout(_) => ErrorCode::AudioTimeout,
            GateError::Transport(_) => ErrorCode::TransportFailed,
            GateError::HttpStatus(_) => ErrorCode::HttpStatus,
            GateError::InvalidResponse(_) => ErrorCode::InvalidResponse,
            GateError::NoInteractionData => ErrorCode::NoInteractionData,
            GateError::Encoding(_) => ErrorCode::EncodingFailed,
            GateError::Config(_) => ErrorCode::ConfigError,
            GateError::Js(_) => ErrorCode::JsException,
        }
    }

    /// Whether this error came from talking to the verification service.
    ///
    /// These are logged and shown to the user, never retried automatically.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            GateError::Transport(_) | GateError::HttpStatus(_) | GateError::InvalidResponse(_)
        )
    }

    /// Whether this error only degrades the fingerprint (its slot becomes `null`).
    pub fn is_collector_failure(&self) -> bool {
        matches!(
            self,
            GateError::CollectorUnavailable(_) | GateError::AudioTimeout(_)
        )
    }

    /// Get a user-friendly message for display
    pub fn user_message(&self) -> String {
        match self {
            err if err.is_transport_failure() => {
                "An error occurred while processing the request.".into()
            }
            GateError::NoInteractionData => "No interaction data to send.".into(),
            GateError::CollectorUnavailable(_) | GateError::AudioTimeout(_) => {
                "Some device signals are unavailable in this browser.".into()
            }
            GateError::Config(_) => {
                "Invalid verification settings. Please check the page configuration.".into()
            }
            _ => "An internal error occurred. Please reload the page.".into(),
        }
    }
}

impl From<GateError> for JsValue {
    fn from(err: GateError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

impl From<JsValue> for GateError {
    fn from(value: JsValue) -> Self {
        match value.as_string() {
            Some(message) => GateError::Js(message),
            None => GateError::Js(format!("{:?}", value)),
        }
    }
}

impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        GateError::Encoding(err.to_string())
    }
}

/// Error information for JavaScript consumption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: u32,
    pub message: String,
    pub user_message: String,
}

impl From<&GateError> for ErrorInfo {
    fn from(err: &GateError) -> Self {
        ErrorInfo {
            code: err.code() as u32,
            message: err.to_string(),
            user_message: err.user_message(),
        }
    }
}
