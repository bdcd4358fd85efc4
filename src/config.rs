//! Client configuration.
//!
//! Passed from JavaScript as an optional plain object; every field has a
//! default, so `new HumanGate()` and `new HumanGate({ endpoint: "..." })`
//! both work.

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::error::{GateError, Result};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000";
pub const DEFAULT_VISIT_PATH: &str = "/add_visit_info";
pub const DEFAULT_PREDICT_PATH: &str = "/predict_behavior";

/// Verification client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Base URL of the verification service.
    pub endpoint: String,
    /// Path receiving the fingerprint report.
    pub visit_path: String,
    /// Path receiving behavior reports and answering with a verdict.
    pub predict_path: String,
    /// Upper bound on the audio render. `None` waits indefinitely.
    pub audio_timeout_ms: Option<u32>,
    /// Forget submitted events after a successful behavior report.
    pub clear_after_submit: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            visit_path: DEFAULT_VISIT_PATH.to_string(),
            predict_path: DEFAULT_PREDICT_PATH.to_string(),
            audio_timeout_ms: None,
            clear_after_submit: false,
        }
    }
}

impl GateConfig {
    /// Read options passed from JavaScript. `undefined`/`null` mean defaults.
    pub fn from_js(options: JsValue) -> Result<Self> {
        if options.is_undefined() || options.is_null() {
            return Ok(Self::default());
        }
        let config: Self = serde_wasm_bindgen::from_value(options)
            .map_err(|e| GateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(GateError::Config(format!(
                "endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        if self.audio_timeout_ms == Some(0) {
            return Err(GateError::Config("audio_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn visit_url(&self) -> String {
        join_url(&self.endpoint, &self.visit_path)
    }

    pub fn predict_url(&self) -> String {
        join_url(&self.endpoint, &self.predict_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
