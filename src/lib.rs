//! # HumanGate WASM Client
//!
//! Browser-side half of a human-verification gate, compiled to WebAssembly.
//!
//! On page load the client derives a device fingerprint from four entropy
//! signals and reports it. While the page is open it records pointer and
//! form-input events. When the user asks for a one-time code, the recorded
//! behavior is submitted and the service's verdict decides whether the
//! code is sent.
//!
//! ## Architecture
//!
//! ```text
//! HumanGate (WASM)
//!   ↓
//! GateSession ── FingerprintSlot ← BrowserSources (canvas, webgl, audio, environment)
//!   │          └─ BehaviorRecorder ← DomEventSource
//!   ↓
//! SubmissionClient
//!   ↓
//! FetchTransport (window.fetch)
//!   ↓
//! Verification service
//! ```
//!
//! Everything runs on the page's single thread.

use std::rc::Rc;

use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

// Modules
pub mod collectors;
pub mod config;
pub mod csv;
mod error;
pub mod fingerprint;
pub mod hash;
pub mod profile;
pub mod recorder;
pub mod session;
pub mod submission;
pub mod transport;

pub use collectors::BrowserSources;
pub use config::GateConfig;
pub use error::{ErrorCode, ErrorInfo, GateError, Result};
pub use fingerprint::{
    assemble_fingerprint, DeviceFingerprint, EntropySource, Establishment, FingerprintSlot, RawSignal,
};
pub use hash::hash_str;
pub use profile::{DeclaredEnvironment, EnvironmentProfile};
pub use recorder::{
    BehaviorRecorder, DomEventSource, EventKind, EventLog, EventSource, InteractionEvent,
    SubscriptionHandle,
};
pub use session::GateSession;
pub use submission::{GateOutcome, SubmissionClient, Transport, Verdict};
pub use transport::FetchTransport;

#[wasm_bindgen(start)]
pub fn init() {
    // Initialize logging; a second init (e.g. re-imported module) is harmless.
    if console_log::init_with_level(log::Level::Info).is_err() {
        return;
    }

    log::info!("HumanGate WASM client initialized");
}

#[derive(Serialize)]
struct EventCounts {
    pointer: usize,
    field: usize,
}

/// Human-verification gate for one page.
#[wasm_bindgen]
pub struct HumanGate {
    session: Rc<GateSession<FetchTransport>>,
    sources: BrowserSources,
}

#[wasm_bindgen]
impl HumanGate {
    /// Create a gate from optional settings.
    ///
    /// ```js
    /// const gate = new HumanGate({ endpoint: "https://verify.example.com" });
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> std::result::Result<HumanGate, JsValue> {
        let config = GateConfig::from_js(options)?;
        log::info!("Verification endpoint: {}", config.endpoint);

        Ok(HumanGate {
            sources: BrowserSources::new(config.audio_timeout_ms),
            session: Rc::new(GateSession::new(FetchTransport::new(), &config)),
        })
    }

    /// Attach the recorder, assemble the fingerprint and report it.
    ///
    /// Resolves with the fingerprint as decimal text. The report is sent in
    /// the background, once per session, even when calls overlap.
    #[wasm_bindgen]
    pub async fn start(&self) -> std::result::Result<String, JsValue> {
        match DomEventSource::from_window() {
            Ok(source) => {
                if let Err(e) = self.session.recorder().attach(&source) {
                    log::warn!("⚠️ Behavior recorder not attached: {}", e);
                }
            }
            Err(e) => log::warn!("⚠️ Behavior recorder not attached: {}", e),
        }

        let established = self.session.establish_fingerprint(&self.sources).await;
        let fingerprint = established.fingerprint();
        log::info!("Generated Fingerprint: {}", fingerprint);

        // Overlapping calls share one assembly; only its owner reports.
        if established.is_assembled() {
            let session = Rc::clone(&self.session);
            spawn_local(async move {
                session.report_fingerprint(fingerprint).await;
            });
        }

        Ok(fingerprint.to_string())
    }

    /// The session fingerprint, once assembled.
    #[wasm_bindgen]
    pub fn fingerprint(&self) -> Option<String> {
        self.session.fingerprint().map(|fp| fp.to_string())
    }

    /// Submit recorded behavior and resolve with the gate outcome.
    ///
    /// Never rejects for submission failures; those come back as a closed
    /// outcome carrying `error`.
    #[wasm_bindgen]
    pub async fn request_code(&self) -> std::result::Result<JsValue, JsValue> {
        let environment = collectors::read_declared_environment().unwrap_or_else(|e| {
            log::warn!("⚠️ Environment readout failed, sending unexposed profile: {}", e);
            DeclaredEnvironment::unexposed()
        });

        let outcome = self.session.request_code(&environment.profile()).await;
        serde_wasm_bindgen::to_value(&outcome).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Number of buffered pointer and field events.
    #[wasm_bindgen]
    pub fn event_counts(&self) -> JsValue {
        let (pointer, field) = self.session.recorder().counts();
        serde_wasm_bindgen::to_value(&EventCounts { pointer, field }).unwrap_or(JsValue::NULL)
    }

    /// Remove the DOM listeners. Buffered events are kept.
    #[wasm_bindgen]
    pub fn stop(&self) {
        self.session.recorder().detach();
        log::info!("Behavior recorder detached");
    }
}

/// The 32-bit string hash used for fingerprints, exposed for the host page.
#[wasm_bindgen]
pub fn fingerprint_hash(text: &str) -> i32 {
    hash_str(text)
}
