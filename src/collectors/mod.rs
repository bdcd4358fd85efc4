//! Browser entropy collectors.
//!
//! Each collector reads one browser subsystem and reports text, or `None`
//! when the subsystem is not exposed. Failures are never raised: a missing
//! API only means one fewer bit of entropy.
//!
//! | Collector      | Source                                   |
//! |----------------|------------------------------------------|
//! | `canvas`       | 2D canvas data URL, hashed               |
//! | `webgl`        | unmasked renderer and vendor             |
//! | `audio`        | offline audio render, summed             |
//! | `environment`  | navigator and screen properties          |

pub mod audio;
pub mod canvas;
pub mod environment;
pub mod js_helpers;
pub mod webgl;

use async_trait::async_trait;

use crate::error::GateError;
use crate::fingerprint::{EntropySource, RawSignal};

pub use environment::read_declared_environment;

/// Log level for a collector that came back empty.
///
/// A source the browser does not expose is routine. Timeouts and unexpected
/// JavaScript exceptions are worth a warning.
pub fn absence_level(err: &GateError) -> log::Level {
    match err {
        GateError::AudioTimeout(_) => log::Level::Warn,
        e if e.is_collector_failure() => log::Level::Debug,
        _ => log::Level::Warn,
    }
}

/// Log why `signal` is absent and yield the absent signal.
fn absent(signal: &str, err: &GateError) -> RawSignal {
    log::log!(absence_level(err), "{} signature unavailable: {}", signal, err);
    None
}

/// The live browser as an [`EntropySource`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserSources {
    /// Bound on the audio render; `None` waits for it indefinitely.
    pub audio_timeout_ms: Option<u32>,
}

impl BrowserSources {
    pub fn new(audio_timeout_ms: Option<u32>) -> Self {
        Self { audio_timeout_ms }
    }
}

#[async_trait(?Send)]
impl EntropySource for BrowserSources {
    fn rendering_signature(&self) -> RawSignal {
        canvas::collect()
    }

    fn graphics_adapter_signature(&self) -> RawSignal {
        webgl::collect()
    }

    async fn audio_signature(&self) -> RawSignal {
        audio::collect(self.audio_timeout_ms).await
    }

    fn environment_signature(&self) -> String {
        environment::collect()
    }
}
