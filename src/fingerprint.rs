//! Fingerprint assembly.
//!
//! Four entropy signals are gathered through [`EntropySource`], joined in
//! a fixed order and hashed into a [`DeviceFingerprint`]:
//!
//! ```text
//! rendering | graphics adapter | audio | environment
//! ```
//!
//! Absent signals keep their slot as the literal `null`, so the join has the
//! same shape in every browser. The audio collector is the only one that
//! suspends; the others run eagerly around it.

use std::cell::RefCell;
use std::fmt;

use async_trait::async_trait;
use futures::channel::oneshot;
use serde::{Deserialize, Serialize};

use crate::hash::hash_str;

/// Output of one collector: text, or `None` when the source is not exposed.
pub type RawSignal = Option<String>;

/// Separator between signals in the canonical join.
pub const SIGNAL_SEPARATOR: &str = " | ";

/// Text standing in for an absent signal.
pub const ABSENT_SIGNAL: &str = "null";

/// The combined device identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceFingerprint(i32);

impl DeviceFingerprint {
    /// Hash a canonical join into a fingerprint.
    pub fn from_joined(joined: &str) -> Self {
        Self(hash_str(joined))
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for DeviceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four entropy collectors.
///
/// Implemented by the browser collectors and by fixed-signal sources in
/// tests. Only the audio signal is asynchronous.
#[async_trait(?Send)]
pub trait EntropySource {
    /// Hash of a fixed 2D drawing, or `None` without a 2D surface.
    fn rendering_signature(&self) -> RawSignal;

    /// `"<renderer> | <vendor>"`, or `None` without adapter introspection.
    fn graphics_adapter_signature(&self) -> RawSignal;

    /// Sum of rendered sample magnitudes, resolved when the render completes.
    async fn audio_signature(&self) -> RawSignal;

    /// Declared navigator/screen properties. Always present.
    fn environment_signature(&self) -> String;
}

/// Join signals with [`SIGNAL_SEPARATOR`], writing absent ones as `null`.
pub fn join_signals(signals: &[RawSignal]) -> String {
    signals
        .iter()
        .map(|signal| signal.as_deref().unwrap_or(ABSENT_SIGNAL))
        .collect::<Vec<_>>()
        .join(SIGNAL_SEPARATOR)
}

/// Run all collectors and hash their canonical join.
///
/// There is no timeout here: if the audio render never completes this
/// future never resolves. Browser sources can bound it with
/// `audio_timeout_ms`.
pub async fn assemble_fingerprint<S: EntropySource + ?Sized>(source: &S) -> DeviceFingerprint {
    let rendering = source.rendering_signature();
    let graphics_adapter = source.graphics_adapter_signature();
    let audio = source.audio_signature().await;
    let environment = Some(source.environment_signature());

    let joined = join_signals(&[rendering, graphics_adapter, audio, environment]);
    log::debug!("Assembled {} bytes of fingerprint input", joined.len());
    DeviceFingerprint::from_joined(&joined)
}

/// How a call to [`FingerprintSlot::establish`] obtained its fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Establishment {
    /// This call ran the collectors.
    Assembled(DeviceFingerprint),
    /// Already stored, or assembled by an overlapping call.
    Stored(DeviceFingerprint),
}

impl Establishment {
    pub fn fingerprint(self) -> DeviceFingerprint {
        match self {
            Establishment::Assembled(fp) | Establishment::Stored(fp) => fp,
        }
    }

    pub fn is_assembled(self) -> bool {
        matches!(self, Establishment::Assembled(_))
    }
}

#[derive(Debug, Default)]
enum SlotState {
    #[default]
    Empty,
    /// One call is assembling; the others wait on these channels.
    Assembling(Vec<oneshot::Sender<DeviceFingerprint>>),
    Ready(DeviceFingerprint),
}

/// Write-once holder for the session's fingerprint.
///
/// Overlapping callers share one assembly: the first runs the collectors,
/// the rest wait for its result. If the assembling call is dropped before
/// it finishes, a waiting caller takes over.
#[derive(Debug, Default)]
pub struct FingerprintSlot {
    state: RefCell<SlotState>,
}

impl FingerprintSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<DeviceFingerprint> {
        match *self.state.borrow() {
            SlotState::Ready(fingerprint) => Some(fingerprint),
            _ => None,
        }
    }

    /// Return the stored fingerprint, assembling it on first use.
    pub async fn get_or_assemble<S: EntropySource + ?Sized>(&self, source: &S) -> DeviceFingerprint {
        self.establish(source).await.fingerprint()
    }

    /// Like [`get_or_assemble`](Self::get_or_assemble), also telling
    /// whether this call was the one that assembled.
    pub async fn establish<S: EntropySource + ?Sized>(&self, source: &S) -> Establishment {
        loop {
            let waiter = {
                let mut state = self.state.borrow_mut();
                let waiter = match &mut *state {
                    SlotState::Ready(fingerprint) => return Establishment::Stored(*fingerprint),
                    SlotState::Assembling(waiters) => {
                        let (tx, rx) = oneshot::channel();
                        waiters.push(tx);
                        Some(rx)
                    }
                    SlotState::Empty => None,
                };
                if waiter.is_none() {
                    *state = SlotState::Assembling(Vec::new());
                }
                waiter
            };

            match waiter {
                None => return Establishment::Assembled(self.assemble_and_store(source).await),
                Some(rx) => {
                    if let Ok(fingerprint) = rx.await {
                        return Establishment::Stored(fingerprint);
                    }
                    // Assembling call was dropped; the slot is empty again.
                }
            }
        }
    }

    async fn assemble_and_store<S: EntropySource + ?Sized>(&self, source: &S) -> DeviceFingerprint {
        let mut guard = AssemblyGuard {
            state: &self.state,
            finished: false,
        };
        let fingerprint = assemble_fingerprint(source).await;
        guard.finished = true;

        if let SlotState::Assembling(waiters) = self.state.replace(SlotState::Ready(fingerprint)) {
            for waiter in waiters {
                let _ = waiter.send(fingerprint);
            }
        }
        fingerprint
    }
}

/// Resets an abandoned assembly so waiters are released and retry.
struct AssemblyGuard<'a> {
    state: &'a RefCell<SlotState>,
    finished: bool,
}

impl Drop for AssemblyGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.state.replace(SlotState::Empty);
        }
    }
}

/// Format a number the way JavaScript's `String(number)` does.
///
/// Shortest round-trip digits, with exponent notation outside
/// `[1e-6, 1e21)`.
pub fn format_js_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.into();
    }
    if value == 0.0 {
        return "0".into();
    }

    if (1e-6..1e21).contains(&value.abs()) {
        return value.to_string();
    }

    let text = format!("{:e}", value);
    match text.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => text,
    }
}
