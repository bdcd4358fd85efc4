//! Per-page verification session.
//!
//! Ties the write-once fingerprint, the behavior recorder and the
//! submission client together. Everything here is single-threaded and
//! lives as long as the page.

use crate::config::GateConfig;
use crate::fingerprint::{DeviceFingerprint, EntropySource, Establishment, FingerprintSlot};
use crate::profile::EnvironmentProfile;
use crate::recorder::BehaviorRecorder;
use crate::submission::{FingerprintReport, GateOutcome, SubmissionClient, Transport};

pub struct GateSession<T> {
    client: SubmissionClient<T>,
    recorder: BehaviorRecorder,
    fingerprint: FingerprintSlot,
    clear_after_submit: bool,
}

impl<T: Transport> GateSession<T> {
    pub fn new(transport: T, config: &GateConfig) -> Self {
        Self {
            client: SubmissionClient::new(transport, config),
            recorder: BehaviorRecorder::new(),
            fingerprint: FingerprintSlot::new(),
            clear_after_submit: config.clear_after_submit,
        }
    }

    pub fn recorder(&self) -> &BehaviorRecorder {
        &self.recorder
    }

    pub fn client(&self) -> &SubmissionClient<T> {
        &self.client
    }

    pub fn fingerprint(&self) -> Option<DeviceFingerprint> {
        self.fingerprint.get()
    }

    /// Assemble the session fingerprint, or return it if already assembled.
    ///
    /// Exactly one caller per session gets [`Establishment::Assembled`];
    /// that caller owns the fingerprint report.
    pub async fn establish_fingerprint<S: EntropySource + ?Sized>(&self, source: &S) -> Establishment {
        self.fingerprint.establish(source).await
    }

    /// Report the fingerprint once. Failures are logged and dropped.
    pub async fn report_fingerprint(&self, fingerprint: DeviceFingerprint) {
        let report = FingerprintReport {
            fingerprint,
            timestamp_ms: now_millis(),
        };
        match self.client.report_fingerprint(report).await {
            Ok(()) => log::info!("Visit info saved for fingerprint {}", fingerprint),
            Err(e) => log::warn!("⚠️ Fingerprint report failed: {}", e),
        }
    }

    /// Submit everything recorded so far and map the verdict to a gate outcome.
    pub async fn request_code(&self, profile: &EnvironmentProfile) -> GateOutcome {
        let snapshot = self.recorder.snapshot();
        let result = self
            .client
            .submit_behavior(&snapshot, profile, self.fingerprint())
            .await;

        match &result {
            Ok(verdict) => {
                log::info!(
                    "Verdict: mouse={} key={} automated={} bot={}",
                    verdict.mouse_result,
                    verdict.key_result,
                    verdict.is_automated,
                    verdict.is_bot
                );
                if self.clear_after_submit {
                    self.recorder.release(&snapshot);
                }
            }
            Err(e) if e.is_transport_failure() => log::error!("❌ Behavior report failed: {}", e),
            Err(e) => log::warn!("Behavior report not sent: {}", e),
        }

        GateOutcome::from_result(result)
    }
}

fn now_millis() -> i64 {
    web_time::SystemTime::now()
        .duration_since(web_time::SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GateError;
    use crate::fingerprint::RawSignal;
    use crate::recorder::InteractionEvent;
    use crate::submission::tests::{profile, RecordingTransport, Sent, HUMAN_VERDICT};
    use async_trait::async_trait;
    use chrono::Utc;
    use futures::executor::block_on;

    struct StaticSource;

    #[async_trait(?Send)]
    impl EntropySource for StaticSource {
        fn rendering_signature(&self) -> RawSignal {
            Some("-1045829937".into())
        }

        fn graphics_adapter_signature(&self) -> RawSignal {
            None
        }

        async fn audio_signature(&self) -> RawSignal {
            Some("35.73833402246237".into())
        }

        fn environment_signature(&self) -> String {
            "UserAgent: test".into()
        }
    }

    fn session(response: crate::error::Result<String>, clear_after_submit: bool) -> GateSession<RecordingTransport> {
        let config = GateConfig {
            clear_after_submit,
            ..GateConfig::default()
        };
        GateSession::new(RecordingTransport::replying(response), &config)
    }

    fn click() -> InteractionEvent {
        InteractionEvent::PointerClick { timestamp: Utc::now(), x: 5, y: 5 }
    }

    fn sent_fingerprint(session: &GateSession<RecordingTransport>, index: usize) -> String {
        match &session.client().transport().sent.borrow()[index] {
            Sent::Multipart(_, parts) => match &parts[3].value {
                crate::submission::FormValue::Text(text) => text.clone(),
                other => panic!("unexpected fingerprint part {:?}", other),
            },
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_fingerprint_reported_with_timestamp() {
        let session = session(Ok("{}".into()), false);
        let fingerprint = block_on(session.establish_fingerprint(&StaticSource)).fingerprint();
        block_on(session.report_fingerprint(fingerprint));

        let sent = session.client().transport().sent.borrow();
        let Sent::Form(_, fields) = &sent[0] else {
            panic!("expected form request");
        };
        assert_eq!(fields[0], ("fingerprint".to_string(), fingerprint.to_string()));
        assert!(fields[1].1.parse::<i64>().unwrap() > 0);
    }

    #[test]
    fn test_overlapping_establish_assembles_for_one_caller() {
        let session = session(Ok("{}".into()), false);
        let (first, second) = block_on(futures::future::join(
            session.establish_fingerprint(&StaticSource),
            session.establish_fingerprint(&StaticSource),
        ));

        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(
            [first.is_assembled(), second.is_assembled()].iter().filter(|a| **a).count(),
            1
        );
        assert!(!block_on(session.establish_fingerprint(&StaticSource)).is_assembled());
    }

    #[test]
    fn test_failed_report_does_not_disturb_session() {
        let session = session(Err(GateError::Transport("offline".into())), false);
        let fingerprint = block_on(session.establish_fingerprint(&StaticSource)).fingerprint();
        block_on(session.report_fingerprint(fingerprint));
        assert_eq!(session.fingerprint(), Some(fingerprint));
    }

    #[test]
    fn test_request_code_uses_stored_fingerprint() {
        let session = session(Ok(HUMAN_VERDICT.into()), false);
        let fingerprint = block_on(session.establish_fingerprint(&StaticSource)).fingerprint();
        session.recorder().record(click());

        let outcome = block_on(session.request_code(&profile()));
        assert!(outcome.gate_open);
        assert_eq!(sent_fingerprint(&session, 0), fingerprint.to_string());
    }

    #[test]
    fn test_submissions_are_cumulative_by_default() {
        let session = session(Ok(HUMAN_VERDICT.into()), false);
        session.recorder().record(click());
        block_on(session.request_code(&profile()));
        session.recorder().record(click());
        block_on(session.request_code(&profile()));

        assert_eq!(session.recorder().len(), 2);
    }

    #[test]
    fn test_clear_after_submit_releases_sent_events() {
        let session = session(Ok(HUMAN_VERDICT.into()), true);
        session.recorder().record(click());
        block_on(session.request_code(&profile()));
        assert!(session.recorder().is_empty());

        let outcome = block_on(session.request_code(&profile()));
        assert!(!outcome.gate_open);
        assert_eq!(outcome.message, "No interaction data to send.");
    }

    #[test]
    fn test_failed_submission_keeps_events() {
        let session = session(Err(GateError::HttpStatus(500)), true);
        session.recorder().record(click());

        let outcome = block_on(session.request_code(&profile()));
        assert!(!outcome.gate_open);
        assert_eq!(outcome.message, "An error occurred while processing the request.");
        assert_eq!(session.recorder().len(), 1);
    }

    #[test]
    fn test_bot_verdict_closes_gate() {
        let verdict = r#"{"mouse_result":"Bot","key_result":"Human","is_automated":"No","is_bot":"No"}"#;
        let session = session(Ok(verdict.into()), false);
        session.recorder().record(click());

        let outcome = block_on(session.request_code(&profile()));
        assert!(!outcome.gate_open);
        assert_eq!(outcome.message, "Verify you are a Human!");
    }
}
