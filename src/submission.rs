//! Reports sent to the verification service.
//!
//! Two independent submissions:
//! - the fingerprint report, sent once after assembly (fire-and-forget);
//! - the behavior report, sent on the user's "request code" action, whose
//!   verdict decides whether the OTP gate opens.
//!
//! Requests go through the [`Transport`] trait so the payload logic runs
//! without a browser. Nothing here retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GateConfig;
use crate::csv::to_csv;
use crate::error::{ErrorInfo, GateError, Result};
use crate::fingerprint::DeviceFingerprint;
use crate::profile::EnvironmentProfile;
use crate::recorder::EventLog;

pub const MOUSE_FILE_NAME: &str = "mouse_interactions.csv";
pub const KEY_FILE_NAME: &str = "key_interactions.csv";
pub const CSV_CONTENT_TYPE: &str = "text/csv";

pub const GATE_OPEN_MESSAGE: &str = "OTP has been sent to your mobile number!";
pub const GATE_CLOSED_MESSAGE: &str = "Verify you are a Human!";

/// Value of one multipart form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        content_type: String,
        contents: String,
    },
}

/// One named multipart form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

impl FormPart {
    pub fn text(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: FormValue::Text(value.into()),
        }
    }

    pub fn csv_file(name: &str, file_name: &str, contents: String) -> Self {
        Self {
            name: name.to_string(),
            value: FormValue::File {
                file_name: file_name.to_string(),
                content_type: CSV_CONTENT_TYPE.to_string(),
                contents,
            },
        }
    }
}

/// HTTP POST capability. Implementations return the response body of a
/// successful (2xx) response and map everything else to an error.
#[async_trait(?Send)]
pub trait Transport {
    async fn post_urlencoded(&self, url: &str, fields: &[(String, String)]) -> Result<String>;

    async fn post_multipart(&self, url: &str, parts: &[FormPart]) -> Result<String>;
}

/// Payload of the fingerprint report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintReport {
    pub fingerprint: DeviceFingerprint,
    pub timestamp_ms: i64,
}

impl FingerprintReport {
    pub fn fields(&self) -> Vec<(String, String)> {
        vec![
            ("fingerprint".to_string(), self.fingerprint.to_string()),
            ("timestamp".to_string(), self.timestamp_ms.to_string()),
        ]
    }
}

/// Payload of the behavior report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorReport {
    pub mouse_csv: String,
    pub key_csv: String,
    pub browser_info: String,
    /// Empty when the fingerprint has not been assembled yet.
    pub fingerprint: String,
}

impl BehaviorReport {
    pub fn build(
        log: &EventLog,
        profile: &EnvironmentProfile,
        fingerprint: Option<DeviceFingerprint>,
    ) -> Result<Self> {
        Ok(Self {
            mouse_csv: to_csv(log.pointer_events())?,
            key_csv: to_csv(log.field_events())?,
            browser_info: profile.to_json()?,
            fingerprint: fingerprint.map(|f| f.to_string()).unwrap_or_default(),
        })
    }

    pub fn parts(&self) -> Vec<FormPart> {
        vec![
            FormPart::csv_file("mouse_file", MOUSE_FILE_NAME, self.mouse_csv.clone()),
            FormPart::csv_file("key_file", KEY_FILE_NAME, self.key_csv.clone()),
            FormPart::text("browser_info", self.browser_info.clone()),
            FormPart::text("fingerprint", self.fingerprint.clone()),
        ]
    }
}

/// Four-part classification returned for a behavior report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub mouse_result: String,
    pub key_result: String,
    pub is_automated: String,
    pub is_bot: String,
}

impl Verdict {
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| GateError::InvalidResponse(e.to_string()))
    }

    /// Human pointer and keys, not automated, not a listed bot.
    pub fn is_human(&self) -> bool {
        self.mouse_result == "Human"
            && self.key_result == "Human"
            && self.is_automated == "No"
            && self.is_bot == "No"
    }

    /// Display text listing the four classifications.
    pub fn summary(&self) -> String {
        format!(
            "Mouse result: {}\nKey result: {}\nBrowser is controlled by: {}\nExist in bot database: {}",
            self.mouse_result, self.key_result, self.is_automated, self.is_bot
        )
    }
}

/// What the host page should show after a code request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateOutcome {
    pub gate_open: bool,
    pub message: String,
    pub summary: Option<String>,
    pub verdict: Option<Verdict>,
    pub error: Option<ErrorInfo>,
}

impl GateOutcome {
    pub fn from_verdict(verdict: Verdict) -> Self {
        let gate_open = verdict.is_human();
        Self {
            gate_open,
            message: if gate_open { GATE_OPEN_MESSAGE } else { GATE_CLOSED_MESSAGE }.to_string(),
            summary: Some(verdict.summary()),
            verdict: Some(verdict),
            error: None,
        }
    }

    /// Closed gate carrying the error's user message.
    pub fn from_error(err: &GateError) -> Self {
        Self {
            gate_open: false,
            message: err.user_message(),
            summary: None,
            verdict: None,
            error: Some(ErrorInfo::from(err)),
        }
    }

    pub fn from_result(result: Result<Verdict>) -> Self {
        match result {
            Ok(verdict) => Self::from_verdict(verdict),
            Err(err) => Self::from_error(&err),
        }
    }
}

/// Sends reports to the configured endpoints.
pub struct SubmissionClient<T> {
    transport: T,
    visit_url: String,
    predict_url: String,
}

impl<T: Transport> SubmissionClient<T> {
    pub fn new(transport: T, config: &GateConfig) -> Self {
        Self {
            transport,
            visit_url: config.visit_url(),
            predict_url: config.predict_url(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send the fingerprint report. The response body is ignored.
    pub async fn report_fingerprint(&self, report: FingerprintReport) -> Result<()> {
        self.transport
            .post_urlencoded(&self.visit_url, &report.fields())
            .await?;
        Ok(())
    }

    /// Send the behavior report and parse the verdict.
    ///
    /// Refuses locally, without a request, when no events were recorded.
    pub async fn submit_behavior(
        &self,
        log: &EventLog,
        profile: &EnvironmentProfile,
        fingerprint: Option<DeviceFingerprint>,
    ) -> Result<Verdict> {
        if log.is_empty() {
            return Err(GateError::NoInteractionData);
        }
        if fingerprint.is_none() {
            log::warn!("⚠️ Submitting behavior before the fingerprint is ready");
        }

        let report = BehaviorReport::build(log, profile, fingerprint)?;
        log::debug!(
            "Submitting {} pointer and {} field events",
            log.pointer_events().len(),
            log.field_events().len()
        );
        let body = self
            .transport
            .post_multipart(&self.predict_url, &report.parts())
            .await?;
        Verdict::parse(&body)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::recorder::InteractionEvent;
    use chrono::{TimeZone, Utc};
    use futures::executor::block_on;
    use std::cell::RefCell;

    pub(crate) const HUMAN_VERDICT: &str =
        r#"{"mouse_result":"Human","key_result":"Human","is_automated":"No","is_bot":"No"}"#;

    /// Captured request: URL plus either urlencoded fields or multipart parts.
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Sent {
        Form(String, Vec<(String, String)>),
        Multipart(String, Vec<FormPart>),
    }

    /// In-memory transport recording requests and replaying one response.
    pub(crate) struct RecordingTransport {
        pub sent: RefCell<Vec<Sent>>,
        pub response: Result<String>,
    }

    impl RecordingTransport {
        pub fn replying(response: Result<String>) -> Self {
            Self {
                sent: RefCell::new(Vec::new()),
                response,
            }
        }
    }

    #[async_trait(?Send)]
    impl Transport for RecordingTransport {
        async fn post_urlencoded(&self, url: &str, fields: &[(String, String)]) -> Result<String> {
            self.sent
                .borrow_mut()
                .push(Sent::Form(url.to_string(), fields.to_vec()));
            self.response.clone()
        }

        async fn post_multipart(&self, url: &str, parts: &[FormPart]) -> Result<String> {
            self.sent
                .borrow_mut()
                .push(Sent::Multipart(url.to_string(), parts.to_vec()));
            self.response.clone()
        }
    }

    pub(crate) fn profile() -> EnvironmentProfile {
        EnvironmentProfile {
            user_agent: "UA".into(),
            platform: "Linux x86_64".into(),
            webdriver: Some(false),
            languages: vec!["en-US".into()],
            plugins_count: 0,
            screen_resolution: "800x600".into(),
            screen_width: 800,
            screen_height: 600,
            max_touch_points: 0,
        }
    }

    fn sample_log() -> EventLog {
        let at = Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap();
        let mut log = EventLog::new();
        log.append(InteractionEvent::PointerMove { timestamp: at, x: 10, y: 20 });
        log.append(InteractionEvent::FieldInput {
            timestamp: at,
            field_name: Some("otp".into()),
            field_value: "123".into(),
        });
        log
    }

    #[test]
    fn test_verdict_gating() {
        let human = Verdict::parse(HUMAN_VERDICT).unwrap();
        assert!(human.is_human());

        for (field, value) in [
            ("mouse_result", "Bot"),
            ("key_result", "Bot"),
            ("is_automated", "Selenium"),
            ("is_bot", "Yes"),
        ] {
            let mut json: serde_json::Value = serde_json::from_str(HUMAN_VERDICT).unwrap();
            json[field] = serde_json::Value::from(value);
            let verdict: Verdict = serde_json::from_value(json).unwrap();
            assert!(!verdict.is_human(), "{} = {} should close the gate", field, value);
        }
    }

    #[test]
    fn test_verdict_parse_errors() {
        assert!(matches!(Verdict::parse("not json"), Err(GateError::InvalidResponse(_))));
        assert!(matches!(
            Verdict::parse(r#"{"mouse_result":"Human"}"#),
            Err(GateError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_outcomes() {
        let open = GateOutcome::from_verdict(Verdict::parse(HUMAN_VERDICT).unwrap());
        assert!(open.gate_open);
        assert_eq!(open.message, GATE_OPEN_MESSAGE);
        assert!(open.summary.unwrap().starts_with("Mouse result: Human\n"));

        let failed = GateOutcome::from_error(&GateError::HttpStatus(502));
        assert!(!failed.gate_open);
        assert_eq!(failed.message, "An error occurred while processing the request.");
        assert_eq!(failed.error.map(|e| e.code), Some(201));
    }

    #[test]
    fn test_fingerprint_report_fields() {
        let transport = RecordingTransport::replying(Ok("{}".into()));
        let client = SubmissionClient::new(transport, &GateConfig::default());
        let fingerprint = DeviceFingerprint::from_joined("A | B | C | D");

        block_on(client.report_fingerprint(FingerprintReport {
            fingerprint,
            timestamp_ms: 1_725_177_600_000,
        }))
        .unwrap();

        let sent = client.transport().sent.borrow();
        assert_eq!(
            sent[0],
            Sent::Form(
                "http://127.0.0.1:8000/add_visit_info".into(),
                vec![
                    ("fingerprint".into(), fingerprint.to_string()),
                    ("timestamp".into(), "1725177600000".into()),
                ]
            )
        );
    }

    #[test]
    fn test_behavior_report_parts() {
        let transport = RecordingTransport::replying(Ok(HUMAN_VERDICT.into()));
        let client = SubmissionClient::new(transport, &GateConfig::default());
        let fingerprint = DeviceFingerprint::from_joined("x");

        let verdict = block_on(client.submit_behavior(&sample_log(), &profile(), Some(fingerprint))).unwrap();
        assert!(verdict.is_human());

        let sent = client.transport().sent.borrow();
        let Sent::Multipart(url, parts) = &sent[0] else {
            panic!("expected multipart request");
        };
        assert_eq!(url, "http://127.0.0.1:8000/predict_behavior");

        let names: Vec<_> = parts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["mouse_file", "key_file", "browser_info", "fingerprint"]);
        assert_eq!(
            parts[0].value,
            FormValue::File {
                file_name: MOUSE_FILE_NAME.into(),
                content_type: "text/csv".into(),
                contents: "eventType,timestamp,x,y\n\"mousemove\",\"2024-09-01T08:00:00.000Z\",10,20".into(),
            }
        );
        assert!(matches!(
            &parts[1].value,
            FormValue::File { file_name, contents, .. }
                if file_name == KEY_FILE_NAME
                    && contents.starts_with("eventType,timestamp,fieldName,fieldValue\n")
        ));
        assert_eq!(parts[3].value, FormValue::Text(fingerprint.to_string()));
    }

    #[test]
    fn test_empty_log_is_refused_without_request() {
        let transport = RecordingTransport::replying(Ok(HUMAN_VERDICT.into()));
        let client = SubmissionClient::new(transport, &GateConfig::default());

        let result = block_on(client.submit_behavior(&EventLog::new(), &profile(), None));
        assert_eq!(result, Err(GateError::NoInteractionData));
        assert!(client.transport().sent.borrow().is_empty());
    }

    #[test]
    fn test_missing_fingerprint_is_sent_empty() {
        let report = BehaviorReport::build(&sample_log(), &profile(), None).unwrap();
        assert_eq!(report.fingerprint, "");
    }

    #[test]
    fn test_transport_errors_propagate() {
        let transport = RecordingTransport::replying(Err(GateError::HttpStatus(500)));
        let client = SubmissionClient::new(transport, &GateConfig::default());

        let result = block_on(client.submit_behavior(&sample_log(), &profile(), None));
        assert_eq!(result, Err(GateError::HttpStatus(500)));
    }
}
