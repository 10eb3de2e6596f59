//! Client-side submission driver: assembles the document, posts it to the
//! relay, and renders success or failure text.
//!
//! Every browser-facing concern is an injected collaborator ([`FormSource`],
//! [`StatusDisplay`], [`RelayTransport`]) so the whole flow runs under test
//! without a browser or a network.

use async_trait::async_trait;
use image::DynamicImage;
use url::Url;

use crate::document::{self, FormSnapshot, PageGeometry, RenderedDocument, raster, text};

/// Longest prefix of a non-JSON relay response surfaced to the user.
pub const ERROR_SNIPPET_LIMIT: usize = 200;

/// Lifecycle of one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Idle,
    Submitting { message: String },
    Success { file_id: String },
    Failure { message: String },
}

/// Which assembly strategy the reporter drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyStrategy {
    /// Rasterize the rendered form and slice it into pages
    Raster,
    /// Walk the logical sections and emit positioned text
    StructuredText,
}

/// The form being submitted. Captures field state, optionally rasterizes the
/// rendered form (bracketed by `begin_capture`/`end_capture` so temporary UI
/// mutations are always undone), and resets after a confirmed success.
pub trait FormSource {
    fn snapshot(&self) -> FormSnapshot;
    /// Apply capture-time UI mutations (readonly styling and the like)
    fn begin_capture(&mut self);
    fn capture(&mut self) -> anyhow::Result<DynamicImage>;
    /// Undo whatever `begin_capture` did; runs on failure paths too
    fn end_capture(&mut self);
    fn reset(&mut self);
}

/// Where submission progress is rendered.
pub trait StatusDisplay {
    fn show(&mut self, state: &SubmissionState);
    fn set_submit_enabled(&mut self, enabled: bool);
    /// Ask whether to clear the form after a success
    fn offer_reset(&mut self) -> bool;
}

/// Raw round-trip result; the reporter owns parsing so malformed bodies can
/// be surfaced verbatim.
#[derive(Debug, Clone)]
pub struct RelayReply {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn submit(&self, file_name: &str, pdf: Vec<u8>) -> anyhow::Result<RelayReply>;
}

/// Production transport: multipart POST to the relay endpoint.
pub struct HttpRelayTransport {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpRelayTransport {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl RelayTransport for HttpRelayTransport {
    async fn submit(&self, file_name: &str, pdf: Vec<u8>) -> anyhow::Result<RelayReply> {
        let part = reqwest::multipart::Part::bytes(pdf)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = reqwest::multipart::Form::new().part("pdf", part);
        let response = self.http.post(self.endpoint.clone()).multipart(form).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RelayReply { status, body })
    }
}

/// Errors a submission can surface client-side.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The relay answered with something that is not JSON
    #[error("Server returned non-JSON response: {snippet}")]
    ClientParse { snippet: String },

    /// The relay answered with a JSON error body
    #[error("{message}")]
    Relay { message: String },

    /// Assembly or transport failure
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Drives `Idle -> Submitting -> Success | Failure` for one form. The submit
/// control is re-enabled on every outcome; that is the one guaranteed
/// cleanup step.
pub struct StatusReporter<F, D, T> {
    form: F,
    display: D,
    transport: T,
    strategy: AssemblyStrategy,
    geometry: PageGeometry,
    state: SubmissionState,
}

impl<F, D, T> StatusReporter<F, D, T>
where
    F: FormSource,
    D: StatusDisplay,
    T: RelayTransport,
{
    pub fn new(form: F, display: D, transport: T, strategy: AssemblyStrategy) -> Self {
        Self {
            form,
            display,
            transport,
            strategy,
            geometry: PageGeometry::A4,
            state: SubmissionState::Idle,
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub async fn submit(&mut self) {
        self.display.set_submit_enabled(false);
        self.transition(SubmissionState::Submitting {
            message: "Generating PDF, please wait...".to_string(),
        });

        let outcome = self.run_submission().await;
        match outcome {
            Ok(file_id) => {
                self.transition(SubmissionState::Success { file_id });
                if self.display.offer_reset() {
                    self.form.reset();
                }
            }
            Err(error) => {
                self.transition(SubmissionState::Failure {
                    message: format!("Error: {error:#}"),
                });
            }
        }

        self.display.set_submit_enabled(true);
    }

    async fn run_submission(&mut self) -> Result<String, ReportError> {
        let snapshot = self.form.snapshot();
        let file_name = document::artifact_name(&snapshot, None);

        let rendered = self.assemble(&snapshot)?;
        let pdf = rendered.to_pdf_bytes(&file_name).map_err(ReportError::Other)?;

        self.transition(SubmissionState::Submitting {
            message: "PDF generated. Uploading to Google Drive...".to_string(),
        });

        let reply = self.transport.submit(&file_name, pdf).await?;
        let parsed: serde_json::Value = serde_json::from_str(&reply.body).map_err(|_| ReportError::ClientParse {
            snippet: snippet(&reply.body).to_string(),
        })?;

        if (200..300).contains(&reply.status) {
            match parsed.get("fileId").and_then(|v| v.as_str()) {
                Some(file_id) if !file_id.is_empty() => Ok(file_id.to_string()),
                _ => Err(ReportError::Relay {
                    message: "Server response carried no file id".to_string(),
                }),
            }
        } else {
            let error = parsed.get("error").and_then(|v| v.as_str()).unwrap_or("Upload failed");
            let message = match parsed.get("details").and_then(|v| v.as_str()) {
                Some(details) => format!("{error}: {details}"),
                None => error.to_string(),
            };
            Err(ReportError::Relay { message })
        }
    }

    fn assemble(&mut self, snapshot: &FormSnapshot) -> Result<RenderedDocument, ReportError> {
        match self.strategy {
            AssemblyStrategy::StructuredText => Ok(text::assemble(snapshot, self.geometry)),
            AssemblyStrategy::Raster => {
                self.form.begin_capture();
                let captured = self.form.capture();
                self.form.end_capture();
                Ok(raster::assemble(&captured?, self.geometry))
            }
        }
    }

    fn transition(&mut self, state: SubmissionState) {
        self.state = state;
        self.display.show(&self.state);
    }
}

/// Bounded, char-boundary-safe prefix of a raw response body.
fn snippet(body: &str) -> &str {
    let mut end = body.len().min(ERROR_SNIPPET_LIMIT);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FieldValue;
    use anyhow::anyhow;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeForm {
        capture_fails: bool,
        capture_depth: i32,
        was_reset: bool,
    }

    impl FormSource for FakeForm {
        fn snapshot(&self) -> FormSnapshot {
            [
                ("customerName", FieldValue::Text("Jane Doe".into())),
                ("dateOfSale", FieldValue::Text("2024-01-01".into())),
            ]
            .into_iter()
            .collect()
        }

        fn begin_capture(&mut self) {
            self.capture_depth += 1;
        }

        fn capture(&mut self) -> anyhow::Result<DynamicImage> {
            if self.capture_fails {
                Err(anyhow!("canvas unavailable"))
            } else {
                Ok(DynamicImage::new_rgb8(900, 1200))
            }
        }

        fn end_capture(&mut self) {
            self.capture_depth -= 1;
        }

        fn reset(&mut self) {
            self.was_reset = true;
        }
    }

    #[derive(Default)]
    struct FakeDisplay {
        states: Vec<SubmissionState>,
        enabled: Vec<bool>,
        accept_reset: bool,
    }

    impl StatusDisplay for FakeDisplay {
        fn show(&mut self, state: &SubmissionState) {
            self.states.push(state.clone());
        }

        fn set_submit_enabled(&mut self, enabled: bool) {
            self.enabled.push(enabled);
        }

        fn offer_reset(&mut self) -> bool {
            self.accept_reset
        }
    }

    struct FakeTransport {
        reply: anyhow::Result<RelayReply>,
        submitted: Arc<Mutex<Vec<String>>>,
    }

    impl FakeTransport {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                reply: Ok(RelayReply {
                    status,
                    body: body.to_string(),
                }),
                submitted: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(anyhow!("{}", message)),
                submitted: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl RelayTransport for FakeTransport {
        async fn submit(&self, file_name: &str, pdf: Vec<u8>) -> anyhow::Result<RelayReply> {
            assert!(pdf.starts_with(b"%PDF"));
            self.submitted.lock().unwrap().push(file_name.to_string());
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(error) => Err(anyhow!("{error}")),
            }
        }
    }

    fn reporter(
        form: FakeForm,
        display: FakeDisplay,
        transport: FakeTransport,
        strategy: AssemblyStrategy,
    ) -> StatusReporter<FakeForm, FakeDisplay, FakeTransport> {
        StatusReporter::new(form, display, transport, strategy)
    }

    #[tokio::test]
    async fn successful_submission_reaches_success_and_reenables_the_control() {
        let transport = FakeTransport::replying(200, r#"{"success":true,"fileId":"file-9","fileName":"x.pdf"}"#);
        let submitted = transport.submitted.clone();
        let mut display = FakeDisplay::default();
        display.accept_reset = true;
        let mut reporter = reporter(FakeForm::default(), display, transport, AssemblyStrategy::StructuredText);

        reporter.submit().await;

        assert_eq!(reporter.state(), &SubmissionState::Success { file_id: "file-9".into() });
        assert!(reporter.form.was_reset);
        // Disabled at start, re-enabled at the end
        assert_eq!(reporter.display.enabled, vec![false, true]);
        // The generated filename follows the artifact naming rule
        assert_eq!(
            submitted.lock().unwrap().as_slice(),
            ["BrickFace_Contract_Jane_Doe_2024-01-01.pdf"]
        );
    }

    #[tokio::test]
    async fn error_body_surfaces_error_and_details() {
        let transport = FakeTransport::replying(
            500,
            r#"{"error":"Cannot access Google Drive folder","details":"share it with the service account"}"#,
        );
        let mut reporter = reporter(
            FakeForm::default(),
            FakeDisplay::default(),
            transport,
            AssemblyStrategy::StructuredText,
        );

        reporter.submit().await;

        match reporter.state() {
            SubmissionState::Failure { message } => {
                assert!(message.contains("Cannot access Google Drive folder: share it with the service account"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!reporter.form.was_reset);
        assert_eq!(reporter.display.enabled, vec![false, true]);
    }

    #[tokio::test]
    async fn non_json_body_is_truncated_into_the_message() {
        let long_body = format!("<html>{}</html>", "x".repeat(400));
        let transport = FakeTransport::replying(502, &long_body);
        let mut reporter = reporter(
            FakeForm::default(),
            FakeDisplay::default(),
            transport,
            AssemblyStrategy::StructuredText,
        );

        reporter.submit().await;

        match reporter.state() {
            SubmissionState::Failure { message } => {
                assert!(message.contains("Server returned non-JSON response: <html>"));
                // Bounded: the full 400-char filler never appears
                assert!(!message.contains(&"x".repeat(300)));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_failure_reenables_the_control() {
        let transport = FakeTransport::failing("connection refused");
        let mut reporter = reporter(
            FakeForm::default(),
            FakeDisplay::default(),
            transport,
            AssemblyStrategy::StructuredText,
        );

        reporter.submit().await;

        assert!(matches!(reporter.state(), SubmissionState::Failure { message } if message.contains("connection refused")));
        assert_eq!(reporter.display.enabled, vec![false, true]);
    }

    #[tokio::test]
    async fn raster_capture_mutations_are_undone_even_on_failure() {
        let form = FakeForm {
            capture_fails: true,
            ..FakeForm::default()
        };
        let transport = FakeTransport::replying(200, "{}");
        let mut reporter = reporter(form, FakeDisplay::default(), transport, AssemblyStrategy::Raster);

        reporter.submit().await;

        assert!(matches!(reporter.state(), SubmissionState::Failure { message } if message.contains("canvas unavailable")));
        // begin_capture was balanced by end_capture despite the failure
        assert_eq!(reporter.form.capture_depth, 0);
        assert_eq!(reporter.display.enabled, vec![false, true]);
    }

    #[tokio::test]
    async fn raster_submission_succeeds_end_to_end() {
        let transport = FakeTransport::replying(200, r#"{"success":true,"fileId":"file-raster"}"#);
        let mut reporter = reporter(
            FakeForm::default(),
            FakeDisplay::default(),
            transport,
            AssemblyStrategy::Raster,
        );

        reporter.submit().await;

        assert_eq!(
            reporter.state(),
            &SubmissionState::Success {
                file_id: "file-raster".into()
            }
        );
        assert_eq!(reporter.form.capture_depth, 0);
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        let body = "é".repeat(150); // 300 bytes of two-byte chars
        let cut = snippet(&body);
        assert!(cut.len() <= ERROR_SNIPPET_LIMIT);
        assert!(cut.chars().all(|c| c == 'é'));
    }
}
