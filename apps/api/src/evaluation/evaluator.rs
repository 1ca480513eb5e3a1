//! Evaluation Orchestrator.
//!
//! Flow: fetch → extract → discard scratch file → prompt → complete → normalize.
//!
//! Every failure is converted into `EvaluationOutcome::Failed` here; callers
//! never see a raised error or a partial result.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::errors::EvaluationError;
use crate::evaluation::extractor::TextExtractor;
use crate::evaluation::fetcher::DocumentFetcher;
use crate::evaluation::models::{EvaluationOutcome, EvaluationRequest, EvaluationResult};
use crate::evaluation::normalizer::normalize;
use crate::evaluation::prompts::build_messages;
use crate::llm_client::CompletionService;

pub struct Evaluator {
    fetcher: DocumentFetcher,
    extractor: Arc<dyn TextExtractor>,
    llm: Arc<dyn CompletionService>,
    /// Held while the scratch file exists. The path is fixed, so only one
    /// evaluation per process may own it at a time.
    scratch_lock: Mutex<()>,
}

impl Evaluator {
    pub fn new(
        fetcher: DocumentFetcher,
        extractor: Arc<dyn TextExtractor>,
        llm: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            llm,
            scratch_lock: Mutex::new(()),
        }
    }

    /// Runs one evaluation. One call in, one record out.
    pub async fn evaluate(&self, request: &EvaluationRequest) -> EvaluationOutcome {
        match self.run(request).await {
            Ok(result) => {
                info!(
                    "Evaluation completed: score={}/10, likelihood={:?}, source={:?}",
                    result.overall_score, result.interview_likelihood, result.source
                );
                EvaluationOutcome::Completed(result)
            }
            Err(e) => {
                error!("Evaluation failed ({:?}): {e}", e.kind());
                e.into()
            }
        }
    }

    async fn run(&self, request: &EvaluationRequest) -> Result<EvaluationResult, EvaluationError> {
        let resume_text = self.read_resume(&request.resume_url).await?;
        if resume_text.trim().is_empty() {
            return Err(EvaluationError::EmptyContent);
        }

        let messages = build_messages(&request.job_description, &resume_text);
        let completion = self.llm.complete(&messages).await?;
        Ok(normalize(&completion))
    }

    /// Downloads and extracts the resume. The scratch file is removed before
    /// the lock is released, whether extraction succeeded or not.
    async fn read_resume(&self, resume_url: &str) -> Result<String, EvaluationError> {
        let _owner = self.scratch_lock.lock().await;

        let document = self.fetcher.fetch(resume_url).await?;
        debug!(
            "Extracting {} bytes fetched from {}",
            document.bytes.len(),
            document.source_url
        );
        let extracted = self.extractor.extract(document.scratch.path()).await;
        drop(document);
        extracted
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::evaluation::extractor::tests::pdf_with_pages;
    use crate::evaluation::extractor::PdfTextExtractor;
    use crate::evaluation::models::{FailureKind, InterviewLikelihood, ResultSource};
    use crate::llm_client::{LlmError, PromptMessages};

    /// Canned completion service that records how often it was called.
    struct StubCompletion {
        reply: Result<String, u16>,
        calls: AtomicUsize,
    }

    impl StubCompletion {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(status),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionService for StubCompletion {
        async fn complete(&self, messages: &PromptMessages) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(messages.as_slice()[1].content.contains("JOB DESCRIPTION:"));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(LlmError::Api {
                    status: *status,
                    message: "insufficient_quota".to_string(),
                }),
            }
        }
    }

    /// Extractor returning fixed text; remembers whether the scratch file
    /// existed while it ran.
    struct StubExtractor {
        text: String,
        saw_file: std::sync::Mutex<Option<bool>>,
    }

    impl StubExtractor {
        fn returning(text: &str) -> Arc<Self> {
            Arc::new(Self {
                text: text.to_string(),
                saw_file: std::sync::Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl TextExtractor for StubExtractor {
        async fn extract(&self, path: &Path) -> Result<String, EvaluationError> {
            *self.saw_file.lock().unwrap() = Some(path.exists());
            Ok(self.text.clone())
        }
    }

    /// Extractor that parks until cancelled; signals once it holds the file.
    struct HangingExtractor {
        entered: Notify,
    }

    #[async_trait]
    impl TextExtractor for HangingExtractor {
        async fn extract(&self, path: &Path) -> Result<String, EvaluationError> {
            assert!(path.exists());
            self.entered.notify_one();
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(String::new())
        }
    }

    /// Extractor that counts how many calls are inside it at once.
    #[derive(Default)]
    struct OverlapCounter {
        active: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextExtractor for OverlapCounter {
        async fn extract(&self, path: &Path) -> Result<String, EvaluationError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(path.exists());
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok("Rust engineer".to_string())
        }
    }

    struct Harness {
        server: MockServer,
        _dir: tempfile::TempDir,
        scratch: PathBuf,
    }

    impl Harness {
        async fn serving(status: u16, body: Vec<u8>) -> Self {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(status).set_body_bytes(body))
                .mount(&server)
                .await;
            let dir = tempfile::tempdir().unwrap();
            let scratch = dir.path().join("resume.pdf");
            Self {
                server,
                _dir: dir,
                scratch,
            }
        }

        fn evaluator(
            &self,
            extractor: Arc<dyn TextExtractor>,
            llm: Arc<dyn CompletionService>,
        ) -> Evaluator {
            Evaluator::new(DocumentFetcher::new(&self.scratch).unwrap(), extractor, llm)
        }

        fn request(&self) -> EvaluationRequest {
            EvaluationRequest {
                job_description: "Backend engineer. Required: Rust, SQL.".to_string(),
                resume_url: format!("{}/resume.pdf", self.server.uri()),
            }
        }
    }

    #[tokio::test]
    async fn test_end_to_end_with_real_pdf() {
        let harness = Harness::serving(200, pdf_with_pages(&["RustSQLTokio"])).await;
        let llm = StubCompletion::replying(
            r#"{"overall_score": 9, "interview_likelihood": "High", "matching_skills": ["Rust"]}"#,
        );
        let evaluator = harness.evaluator(Arc::new(PdfTextExtractor), llm.clone());

        let outcome = evaluator.evaluate(&harness.request()).await;

        match outcome {
            EvaluationOutcome::Completed(result) => {
                assert_eq!(result.overall_score, 9);
                assert_eq!(result.interview_likelihood, InterviewLikelihood::High);
                assert_eq!(result.matching_skills, vec!["Rust"]);
                assert_eq!(result.source, ResultSource::Structured);
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
        assert!(!harness.scratch.exists());
    }

    #[tokio::test]
    async fn test_scratch_file_exists_during_extraction_and_not_after() {
        let harness = Harness::serving(200, b"%PDF".to_vec()).await;
        let extractor = StubExtractor::returning("Rust engineer with 5 years");
        let evaluator = harness.evaluator(
            extractor.clone(),
            StubCompletion::replying("Looks fine, score 6"),
        );

        let outcome = evaluator.evaluate(&harness.request()).await;

        assert_eq!(*extractor.saw_file.lock().unwrap(), Some(true));
        assert!(!harness.scratch.exists());
        match outcome {
            EvaluationOutcome::Completed(result) => {
                assert_eq!(result.source, ResultSource::TextFallback);
                assert_eq!(result.overall_score, 6);
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_download_is_error_only_and_leaves_no_file() {
        let harness = Harness::serving(404, vec![]).await;
        let llm = StubCompletion::replying("{}");
        let evaluator = harness.evaluator(StubExtractor::returning("text"), llm.clone());

        let outcome = evaluator.evaluate(&harness.request()).await;

        assert_eq!(
            outcome,
            EvaluationOutcome::Failed {
                kind: FailureKind::Download,
                error: "Failed to download PDF. Status code: 404".to_string(),
            }
        );
        assert!(!harness.scratch.exists());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_download_failure() {
        let dir = tempfile::tempdir().unwrap();
        let evaluator = Evaluator::new(
            DocumentFetcher::new(dir.path().join("resume.pdf")).unwrap(),
            StubExtractor::returning("text"),
            StubCompletion::replying("{}"),
        );
        let request = EvaluationRequest {
            job_description: "jd".to_string(),
            resume_url: "http://127.0.0.1:1/resume.pdf".to_string(),
        };

        let outcome = evaluator.evaluate(&request).await;
        assert!(matches!(
            outcome,
            EvaluationOutcome::Failed {
                kind: FailureKind::Download,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_text_is_empty_content_failure_not_zero_score() {
        let harness = Harness::serving(200, b"%PDF".to_vec()).await;
        let llm = StubCompletion::replying(r#"{"overall_score": 0}"#);
        let evaluator = harness.evaluator(StubExtractor::returning("  \n\t "), llm.clone());

        let outcome = evaluator.evaluate(&harness.request()).await;

        match outcome {
            EvaluationOutcome::Failed { kind, error } => {
                assert_eq!(kind, FailureKind::EmptyContent);
                assert!(error.contains("Please ensure the PDF is readable"));
            }
            other => panic!("expected empty-content failure, got {other:?}"),
        }
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
        assert!(!harness.scratch.exists());
    }

    #[tokio::test]
    async fn test_unreadable_document_is_extraction_failure_and_cleans_up() {
        let harness = Harness::serving(200, b"<html>sign in</html>".to_vec()).await;
        let evaluator =
            harness.evaluator(Arc::new(PdfTextExtractor), StubCompletion::replying("{}"));

        let outcome = evaluator.evaluate(&harness.request()).await;

        assert!(matches!(
            outcome,
            EvaluationOutcome::Failed {
                kind: FailureKind::Extraction,
                ..
            }
        ));
        assert!(!harness.scratch.exists());
    }

    #[tokio::test]
    async fn test_service_failure_is_surfaced_once() {
        let harness = Harness::serving(200, b"%PDF".to_vec()).await;
        let llm = StubCompletion::failing(429);
        let evaluator = harness.evaluator(StubExtractor::returning("resume text"), llm.clone());

        let outcome = evaluator.evaluate(&harness.request()).await;

        match outcome {
            EvaluationOutcome::Failed { kind, error } => {
                assert_eq!(kind, FailureKind::Service);
                assert!(error.contains("429"));
            }
            other => panic!("expected service failure, got {other:?}"),
        }
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
        assert!(!harness.scratch.exists());
    }

    #[tokio::test]
    async fn test_cancelled_evaluation_removes_scratch_file() {
        let harness = Harness::serving(200, b"%PDF".to_vec()).await;
        let extractor = Arc::new(HangingExtractor {
            entered: Notify::new(),
        });
        let evaluator = Arc::new(harness.evaluator(
            extractor.clone(),
            StubCompletion::replying("{}"),
        ));

        let task = tokio::spawn({
            let evaluator = evaluator.clone();
            let request = harness.request();
            async move { evaluator.evaluate(&request).await }
        });
        extractor.entered.notified().await;
        assert!(harness.scratch.exists());

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(!harness.scratch.exists());
    }

    #[tokio::test]
    async fn test_concurrent_evaluations_take_turns_on_scratch_file() {
        let harness = Harness::serving(200, b"%PDF".to_vec()).await;
        let extractor = Arc::new(OverlapCounter::default());
        let llm = StubCompletion::replying(r#"{"overall_score": 7}"#);
        let evaluator = harness.evaluator(extractor.clone(), llm.clone());
        let request = harness.request();

        let (first, second) =
            tokio::join!(evaluator.evaluate(&request), evaluator.evaluate(&request));

        assert!(matches!(first, EvaluationOutcome::Completed(_)));
        assert!(matches!(second, EvaluationOutcome::Completed(_)));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
        assert_eq!(extractor.peak.load(Ordering::SeqCst), 1);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
        assert!(!harness.scratch.exists());
    }
}
