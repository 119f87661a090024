//! Integration tests for the whole transcription pipeline.
//!
//! A scripted in-process model stands in for the hosted one, so these run
//! offline and record exactly what each remote call would have received.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

use futures::StreamExt;
use notes2tex::prompts::{LATEX_INSTRUCTION, MARKDOWN_INSTRUCTION, STRUCTURING_INSTRUCTION};
use notes2tex::{
    stream_uploads, transcribe, transcribe_to_file, transcribe_with, ContentPart,
    GenerativeModel, ModelError, Notes2TexError, PipelineConfig, StructuredOutcome,
    StructuringPolicy, TranscriptionProgressCallback, UploadedImage, Variant,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Owned copy of one request part.
#[derive(Debug, Clone, PartialEq)]
enum Recorded {
    Image { media_type: String, len: usize },
    Text(String),
}

/// Replies from a script, in order, and records every request.
struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    calls: Mutex<Vec<Vec<Recorded>>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Result<String, ModelError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Vec<Recorded>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl GenerativeModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted/test"
    }

    async fn generate(&self, parts: &[ContentPart<'_>]) -> Result<String, ModelError> {
        let recorded = parts
            .iter()
            .map(|p| match p {
                ContentPart::Image { media_type, data } => Recorded::Image {
                    media_type: media_type.to_string(),
                    len: data.len(),
                },
                ContentPart::Text(t) => Recorded::Text(t.to_string()),
            })
            .collect();
        self.calls.lock().unwrap().push(recorded);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Provider("script exhausted".into())))
    }
}

/// Records every progress event as a string.
#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl RecordingCallback {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl TranscriptionProgressCallback for RecordingCallback {
    fn on_image_complete(&self, position: usize, _total: usize, name: &str, _len: usize) {
        self.events.lock().unwrap().push(format!("ok {position} {name}"));
    }
    fn on_image_error(&self, position: usize, _total: usize, name: &str, error: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("error {position} {name}: {error}"));
    }
    fn on_image_skipped(&self, position: usize, _total: usize, name: &str) {
        self.events.lock().unwrap().push(format!("skip {position} {name}"));
    }
    fn on_structuring_error(&self, error: &str) {
        self.events.lock().unwrap().push(format!("structuring error: {error}"));
    }
}

fn png(name: &str) -> UploadedImage {
    UploadedImage::with_media_type(name, "image/png", vec![0x89, b'P', b'N', b'G', 1, 2, 3])
}

fn config(variant: Variant, model: Arc<ScriptedModel>) -> PipelineConfig {
    PipelineConfig::builder()
        .variant(variant)
        .model_client(model)
        .build()
        .unwrap()
}

fn wrap_document(body: &str) -> String {
    format!("\\documentclass{{article}}\n\\begin{{document}}\n{body}\\end{{document}}\n")
}

// ── Transcription and aggregation ────────────────────────────────────────────

#[tokio::test]
async fn aggregate_follows_upload_order() {
    let model = ScriptedModel::new(vec![Ok("Hello".into()), Ok("World".into())]);
    let cfg = PipelineConfig::builder()
        .variant(Variant::LatexMulti)
        .structure(false)
        .model_client(model.clone())
        .build()
        .unwrap();

    let out = transcribe(&[png("p1.png"), png("p2.png")], &cfg).await.unwrap();

    assert_eq!(out.aggregate, "Hello\n\nWorld\n\n");
    assert!(out.structured.is_none());
    assert_eq!(out.stats.transcribed, 2);
    assert_eq!(out.images[0].name, "p1.png");
    assert_eq!(out.images[1].name, "p2.png");
}

#[tokio::test]
async fn each_image_call_sends_image_then_instruction() {
    let model = ScriptedModel::new(vec![Ok("x".into())]);
    let cfg = config(Variant::Latex, model.clone());

    transcribe(&[png("only.png")], &cfg).await.unwrap();

    let calls = model.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0],
        vec![
            Recorded::Image {
                media_type: "image/png".into(),
                len: 7
            },
            Recorded::Text(LATEX_INSTRUCTION.into()),
        ]
    );
}

#[tokio::test]
async fn markdown_variant_uses_markdown_instruction_and_export() {
    let model = ScriptedModel::new(vec![Ok("# Title\n".into())]);
    let cfg = config(Variant::Markdown, model.clone());

    let out = transcribe(&[png("page.png")], &cfg).await.unwrap();
    let artifact = out.export(cfg.structuring_policy).unwrap();

    assert_eq!(
        model.calls()[0][1],
        Recorded::Text(MARKDOWN_INSTRUCTION.into())
    );
    assert_eq!(artifact.file_name, "resultado_markdown.md");
    assert_eq!(artifact.content_type, "text/plain");
    assert_eq!(artifact.body, "# Title\n\n\n");
}

#[tokio::test]
async fn custom_instruction_is_sent_verbatim() {
    let model = ScriptedModel::new(vec![Ok("x".into())]);
    let cfg = PipelineConfig::builder()
        .variant(Variant::Latex)
        .instruction("Transcribe exactly.")
        .model_client(model.clone())
        .build()
        .unwrap();

    transcribe(&[png("a.png")], &cfg).await.unwrap();

    assert_eq!(
        model.calls()[0][1],
        Recorded::Text("Transcribe exactly.".into())
    );
}

// ── Failure isolation ────────────────────────────────────────────────────────

#[tokio::test]
async fn one_failing_image_does_not_abort_the_batch() {
    let model = ScriptedModel::new(vec![
        Ok("one".into()),
        Err(ModelError::Http {
            status: 500,
            body: "boom".into(),
        }),
        Ok("three".into()),
    ]);
    let cb = Arc::new(RecordingCallback::default());
    let cfg = PipelineConfig::builder()
        .variant(Variant::LatexMulti)
        .structure(false)
        .model_client(model.clone())
        .progress_callback(cb.clone())
        .build()
        .unwrap();

    let out = transcribe(&[png("a.png"), png("b.png"), png("c.png")], &cfg)
        .await
        .unwrap();

    assert_eq!(model.calls().len(), 3);
    assert_eq!(out.aggregate, "one\n\nthree\n\n");
    assert_eq!(out.stats.failed, 1);

    let errors: Vec<_> = out.image_errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].position(), 2);
    assert!(errors[0].to_string().contains("b.png"));

    let events = cb.events();
    assert_eq!(events[0], "ok 1 a.png");
    assert!(events[1].starts_with("error 2 b.png"));
    assert_eq!(events[2], "ok 3 c.png");
}

#[tokio::test]
async fn empty_upload_is_skipped_without_a_call() {
    let model = ScriptedModel::new(vec![Ok("kept".into())]);
    let cb = Arc::new(RecordingCallback::default());
    let cfg = PipelineConfig::builder()
        .variant(Variant::LatexMulti)
        .structure(false)
        .model_client(model.clone())
        .progress_callback(cb.clone())
        .build()
        .unwrap();
    let empty = UploadedImage::with_media_type("blank.png", "image/png", Vec::new());

    let out = transcribe(&[empty, png("real.png")], &cfg).await.unwrap();

    assert_eq!(model.calls().len(), 1);
    assert_eq!(out.aggregate, "kept\n\n");
    assert_eq!(out.stats.skipped, 1);
    assert_eq!(cb.events()[0], "skip 1 blank.png");
}

#[tokio::test]
async fn zero_images_make_no_calls() {
    let model = ScriptedModel::new(vec![]);
    let cfg = config(Variant::LatexMulti, model.clone());

    let err = transcribe(&[], &cfg).await.unwrap_err();

    assert!(matches!(err, Notes2TexError::NoImages));
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn single_variant_rejects_two_images() {
    let model = ScriptedModel::new(vec![]);
    let cfg = config(Variant::Latex, model.clone());

    let err = transcribe(&[png("a.png"), png("b.png")], &cfg)
        .await
        .unwrap_err();

    assert!(matches!(err, Notes2TexError::TooManyImages { max: 1, got: 2 }));
    assert!(model.calls().is_empty());
}

// ── Structuring ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn structuring_receives_exact_aggregate_and_instruction() {
    let aggregate = "Hello\n\nWorld\n\n";
    let model = ScriptedModel::new(vec![
        Ok("Hello".into()),
        Ok("World".into()),
        Ok(wrap_document(aggregate)),
    ]);
    let cfg = config(Variant::LatexMulti, model.clone());

    let out = transcribe(&[png("p1.png"), png("p2.png")], &cfg).await.unwrap();

    let calls = model.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(
        calls[2],
        vec![
            Recorded::Text(aggregate.into()),
            Recorded::Text(STRUCTURING_INSTRUCTION.into()),
        ]
    );

    let text = out.final_text(StructuringPolicy::Strict).unwrap();
    assert!(text.contains(aggregate));
    assert!(text.starts_with("\\documentclass"));

    let artifact = out.export(StructuringPolicy::Strict).unwrap();
    assert_eq!(artifact.file_name, "resultado_latex.tex");
    assert_eq!(artifact.content_type, "text/latex");
    assert_eq!(artifact.body, text);
}

#[tokio::test]
async fn structuring_is_skipped_when_nothing_was_transcribed() {
    let model = ScriptedModel::new(vec![Err(ModelError::Timeout { secs: 5 })]);
    let cfg = config(Variant::LatexMulti, model.clone());

    let out = transcribe(&[png("a.png")], &cfg).await.unwrap();

    assert_eq!(model.calls().len(), 1);
    assert!(out.structured.is_none());
    assert_eq!(out.aggregate, "");
}

#[tokio::test]
async fn failed_structuring_under_strict_blocks_export() {
    let model = ScriptedModel::new(vec![
        Ok("A".into()),
        Err(ModelError::RateLimited {
            provider: "gemini".into(),
            retry_after_secs: None,
        }),
    ]);
    let cb = Arc::new(RecordingCallback::default());
    let cfg = PipelineConfig::builder()
        .variant(Variant::LatexMulti)
        .model_client(model.clone())
        .progress_callback(cb.clone())
        .build()
        .unwrap();

    let out = transcribe(&[png("a.png")], &cfg).await.unwrap();

    assert!(matches!(
        out.structured,
        Some(StructuredOutcome::Failed { .. })
    ));
    assert_eq!(out.aggregate, "A\n\n");
    assert!(matches!(
        out.export(StructuringPolicy::Strict),
        Err(Notes2TexError::StructuringFailed { .. })
    ));
    assert!(cb
        .events()
        .iter()
        .any(|e| e.starts_with("structuring error")));
}

#[tokio::test]
async fn failed_structuring_with_fallback_exports_aggregate() {
    let model = ScriptedModel::new(vec![
        Ok("A".into()),
        Err(ModelError::EmptyResponse { reason: None }),
    ]);
    let cfg = config(Variant::LatexMulti, model.clone());

    let out = transcribe(&[png("a.png")], &cfg).await.unwrap();
    let artifact = out.export(StructuringPolicy::FallbackToAggregate).unwrap();

    assert_eq!(artifact.body, "A\n\n");
    assert_eq!(artifact.content_type, "text/latex");
}

// ── Fence stripping ──────────────────────────────────────────────────────────

#[tokio::test]
async fn fences_are_kept_unless_stripping_is_enabled() {
    let fenced = "```latex\n\\section{A}\n```";

    let model = ScriptedModel::new(vec![Ok(fenced.into())]);
    let cfg = config(Variant::Latex, model.clone());
    let out = transcribe_with(model.as_ref(), &[png("a.png")], &cfg)
        .await
        .unwrap();
    assert_eq!(out.images[0].text, fenced);

    let model = ScriptedModel::new(vec![Ok(fenced.into())]);
    let cfg = PipelineConfig::builder()
        .variant(Variant::Latex)
        .strip_fences(true)
        .model_client(model.clone())
        .build()
        .unwrap();
    let out = transcribe(&[png("a.png")], &cfg).await.unwrap();
    assert_eq!(out.images[0].text.trim(), "\\section{A}");
}

// ── Streaming ────────────────────────────────────────────────────────────────

#[test]
fn stream_yields_results_in_upload_order() {
    let model = ScriptedModel::new(vec![
        Ok("first".into()),
        Err(ModelError::Provider("bad".into())),
        Ok("third".into()),
    ]);
    let cfg = config(Variant::LatexMulti, model.clone());
    let uploads = vec![png("1.png"), png("2.png"), png("3.png")];

    let items: Vec<_> =
        tokio_test::block_on(stream_uploads(model.clone(), uploads, &cfg).collect());

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_ref().unwrap().text, "first");
    assert_eq!(items[1].as_ref().unwrap_err().position(), 2);
    assert_eq!(items[2].as_ref().unwrap().text, "third");
}

/// Records run-level and per-image events in order.
#[derive(Default)]
struct RunEvents {
    events: Mutex<Vec<String>>,
}

impl TranscriptionProgressCallback for RunEvents {
    fn on_run_start(&self, total_images: usize) {
        self.events.lock().unwrap().push(format!("start {total_images}"));
    }
    fn on_image_complete(&self, position: usize, _total: usize, _name: &str, _len: usize) {
        self.events.lock().unwrap().push(format!("ok {position}"));
    }
    fn on_image_error(&self, position: usize, _total: usize, _name: &str, _error: &str) {
        self.events.lock().unwrap().push(format!("error {position}"));
    }
    fn on_run_complete(&self, total_images: usize, transcribed: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("complete {transcribed}/{total_images}"));
    }
}

#[test]
fn stream_fires_the_same_run_events_as_the_eager_api() {
    let uploads = || vec![png("1.png"), png("2.png")];
    let replies = || vec![Ok("a".to_string()), Err(ModelError::Provider("bad".into()))];

    let model = ScriptedModel::new(replies());
    let eager_cb = Arc::new(RunEvents::default());
    let cfg = PipelineConfig::builder()
        .variant(Variant::LatexMulti)
        .structure(false)
        .model_client(model.clone())
        .progress_callback(eager_cb.clone())
        .build()
        .unwrap();
    tokio_test::block_on(transcribe(&uploads(), &cfg)).unwrap();

    let model = ScriptedModel::new(replies());
    let stream_cb = Arc::new(RunEvents::default());
    let cfg = PipelineConfig::builder()
        .variant(Variant::LatexMulti)
        .structure(false)
        .model_client(model.clone())
        .progress_callback(stream_cb.clone())
        .build()
        .unwrap();
    let items: Vec<_> =
        tokio_test::block_on(stream_uploads(model.clone(), uploads(), &cfg).collect());
    assert_eq!(items.len(), 2);

    let expected = vec!["start 2", "ok 1", "error 2", "complete 1/2"];
    assert_eq!(*eager_cb.events.lock().unwrap(), expected);
    assert_eq!(*stream_cb.events.lock().unwrap(), expected);
}

// ── Files on disk ────────────────────────────────────────────────────────────

#[tokio::test]
async fn transcribe_to_file_writes_the_final_text() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("page.png");
    std::fs::write(&input, b"not really a png").unwrap();
    let target = dir.path().join("out.tex");

    let model = ScriptedModel::new(vec![Ok("\\(x^2\\)".into())]);
    let cfg = config(Variant::Latex, model.clone());

    let out = transcribe_to_file(&[input.display().to_string()], &target, &cfg)
        .await
        .unwrap();

    let written = std::fs::read_to_string(&target).unwrap();
    assert_eq!(written, "\\(x^2\\)\n\n");
    assert_eq!(written, out.final_text(StructuringPolicy::Strict).unwrap());
}

#[tokio::test]
async fn missing_input_file_is_fatal() {
    let model = ScriptedModel::new(vec![]);
    let cfg = config(Variant::Latex, model.clone());

    let err = notes2tex::transcribe_files(&["/nonexistent/page.png".to_string()], &cfg)
        .await
        .unwrap_err();

    assert!(matches!(err, Notes2TexError::FileNotFound { .. }));
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn unsupported_extension_is_rejected() {
    let model = ScriptedModel::new(vec![]);
    let cfg = config(Variant::Latex, model.clone());

    let err = notes2tex::transcribe_files(&["scan.gif".to_string()], &cfg)
        .await
        .unwrap_err();

    assert!(matches!(err, Notes2TexError::UnsupportedImageType { .. }));
}
