//! Integration tests for [`run_session`].
//!
//! Every test drives the orchestrator with a scripted [`MockCapability`];
//! no HTTP requests are made.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use paperentry_core::capability::mock::{MockCapability, MockResponse};
use paperentry_core::capability::{CapabilityError, OutputMode};
use paperentry_core::latex::{FIELD_COUNT, scan_fields};
use paperentry_core::prompts::UNREADABLE_SENTINEL;
use paperentry_core::{
    DocumentPayload, ItemStatus, PDF_MIME_TYPE, Phase, Session, SessionSnapshot, run_session,
};

const TWO_PAPERS: &str = r#"[{"index": 1, "title": "A"}, {"index": 2, "title": "B"}]"#;
const BLOCK_A: &str = r"\paperentrynum{A}{Ann Author}{Lab A}{Abstract of A.}{a; b}";
const BLOCK_B: &str = r"\paperentrynum{B}{Bo Author, Cy Author}{Lab B; Lab C}{Abstract of B.}{c}";

fn document() -> Arc<DocumentPayload> {
    Arc::new(DocumentPayload::from_bytes(b"%PDF-1.7 two papers", PDF_MIME_TYPE).unwrap())
}

/// Collects every published snapshot.
fn recorder() -> (
    Arc<Mutex<Vec<SessionSnapshot>>>,
    impl Fn(SessionSnapshot) + Send + Sync,
) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    (log, move |snap| sink.lock().unwrap().push(snap))
}

fn statuses(snap: &SessionSnapshot) -> Vec<&'static str> {
    snap.results.iter().map(|r| r.status.label()).collect()
}

#[tokio::test]
async fn two_papers_processed_in_order() {
    let mock = MockCapability::with_sequence(vec![
        MockResponse::text(TWO_PAPERS),
        MockResponse::text(BLOCK_A),
        MockResponse::text(format!("```latex\n{}\n```", BLOCK_B)),
    ]);
    let session = Session::new();
    let (log, progress) = recorder();

    let last = run_session(&session, &mock, document(), 50, progress).await;

    assert_eq!(last.phase, Phase::Finished);
    assert_eq!(last.results[0].content(), Some(BLOCK_A));
    assert_eq!(last.results[1].content(), Some(BLOCK_B));

    let log = log.lock().unwrap();
    let phases: Vec<Phase> = log.iter().map(|s| s.phase).collect();
    assert_eq!(
        phases,
        vec![
            Phase::Analyzing,
            Phase::Processing,
            Phase::Processing,
            Phase::Processing,
            Phase::Processing,
            Phase::Processing,
            Phase::Finished,
        ]
    );

    // Two pending results before any extraction starts.
    assert_eq!(statuses(&log[1]), vec!["pending", "pending"]);
    // Item 1 is fully processed before item 2 starts.
    assert_eq!(statuses(&log[2]), vec!["processing", "pending"]);
    assert_eq!(statuses(&log[3]), vec!["success", "pending"]);
    assert_eq!(statuses(&log[4]), vec!["success", "processing"]);
    assert_eq!(statuses(&log[5]), vec!["success", "success"]);

    // One analysis request in JSON mode, then one text request per paper.
    let calls = mock.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].output_mode, OutputMode::Json);
    assert!(calls[1].prompt.contains("paper number 1 titled roughly \"A\""));
    assert!(calls[2].prompt.contains("paper number 2 titled roughly \"B\""));
    assert!(calls.iter().all(|c| c.document_bytes == 19));
}

#[tokio::test]
async fn snapshots_keep_count_order_and_single_processing() {
    let mock = MockCapability::with_sequence(vec![
        MockResponse::text(
            r#"[{"index": 1, "title": "A"}, {"index": 2, "title": "B"}, {"index": 3, "title": "C"}]"#,
        ),
        MockResponse::text(BLOCK_A),
    ]);
    let session = Session::new();
    let (log, progress) = recorder();

    run_session(&session, &mock, document(), 50, progress).await;

    let log = log.lock().unwrap();
    for snap in log.iter().filter(|s| s.phase != Phase::Analyzing) {
        assert_eq!(snap.results.len(), 3);
        assert!(snap.processing_count() <= 1);
        let indices: Vec<u32> = snap.results.iter().map(|r| r.metadata.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }
}

#[tokio::test]
async fn empty_analysis_fails_session() {
    let mock = MockCapability::new(MockResponse::text(""));
    let session = Session::new();
    let (log, progress) = recorder();

    let last = run_session(&session, &mock, document(), 50, progress).await;

    assert_eq!(last.phase, Phase::Failed);
    assert!(last.results.is_empty());
    assert!(
        last.error
            .as_deref()
            .unwrap()
            .contains("Failed to analyze PDF structure.")
    );
    assert_eq!(mock.call_count(), 1);

    let phases: Vec<Phase> = log.lock().unwrap().iter().map(|s| s.phase).collect();
    assert_eq!(phases, vec![Phase::Analyzing, Phase::Failed]);
}

#[tokio::test]
async fn sentinel_marks_item_unreadable() {
    let mock = MockCapability::with_sequence(vec![
        MockResponse::text(r#"[{"index": 1, "title": "A"}]"#),
        MockResponse::text(UNREADABLE_SENTINEL),
    ]);
    let session = Session::new();

    let last = run_session(&session, &mock, document(), 50, |_| {}).await;

    assert_eq!(last.phase, Phase::Finished);
    assert_eq!(
        last.results[0].status,
        ItemStatus::Error {
            message: "Content unreadable".into()
        }
    );
    assert!(last.results[0].content().is_none());
}

#[tokio::test]
async fn item_failure_does_not_abort_loop() {
    let mock = MockCapability::with_sequence(vec![
        MockResponse::text(TWO_PAPERS),
        MockResponse::text(BLOCK_A),
        MockResponse::Error(CapabilityError::Transport("socket hang up".into())),
    ]);
    let session = Session::new();

    let last = run_session(&session, &mock, document(), 50, |_| {}).await;

    assert_eq!(last.phase, Phase::Finished);
    assert_eq!(last.results[0].content(), Some(BLOCK_A));
    assert_eq!(last.results[1].error_message(), Some("socket hang up"));
    assert_eq!(session.snapshot(), last);
}

#[tokio::test]
async fn failure_in_middle_continues_to_next() {
    let mock = MockCapability::with_sequence(vec![
        MockResponse::text(
            r#"[{"index": 1, "title": "A"}, {"index": 2, "title": "B"}, {"index": 3, "title": "C"}]"#,
        ),
        MockResponse::text(BLOCK_A),
        MockResponse::text("   "),
        MockResponse::text(BLOCK_B),
    ]);
    let session = Session::new();

    let last = run_session(&session, &mock, document(), 50, |_| {}).await;

    assert_eq!(statuses(&last), vec!["success", "error", "success"]);
    assert_eq!(
        last.results[1].error_message(),
        Some("Failed to extract abstract: no output generated.")
    );
    assert_eq!(mock.call_count(), 4);
}

#[tokio::test]
async fn requests_are_never_concurrent() {
    let mock = MockCapability::with_sequence(vec![
        MockResponse::text(TWO_PAPERS),
        MockResponse::text(BLOCK_A),
    ])
    .with_delay(Duration::from_millis(5));
    let session = Session::new();

    run_session(&session, &mock, document(), 50, |_| {}).await;

    assert_eq!(mock.call_count(), 3);
    assert_eq!(mock.max_in_flight(), 1);
}

#[tokio::test]
async fn produced_blocks_have_five_fields() {
    let mock = MockCapability::with_sequence(vec![
        MockResponse::text(TWO_PAPERS),
        MockResponse::text(BLOCK_A),
        MockResponse::text(BLOCK_B),
    ]);
    let session = Session::new();

    let last = run_session(&session, &mock, document(), 50, |_| {}).await;

    for result in &last.results {
        let block = result.content().unwrap();
        assert_eq!(scan_fields(block).unwrap().len(), FIELD_COUNT);
    }
}

#[tokio::test(start_paused = true)]
async fn reset_mid_run_discards_late_results() {
    let mock = Arc::new(
        MockCapability::with_sequence(vec![
            MockResponse::text(TWO_PAPERS),
            MockResponse::text(BLOCK_A),
        ])
        .with_delay(Duration::from_secs(1)),
    );
    let session = Arc::new(Session::new());
    let (log, progress) = recorder();

    let run = {
        let session = Arc::clone(&session);
        let mock = Arc::clone(&mock);
        tokio::spawn(async move {
            run_session(&session, mock.as_ref(), document(), 50, progress).await
        })
    };

    // Let analysis finish and the first extraction start, then reset.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let reset = session.reset();
    assert_eq!(reset.phase, Phase::Idle);

    let last = run.await.unwrap();
    assert_eq!(last.phase, Phase::Idle);
    assert!(last.results.is_empty());

    // The in-flight extraction completed but was never written; item 2 was
    // never requested.
    assert_eq!(mock.call_count(), 2);
    let log = log.lock().unwrap();
    assert!(log.iter().all(|s| s.phase != Phase::Finished));
    assert_eq!(session.snapshot(), reset);
}

#[tokio::test]
async fn new_run_replaces_previous_session() {
    let session = Session::new();

    let failing = MockCapability::new(MockResponse::text("[]"));
    let first = run_session(&session, &failing, document(), 50, |_| {}).await;
    assert_eq!(first.phase, Phase::Failed);

    let ok = MockCapability::with_sequence(vec![
        MockResponse::text(r#"[{"index": 1, "title": "A"}]"#),
        MockResponse::text(BLOCK_A),
    ]);
    let second = run_session(&session, &ok, document(), 50, |_| {}).await;
    assert_eq!(second.phase, Phase::Finished);
    assert!(second.error.is_none());
    assert_eq!(second.results.len(), 1);
    assert!(second.generation > first.generation);
}

#[tokio::test]
async fn zero_paper_cap_never_finishes_empty() {
    let mock = MockCapability::with_sequence(vec![
        MockResponse::text(r#"[{"index": 1, "title": "A"}]"#),
        MockResponse::text(BLOCK_A),
    ]);
    let session = Session::new();

    let last = run_session(&session, &mock, document(), 0, |_| {}).await;

    assert_eq!(last.phase, Phase::Finished);
    assert_eq!(last.results.len(), 1);
    assert_eq!(last.results[0].content(), Some(BLOCK_A));
}
