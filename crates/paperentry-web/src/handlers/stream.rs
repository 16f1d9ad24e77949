use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use paperentry_core::{DocumentPayload, PDF_MIME_TYPE, Session, SessionSnapshot};

use crate::models::*;
use crate::state::AppState;
use crate::upload;

pub async fn stream(State(state): State<Arc<AppState>>, multipart: Multipart) -> impl IntoResponse {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(64);

    tokio::spawn(async move {
        if let Err(e) = handle_stream(state, multipart, tx.clone()).await {
            let _ = tx
                .send(Ok(sse_event("error", &ErrorEvent { message: e })))
                .await;
        }
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default())
}

async fn handle_stream(
    state: Arc<AppState>,
    multipart: Multipart,
    tx: mpsc::Sender<Result<Event, Infallible>>,
) -> Result<(), String> {
    // Parse the multipart form; non-PDF uploads never start a session.
    let file = upload::parse_multipart(multipart).await?;

    let document = DocumentPayload::from_bytes(&file.data, PDF_MIME_TYPE)
        .map_err(|e| format!("{}: {}", file.filename, e))?;
    document
        .validate(state.config.max_document_bytes())
        .map_err(|e| format!("{}: {}", file.filename, e))?;
    drop(file);

    tracing::info!(bytes = document.byte_len(), "starting conversion session");

    // Each request is its own session.
    let session = Arc::new(Session::new());
    let session_for_run = Arc::clone(&session);
    let run_state = Arc::clone(&state);

    // The progress callback is sync; snapshots queue here and are forwarded
    // in order with backpressure from the SSE channel.
    let (snapshot_tx, snapshot_rx) = mpsc::unbounded_channel::<SessionSnapshot>();
    let forwarder = tokio::spawn(forward_snapshots(snapshot_rx, tx.clone()));

    let run_handle = tokio::spawn(async move {
        paperentry_core::run_session(
            &session_for_run,
            run_state.capability.as_ref(),
            Arc::new(document),
            run_state.config.max_papers,
            move |snapshot| {
                let _ = snapshot_tx.send(snapshot);
            },
        )
        .await
    });

    // Race between the session completing and the client going away.
    let last = tokio::select! {
        result = run_handle => {
            result.map_err(|e| format!("Conversion task error: {}", e))?
        }
        _ = tx.closed() => {
            // Discard the session; the run stops once its in-flight request returns.
            session.reset();
            tracing::info!("client disconnected, session discarded");
            return Err("Client disconnected".to_string());
        }
    };

    // The run's callback is gone, so the forwarder ends once its queue drains.
    let _ = forwarder.await;
    send(&tx, "done", &last).await
}

/// Forward every queued snapshot as a `snapshot` event, stopping early if
/// the client goes away.
async fn forward_snapshots(
    mut rx: mpsc::UnboundedReceiver<SessionSnapshot>,
    tx: mpsc::Sender<Result<Event, Infallible>>,
) {
    while let Some(snapshot) = rx.recv().await {
        if send(&tx, "snapshot", &snapshot).await.is_err() {
            break;
        }
    }
}

/// Send an SSE event, returning Err if the client disconnected.
async fn send<T: serde::Serialize>(
    tx: &mpsc::Sender<Result<Event, Infallible>>,
    event_type: &str,
    data: &T,
) -> Result<(), String> {
    tx.send(Ok(sse_event(event_type, data)))
        .await
        .map_err(|_| "Client disconnected".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperentry_core::Phase;
    use std::time::Duration;

    fn snapshot(generation: u64) -> SessionSnapshot {
        SessionSnapshot {
            generation,
            phase: Phase::Processing,
            results: Vec::new(),
            error: None,
        }
    }

    #[tokio::test]
    async fn slow_client_still_receives_every_snapshot() {
        let (snapshot_tx, snapshot_rx) = mpsc::unbounded_channel();
        let (tx, mut rx) = mpsc::channel(1);
        for generation in 0..100 {
            snapshot_tx.send(snapshot(generation)).unwrap();
        }
        drop(snapshot_tx);

        let forwarder = tokio::spawn(forward_snapshots(snapshot_rx, tx));
        let mut received = 0;
        while let Some(event) = rx.recv().await {
            assert!(event.is_ok());
            received += 1;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        forwarder.await.unwrap();
        assert_eq!(received, 100);
    }

    #[tokio::test]
    async fn forwarding_stops_when_client_disconnects() {
        let (snapshot_tx, snapshot_rx) = mpsc::unbounded_channel();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        snapshot_tx.send(snapshot(1)).unwrap();

        // Returns even though the sender is still open.
        forward_snapshots(snapshot_rx, tx).await;
        assert!(snapshot_tx.send(snapshot(2)).is_err());
    }
}
