use std::sync::Arc;

use crate::analyzer::analyze_document;
use crate::capability::Capability;
use crate::extractor::{Extraction, UNREADABLE_MESSAGE, extract_paper};
use crate::payload::DocumentPayload;
use crate::session::{ItemStatus, Session, SessionSnapshot, SessionTicket, TransitionError};

/// Run a full conversion: analysis, then one extraction per paper, strictly
/// in order with one request in flight at a time.
///
/// `progress` receives a snapshot after every accepted transition. If the
/// session is reset (or begun again) while this run is in progress, the
/// run's remaining writes are rejected and it stops before issuing another
/// request; the returned snapshot is then the session's current state.
pub async fn run_session(
    session: &Session,
    capability: &dyn Capability,
    document: Arc<DocumentPayload>,
    max_papers: usize,
    progress: impl Fn(SessionSnapshot) + Send + Sync,
) -> SessionSnapshot {
    let (ticket, snapshot) = session.begin();
    tracing::info!(
        generation = ticket.generation(),
        capability = capability.name(),
        document_bytes = document.byte_len(),
        "analyzing document"
    );
    progress(snapshot);

    match drive(session, ticket, capability, &document, max_papers, &progress).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::info!(generation = ticket.generation(), reason = %e, "session run abandoned");
            session.snapshot()
        }
    }
}

async fn drive(
    session: &Session,
    ticket: SessionTicket,
    capability: &dyn Capability,
    document: &DocumentPayload,
    max_papers: usize,
    progress: &(impl Fn(SessionSnapshot) + Send + Sync),
) -> Result<SessionSnapshot, TransitionError> {
    let papers = match analyze_document(capability, document, max_papers).await {
        Ok(papers) => papers,
        Err(e) => {
            let message = e.user_message();
            tracing::warn!(generation = ticket.generation(), error = %message, "analysis failed");
            let snapshot = session.analysis_failed(ticket, message)?;
            progress(snapshot.clone());
            return Ok(snapshot);
        }
    };

    let snapshot = session.analysis_succeeded(ticket, papers)?;
    let total = snapshot.results.len();
    progress(snapshot.clone());

    for (position, item) in snapshot.results.iter().enumerate() {
        progress(session.start_item(ticket, position)?);
        tracing::info!(
            index = item.metadata.index,
            total,
            title = %item.metadata.title,
            "extracting paper"
        );

        let outcome = match extract_paper(capability, document, &item.metadata).await {
            Ok(Extraction::Block(content)) => ItemStatus::Success { content },
            Ok(Extraction::Unreadable) => {
                tracing::warn!(index = item.metadata.index, "paper content unreadable");
                ItemStatus::Error {
                    message: UNREADABLE_MESSAGE.to_string(),
                }
            }
            Err(e) => {
                let message = e.user_message();
                tracing::warn!(index = item.metadata.index, error = %message, "extraction failed");
                ItemStatus::Error { message }
            }
        };

        progress(session.finish_item(ticket, position, outcome)?);
    }

    let snapshot = session.finish(ticket)?;
    tracing::info!(
        generation = ticket.generation(),
        succeeded = snapshot.success_count(),
        failed = snapshot.error_count(),
        "session finished"
    );
    progress(snapshot.clone());
    Ok(snapshot)
}
