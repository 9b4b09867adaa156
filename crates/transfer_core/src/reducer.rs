//! Pure translation of engine events into registry mutations and follow-up
//! effects. No locks, no tasks, no channels; the caller owns all of those.

use std::collections::HashMap;

use shared::{
    domain::{Direction, SessionId, TransferPhase},
    error::EngineFailure,
    protocol::{EngineEvent, FailureBody, ProgressBody},
};

use crate::{
    registry::{PendingOffer, Session, SessionPatch, SessionRegistry},
    OrchestratorEvent,
};

/// Side effects the caller must carry out after a reduction step.
#[derive(Debug)]
pub enum Effect {
    /// The session table changed; publish a fresh snapshot.
    Publish,
    /// A session reached 100 percent; remove it after the linger delay.
    ScheduleRemoval(SessionId),
    /// A session completed; append it to the transfer history.
    RecordCompletion(Session),
    /// Surface a notification that is not a snapshot.
    Notify(OrchestratorEvent),
}

/// Apply one engine event to the registry and pending-offer table.
///
/// Events about unknown ids create a record rather than getting dropped;
/// the engine is authoritative and the table catches up.
pub fn apply(
    registry: &mut SessionRegistry,
    offers: &mut HashMap<SessionId, PendingOffer>,
    event: EngineEvent,
) -> Vec<Effect> {
    match event {
        EngineEvent::ConnectionCodeAssigned { session_id, code } => {
            // Codes only decorate sends the dispatcher already created. A
            // code for a dismissed session must not resurrect it.
            if !registry.contains(&session_id) {
                return Vec::new();
            }
            registry.upsert(
                &session_id,
                SessionPatch {
                    connection_code: Some(code),
                    phase: Some(TransferPhase::Waiting),
                    ..SessionPatch::default()
                },
            );
            vec![Effect::Publish]
        }
        EngineEvent::ConnectionCodeFailed {
            session_id,
            message,
        } => vec![Effect::Notify(OrchestratorEvent::MailboxFailure {
            session_id,
            failure: EngineFailure::mailbox(message),
        })],
        EngineEvent::SendProgress(body) => progress(registry, Direction::Send, body),
        EngineEvent::ReceiveProgress(body) => progress(registry, Direction::Receive, body),
        EngineEvent::SendFailed(body) => failure(registry, Direction::Send, body),
        EngineEvent::ReceiveFailed(body) => failure(registry, Direction::Receive, body),
        EngineEvent::OfferReceived(details) => {
            let offer = PendingOffer::from(details);
            offers.insert(offer.id.clone(), offer.clone());
            vec![Effect::Notify(OrchestratorEvent::OfferReady(offer))]
        }
    }
}

fn progress(
    registry: &mut SessionRegistry,
    direction: Direction,
    body: ProgressBody,
) -> Vec<Effect> {
    let percentage = body.percentage.min(100);
    let done = percentage >= 100;
    // The engine may repeat a final progress event; completion effects fire
    // only on the transition into Completed, otherwise a duplicate would
    // land in the history twice and schedule a second removal.
    let already_completed = registry
        .get(&body.id)
        .map(|session| session.phase == TransferPhase::Completed)
        .unwrap_or(false);
    let phase = if done {
        Some(TransferPhase::Completed)
    } else {
        // Engine phase hints (waiting, packaging) win; otherwise moving
        // bytes imply the active phase for the direction. With neither,
        // keep whatever phase the session already has.
        match body.phase {
            Some(phase) => Some(phase),
            None if body.transferred > 0 => Some(TransferPhase::active(direction)),
            None => None,
        }
    };

    let session = registry.upsert(
        &body.id,
        SessionPatch {
            direction: Some(direction),
            display_name: Some(body.file_name),
            transferred_bytes: Some(body.transferred),
            total_bytes: Some(body.total),
            percentage: Some(percentage),
            phase,
            ..SessionPatch::default()
        },
    );

    let mut effects = vec![Effect::Publish];
    if done && !already_completed {
        effects.push(Effect::RecordCompletion(session.clone()));
        effects.push(Effect::ScheduleRemoval(body.id));
    }
    effects
}

fn failure(registry: &mut SessionRegistry, direction: Direction, body: FailureBody) -> Vec<Effect> {
    registry.upsert(
        &body.id,
        SessionPatch {
            direction: Some(direction),
            display_name: Some(body.file_name),
            ..SessionPatch::failed(body.error)
        },
    );
    vec![Effect::Publish]
}
