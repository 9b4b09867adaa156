//! Client-side orchestration of file transfer sessions.
//!
//! The orchestrator tracks every in-flight send and receive in a session
//! table, reconciles user commands with the asynchronous event stream of an
//! external transfer engine, and publishes snapshots plus notifications over
//! a broadcast channel for frontends to render.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use thiserror::Error;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared::{
    domain::{Direction, SessionId, TransferPhase},
    error::EngineFailure,
};

pub mod config;
pub mod engine;
pub mod history;
pub mod reducer;
pub mod registry;

pub use config::{load_config, OrchestratorConfig};
pub use engine::{MissingTransferEngine, TransferEngine};
pub use history::{TransferHistory, TransferRecord};
pub use registry::{PendingOffer, Session, SessionPatch, SessionRegistry};

use reducer::Effect;

/// Notifications published to frontends.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    /// The session table changed; the full table, newest first.
    SessionsUpdated(Vec<Session>),
    /// An inbound offer is ready for an accept/deny decision.
    OfferReady(PendingOffer),
    /// The engine could not obtain a connection code for a send.
    MailboxFailure {
        session_id: SessionId,
        failure: EngineFailure,
    },
}

#[derive(Debug, Error)]
pub enum OfferError {
    #[error("connection code must not be empty")]
    EmptyCode,
    #[error("offer lookup failed: {0}")]
    Lookup(String),
    #[error("no pending offer with id {0}")]
    UnknownOffer(SessionId),
    #[error("offer rejection failed: {0}")]
    Deny(String),
}

struct OrchestratorState {
    registry: SessionRegistry,
    pending_offers: HashMap<SessionId, PendingOffer>,
    history: TransferHistory,
    pump: Option<JoinHandle<()>>,
    started: bool,
}

pub struct TransferOrchestrator {
    engine: Arc<dyn TransferEngine>,
    config: OrchestratorConfig,
    inner: Mutex<OrchestratorState>,
    events: broadcast::Sender<OrchestratorEvent>,
}

impl TransferOrchestrator {
    pub fn new(engine: Arc<dyn TransferEngine>) -> Arc<Self> {
        Self::with_config(engine, OrchestratorConfig::default())
    }

    pub fn with_config(engine: Arc<dyn TransferEngine>, config: OrchestratorConfig) -> Arc<Self> {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Arc::new(Self {
            engine,
            inner: Mutex::new(OrchestratorState {
                registry: SessionRegistry::default(),
                pending_offers: HashMap::new(),
                history: TransferHistory::new(config.history_capacity),
                pump: None,
                started: false,
            }),
            events,
            config,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.events.subscribe()
    }

    pub async fn sessions(&self) -> Vec<Session> {
        self.inner.lock().await.registry.snapshot()
    }

    pub async fn pending_offers(&self) -> Vec<PendingOffer> {
        let guard = self.inner.lock().await;
        let mut offers: Vec<PendingOffer> = guard.pending_offers.values().cloned().collect();
        offers.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        offers
    }

    pub async fn history(&self) -> Vec<TransferRecord> {
        self.inner.lock().await.history.snapshot()
    }

    /// Begin consuming the engine's event stream. Safe to call repeatedly;
    /// only the first call spawns the pump task.
    pub async fn start(self: &Arc<Self>) {
        let mut guard = self.inner.lock().await;
        if guard.started {
            return;
        }
        let receiver = self.engine.subscribe_events();
        let orchestrator = Arc::clone(self);
        guard.pump = Some(tokio::spawn(async move {
            orchestrator.pump_events(receiver).await;
        }));
        guard.started = true;
        info!("transfer event pump started");
    }

    /// Stop consuming engine events. In-flight engine operations are not
    /// cancelled; their eventual events are simply no longer observed.
    pub async fn shutdown(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(pump) = guard.pump.take() {
            pump.abort();
        }
        guard.started = false;
    }

    async fn pump_events(self: Arc<Self>, mut receiver: broadcast::Receiver<shared::protocol::EngineEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.apply_engine_event(event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "engine event stream lagged; sessions may be stale");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        let mut guard = self.inner.lock().await;
        guard.started = false;
        guard.pump = None;
    }

    async fn apply_engine_event(self: &Arc<Self>, event: shared::protocol::EngineEvent) {
        debug!(session_id = %event.session_id(), "applying engine event");
        let mut notifications = Vec::new();
        {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            let effects = reducer::apply(&mut state.registry, &mut state.pending_offers, event);
            let mut publish = false;
            for effect in effects {
                match effect {
                    Effect::Publish => publish = true,
                    Effect::RecordCompletion(session) => {
                        state.history.record_completed(&session);
                    }
                    Effect::ScheduleRemoval(session_id) => {
                        self.spawn_removal(session_id);
                    }
                    Effect::Notify(notification) => notifications.push(notification),
                }
            }
            if publish {
                notifications.push(OrchestratorEvent::SessionsUpdated(state.registry.snapshot()));
            }
        }
        for notification in notifications {
            let _ = self.events.send(notification);
        }
    }

    /// Completed sessions linger briefly so frontends can show the finished
    /// state, then disappear on their own.
    fn spawn_removal(self: &Arc<Self>, session_id: SessionId) {
        let orchestrator = Arc::clone(self);
        let linger = self.config.completion_linger;
        tokio::spawn(async move {
            tokio::time::sleep(linger).await;
            let snapshot = {
                let mut guard = orchestrator.inner.lock().await;
                if guard.registry.remove(&session_id).is_none() {
                    return;
                }
                guard.registry.snapshot()
            };
            let _ = orchestrator
                .events
                .send(OrchestratorEvent::SessionsUpdated(snapshot));
        });
    }

    /// Start sending one or more paths. The session appears in the table
    /// immediately; engine events fill in progress from there.
    pub async fn initiate_send(
        self: &Arc<Self>,
        paths: Vec<PathBuf>,
        name_hint: Option<String>,
    ) -> Result<SessionId> {
        if paths.is_empty() {
            bail!("nothing to send: no paths given");
        }

        let session_id = SessionId::new(Uuid::new_v4().to_string());
        let display_name = send_display_name(&paths, name_hint, &self.config.bundle_name_format);

        {
            let mut guard = self.inner.lock().await;
            guard.registry.upsert(
                &session_id,
                SessionPatch {
                    direction: Some(Direction::Send),
                    display_name: Some(display_name.clone()),
                    phase: Some(TransferPhase::Preparing),
                    ..SessionPatch::default()
                },
            );
        }
        self.publish_sessions().await;

        let orchestrator = Arc::clone(self);
        let id = session_id.clone();
        tokio::spawn(async move {
            let outcome = match <[PathBuf; 1]>::try_from(paths) {
                Ok([path]) => orchestrator.engine.send_file(path, id.clone()).await,
                Err(paths) => {
                    orchestrator
                        .engine
                        .send_files(paths, id.clone(), Some(display_name))
                        .await
                }
            };
            if let Err(err) = outcome {
                orchestrator.fail_session(&id, err.to_string()).await;
            }
        });

        Ok(session_id)
    }

    /// Resolve a connection code to an inbound offer and stage it for an
    /// accept/deny decision. Nothing enters the session table yet.
    pub async fn request_receive(self: &Arc<Self>, code: &str) -> Result<PendingOffer, OfferError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(OfferError::EmptyCode);
        }

        let details = self
            .engine
            .lookup_offer(shared::domain::ConnectionCode::new(code))
            .await
            .map_err(|err| OfferError::Lookup(err.to_string()))?;

        let offer = PendingOffer::from(details);
        {
            let mut guard = self.inner.lock().await;
            guard
                .pending_offers
                .insert(offer.id.clone(), offer.clone());
        }
        let _ = self
            .events
            .send(OrchestratorEvent::OfferReady(offer.clone()));
        Ok(offer)
    }

    /// Accept a staged offer. A receive session appears immediately; engine
    /// events drive it from there.
    pub async fn accept_offer(self: &Arc<Self>, offer_id: &SessionId) -> Result<(), OfferError> {
        let offer = {
            let mut guard = self.inner.lock().await;
            let Some(offer) = guard.pending_offers.remove(offer_id) else {
                return Err(OfferError::UnknownOffer(offer_id.clone()));
            };
            guard.registry.upsert(
                offer_id,
                SessionPatch {
                    direction: Some(Direction::Receive),
                    display_name: Some(offer.file_name.clone()),
                    total_bytes: offer.file_size,
                    phase: Some(TransferPhase::Preparing),
                    ..SessionPatch::default()
                },
            );
            offer
        };
        self.publish_sessions().await;

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = orchestrator.engine.accept_offer(offer.id.clone()).await {
                orchestrator.fail_session(&offer.id, err.to_string()).await;
            }
        });
        Ok(())
    }

    /// Reject a staged offer. Never touches the session table.
    pub async fn deny_offer(&self, offer_id: &SessionId) -> Result<(), OfferError> {
        {
            let mut guard = self.inner.lock().await;
            if guard.pending_offers.remove(offer_id).is_none() {
                return Err(OfferError::UnknownOffer(offer_id.clone()));
            }
        }
        self.engine
            .deny_offer(offer_id.clone())
            .await
            .map_err(|err| OfferError::Deny(err.to_string()))
    }

    /// Cancel an in-flight send. The session leaves the table immediately;
    /// the engine-side cancellation is best effort.
    pub async fn cancel_send(self: &Arc<Self>, session_id: &SessionId) {
        let removed = {
            let mut guard = self.inner.lock().await;
            guard.registry.remove(session_id).is_some()
        };
        if removed {
            self.publish_sessions().await;
        }

        let orchestrator = Arc::clone(self);
        let id = session_id.clone();
        tokio::spawn(async move {
            if let Err(err) = orchestrator.engine.cancel_send(id.clone()).await {
                warn!(session_id = %id, error = %err, "engine cancel failed");
            }
        });
    }

    /// Drop a session from the table without telling the engine anything.
    /// Used to clear finished or failed entries from view.
    pub async fn dismiss(&self, session_id: &SessionId) {
        let removed = {
            let mut guard = self.inner.lock().await;
            guard.registry.remove(session_id).is_some()
        };
        if removed {
            self.publish_sessions().await;
        }
    }

    /// Mark a dispatched command as failed, unless the user already removed
    /// the session while the engine call was in flight.
    async fn fail_session(&self, session_id: &SessionId, error: String) {
        {
            let mut guard = self.inner.lock().await;
            if !guard.registry.contains(session_id) {
                return;
            }
            guard.registry.upsert(session_id, SessionPatch::failed(error));
        }
        self.publish_sessions().await;
    }

    async fn publish_sessions(&self) {
        let snapshot = self.inner.lock().await.registry.snapshot();
        let _ = self
            .events
            .send(OrchestratorEvent::SessionsUpdated(snapshot));
    }
}

fn send_display_name(
    paths: &[PathBuf],
    name_hint: Option<String>,
    bundle_format: &str,
) -> String {
    if paths.len() == 1 {
        return paths[0]
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| paths[0].to_string_lossy().into_owned());
    }
    match name_hint {
        Some(hint) if !hint.trim().is_empty() => {
            format!("{}{}", hint.trim(), config::BUNDLE_SUFFIX)
        }
        _ => config::bundle_display_name(bundle_format, paths.len()),
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
