//! The seam between the orchestrator and the external transfer engine.
//!
//! The engine owns connections, relay negotiation, packaging, and byte
//! movement; the orchestrator only issues commands and consumes the engine's
//! event stream. Everything behind this trait is replaceable, including in
//! tests.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

use shared::{
    domain::{ConnectionCode, SessionId},
    error::EngineFailure,
    protocol::{EngineEvent, OfferDetails},
};

#[async_trait]
pub trait TransferEngine: Send + Sync {
    /// Send a single file or folder. The engine resolves the path and
    /// packages folders itself; this call returns once the transfer has
    /// finished or failed.
    async fn send_file(&self, path: PathBuf, session_id: SessionId) -> Result<()>;

    /// Send several paths bundled under one top-level folder name.
    async fn send_files(
        &self,
        paths: Vec<PathBuf>,
        session_id: SessionId,
        folder_name: Option<String>,
    ) -> Result<()>;

    /// Resolve a connection code to the file offer behind it.
    async fn lookup_offer(&self, code: ConnectionCode) -> Result<OfferDetails>;

    /// Accept a previously looked-up offer; progress events for the same id
    /// follow on the event stream.
    async fn accept_offer(&self, offer_id: SessionId) -> Result<()>;

    /// Reject a previously looked-up offer.
    async fn deny_offer(&self, offer_id: SessionId) -> Result<()>;

    /// Best-effort cancellation of an in-flight send. The engine may or may
    /// not emit a final event for the session afterwards.
    async fn cancel_send(&self, session_id: SessionId) -> Result<()>;

    fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent>;
}

/// Stand-in used when no engine has been wired up. Every command fails and
/// the event stream stays silent.
pub struct MissingTransferEngine {
    events: broadcast::Sender<EngineEvent>,
}

impl MissingTransferEngine {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(1);
        Self { events }
    }
}

impl Default for MissingTransferEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn unavailable(detail: String) -> anyhow::Error {
    EngineFailure::command(format!("transfer engine is unavailable ({detail})")).into()
}

#[async_trait]
impl TransferEngine for MissingTransferEngine {
    async fn send_file(&self, path: PathBuf, _session_id: SessionId) -> Result<()> {
        Err(unavailable(format!("send_file {}", path.display())))
    }

    async fn send_files(
        &self,
        _paths: Vec<PathBuf>,
        session_id: SessionId,
        _folder_name: Option<String>,
    ) -> Result<()> {
        Err(unavailable(format!("send_files {session_id}")))
    }

    async fn lookup_offer(&self, code: ConnectionCode) -> Result<OfferDetails> {
        Err(unavailable(format!("lookup {code}")))
    }

    async fn accept_offer(&self, offer_id: SessionId) -> Result<()> {
        Err(unavailable(format!("accept {offer_id}")))
    }

    async fn deny_offer(&self, offer_id: SessionId) -> Result<()> {
        Err(unavailable(format!("deny {offer_id}")))
    }

    async fn cancel_send(&self, session_id: SessionId) -> Result<()> {
        Err(unavailable(format!("cancel {session_id}")))
    }

    fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}
