use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use transfer_core::{
    load_config, MissingTransferEngine, OrchestratorEvent, TransferEngine, TransferOrchestrator,
};

#[derive(Parser, Debug)]
#[command(about = "Track file transfer sessions from the terminal")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one or more paths to a peer.
    Send {
        paths: Vec<PathBuf>,
        /// Bundle name to use when sending multiple paths.
        #[arg(long)]
        name: Option<String>,
    },
    /// Look up an inbound offer by connection code and accept it.
    Receive { code: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let config = load_config();
    // No engine backend is wired up in this skeleton; commands fail fast
    // and the failure shows up in the session table like any other error.
    let engine: Arc<dyn TransferEngine> = Arc::new(MissingTransferEngine::new());
    let orchestrator = TransferOrchestrator::with_config(engine, config);
    let mut events = orchestrator.subscribe_events();
    orchestrator.start().await;

    match args.command {
        Command::Send { paths, name } => {
            let session_id = orchestrator.initiate_send(paths, name).await?;
            println!("Started send session {session_id}");
        }
        Command::Receive { code } => match orchestrator.request_receive(&code).await {
            Ok(offer) => {
                println!(
                    "Offer: {} ({} bytes)",
                    offer.file_name,
                    offer
                        .file_size
                        .map(|size| size.to_string())
                        .unwrap_or_else(|| "unknown".into())
                );
                orchestrator.accept_offer(&offer.id).await?;
            }
            Err(err) => {
                eprintln!("Receive failed: {err}");
                orchestrator.shutdown().await;
                return Ok(());
            }
        },
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(OrchestratorEvent::SessionsUpdated(sessions)) => {
                    for session in &sessions {
                        println!(
                            "{} {} {:?} {}% {}",
                            session.id,
                            session.display_name,
                            session.phase,
                            session.percentage,
                            session.error.as_deref().unwrap_or("")
                        );
                    }
                    let all_settled = sessions
                        .iter()
                        .all(|session| session.phase.is_terminal());
                    if all_settled {
                        break;
                    }
                }
                Ok(OrchestratorEvent::OfferReady(offer)) => {
                    println!("Offer ready: {}", offer.file_name);
                }
                Ok(OrchestratorEvent::MailboxFailure { session_id, failure }) => {
                    eprintln!("Mailbox failure for {session_id}: {failure}");
                }
                Err(_) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    orchestrator.shutdown().await;
    Ok(())
}
