// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Onyx CLI
//!
//! Entry point for the `onyx` binary. Parses arguments, sets up logging,
//! opens the account database in the data directory and runs one
//! onboarding command:
//!
//! - `generate`: print a fresh recovery phrase
//! - `register`: create a new account (generating a phrase if needed)
//! - `link`: restore an account and look for its display name
//! - `status`: show what is registered here
//! - `version`: print build version information

mod cli;
mod logging;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use onyx_account::conversation::{ConversationController, SledConversationController};
use onyx_account::identity::EnglishStrings;
use onyx_account::mnemonic::{self, MnemonicLanguage};
use onyx_account::registration::{
    load_account_id, load_registration_state, onboarding, ActivationError, ActivationListener,
    ListenerOutcome, Registrar,
};
use onyx_account::storage::SledAccountStore;
use onyx_account::sync::{
    link_cancellation, ConfigMessageFile, ProfileSource, StoreBackedConfigSync, SwarmProfilePoller,
};

use cli::{Commands, GlobalArgs, OnyxCli};
use logging::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = OnyxCli::parse();
    logging::init_logging(
        "onyx=info,onyx_account=info",
        LogFormat::from_str_lossy(&cli.global.log_format),
    );

    match cli.command {
        Commands::Generate(args) => generate(args),
        Commands::Register(args) => register(&cli.global, args).await,
        Commands::Link(args) => link(&cli.global, args).await,
        Commands::Status(args) => status(&cli.global, args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

struct Device {
    store: Arc<SledAccountStore>,
    conversations: Arc<SledConversationController>,
}

fn open_device(data_dir: &Path) -> Result<Device> {
    let db_path = data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let store = Arc::new(
        SledAccountStore::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?,
    );
    let conversations = Arc::new(
        SledConversationController::open(&store).context("failed to open conversation list")?,
    );
    tracing::debug!(path = %db_path.display(), "database opened");

    Ok(Device {
        store,
        conversations,
    })
}

fn build_onboarding(
    device: &Device,
    sources: Vec<Arc<dyn ProfileSource>>,
    attempt_timeout: Duration,
) -> (Registrar, ActivationListener) {
    onboarding(
        device.store.clone(),
        device.conversations.clone(),
        Arc::new(StoreBackedConfigSync::new(device.store.clone())),
        Arc::new(SwarmProfilePoller::new(sources, attempt_timeout)),
        Arc::new(EnglishStrings),
    )
}

/// Registered-but-unsynced is still registered; say so and carry on.
fn tolerate_sync_failure(err: onyx_account::registration::RegistrationError) -> Result<()> {
    if err.left_registered() {
        tracing::warn!(error = %err, "account registered, but config sync did not start");
        return Ok(());
    }
    Err(err.into())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn generate(args: cli::GenerateArgs) -> Result<()> {
    let language = MnemonicLanguage::from_name(&args.language)?;
    let phrase = mnemonic::generate(onyx_account::config::SEED_ENTROPY_LENGTH, language)?;
    println!("{}", phrase);
    Ok(())
}

async fn register(global: &GlobalArgs, args: cli::RegisterArgs) -> Result<()> {
    let device = open_device(&global.data_dir)?;
    let (registrar, _listener) = build_onboarding(&device, Vec::new(), Duration::from_secs(1));

    let name = registrar
        .validate_display_name(&args.name)
        .context("invalid display name")?;

    let phrase = match args.phrase {
        Some(phrase) => phrase,
        None => {
            let language = MnemonicLanguage::from_name(&args.language)?;
            let phrase = mnemonic::generate(onyx_account::config::SEED_ENTROPY_LENGTH, language)?;
            println!("Recovery phrase (write this down, it is shown once):");
            println!("  {}", phrase);
            phrase
        }
    };

    match registrar
        .register_fresh_account(&phrase, &args.language, &name, None)
        .await
    {
        Ok(account_id) => {
            println!("Registered.");
            println!("  Account id   : {}", account_id);
            println!("  Display name : {}", name);
            Ok(())
        }
        Err(e) => tolerate_sync_failure(e),
    }
}

async fn link(global: &GlobalArgs, args: cli::LinkArgs) -> Result<()> {
    let device = open_device(&global.data_dir)?;
    let timeout = Duration::from_secs(args.timeout_secs);
    let sources: Vec<Arc<dyn ProfileSource>> = args
        .config_messages
        .iter()
        .map(|path| Arc::new(ConfigMessageFile::new(path)) as Arc<dyn ProfileSource>)
        .collect();
    let (registrar, mut listener) = build_onboarding(&device, sources, timeout);

    let (handle, token) = link_cancellation();
    let watchdog = tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "profile poll timed out");
            }
            _ = shutdown_signal() => {
                tracing::info!("interrupted, cancelling link");
            }
        }
        handle.cancel();
    });

    let outcome = registrar
        .link_existing_account(&args.phrase, &args.language, &token)
        .await;
    watchdog.abort();
    let outcome = outcome.context("device link failed")?;

    if outcome.cancelled {
        println!("Link cancelled. Account {} is pending; run `link` again.", outcome.account_id);
        return Ok(());
    }

    match listener.next().await {
        Some(Ok(ListenerOutcome::Activated(account_id))) => {
            println!("Linked.");
            println!("  Account id   : {}", account_id);
            if let Some(name) = &outcome.display_name {
                println!("  Display name : {}", name);
            }
            Ok(())
        }
        Some(Ok(ListenerOutcome::NeedsDisplayName(account_id))) => {
            let Some(name) = args.name else {
                println!("No display name found for {}.", account_id);
                println!("Run `link` again with --name to finish.");
                return Ok(());
            };
            let name = registrar
                .validate_display_name(&name)
                .context("invalid display name")?;
            let callback = registrar.link_completion_callback(name.clone());
            registrar
                .register_fresh_account(&args.phrase, &args.language, &name, Some(callback))
                .await
                .context("failed to finish link with the given name")?;
            finish_fallback(&mut listener, &name).await
        }
        Some(Err(ActivationError::SyncInit(e))) => {
            tracing::warn!(error = %e, "account registered, but config sync did not start");
            Ok(())
        }
        Some(Err(e)) => Err(e).context("activation after link failed"),
        None => Err(anyhow!("activation listener closed unexpectedly")),
    }
}

async fn finish_fallback(listener: &mut ActivationListener, name: &str) -> Result<()> {
    match listener.next().await {
        Some(Ok(ListenerOutcome::Activated(account_id))) => {
            println!("Linked.");
            println!("  Account id   : {}", account_id);
            println!("  Display name : {}", name);
            Ok(())
        }
        Some(Ok(ListenerOutcome::NeedsDisplayName(_))) => {
            Err(anyhow!("display name was rejected during activation"))
        }
        Some(Err(ActivationError::SyncInit(e))) => {
            tracing::warn!(error = %e, "account registered, but config sync did not start");
            Ok(())
        }
        Some(Err(e)) => Err(e).context("activation after link failed"),
        None => Err(anyhow!("activation listener closed unexpectedly")),
    }
}

async fn status(global: &GlobalArgs, args: cli::StatusArgs) -> Result<()> {
    let device = open_device(&global.data_dir)?;
    let state = load_registration_state(device.store.as_ref())
        .await
        .context("failed to read registration state")?;
    let account_id = load_account_id(device.store.as_ref())
        .await
        .context("failed to read account id")?;

    let display_name = match &account_id {
        Some(id) => device
            .conversations
            .get(id.as_str())
            .await
            .context("failed to read self-conversation")?
            .and_then(|c| c.display_name().map(str::to_string)),
        None => None,
    };

    if args.json {
        let body = serde_json::json!({
            "state": state.to_string(),
            "account_id": account_id.as_ref().map(|id| id.as_str()),
            "display_name": display_name,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("State        : {}", state);
    println!(
        "Account id   : {}",
        account_id.as_ref().map(|id| id.as_str()).unwrap_or("-")
    );
    println!("Display name : {}", display_name.as_deref().unwrap_or("-"));
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("onyx  {}", env!("CARGO_PKG_VERSION"));
    println!("rustc {}", rustc_version());
}

fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for Ctrl+C or SIGTERM, whichever comes first.
///
/// If a handler cannot be installed, that signal is never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
