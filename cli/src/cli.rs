//! # CLI Interface
//!
//! Command-line arguments for `onyx`, via `clap` derive. Five subcommands:
//! `generate`, `register`, `link`, `status` and `version`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Onyx account onboarding.
///
/// Creates a new account from a recovery phrase, or links this device to an
/// existing one, and keeps the result in a local data directory.
#[derive(Parser, Debug)]
#[command(
    name = "onyx",
    about = "Onyx account onboarding",
    version,
    propagate_version = true
)]
pub struct OnyxCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Directory holding the account database. Created if missing.
    #[arg(long, short = 'd', global = true, env = "ONYX_DATA_DIR", default_value = ".onyx")]
    pub data_dir: PathBuf,

    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "ONYX_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a fresh recovery phrase. Nothing is stored.
    Generate(GenerateArgs),
    /// Register a brand-new account on this device.
    Register(RegisterArgs),
    /// Link this device to an existing account.
    Link(LinkArgs),
    /// Show this device's registration state.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Wordlist language.
    #[arg(long, default_value = "english")]
    pub language: String,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Display name for the new account.
    #[arg(long, short = 'n')]
    pub name: String,

    /// Recovery phrase to register with. A new one is generated and printed
    /// when omitted.
    #[arg(long, env = "ONYX_RECOVERY_PHRASE", hide_env_values = true)]
    pub phrase: Option<String>,

    /// Wordlist language of the phrase.
    #[arg(long, default_value = "english")]
    pub language: String,
}

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Recovery phrase of the account to link.
    #[arg(long, env = "ONYX_RECOVERY_PHRASE", hide_env_values = true)]
    pub phrase: String,

    /// Wordlist language of the phrase.
    #[arg(long, default_value = "english")]
    pub language: String,

    /// Configuration message files (JSON) to look for the display name in.
    /// May be repeated.
    #[arg(long = "config-message", short = 'm')]
    pub config_messages: Vec<PathBuf>,

    /// Display name to fall back to if none is found.
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Give up on the profile poll after this many seconds.
    #[arg(long, env = "ONYX_LINK_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}
