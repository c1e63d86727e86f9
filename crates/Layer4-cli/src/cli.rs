//! Command-line arguments

use clap::{Args as ClapArgs, Parser, Subcommand};
use tasklog_foundation::TransportMode;

/// Tasklog - follow a remote task's live log stream
#[derive(Parser, Debug)]
#[command(name = "tasklog")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Transport to use (eventstream, polling) - overrides config
    #[arg(long, global = true)]
    pub transport: Option<TransportMode>,

    /// Base URL of the task service - overrides config
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Print events as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream a task's logs until it completes
    Follow(FollowArgs),

    /// Fetch one batch of events and exit
    Fetch(FetchArgs),
}

#[derive(ClapArgs, Debug)]
pub struct FollowArgs {
    /// Task identifier
    pub task_id: String,

    /// Resume strictly after this ordinal
    #[arg(long)]
    pub after: Option<u64>,

    /// Keep the stream open after a completion event
    #[arg(long)]
    pub recoverable: bool,
}

#[derive(ClapArgs, Debug)]
pub struct FetchArgs {
    /// Task identifier
    pub task_id: String,

    /// Only events after this ordinal
    #[arg(long)]
    pub after: Option<u64>,
}
