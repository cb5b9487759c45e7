use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "repo-likes")]
#[command(about = "Repo Likes - Lists repositories from a remote API and lets you like them")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Base URL of the repositories API
    #[arg(long, global = true, env = "API_URL", default_value = "http://localhost:3333")]
    pub api_url: String,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Print the per-record likes and button identifiers
    #[arg(long, global = true)]
    pub show_ids: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch and print the repository list
    List,

    /// Like one or more repositories and print the updated list
    Like {
        /// Repository ids to like
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Print the list, then like each id typed on stdin and re-render on change
    Watch,

    /// Run the in-memory development backend
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = 3333)]
        port: u16,

        /// JSON file with the initial repositories
        #[arg(long)]
        seed: Option<PathBuf>,
    },
}
