//! CLI argument parsing
//!
//! Uses clap for argument parsing with derive macros.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

/// Get default socket path, preferring XDG_RUNTIME_DIR on Linux
fn default_socket_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join("responder-watch.sock");
    }
    PathBuf::from("/tmp/responder-watch.sock")
}

/// Agent activity tracking and map marker extraction for disaster-response chat sessions
#[derive(Parser, Debug)]
#[command(name = "responder-watch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Socket path for inbound items (default: $XDG_RUNTIME_DIR/responder-watch.sock or /tmp/responder-watch.sock)
    #[arg(
        short,
        long,
        env = "RESPONDER_WATCH_SOCKET",
        default_value_os_t = default_socket_path(),
        global = true
    )]
    pub socket: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Config file (default: platform config dir)
    #[arg(short, long, env = "RESPONDER_WATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Listen on the socket and print the session view as JSON lines (default)
    Listen,

    /// Forward JSON lines from a file or stdin to a running listener
    Push {
        /// Input file (default: stdin)
        file: Option<PathBuf>,
    },

    /// Replay a JSONL capture offline and print the resulting view
    Replay {
        /// Capture file, one inbound item per line
        file: PathBuf,

        /// Print a view after every line that changed state
        #[arg(long, default_value_t = false)]
        every: bool,
    },

    /// Extract map markers from text and print them as JSON
    Extract {
        /// Text to scan (default: stdin)
        text: Option<String>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print an example config with all defaults
    Example,
    /// Print the default config file path
    Path,
}

/// Generate shell completions and print to stdout
pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "responder-watch", &mut io::stdout());
}
