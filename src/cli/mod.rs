//! CLI module for study-rag-server
//!
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Retrieval-augmented question answering over a local vector store.
#[derive(Parser, Debug)]
#[command(
    name = "study-rag-server",
    version,
    about = "Retrieval-augmented question answering server",
    long_about = "Answers questions from previously indexed documents: the question is\n\
                  embedded, the nearest fragments are retrieved from the vector store and\n\
                  handed to a chat model together with a prompt template.\n\n\
                  Run without arguments to start the HTTP server.",
    after_help = "EXAMPLES:\n    \
                  study-rag-server                        # Start the server on port 8000\n    \
                  study-rag-server serve --port 9000      # Start on another port\n    \
                  study-rag-server ask \"What is RAG?\"     # Answer one question and exit\n    \
                  study-rag-server config --validate      # Check the configuration file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "study-rag.toml", global = true)]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Port to listen on, overriding the configuration and PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Answer a single question and print the result
    Ask {
        /// The question to answer
        question: String,
    },

    /// Show the effective configuration
    Config {
        /// Only validate, print nothing on success
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand to run; no subcommand means `serve`.
    pub fn subcommand(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Serve { port: None })
    }

    /// Log level implied by `--verbose`, if any.
    pub fn log_level_override(&self) -> Option<&'static str> {
        self.verbose.then_some("debug")
    }
}
