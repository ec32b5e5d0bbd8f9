use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "conversa")]
#[command(author, version, about = "Conversational state engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a single chat message
    Chat {
        prompt: String,

        /// Owner of the conversation
        #[arg(short, long, default_value = "local")]
        owner: String,

        /// Existing conversation id to continue
        #[arg(short, long)]
        conversation: Option<String>,

        /// Model id override
        #[arg(short, long)]
        model: Option<String>,

        /// Retention policy: recent-window or full-history
        #[arg(short, long, default_value = "recent-window")]
        policy: String,
    },

    /// Start an interactive chat session
    Interactive {
        /// Owner of the conversation
        #[arg(short, long, default_value = "local")]
        owner: String,

        /// Model id override
        #[arg(short, long)]
        model: Option<String>,

        /// Retention policy: recent-window or full-history
        #[arg(short, long, default_value = "recent-window")]
        policy: String,
    },
}
