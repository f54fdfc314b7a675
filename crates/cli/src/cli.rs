use clap::{Parser, Subcommand};

/// Inspect and dry-run the event fan-out topology.
///
/// Reads the same `fanout.toml` the service uses, so the names printed here
/// are the names the broker will see.
#[derive(Parser, Debug)]
#[command(name = "fanout", version, about = "Inspect event fan-out routing")]
pub struct CliArgs {
    /// Path to the router config file (defaults and FANOUT_* env vars if unset)
    #[arg(long, env = "FANOUT_CONFIG")]
    pub config: Option<String>,

    /// Routing mode override: isolated, single or global
    #[arg(long)]
    pub mode: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List event categories and the events each one owns
    Categories,

    /// Resolve exchange, queue and binding key for one event
    Resolve {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        event: String,
    },

    /// Print every declaration enabling these events would assert
    Plan {
        #[arg(long)]
        tenant: String,
        /// Comma-separated event names (MESSAGES_UPSERT,chats.update,...).
        /// Defaults to the events enabled in config.
        #[arg(long, value_delimiter = ',')]
        events: Vec<String>,
    },

    /// Enable a tenant and publish against an in-memory broker, then print
    /// the resulting topology
    Simulate {
        #[arg(long)]
        tenant: String,
        /// Defaults to the events enabled in config
        #[arg(long, value_delimiter = ',')]
        events: Vec<String>,
        /// Events to publish after enabling (may include non-enabled ones)
        #[arg(long, value_delimiter = ',')]
        publish: Vec<String>,
    },
}
