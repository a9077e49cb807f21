pub mod hosts;
pub mod repair;
pub mod resolve;
pub mod scan;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ipward")]
#[command(about = "Network discovery with address-ownership reconciliation.")]
#[command(version)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Host store, overrides the configured path
    #[arg(short, long, global = true)]
    pub store: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Less output (-q summary only)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub quiet: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover hosts in the configured ranges and reconcile them
    #[command(alias = "s")]
    Scan {
        /// Range ids to scan; all configured ranges when omitted
        ranges: Vec<String>,

        /// Skip reverse DNS lookups
        #[arg(long)]
        no_dns: bool,

        /// Print events as JSON lines instead of the progress view
        #[arg(long)]
        json: bool,
    },
    /// Show which range owns an address
    #[command(alias = "r")]
    Resolve { address: String },
    /// Re-resolve the owner of every stored host
    Repair,
    /// List stored hosts
    #[command(alias = "h")]
    Hosts {
        /// Only hosts owned by this range
        #[arg(long)]
        range: Option<String>,
    },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
