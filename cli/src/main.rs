mod commands;
mod terminal;

use commands::{CommandLine, Commands, hosts, repair, resolve, scan};
use ipward_common::config::Config;
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLine::parse_args();

    logging::init(cli.verbose, cli.quiet);
    print::banner(cli.quiet);

    let mut cfg = Config::load_or_default(cli.config.as_deref())?;
    let store_path = cli.store.clone().unwrap_or_else(|| cfg.store.path.clone());

    match cli.command {
        Commands::Scan {
            ranges,
            no_dns,
            json,
        } => {
            cfg.probe.no_dns |= no_dns;
            print::header("getting ready for discovery", cli.quiet);
            scan::scan(ranges, json, &cfg, &store_path, cli.quiet).await
        }
        Commands::Resolve { address } => {
            print::header("range ownership", cli.quiet);
            resolve::resolve(&address, &cfg)
        }
        Commands::Repair => {
            print::header("repairing ownership", cli.quiet);
            repair::repair(&cfg, &store_path).await
        }
        Commands::Hosts { range } => hosts::hosts(range, &cfg, &store_path, cli.quiet).await,
    }
}
