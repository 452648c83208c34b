mod clean_cmd;
mod cli;
mod page_range;
mod redact_cmd;
mod shared;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        cli::Commands::Clean { ref common } => clean_cmd::run(common),
        cli::Commands::Redact {
            ref common,
            ref remove,
        } => redact_cmd::run(common, remove),
    };

    if let Err(code) = result {
        std::process::exit(code);
    }
}
