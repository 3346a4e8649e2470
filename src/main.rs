mod adapters;
mod cli;
mod config;
mod core;
#[cfg(test)]
mod test_support;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::context::CommandContext;
use cli::{Cli, Commands};

fn main() {
    let args = Cli::parse();
    init_logging(args.verbose, args.quiet);

    let result = CommandContext::new(&args).and_then(|ctx| match &args.command {
        Commands::Scan { file } => cli::commands::scan::execute(&ctx, file),
        Commands::Import { file, only } => cli::commands::import::execute(&ctx, file, only),
        Commands::Export {
            ids,
            all,
            secret,
            output,
        } => cli::commands::export::execute(&ctx, ids, *all, *secret, output),
        Commands::List { secret } => cli::commands::list::execute(&ctx, *secret),
        Commands::Delete { id, secret } => cli::commands::delete::execute(&ctx, id, *secret),
        Commands::Upload { id, server } => {
            cli::commands::upload::execute(&ctx, id, server.as_deref())
        }
    });

    if let Err(e) = result {
        cli::output::error(&format!("Error: {e}"));
        std::process::exit(1);
    }
}

/// Log to stderr. `RUST_LOG` wins over the verbosity flags.
fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        "keyport=debug"
    } else if quiet {
        "keyport=error"
    } else {
        "keyport=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
