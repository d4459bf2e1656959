use clap::Parser;
use tracing_subscriber::EnvFilter;

use split_segments::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("split_segments=debug,info")
    } else {
        EnvFilter::new("split_segments=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        cli::Commands::Scan(args) => {
            cli::scan::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Groups(args) => {
            cli::groups::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
