use clap::Parser;
use trellis::cli::commands::Cli;
use trellis::cli::handlers;

fn main() {
    let cli = Cli::parse();
    trellis::logging::init(cli.verbose);

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
