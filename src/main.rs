mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod ledger;
mod models;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir, church } => cli::init::run(data_dir, church),
        Commands::Import {
            file,
            yes,
            dry_run,
            force,
        } => cli::import::run(&file, yes, dry_run, force),
        Commands::Add {
            description,
            amount,
            txn_type,
            category,
            method,
            date,
        } => cli::transactions::add(&description, &amount, txn_type, &category, method, date.as_deref()),
        Commands::List { search, limit } => cli::transactions::list(search.as_deref(), limit),
        Commands::Delete { id } => cli::transactions::delete(id),
        Commands::Summary { year } => cli::summary::run(year),
        Commands::Backup { output } => cli::backup::run(output),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
