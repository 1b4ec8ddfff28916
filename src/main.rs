#![allow(dead_code)]
#[macro_use]
mod errors;
mod repl;
mod session;
mod sql;
mod storage;

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "mysqlite", version = VERSION, about = "Tiny persistent key-value store.")]
struct Cli {
    /// Path to the database file. Created if it doesn't already exist.
    #[arg(long, default_value = "data.db", env = "MYSQLITE_FILE")]
    file: PathBuf,
}

fn main() {
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open("mysqlite.log")
        .expect("Failed to open log file");

    tracing_subscriber::fmt()
        .with_writer(file)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match repl::start(cli.file) {
        Ok(_) => (),
        Err(errors::Error::Io(e)) if e.kind() == io::ErrorKind::Interrupted => (), // Silence Ctrl+C/Ctrl+D
        Err(e) => {
            println!("\nError: {}", e);
            std::process::exit(1);
        }
    }
}
