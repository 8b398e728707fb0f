#![doc = "The kona data transport layer: indexes rollup contract events from the L1 chain."]

use clap::Parser;

mod cli;
mod error;
mod flags;

fn main() {
    kona_cli::backtrace::enable();

    if let Err(err) = cli::Cli::parse().run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
