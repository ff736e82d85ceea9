//! gzfeed CLI: decode every .gz JSON dump under a directory with a bounded worker pool.

use anyhow::Result;
use clap::Parser;
use gzfeed::engine::arg_parser::Cli;
use gzfeed::engine::handle_run;

fn main() -> Result<()> {
    let cli = Cli::parse();
    handle_run(&cli)
}
