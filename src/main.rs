use clap::Parser;
use tradetally::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
