use clap::Parser;
use extsort::cli::{Cli, run_cli};

fn main() {
    let cli = Cli::parse();

    match run_cli(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
