//! Command-line entry point for the rexz binary.

use clap::error::ErrorKind;
use clap::Parser;

use rexz::error::PreconditionError;

fn main() {
    // Help output must exit non-success so it cannot be mistaken for a
    // successful no-op run.
    let cli = match rexz::cli::Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayVersion => 0,
                _ => 2,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    if let Err(err) = rexz::run(cli) {
        let mut exit_code = 1;
        for cause in err.chain() {
            if cause.is::<PreconditionError>() {
                exit_code = 2;
                break;
            }
            if cause.is::<std::io::Error>() {
                exit_code = 1;
            }
        }
        eprintln!("rexz: {err:#}");
        std::process::exit(exit_code);
    }
}
