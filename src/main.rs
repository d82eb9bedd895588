use std::process::ExitCode;

use clap::Parser;

use githooks_installer::auth::AuthMethod;
use githooks_installer::cli::Cli;
use githooks_installer::config::Options;
use githooks_installer::installer::{render_outcome, InstallOutcome, Installer};
use githooks_installer::{error, styling};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbosity = if cli.debug { 2 } else if cli.verbose { 1 } else { 0 };
    styling::set_verbosity(verbosity);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(match verbosity {
        2 => "debug",
        1 => "info",
        _ => "warn",
    }))
    .init();

    let options = Options::from_cli(&cli);
    let auth = AuthMethod::from_env();

    match Installer::new(options).run(&auth) {
        Ok(outcome) => {
            println!("{}", render_outcome(&outcome));
            match outcome {
                InstallOutcome::CheckResult { installed_and_current: false, .. } => ExitCode::from(1),
                _ => ExitCode::SUCCESS,
            }
        }
        Err(e) => {
            eprintln!("{}", error::render(&e));
            ExitCode::from(error::exit_code(&e) as u8)
        }
    }
}
