//! Command-line surface.
//!
//! One mode of operation, not a subcommand dispatch table: the positional
//! target-repository argument plus the flags documented for the installer.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "githooks-installer", about = "Safely install repository-local commit-documentation hooks via a reviewable pull request")]
pub struct Cli {
    /// Target repository path.
    pub target_repo: PathBuf,

    /// Directory containing the installable payload tree (defaults to a
    /// `payload/` directory adjacent to the binary).
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Run preflight and report installation status; make no mutations.
    #[arg(short = 'c', long = "check")]
    pub check: bool,

    /// Proceed even if already installed; tracked files become modifications.
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// Skip installation of continuous-integration templates.
    #[arg(long = "no-ci")]
    pub no_ci: bool,

    /// Raise logging verbosity.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Raise logging verbosity further, including full diagnostics.
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,
}
