//! Command implementations for GUDID processor CLI
//!
//! Each command is implemented in its own module; `shared` holds logging,
//! configuration and terminal progress used by both.

pub mod clean;
pub mod run;
pub mod shared;

pub use shared::{TerminalProgress, format_size};

use crate::Result;
use crate::cli::args::{Args, Commands};
use tokio_util::sync::CancellationToken;

/// Main command runner for GUDID processor
///
/// Dispatches to the subcommand handler and returns the process exit code.
/// Callers must check that a subcommand is present first.
pub async fn run(args: Args, cancellation_token: CancellationToken) -> Result<i32> {
    match args.command {
        Some(Commands::Run(run_args)) => {
            let outcome = run::run_pipeline(run_args, cancellation_token).await?;
            Ok(outcome.exit_code())
        }
        Some(Commands::Clean(clean_args)) => {
            clean::run_clean(clean_args).await?;
            Ok(0)
        }
        None => Ok(0),
    }
}
