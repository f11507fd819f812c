//! Run command implementation
//!
//! Loads configuration, installs logging, and drives one pipeline job on a
//! spawned task while the caller keeps the cancellation token.

use super::shared::{LogFile, TerminalProgress, load_configuration, print_run_report, setup_logging};
use crate::app::models::PipelineJob;
use crate::app::pipeline::{Pipeline, RunOutcome};
use crate::cli::args::RunArgs;
use crate::config::Config;
use crate::{Error, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Run command entry point
pub async fn run_pipeline(args: RunArgs, cancellation_token: CancellationToken) -> Result<RunOutcome> {
    args.validate()?;

    let config = apply_cli_overrides(load_configuration(args.config_file.as_deref())?, &args);
    config.validate()?;

    let log_file = (config.logging.write_log_file && !args.no_log_file).then(|| LogFile {
        dir: args.work_dir.clone(),
        prefix: config.logging.log_file_prefix.clone(),
        level: file_log_level(&config, &args),
    });
    let log_level = if args.verbose == 0 && !args.quiet {
        config.logging.level.clone()
    } else {
        args.get_log_level().to_string()
    };
    let _guard = setup_logging(&log_level, args.quiet, log_file.as_ref())?;

    info!("Starting GUDID processor");
    debug!("Command line arguments: {:?}", args);
    debug!("Loaded configuration: {:?}", config);

    let source = args.source.to_source()?;
    let job = PipelineJob::new(source, &args.work_dir, &args.output)
        .with_extract_dir_name(&config.pipeline.extract_dir_name)
        .with_cancellation_token(cancellation_token);

    let progress = Arc::new(TerminalProgress::new(args.show_progress()));
    let mut pipeline = Pipeline::new(job, config).with_progress(progress);

    // Background task keeps the caller free to observe Ctrl+C
    let outcome = tokio::spawn(async move { pipeline.run().await })
        .await
        .map_err(|e| Error::io("Pipeline task failed", e.into()))?;

    if let RunOutcome::Done { summary } = &outcome {
        if !args.quiet {
            print_run_report(summary);
        }
    }

    Ok(outcome)
}

/// Level for the per-run log file: `-v` raises it, `-q` leaves it alone
pub fn file_log_level(config: &Config, args: &RunArgs) -> String {
    if args.verbose > 0 {
        args.get_log_level().to_string()
    } else {
        config.logging.level.clone()
    }
}

/// Apply CLI argument overrides to configuration
pub fn apply_cli_overrides(mut config: Config, args: &RunArgs) -> Config {
    if let Some(profile) = args.profile {
        config = config.with_profile(profile);
    }
    if let Some(workers) = args.workers {
        config = config.with_parse_workers(workers);
    }
    if let Some(rows) = args.chunk_rows {
        config = config.with_csv_chunk_rows(rows);
    }
    if args.no_log_file {
        config.logging.write_log_file = false;
    }
    config
}
