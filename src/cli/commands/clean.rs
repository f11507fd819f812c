//! Clean command implementation

use super::shared::{load_configuration, setup_logging};
use crate::app::services::cleanup::{CleanupReport, clean_extract_dir};
use crate::cli::args::CleanArgs;
use crate::Result;
use colored::*;
use tracing::info;

/// Delete run artifacts from `<work-dir>/<extract>`
pub async fn run_clean(args: CleanArgs) -> Result<CleanupReport> {
    let config = load_configuration(args.config_file.as_deref())?;
    let _guard = setup_logging(args.get_log_level(), false, None)?;

    let extract_dir = args.work_dir.join(&config.pipeline.extract_dir_name);
    info!("Cleaning {}", extract_dir.display());

    let report = clean_extract_dir(&extract_dir, &config.pipeline.archive_file_name)?;
    match &report {
        CleanupReport::NothingToClean { .. } => println!("{}", report.to_string().yellow()),
        CleanupReport::Cleaned { .. } => println!("{}", report.to_string().green()),
    }

    Ok(report)
}
