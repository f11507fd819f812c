use clap::Parser;
use gudid_processor::cli::{args::Args, commands};
use std::process;
use tokio_util::sync::CancellationToken;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    // Create async runtime and run the main command logic with signal handling
    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        // Create cancellation token for coordinating graceful shutdown
        let cancellation_token = CancellationToken::new();

        // Ctrl+C only requests cancellation; the run still reports its own outcome
        let signal_token = cancellation_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nReceived CTRL+C, cancelling...");
                signal_token.cancel();
            }
        });

        commands::run(args, cancellation_token).await
    });

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(error) => {
            // Error occurred - print to stderr and exit with error code
            eprintln!("Error: {}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("GUDID Processor - FDA Device Export Converter");
    println!("=============================================");
    println!();
    println!("Convert zipped FDA GUDID device exports from XML into flat CSV files.");
    println!();
    println!("USAGE:");
    println!("    gudid-processor <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    run         Acquire, extract, parse and write CSV (main command)");
    println!("    clean       Delete the downloaded archive and extracted XML files");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Show help information");
    println!("    -V, --version    Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    # Download the export and convert it:");
    println!("    gudid-processor run --url https://example.org/gudid_full_release.zip \\");
    println!("                        --work-dir ./work --output ./devices.csv");
    println!();
    println!("    # Convert an archive already on disk with the unqualified schema:");
    println!("    gudid-processor run --local ./export.zip --work-dir ./work \\");
    println!("                        --output ./devices.csv --profile unqualified");
    println!();
    println!("    # Remove the downloaded archive and extracted XML:");
    println!("    gudid-processor clean --work-dir ./work");
    println!();
    println!("For detailed help on any command, use:");
    println!("    gudid-processor <COMMAND> --help");
}
