use crate::cli::BuildArgs;
use crate::config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use paramforge::engine::progress::ProgressReporter;
use paramforge::workflows::build::{self, BuildSummary};
use tracing::{info, warn};

pub fn run(args: BuildArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let config = config::build_config(&args)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Building dataset from {} into {}...",
        config.input_dir.display(),
        config.output_dir.display()
    );
    info!("Invoking the core build workflow...");
    let result = build::run(&config, &reporter)?;

    print_summary(&result.summary);
    if result.summary.failed > 0 {
        warn!(
            "{} molecule(s) failed; see the log for details.",
            result.summary.failed
        );
    }
    Ok(())
}

fn print_summary(summary: &BuildSummary) {
    println!("Processed {} molecule(s):", summary.total);
    println!(
        "  written: {} ({} conformers)",
        summary.written, summary.total_conformers
    );
    println!("  skipped (existing): {}", summary.skipped_existing);
    println!("  incomplete: {}", summary.incomplete);
    println!("  failed: {}", summary.failed);
    for (kind, count) in &summary.failures_by_kind {
        println!("    {kind}: {count}");
    }
}
