//! HMS Mirror - CLI entry point.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use hms_mirror::{
    audit::{audit_store, check_completeness, check_consistency, AuditOptions},
    cli::{Args, Command},
    config::{validate_config, Config},
    download::{BackoffController, BatchOptions, BatchRunner, HttpFetcher, TokioSleeper},
    error::{exit_codes, Error, Result},
    fs::{ensure_dir, LocalStore},
    manifest::read_manifest,
    output::{
        print_audit_report, print_banner, print_batch_report, print_completeness_report,
        print_config_summary, print_consistency_report, print_error, print_info, print_success,
        print_warning,
    },
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            match e {
                Error::Config(_)
                | Error::ConfigValidation { .. }
                | Error::MissingConfig(_)
                | Error::TomlParse(_) => ExitCode::from(exit_codes::CONFIG_ERROR as u8),
                Error::Aborted(_) => ExitCode::from(exit_codes::ABORT as u8),
                Error::Download(_) | Error::Filesystem { .. } => {
                    ExitCode::from(exit_codes::DOWNLOAD_ERROR as u8)
                }
                Error::IntegrityIssues(_) => ExitCode::from(exit_codes::INTEGRITY_ISSUES as u8),
                _ => ExitCode::from(exit_codes::UNEXPECTED_ERROR as u8),
            }
        }
    }
}

async fn run() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt().with_env_filter(filter).with_target(false).init();

    print_banner();

    if let Command::Init { force } = &args.command {
        return init_config(&args.config, *force);
    }

    // Load configuration
    let mut config = if args.config.exists() {
        Config::load(&args.config)?
    } else {
        print_warning(&format!(
            "Configuration file not found: {}",
            args.config.display()
        ));
        print_info("Using default configuration with CLI arguments");
        Config::default()
    };

    // Merge CLI arguments into config
    args.merge_into_config(&mut config);

    // Validate configuration
    validate_config(&config)?;

    match &args.command {
        Command::Download { report, .. } => download(&config, report.as_deref()).await,
        Command::Audit { dry_run, .. } => audit(&config, *dry_run),
        Command::Check {
            mismatches, limit, ..
        } => check(&config, mismatches.as_deref(), *limit),
        Command::Completeness { limit, .. } => completeness(&config, *limit),
        Command::Init { .. } => Ok(()),
    }
}

/// Write the default configuration file.
fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    Config::default().save(path)?;
    print_success(&format!("Wrote default configuration to {}", path.display()));
    Ok(())
}

/// Resolve the links file and fetch everything not already on disk.
async fn download(config: &Config, report_path: Option<&Path>) -> Result<()> {
    print_config_summary(
        &config.manifest.links_file,
        &config.output.directory,
        config.options.workers,
    );

    let manifest = read_manifest(&config.manifest.links_file)?;
    print_info(&format!(
        "Found {} media files to download ({} other files excluded, {} lines skipped)",
        manifest.tasks.len(),
        manifest.excluded,
        manifest.skipped.len()
    ));

    ensure_dir(&config.output.directory)?;

    let sleeper = TokioSleeper;
    let backoff = BackoffController::from_config(&config.backoff, &sleeper);
    let fetcher = HttpFetcher::from_config(config)?;
    let store = LocalStore::new(config.output.directory.clone());
    let runner = BatchRunner::new(
        &store,
        &fetcher,
        &backoff,
        &sleeper,
        BatchOptions::from_config(config),
    );

    let report = runner.run(&manifest.tasks).await;
    print_batch_report(&report);

    if let Some(path) = report_path {
        report.write_json(path)?;
        print_info(&format!("Report written to {}", path.display()));
    }

    if let Some(reason) = report.aborted {
        return Err(Error::Aborted(reason));
    }
    if !report.failed.is_empty() {
        return Err(Error::Download(format!(
            "{} task(s) failed",
            report.failed.len()
        )));
    }

    print_success("Download complete.");
    Ok(())
}

/// Remove empty and corrupt files from the mirror.
fn audit(config: &Config, dry_run: bool) -> Result<()> {
    let report = audit_store(
        &config.output.directory,
        AuditOptions {
            dry_run,
            show_progress: config.options.show_downloads,
        },
    )?;
    print_audit_report(&report);

    if !report.is_clean() {
        return Err(Error::IntegrityIssues(format!(
            "{} empty, {} corrupt",
            report.empty, report.corrupt
        )));
    }
    Ok(())
}

/// Report files filed under a folder that does not mention their label.
fn check(config: &Config, mismatches: Option<&Path>, limit: usize) -> Result<()> {
    let report = check_consistency(&config.output.directory)?;
    print_consistency_report(&report, limit);

    if let Some(path) = mismatches {
        report.write_mismatches(path)?;
        print_info(&format!("Mismatches written to {}", path.display()));
    }
    Ok(())
}

/// Compare the links file against the files on disk.
fn completeness(config: &Config, limit: usize) -> Result<()> {
    let manifest = read_manifest(&config.manifest.links_file)?;
    let report = check_completeness(&manifest.tasks, &config.output.directory)?;
    print_completeness_report(&report, limit);

    if !report.is_complete() {
        return Err(Error::IntegrityIssues(format!(
            "{} files missing",
            report.missing.len()
        )));
    }
    Ok(())
}
