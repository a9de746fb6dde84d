//! Command-line argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// HearMyShip dataset mirror CLI.
#[derive(Parser, Debug)]
#[command(
    name = "hms-mirror",
    version,
    about = "Mirror the HearMyShip audio/image dataset over HTTP",
    long_about = "A CLI tool to download the HearMyShip dataset from a file of links.\n\n\
                  Rebuilds the remote folder layout locally, backs off when rate limited, \
                  resumes where it left off, and audits the result for empty or corrupt files."
)]
pub struct Args {
    /// Path to configuration file.
    #[arg(short, long, global = true, default_value = "hms-mirror.toml")]
    pub config: PathBuf,

    /// Enable debug logging.
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download every file named in the links file.
    Download {
        /// Newline-delimited file of dataset URLs.
        #[arg(short, long)]
        links: Option<PathBuf>,

        /// Root directory for the mirror.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Browser user agent string.
        #[arg(short = 'a', long = "user-agent", env = "HMS_USER_AGENT")]
        user_agent: Option<String>,

        /// Per-request timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,

        /// Number of concurrent downloads.
        #[arg(short, long)]
        workers: Option<usize>,

        /// Write the run report as JSON to this file.
        #[arg(long)]
        report: Option<PathBuf>,

        /// Hide download progress information.
        #[arg(long, short)]
        quiet: bool,

        /// Show information about skipped downloads.
        #[arg(long)]
        show_skipped: bool,
    },

    /// Delete empty or corrupt files from the mirror.
    Audit {
        /// Root directory of the mirror.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report what would be deleted without deleting.
        #[arg(long)]
        dry_run: bool,
    },

    /// Report files whose label does not match their folder.
    Check {
        /// Root directory of the mirror.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write every mismatched path to this file.
        #[arg(long)]
        mismatches: Option<PathBuf>,

        /// Maximum unique conflicts to print.
        #[arg(long, default_value_t = 150)]
        limit: usize,
    },

    /// Compare the links file against the files on disk.
    Completeness {
        /// Newline-delimited file of dataset URLs.
        #[arg(short, long)]
        links: Option<PathBuf>,

        /// Root directory of the mirror.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum missing names to print.
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(&self, config: &mut Config) {
        match &self.command {
            Command::Download {
                links,
                output,
                user_agent,
                timeout,
                workers,
                quiet,
                show_skipped,
                ..
            } => {
                if let Some(links) = links {
                    config.manifest.links_file = links.clone();
                }
                if let Some(output) = output {
                    config.output.directory = output.clone();
                }
                if let Some(user_agent) = user_agent {
                    config.http.user_agent = user_agent.clone();
                }
                if let Some(timeout) = timeout {
                    config.http.timeout_seconds = *timeout;
                }
                if let Some(workers) = workers {
                    config.options.workers = *workers;
                }

                // Boolean flags (only override if set to non-default)
                if *quiet {
                    config.options.show_downloads = false;
                    config.options.show_skipped_downloads = false;
                }
                if *show_skipped {
                    config.options.show_skipped_downloads = true;
                }
            }
            Command::Audit { output, .. } | Command::Check { output, .. } => {
                if let Some(output) = output {
                    config.output.directory = output.clone();
                }
            }
            Command::Completeness { links, output, .. } => {
                if let Some(links) = links {
                    config.manifest.links_file = links.clone();
                }
                if let Some(output) = output {
                    config.output.directory = output.clone();
                }
            }
            Command::Init { .. } => {}
        }
    }
}
