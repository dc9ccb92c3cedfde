pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIGS_DIR;
use crate::publisher::filesystem::DEFAULT_OUTPUT_DIR;
use crate::publisher::site::DEFAULT_LAYOUT;

/// Item limit applied by `--test`.
pub const TEST_LIMIT: usize = 5;

#[derive(Parser)]
#[command(name = "estuary")]
#[command(about = "Summarize RSS/Atom feeds into a digest and publish it", long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, summarize and save a digest
    Generate(GenerateArgs),
    /// Publish a previously saved digest
    Publish {
        #[command(subcommand)]
        target: PublishTarget,
    },
    /// List available digest configurations
    Configs {
        /// Directory holding the configuration files
        #[arg(long, default_value = DEFAULT_CONFIGS_DIR)]
        configs_dir: PathBuf,
    },
}

#[derive(clap::Args)]
pub struct GenerateArgs {
    /// Configuration name (file stem under the configs directory)
    #[arg(short, long)]
    pub config: String,

    /// Directory holding the configuration files
    #[arg(long, default_value = DEFAULT_CONFIGS_DIR)]
    pub configs_dir: PathBuf,

    /// Output directory for saved digests
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Days to look back (overrides the configuration)
    #[arg(short, long)]
    pub days: Option<u32>,

    /// Limit the number of articles summarized
    #[arg(short, long, conflicts_with = "test")]
    pub limit: Option<usize>,

    /// Quick run over at most 5 articles
    #[arg(long)]
    pub test: bool,

    /// Save the digest locally but skip email and site delivery
    #[arg(long)]
    pub dry_run: bool,

    /// Also send the digest by email
    #[arg(long)]
    pub email: bool,

    /// Also publish the digest to the static-site repository
    #[arg(long)]
    pub site: bool,

    /// HTML email template
    #[arg(long)]
    pub template: Option<PathBuf>,
}

impl GenerateArgs {
    pub fn effective_limit(&self) -> Option<usize> {
        if self.test {
            Some(TEST_LIMIT)
        } else {
            self.limit
        }
    }
}

#[derive(Subcommand)]
pub enum PublishTarget {
    /// Send a saved digest by email
    Email {
        /// Digest Markdown file
        file: PathBuf,

        /// HTML email template
        #[arg(long)]
        template: Option<PathBuf>,

        /// Subject line prefix
        #[arg(long)]
        subject: Option<String>,
    },
    /// Send a fixed test message to check the SMTP settings
    TestEmail {
        /// Recipient (defaults to EMAIL_RECIPIENT)
        #[arg(long)]
        to: Option<String>,
    },
    /// Push a saved digest to the static-site repository
    Site {
        /// Digest Markdown file
        file: PathBuf,

        /// Repository URL (defaults to BLOG_REPO_URL)
        #[arg(long)]
        repo: Option<String>,

        /// Front-matter layout
        #[arg(long, default_value = DEFAULT_LAYOUT)]
        layout: String,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },
}
