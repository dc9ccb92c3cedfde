use std::path::{Path, PathBuf};

use crate::app::{AppContext, Result};
use crate::cli::GenerateArgs;
use crate::config::{config_info, list_available_configs, DigestConfig};
use crate::domain::DigestResult;
use crate::pipeline::{Outcome, Pipeline, RunOptions, Stage};
use crate::publisher::frontmatter::parse_document;
use crate::publisher::{
    Bound, EmailOptions, FileSystemPublisher, Publisher, SiteOptions, SitePublisher,
};

/// Run the full pipeline for one configuration. Returns whether the run
/// should count as a success for the exit code.
pub async fn generate(ctx: &AppContext, args: &GenerateArgs) -> Result<bool> {
    let config = DigestConfig::load(&args.config, &args.configs_dir)?;
    println!("Generating digest for {}...", config.name);

    let mut pipeline = Pipeline::new(ctx.fetcher.clone(), ctx.summarizer()?)
        .with_archive(FileSystemPublisher::new(args.output.clone()));

    if args.email {
        let options = EmailOptions {
            template_path: args.template.clone(),
            subject_override: Some(config.email_subject.clone()),
        };
        let publisher = ctx.email_publisher(&config.sender_name)?;
        pipeline = pipeline.with_delivery(Bound::new("email", publisher, options).boxed());
    }
    if args.site {
        let publisher = ctx.site_publisher(None)?;
        pipeline = pipeline.with_delivery(Bound::new("site", publisher, SiteOptions::default()).boxed());
    }

    let options = RunOptions {
        lookback_days: args.days,
        limit: args.effective_limit(),
        dry_run: args.dry_run,
    };
    let report = pipeline.run(&config, options).await;

    if let Some(path) = &report.artifact {
        println!("Digest saved to {}", path.display());
    }
    if report.total_tokens > 0 {
        println!("Token usage: {} tokens", report.total_tokens);
    }

    match &report.outcome {
        Outcome::Completed => {
            println!(
                "Done: {} articles, {}",
                report.article_count, report.date_range
            );
            Ok(true)
        }
        Outcome::Aborted {
            stage: Stage::Fetch,
            ..
        } => {
            println!("No articles found.");
            Ok(true)
        }
        Outcome::Aborted { stage, reason } => {
            eprintln!("Error during {}: {}", stage, reason);
            Ok(false)
        }
    }
}

async fn load_digest(file: &Path) -> Result<DigestResult> {
    let text = tokio::fs::read_to_string(file).await?;
    let digest = parse_document(&text)?;
    println!(
        "Loaded digest: {} ({} articles)",
        digest.title, digest.sources_analyzed
    );
    Ok(digest)
}

pub async fn publish_email(
    ctx: &AppContext,
    file: &Path,
    template: Option<PathBuf>,
    subject: Option<String>,
) -> Result<bool> {
    let digest = load_digest(file).await?;

    let subject_override = subject
        .or_else(|| digest.metadata_str("subject").map(String::from))
        .unwrap_or_else(|| format!("{} Digest", digest.config_name));
    let publisher = ctx.email_publisher(&digest.config_name)?;
    let options = EmailOptions {
        template_path: template,
        subject_override: Some(subject_override),
    };

    let sent = publisher.publish(&digest, &options).await;
    if sent {
        println!("Email sent");
    } else {
        eprintln!("Failed to send email");
    }
    Ok(sent)
}

pub async fn send_test_email(ctx: &AppContext, to: Option<String>) -> Result<bool> {
    let publisher = ctx.email_publisher("Estuary")?;

    let sent = publisher.send_test(to.as_deref()).await;
    if sent {
        println!("Test email sent. Check your inbox to confirm receipt.");
    } else {
        eprintln!("Failed to send test email. Check the logs for details.");
    }
    Ok(sent)
}

pub async fn publish_site(
    ctx: &AppContext,
    file: &Path,
    repo: Option<String>,
    layout: String,
    message: Option<String>,
) -> Result<bool> {
    let digest = load_digest(file).await?;

    let publisher = ctx.site_publisher(repo)?;
    let options = SiteOptions {
        layout,
        commit_message: message,
    };

    let published = publisher.publish(&digest, &options).await;
    if published {
        println!(
            "Published to {}",
            publisher
                .checkout_dir()
                .join(SitePublisher::post_path(&digest))
                .display()
        );
    } else {
        eprintln!("Failed to publish to site");
    }
    Ok(published)
}

pub fn list_configs(configs_dir: &Path) -> Result<()> {
    let names = list_available_configs(configs_dir);

    if names.is_empty() {
        println!("No configurations found in {}", configs_dir.display());
        return Ok(());
    }

    for name in names {
        match config_info(&name, configs_dir) {
            Ok(info) => {
                println!("{} ({})", name, info.name);
                if !info.description.is_empty() {
                    println!("  {}", info.description);
                }
                println!("  schedule: {}, feeds: {}", info.schedule, info.feed_count);
            }
            Err(e) => println!("{} (invalid: {})", name, e),
        }
    }

    Ok(())
}
