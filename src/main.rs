use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use estuary::app::AppContext;
use estuary::cli::{commands, Cli, Commands, PublishTarget};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_filter = if cli.verbose {
        "estuary=debug"
    } else {
        "estuary=info"
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let ok = match cli.command {
        Commands::Configs { configs_dir } => {
            commands::list_configs(&configs_dir)?;
            true
        }
        Commands::Generate(args) => {
            let ctx = AppContext::from_env()?;
            commands::generate(&ctx, &args).await?
        }
        Commands::Publish { target } => {
            let ctx = AppContext::from_env()?;
            match target {
                PublishTarget::Email {
                    file,
                    template,
                    subject,
                } => commands::publish_email(&ctx, &file, template, subject).await?,
                PublishTarget::TestEmail { to } => commands::send_test_email(&ctx, to).await?,
                PublishTarget::Site {
                    file,
                    repo,
                    layout,
                    message,
                } => commands::publish_site(&ctx, &file, repo, layout, message).await?,
            }
        }
    };

    if !ok {
        std::process::exit(1);
    }

    Ok(())
}
