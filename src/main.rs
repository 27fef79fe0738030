mod batch;
mod cancel;
mod cli;
mod commands;
mod config;
mod counter;
mod delivery;
mod mcp;
mod page_range;
mod partition;
mod pdf;
mod selection;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use commands::Context;
use config::Config;
use counter::{JsonFileStore, MemoryStore, OperationCounter};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn open_counter(config: &Config) -> OperationCounter {
    let path = config
        .counter
        .path
        .clone()
        .or_else(JsonFileStore::default_path);
    match path {
        Some(path) => {
            let store = JsonFileStore::new(path);
            tracing::debug!("operation counter at {}", store.path().display());
            OperationCounter::load(Box::new(store))
        }
        None => {
            tracing::warn!("No data directory found; the operation counter will not persist");
            OperationCounter::load(Box::new(MemoryStore::default()))
        }
    }
}

/// Commands that stop pending work and report it when cancelled.
fn cancellable(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Extract { .. }
            | Commands::Split { .. }
            | Commands::Merge { .. }
            | Commands::Rotate { .. }
            | Commands::Compress { .. }
            | Commands::Unlock { .. }
            | Commands::Images { .. }
            | Commands::Create { .. }
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let counter = open_counter(&config);
    let ctx = Arc::new(Context::new(config, counter));

    // Everything else keeps the default Ctrl-C behaviour
    if cancellable(&cli.command) {
        let session = ctx.session().clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            tracing::debug!("interrupted, cancelling");
            eprintln!("Cancelling; press Ctrl-C again to exit now");
            session.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        });
    }

    match cli.command {
        Commands::Mcp => {
            mcp::run_server(ctx).await?;
        }
        Commands::Info { path, password } => {
            commands::info::run(&path, password.as_deref())?;
        }
        Commands::Extract {
            path,
            pages,
            pick,
            per_range,
            password,
            output_dir,
        } => {
            let options = commands::extract::ExtractOptions {
                pages: pages.as_deref(),
                pick: pick.as_deref(),
                per_range,
                password: password.as_deref(),
                output_dir: output_dir.as_deref(),
            };
            commands::extract::run(&ctx, &path, &options).await?;
        }
        Commands::Split {
            path,
            ranges,
            every,
            password,
            output_dir,
        } => {
            let by = match &ranges {
                Some(ranges) => commands::split::SplitBy::Ranges(ranges),
                None => commands::split::SplitBy::Every(every.unwrap_or(1)),
            };
            commands::split::run(&ctx, &path, by, password.as_deref(), output_dir.as_deref())
                .await?;
        }
        Commands::Merge { inputs, output } => {
            commands::merge::run(&ctx, &inputs, &output).await?;
        }
        Commands::Rotate {
            path,
            degrees,
            pages,
            pick,
            password,
            output_dir,
        } => {
            let options = commands::rotate::RotateOptions {
                degrees,
                pages: pages.as_deref(),
                pick: pick.as_deref(),
                password: password.as_deref(),
                output_dir: output_dir.as_deref(),
            };
            commands::rotate::run(&ctx, &path, &options).await?;
        }
        Commands::Compress {
            path,
            level,
            password,
            output_dir,
        } => {
            commands::compress::run(
                &ctx,
                &path,
                level,
                password.as_deref(),
                output_dir.as_deref(),
            )
            .await?;
        }
        Commands::Protect {
            path,
            password,
            confirm,
        } => {
            commands::protect::run(&path, &password, &confirm)?;
        }
        Commands::Unlock {
            path,
            password,
            output_dir,
        } => {
            commands::unlock::run(&ctx, &path, &password, output_dir.as_deref()).await?;
        }
        Commands::Text {
            path,
            pages,
            pick,
            password,
            output,
        } => {
            let options = commands::text::TextOptions {
                pages: pages.as_deref(),
                pick: pick.as_deref(),
                password: password.as_deref(),
                output: output.as_deref(),
            };
            commands::text::run(&ctx, &path, &options).await?;
        }
        Commands::Images {
            path,
            pages,
            pick,
            format,
            dpi,
            password,
            output_dir,
        } => {
            let options = commands::images::ImagesOptions {
                pages: pages.as_deref(),
                pick: pick.as_deref(),
                format,
                dpi,
                password: password.as_deref(),
                output_dir: output_dir.as_deref(),
            };
            commands::images::run(&ctx, &path, &options).await?;
        }
        Commands::Create { inputs, output } => {
            commands::create::run(&ctx, &inputs, &output).await?;
        }
        Commands::Stats { reset } => {
            commands::stats::run(&ctx, reset)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellable_commands() {
        let parse = |args: &[&str]| Cli::parse_from(args).command;
        assert!(cancellable(&parse(&["pdfsuite", "split", "a.pdf"])));
        assert!(!cancellable(&parse(&["pdfsuite", "mcp"])));
        assert!(!cancellable(&parse(&["pdfsuite", "info", "a.pdf"])));
    }
}
