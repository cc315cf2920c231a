//! Morosidad - Main Entry Point
//!
//! Trains credit-default classifiers and serves the recommended one.

use clap::Parser;
use morosidad::cli::{cmd_info, cmd_predict, cmd_serve, cmd_train, Cli, Commands, TrainArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "morosidad=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            target,
            output_dir,
            seed,
            cv_folds,
            search_iterations,
            no_optimize,
            config,
        } => {
            let args = TrainArgs {
                target,
                output_dir,
                seed,
                cv_folds,
                search_iterations,
                no_optimize,
                config,
            };
            // training is CPU-bound; keep it off the async workers
            tokio::task::spawn_blocking(move || cmd_train(&data, &args)).await??;
        }
        Commands::Serve { host, port, models_dir } => {
            cmd_serve(&host, port, &models_dir).await?;
        }
        Commands::Predict { models_dir, input } => {
            cmd_predict(&models_dir, &input)?;
        }
        Commands::Info { data, target } => {
            cmd_info(&data, target.as_deref())?;
        }
    }

    Ok(())
}
