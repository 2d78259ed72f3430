//! jobbench command-line entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobbench::{Args, ConfiguredConnector, JobGenerator, Runner, StdoutReporter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout carries only timing output.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobbench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Args::parse().into_config();

    let generator = JobGenerator::from_paths(
        &config.template_path,
        &config.first_names_path,
        &config.last_names_path,
    )?;

    if config.strict_template {
        generator.template().to_typed()?;
        tracing::debug!("template matches the job model");
    }

    tracing::info!(
        backends = %config.backends,
        records = config.record_count,
        lookups = config.lookups_per_round,
        rounds = config.read_rounds,
        "starting benchmark"
    );

    let connector = ConfiguredConnector::new(config.connections.clone());
    let mut runner = Runner::new(config, connector);
    let summary = runner.run(&generator, &mut StdoutReporter).await?;

    if !summary.unavailable.is_empty() {
        tracing::warn!(
            count = summary.unavailable.len(),
            "some backends were unavailable"
        );
    }

    Ok(())
}
