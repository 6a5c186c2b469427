use anyhow::Result;
use browser_worker::Worker;
use browser_worker::config::Config;
use browser_worker::hands::BrowserSession;
use clap::Parser;
use dotenvy::dotenv;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = Config::parse();

    // stdout carries the protocol; everything else goes to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log)),
        )
        .with_writer(std::io::stderr)
        .init();

    let rules = config.scoring_rules()?;

    let launch_config = config.clone();
    let session = tokio::task::spawn_blocking(move || BrowserSession::launch(&launch_config))
        .await
        .map_err(|e| anyhow::anyhow!("Browser launch panicked: {}", e))??;

    let worker = Worker::new(session.page(), rules);
    let outcome = worker
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await;
    drop(worker);

    tokio::task::spawn_blocking(move || session.close()).await?;

    let shutdown = outcome?;
    info!(?shutdown, "worker stopped");
    Ok(())
}
