use anyhow::Context;
use trade_journal_lib::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env().context("Failed to load configuration")?;
    log::info!("Starting trading journal API (db: {})", config.db_path);

    trade_journal_lib::run(config).await.context("Server exited with an error")?;
    Ok(())
}
