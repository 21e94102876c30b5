use std::sync::Arc;

use relay_core::{
    completion::CompletionPort,
    config::Config,
    message_log::{MessageLog, SqliteMessageLog},
};
use relay_openai::OpenAiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    relay_core::logging::init("relay")?;

    let cfg = Arc::new(Config::load()?);

    let log: Arc<dyn MessageLog> = Arc::new(SqliteMessageLog::open(&cfg.message_db_path)?);
    tracing::info!("message log: {}", cfg.message_db_path.display());

    let completion: Arc<dyn CompletionPort> = Arc::new(OpenAiClient::from_config(&cfg)?);
    tracing::info!("completion model: {}", cfg.openai_model);

    if let Err(e) = relay_telegram::router::run_polling(cfg, completion, log).await {
        tracing::error!("{e}");
        return Err(e);
    }

    Ok(())
}
