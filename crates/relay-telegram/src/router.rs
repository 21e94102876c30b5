use std::{sync::Arc, time::Duration};

use teloxide::{
    dispatching::Dispatcher,
    dptree,
    error_handlers::LoggingErrorHandler,
    prelude::*,
    types::AllowedUpdate,
    update_listeners::Polling,
};

use relay_core::{
    admission::AdmissionGuard,
    completion::CompletionPort,
    config::Config,
    message_log::MessageLog,
    messaging::port::MessagingPort,
    router::MessageRouter,
    spawner::{TaskSpawner, TokioSpawner},
};

use crate::handlers;
use crate::TelegramMessenger;

const POLL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<MessageRouter>,
}

/// Run the intake loop until Ctrl-C.
///
/// Fails fast if Telegram cannot be reached at startup; afterwards polling
/// errors are logged and polling continues.
pub async fn run_polling(
    cfg: Arc<Config>,
    completion: Arc<dyn CompletionPort>,
    log: Arc<dyn MessageLog>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let me = bot.get_me().await.map_err(|e| {
        tracing::error!("telegram get_me failed: {e}");
        anyhow::anyhow!("Couldn't connect to telegram. Please restart the bot.")
    })?;
    tracing::info!("relay started: @{}", me.username());

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(
        bot.clone(),
        cfg.telegram_message_limit,
    ));
    let spawner = TokioSpawner::new();
    let task_spawner: Arc<dyn TaskSpawner> = Arc::new(spawner.clone());
    let router = Arc::new(MessageRouter::new(
        messenger,
        completion,
        log,
        Arc::new(AdmissionGuard::new()),
        task_spawner,
    ));

    let state = Arc::new(AppState { router });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    let listener = Polling::builder(bot.clone())
        .timeout(POLL_TIMEOUT)
        .allowed_updates(vec![AllowedUpdate::Message])
        .delete_webhook()
        .await
        .build();

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("telegram polling failed"),
        )
        .await;

    let abandoned = spawner.in_flight();
    if abandoned > 0 {
        tracing::warn!(abandoned, "shutting down with tasks still in flight");
    }
    tracing::info!("relay stopped");

    Ok(())
}
