//! Message router: classify every inbound update and dispatch it.
//!
//! Dispatch never waits for the work it starts. Timers and completions are
//! handed to the [`TaskSpawner`] and the router returns to the intake loop as
//! soon as the user has been acknowledged. The only user-visible errors that
//! come back from [`MessageRouter::dispatch`] are transport failures while
//! acknowledging; everything after the spawn is the task's business.

use std::sync::Arc;

use crate::{
    admission::AdmissionGuard,
    completion::CompletionPort,
    message_log::{LogWriter, LoggedMessage, MessageLog},
    messaging::{
        port::MessagingPort,
        types::{ChatAction, Command, CommandKind, IncomingUpdate, TextMessage},
    },
    replies,
    spawner::{TaskHandle, TaskKind, TaskSpawner},
    tasks::{CompletionRequest, CompletionTask, TimerRequest, TimerTask},
    Result,
};

/// How a text message is handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Countdown of this many seconds.
    Timer(u64),
    /// Forward to the completion service.
    Completion,
}

/// A non-empty body of ASCII decimal digits is a timer; anything else is a
/// completion prompt. Durations too large for `u64` saturate.
pub fn classify(text: &str) -> Route {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Route::Completion;
    }
    Route::Timer(text.parse::<u64>().unwrap_or(u64::MAX))
}

/// What `dispatch` did with an update.
#[derive(Debug)]
pub enum Dispatch {
    /// A command was answered inline.
    Replied,
    TimerStarted(TaskHandle),
    CompletionStarted(TaskHandle),
    /// The user already has a completion in flight; nothing was spawned.
    StillThinking,
}

pub struct MessageRouter {
    messenger: Arc<dyn MessagingPort>,
    completion: Arc<dyn CompletionPort>,
    log: LogWriter,
    guard: Arc<AdmissionGuard>,
    spawner: Arc<dyn TaskSpawner>,
}

impl MessageRouter {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        completion: Arc<dyn CompletionPort>,
        log: Arc<dyn MessageLog>,
        guard: Arc<AdmissionGuard>,
        spawner: Arc<dyn TaskSpawner>,
    ) -> Self {
        Self {
            messenger,
            completion,
            log: LogWriter::new(log, spawner.clone()),
            guard,
            spawner,
        }
    }

    pub fn guard(&self) -> &AdmissionGuard {
        &self.guard
    }

    pub async fn dispatch(&self, update: IncomingUpdate) -> Result<Dispatch> {
        match update {
            IncomingUpdate::Command(cmd) => self.handle_command(cmd).await,
            IncomingUpdate::Text(msg) => match classify(&msg.text) {
                Route::Timer(seconds) => self.start_timer(msg, seconds).await,
                Route::Completion => self.start_completion(msg).await,
            },
        }
    }

    async fn handle_command(&self, cmd: Command) -> Result<Dispatch> {
        let text = match cmd.kind {
            CommandKind::Start => replies::START_TEXT,
            CommandKind::Help => replies::HELP_TEXT,
        };
        self.messenger.send_text(cmd.chat_id, text, None).await?;
        Ok(Dispatch::Replied)
    }

    async fn start_timer(&self, msg: TextMessage, seconds: u64) -> Result<Dispatch> {
        self.messenger
            .send_text(msg.chat_id, &replies::timer_started(seconds), None)
            .await?;

        let task = TimerTask::new(
            TimerRequest {
                seconds,
                reply_target: msg.message_ref(),
            },
            self.messenger.clone(),
        );
        let handle = self.spawner.spawn(TaskKind::Timer, Box::pin(task.run()));
        tracing::info!(user_id = msg.user_id.0, seconds, "timer started");
        Ok(Dispatch::TimerStarted(handle))
    }

    async fn start_completion(&self, msg: TextMessage) -> Result<Dispatch> {
        let username = msg.username_or_unknown();
        self.log_message(&username, &msg.text);

        let Some(permit) = self.guard.try_permit(msg.user_id) else {
            tracing::info!(user_id = msg.user_id.0, "completion already in flight");
            self.messenger
                .send_text(msg.chat_id, replies::STILL_THINKING, Some(msg.message_id))
                .await?;
            return Ok(Dispatch::StillThinking);
        };

        // The permit is dropped, and the slot freed, if acknowledging fails.
        self.messenger
            .send_text(msg.chat_id, replies::THINKING, None)
            .await?;
        if self.messenger.capabilities().supports_chat_actions {
            if let Err(e) = self
                .messenger
                .send_chat_action(msg.chat_id, ChatAction::Typing)
                .await
            {
                tracing::debug!(chat_id = msg.chat_id.0, "typing indicator failed: {e}");
            }
        }

        let task = CompletionTask::new(
            CompletionRequest {
                user_id: msg.user_id,
                username,
                prompt: msg.text.clone(),
                reply_target: msg.message_ref(),
            },
            permit,
            self.completion.clone(),
            self.messenger.clone(),
        );
        let handle = self
            .spawner
            .spawn(TaskKind::Completion, Box::pin(task.run()));
        tracing::info!(user_id = msg.user_id.0, "completion started");
        Ok(Dispatch::CompletionStarted(handle))
    }

    /// Best-effort append in arrival order; the router does not wait for it.
    fn log_message(&self, username: &str, text: &str) {
        self.log.submit(LoggedMessage {
            username: username.to_string(),
            text: text.to_string(),
        });
    }
}
