use std::{sync::Arc, time::Duration};

use tokio::time::sleep;

use crate::{domain::MessageRef, messaging::port::MessagingPort, replies};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerRequest {
    pub seconds: u64,
    pub reply_target: MessageRef,
}

/// Sleep for the requested duration, then notify in the original thread.
///
/// Timers are not cancellable and hold no admission slot; any number of them
/// may run for the same user.
pub struct TimerTask {
    request: TimerRequest,
    messenger: Arc<dyn MessagingPort>,
}

impl TimerTask {
    pub fn new(request: TimerRequest, messenger: Arc<dyn MessagingPort>) -> Self {
        Self { request, messenger }
    }

    pub async fn run(self) {
        let TimerRequest {
            seconds,
            reply_target,
        } = self.request;

        tracing::debug!(seconds, chat_id = reply_target.chat_id.0, "timer sleeping");
        if seconds > 0 {
            sleep(Duration::from_secs(seconds)).await;
        }

        if let Err(e) = self
            .messenger
            .send_text(
                reply_target.chat_id,
                replies::TIMER_FINISHED,
                Some(reply_target.message_id),
            )
            .await
        {
            tracing::warn!(
                seconds,
                chat_id = reply_target.chat_id.0,
                "timer notification failed: {e}"
            );
            return;
        }
        tracing::debug!(seconds, chat_id = reply_target.chat_id.0, "timer done");
    }
}
