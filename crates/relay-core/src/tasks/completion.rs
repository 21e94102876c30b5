use std::sync::Arc;

use crate::{
    admission::AdmissionPermit,
    completion::CompletionPort,
    domain::{MessageRef, UserId},
    messaging::{chunks::split_message, port::MessagingPort},
    replies, Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionRequest {
    pub user_id: UserId,
    pub username: String,
    pub prompt: String,
    pub reply_target: MessageRef,
}

/// One completion round-trip for one user.
///
/// The task owns the user's [`AdmissionPermit`] for its whole lifetime; the
/// slot frees when the task ends, on success, on failure and on panic alike.
pub struct CompletionTask {
    request: CompletionRequest,
    permit: AdmissionPermit,
    completion: Arc<dyn CompletionPort>,
    messenger: Arc<dyn MessagingPort>,
}

impl CompletionTask {
    pub fn new(
        request: CompletionRequest,
        permit: AdmissionPermit,
        completion: Arc<dyn CompletionPort>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            request,
            permit,
            completion,
            messenger,
        }
    }

    pub async fn run(self) {
        let Self {
            request,
            permit,
            completion,
            messenger,
        } = self;
        let chat_id = request.reply_target.chat_id;

        match completion.complete(&request.prompt).await {
            Ok(answer) => {
                if let Err(e) = relay_answer(messenger.as_ref(), &request, &answer).await {
                    tracing::warn!(
                        user_id = request.user_id.0,
                        chat_id = chat_id.0,
                        "failed to relay completion: {e}"
                    );
                }
            }
            Err(e) => {
                tracing::error!(
                    user_id = request.user_id.0,
                    chat_id = chat_id.0,
                    "chat with user {} caused an error: {e}",
                    request.username
                );
                if let Err(e) = messenger
                    .send_text(
                        chat_id,
                        replies::APOLOGY,
                        Some(request.reply_target.message_id),
                    )
                    .await
                {
                    tracing::warn!(chat_id = chat_id.0, "failed to send apology: {e}");
                }
            }
        }

        drop(permit);
        tracing::debug!(user_id = request.user_id.0, "admission slot released");
    }
}

async fn relay_answer(
    messenger: &dyn MessagingPort,
    request: &CompletionRequest,
    answer: &str,
) -> Result<()> {
    let limit = messenger.capabilities().max_message_len;
    for chunk in split_message(answer, limit) {
        messenger
            .send_text(request.reply_target.chat_id, &chunk, None)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::admission::AdmissionGuard;
    use crate::domain::{ChatId, MessageId};
    use crate::testing::{FakeCompletion, FakeMessenger};

    fn request(prompt: &str) -> CompletionRequest {
        CompletionRequest {
            user_id: UserId(1),
            username: "alice".to_string(),
            prompt: prompt.to_string(),
            reply_target: MessageRef {
                chat_id: ChatId(100),
                message_id: MessageId(5),
            },
        }
    }

    #[tokio::test]
    async fn relays_answer_and_releases_slot() {
        let guard = AdmissionGuard::new();
        let permit = guard.try_permit(UserId(1)).unwrap();
        let messenger = Arc::new(FakeMessenger::default());
        let completion = Arc::new(FakeCompletion::answering("forty-two"));

        CompletionTask::new(
            request("meaning of life?"),
            permit,
            completion.clone(),
            messenger.clone(),
        )
        .run()
        .await;

        assert_eq!(completion.prompts(), vec!["meaning of life?".to_string()]);
        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "forty-two");
        assert_eq!(sent[0].reply_to, None);
        assert!(!guard.is_held(UserId(1)));
        assert!(guard.try_acquire(UserId(1)));
    }

    #[tokio::test]
    async fn failure_apologises_and_releases_slot() {
        let guard = AdmissionGuard::new();
        let permit = guard.try_permit(UserId(1)).unwrap();
        let messenger = Arc::new(FakeMessenger::default());
        let completion = Arc::new(FakeCompletion::failing("upstream 500"));

        CompletionTask::new(request("hi"), permit, completion, messenger.clone())
            .run()
            .await;

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, replies::APOLOGY);
        assert_eq!(sent[0].reply_to, Some(MessageId(5)));
        assert!(!guard.is_held(UserId(1)));
    }

    #[tokio::test]
    async fn long_answers_are_split_by_transport_limit() {
        let guard = AdmissionGuard::new();
        let permit = guard.try_permit(UserId(1)).unwrap();
        let messenger = Arc::new(FakeMessenger::with_limit(4));
        let completion = Arc::new(FakeCompletion::answering("abcdefghij"));

        CompletionTask::new(request("x"), permit, completion, messenger.clone())
            .run()
            .await;

        let texts = messenger
            .sent()
            .into_iter()
            .map(|s| s.text)
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["abcd", "efgh", "ij"]);
    }

    #[tokio::test]
    async fn transport_failure_still_releases_slot() {
        let guard = AdmissionGuard::new();
        let permit = guard.try_permit(UserId(1)).unwrap();
        let messenger = Arc::new(FakeMessenger::failing());
        let completion = Arc::new(FakeCompletion::answering("ok"));

        CompletionTask::new(request("x"), permit, completion, messenger)
            .run()
            .await;

        assert!(!guard.is_held(UserId(1)));
    }
}
