//! Fake ports shared by the unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::{
    completion::CompletionPort,
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    message_log::{LoggedMessage, MessageLog},
    messaging::{
        port::MessagingPort,
        types::{ChatAction, MessagingCapabilities},
    },
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentText {
    pub chat_id: ChatId,
    pub text: String,
    pub reply_to: Option<MessageId>,
}

pub struct FakeMessenger {
    fail: bool,
    limit: usize,
    next_id: Mutex<i32>,
    sends: Mutex<Vec<SentText>>,
    actions: Mutex<Vec<(ChatId, ChatAction)>>,
}

impl Default for FakeMessenger {
    fn default() -> Self {
        Self {
            fail: false,
            limit: 4096,
            next_id: Mutex::new(1000),
            sends: Mutex::new(Vec::new()),
            actions: Mutex::new(Vec::new()),
        }
    }
}

impl FakeMessenger {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentText> {
        self.sends.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|s| s.text).collect()
    }

    pub fn actions(&self) -> Vec<(ChatId, ChatAction)> {
        self.actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_chat_actions: true,
            max_message_len: self.limit,
        }
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageRef> {
        if self.fail {
            return Err(Error::Transport("fake transport down".to_string()));
        }
        self.sends.lock().unwrap().push(SentText {
            chat_id,
            text: text.to_string(),
            reply_to,
        });
        let mut id = self.next_id.lock().unwrap();
        *id += 1;
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(*id),
        })
    }

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()> {
        if self.fail {
            return Err(Error::Transport("fake transport down".to_string()));
        }
        self.actions.lock().unwrap().push((chat_id, action));
        Ok(())
    }
}

pub struct FakeCompletion {
    answer: std::result::Result<String, String>,
    gate: Option<Semaphore>,
    prompts: Mutex<Vec<String>>,
}

impl FakeCompletion {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Ok(answer.to_string()),
            gate: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            answer: Err(reason.to_string()),
            gate: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Calls block until [`FakeCompletion::open`] lets them through.
    pub fn gated(answer: &str) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::answering(answer)
        }
    }

    pub fn open(&self, calls: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(calls);
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionPort for FakeCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| Error::Completion(e.to_string()))?
                .forget();
        }
        self.answer.clone().map_err(Error::Completion)
    }
}

#[derive(Default)]
pub struct FakeLog {
    fail: bool,
    entries: Mutex<Vec<LoggedMessage>>,
}

impl FakeLog {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<LoggedMessage> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageLog for FakeLog {
    async fn append(&self, entry: LoggedMessage) -> Result<()> {
        if self.fail {
            return Err(Error::External("fake log unavailable".to_string()));
        }
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}
