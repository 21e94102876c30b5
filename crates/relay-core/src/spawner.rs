//! Fire-and-forget task spawning.
//!
//! The router hands every accepted request to a [`TaskSpawner`] and moves on.
//! The returned [`TaskHandle`] may be awaited (tests do) or simply dropped, which
//! detaches the task; the intake loop never waits on one.

use std::{fmt, future::Future, pin::Pin};

use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

pub type BoxTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    Timer,
    Completion,
    MessageLog,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskKind::Timer => "timer",
            TaskKind::Completion => "completion",
            TaskKind::MessageLog => "message_log",
        };
        f.write_str(s)
    }
}

pub trait TaskSpawner: Send + Sync {
    fn spawn(&self, kind: TaskKind, task: BoxTask) -> TaskHandle;
}

/// Handle to a spawned task. Dropping it detaches the task.
#[derive(Debug)]
pub struct TaskHandle {
    kind: TaskKind,
    inner: JoinHandle<()>,
}

impl TaskHandle {
    pub fn new(kind: TaskKind, inner: JoinHandle<()>) -> Self {
        Self { kind, inner }
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Wait for the task to end. Returns `false` if it panicked.
    pub async fn join(self) -> bool {
        self.inner.await.is_ok()
    }
}

/// Spawns onto the ambient tokio runtime and keeps count of in-flight tasks.
#[derive(Clone, Debug, Default)]
pub struct TokioSpawner {
    tracker: TaskTracker,
}

impl TokioSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks spawned and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every task spawned so far has finished.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn(&self, kind: TaskKind, task: BoxTask) -> TaskHandle {
        tracing::debug!(%kind, "spawning task");
        TaskHandle::new(kind, self.tracker.spawn(task))
    }
}
