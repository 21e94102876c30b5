use std::{
    collections::VecDeque,
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use rusqlite::{params, Connection};

use crate::{
    errors::Error,
    spawner::{TaskKind, TaskSpawner},
    Result,
};

/// One inbound message as recorded by the log store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggedMessage {
    pub username: String,
    pub text: String,
}

/// Append-only message log. There is no update or delete path.
#[async_trait]
pub trait MessageLog: Send + Sync {
    async fn append(&self, entry: LoggedMessage) -> Result<()>;
}

const CREATE_MESSAGES: &str = "CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT,
    text TEXT
)";

/// SQLite-backed log: rows land in the `messages` table in insertion order.
#[derive(Clone)]
pub struct SqliteMessageLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMessageLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(CREATE_MESSAGES, [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn insert(conn: &Mutex<Connection>, entry: &LoggedMessage) -> Result<()> {
        let conn = conn
            .lock()
            .map_err(|_| Error::External("message log connection poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO messages (username, text) VALUES (?1, ?2)",
            params![entry.username, entry.text],
        )?;
        Ok(())
    }

    /// All rows in insertion order.
    pub fn entries(&self) -> Result<Vec<LoggedMessage>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::External("message log connection poisoned".to_string()))?;
        let mut stmt = conn.prepare("SELECT username, text FROM messages ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(LoggedMessage {
                username: row.get(0)?,
                text: row.get(1)?,
            })
        })?;
        let out = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(out)
    }
}

#[async_trait]
impl MessageLog for SqliteMessageLog {
    async fn append(&self, entry: LoggedMessage) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || Self::insert(&conn, &entry))
            .await
            .map_err(|e| Error::External(format!("message log task failed: {e}")))?
    }
}

/// Non-blocking front for a [`MessageLog`] that keeps arrival order.
///
/// `submit` only queues. At most one drain task is alive at a time and it
/// appends the backlog front to back, exiting once the queue is empty; the
/// next `submit` starts a new one. Append failures are logged and dropped.
pub struct LogWriter {
    log: Arc<dyn MessageLog>,
    spawner: Arc<dyn TaskSpawner>,
    backlog: Arc<Mutex<Backlog>>,
}

#[derive(Default)]
struct Backlog {
    pending: VecDeque<LoggedMessage>,
    draining: bool,
}

impl LogWriter {
    pub fn new(log: Arc<dyn MessageLog>, spawner: Arc<dyn TaskSpawner>) -> Self {
        Self {
            log,
            spawner,
            backlog: Arc::new(Mutex::new(Backlog::default())),
        }
    }

    pub fn submit(&self, entry: LoggedMessage) {
        let start_drain = {
            let mut backlog = self.backlog.lock().unwrap_or_else(PoisonError::into_inner);
            backlog.pending.push_back(entry);
            !std::mem::replace(&mut backlog.draining, true)
        };
        if start_drain {
            let _detached = self.spawner.spawn(
                TaskKind::MessageLog,
                Box::pin(drain(self.log.clone(), self.backlog.clone())),
            );
        }
    }
}

async fn drain(log: Arc<dyn MessageLog>, backlog: Arc<Mutex<Backlog>>) {
    loop {
        let next = {
            let mut backlog = backlog.lock().unwrap_or_else(PoisonError::into_inner);
            match backlog.pending.pop_front() {
                Some(entry) => entry,
                None => {
                    // Cleared under the same lock `submit` pushes under, so no
                    // entry is left behind without a drainer.
                    backlog.draining = false;
                    return;
                }
            }
        };
        if let Err(e) = log.append(next).await {
            tracing::warn!("failed to log message: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::spawner::TokioSpawner;
    use crate::testing::FakeLog;

    fn msg(username: &str, text: &str) -> LoggedMessage {
        LoggedMessage {
            username: username.to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn appends_in_insertion_order() {
        let log = SqliteMessageLog::open_in_memory().unwrap();
        log.append(msg("alice", "hello")).await.unwrap();
        log.append(msg("bob", "12a")).await.unwrap();
        log.append(msg("alice", "again")).await.unwrap();

        assert_eq!(
            log.entries().unwrap(),
            vec![msg("alice", "hello"), msg("bob", "12a"), msg("alice", "again")]
        );
    }

    #[tokio::test]
    async fn reopening_a_file_keeps_rows() {
        let path = std::env::temp_dir().join(format!(
            "relay-messages-{}-{}.db",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));

        {
            let log = SqliteMessageLog::open(&path).unwrap();
            log.append(msg("carol", "persisted")).await.unwrap();
        }

        let log = SqliteMessageLog::open(&path).unwrap();
        assert_eq!(log.entries().unwrap(), vec![msg("carol", "persisted")]);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn writer_keeps_submission_order() {
        let log = Arc::new(SqliteMessageLog::open_in_memory().unwrap());
        let spawner = TokioSpawner::new();
        let writer = LogWriter::new(log.clone(), Arc::new(spawner.clone()));

        for i in 0..200 {
            writer.submit(msg("dana", &format!("m{i}")));
            if i % 7 == 0 {
                tokio::task::yield_now().await;
            }
        }
        spawner.wait_idle().await;

        let texts = log
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.text)
            .collect::<Vec<_>>();
        let expected = (0..200).map(|i| format!("m{i}")).collect::<Vec<_>>();
        assert_eq!(texts, expected);
    }

    #[tokio::test]
    async fn writer_restarts_after_draining() {
        let log = Arc::new(FakeLog::default());
        let spawner = TokioSpawner::new();
        let writer = LogWriter::new(log.clone(), Arc::new(spawner.clone()));

        writer.submit(msg("erin", "first"));
        spawner.wait_idle().await;
        assert_eq!(spawner.in_flight(), 0);

        writer.submit(msg("erin", "second"));
        spawner.wait_idle().await;
        assert_eq!(log.entries(), vec![msg("erin", "first"), msg("erin", "second")]);
    }

    #[tokio::test]
    async fn writer_skips_failed_appends() {
        let spawner = TokioSpawner::new();
        let writer = LogWriter::new(Arc::new(FakeLog::failing()), Arc::new(spawner.clone()));

        writer.submit(msg("frank", "lost"));
        writer.submit(msg("frank", "also lost"));
        spawner.wait_idle().await;
        assert_eq!(spawner.in_flight(), 0);
    }
}
