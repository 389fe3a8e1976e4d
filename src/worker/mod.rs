//! Worker implementation
//!
//! A [`Worker`] serves one coordinator session over any byte stream. It owns
//! its local histogram exclusively: every assigned file is tokenized and
//! merged into it, and the whole histogram is sent back exactly once when the
//! coordinator terminates the session.
//!
//! # Session
//!
//! ```text
//! coordinator                      worker
//!     Hello(version, id)  ──▶
//!                         ◀──  Hello(version, id, node)
//!     Task(index, path)   ──▶      count file, merge
//!                         ◀──  Ready(id)
//!     ...
//!     Terminate           ──▶
//!                         ◀──  HistCount(n), n × (HistWord, HistFreq)
//! ```
//!
//! A fatal error inside the session is reported with `Abort` before the
//! worker exits.
//!
//! # Example
//!
//! ```no_run
//! use wordpulse::worker::Worker;
//! use tokio::net::TcpStream;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let stream = TcpStream::connect("127.0.0.1:9100").await?;
//! let summary = Worker::new("node-a").serve(stream).await?;
//! println!("{} tasks completed", summary.tasks_completed);
//! # Ok(())
//! # }
//! ```

use crate::distributed::protocol::*;
use crate::error::{CountResult, WordCountError};
use crate::stats::histogram::Histogram;
use crate::stats::tokenizer::count_task_file;
use tokio::io::{AsyncRead, AsyncWrite};

/// What a worker did during one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSummary {
    pub worker_id: WorkerId,
    pub tasks_completed: usize,
    /// Tasks whose file could not be read
    pub files_unavailable: usize,
    /// Distinct words sent to the coordinator
    pub unique_words: usize,
    pub total_words: u64,
}

/// One worker session
pub struct Worker {
    node_id: String,
    id: Option<WorkerId>,
    local: Histogram,
    tasks_completed: usize,
    files_unavailable: usize,
}

impl Worker {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            id: None,
            local: Histogram::new(),
            tasks_completed: 0,
            files_unavailable: 0,
        }
    }

    /// Serve one coordinator session to completion
    pub async fn serve<S>(mut self, mut stream: S) -> CountResult<WorkerSummary>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self.run_session(&mut stream).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                // A broken connection cannot carry the abort.
                if !matches!(e, WordCountError::Transport { .. }) {
                    let abort = Message::Abort(AbortMessage {
                        worker_id: self.id,
                        reason: e.to_string(),
                    });
                    if let Err(send_err) = write_message(&mut stream, &abort).await {
                        log::debug!("Could not deliver abort: {}", send_err);
                    }
                }
                log::error!("Worker {} failed: {}", self.describe(), e);
                Err(e)
            }
        }
    }

    async fn run_session<S>(&mut self, stream: &mut S) -> CountResult<WorkerSummary>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let id = self.handshake(stream).await?;
        log::info!("Worker {} on {} ready", id, self.node_id);

        loop {
            match read_message(stream).await? {
                Message::Task(task) => {
                    log::debug!("{} counting task {} ({})", id, task.task_index, task.path.display());
                    self.count_task(task).await?;
                    write_message(stream, &Message::Ready(ReadyMessage { worker_id: id })).await?;
                }
                Message::Terminate => {
                    return self.send_histogram(id, stream).await;
                }
                other => {
                    return Err(WordCountError::protocol(
                        "coordinator",
                        format!("unexpected {:?} sent to {}", other.label(), id),
                    ));
                }
            }
        }
    }

    async fn handshake<S>(&mut self, stream: &mut S) -> CountResult<WorkerId>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let hello = match read_message(stream).await? {
            Message::Hello(hello) => hello,
            other => {
                return Err(WordCountError::protocol(
                    "coordinator",
                    format!("expected Hello, got {:?}", other.label()),
                ))
            }
        };

        self.id = Some(hello.worker_id);
        if hello.protocol_version != PROTOCOL_VERSION {
            return Err(WordCountError::protocol(
                "coordinator",
                format!(
                    "protocol version mismatch: coordinator={}, worker={}",
                    hello.protocol_version, PROTOCOL_VERSION
                ),
            ));
        }

        let reply = Message::Hello(HelloMessage {
            protocol_version: PROTOCOL_VERSION,
            worker_id: hello.worker_id,
            node_id: self.node_id.clone(),
        });
        write_message(stream, &reply).await?;
        Ok(hello.worker_id)
    }

    async fn count_task(&mut self, task: TaskMessage) -> CountResult<()> {
        let path = task.path;
        let counted = tokio::task::spawn_blocking(move || count_task_file(&path))
            .await
            .map_err(|e| {
                if e.is_panic() {
                    std::panic::resume_unwind(e.into_panic());
                }
                WordCountError::transport(
                    "counting task was cancelled",
                    std::io::Error::new(std::io::ErrorKind::Interrupted, e),
                )
            })??;

        match counted {
            Some(file_histogram) => self.local.merge(&file_histogram)?,
            None => self.files_unavailable += 1,
        }
        self.tasks_completed += 1;
        Ok(())
    }

    async fn send_histogram<S>(&mut self, id: WorkerId, stream: &mut S) -> CountResult<WorkerSummary>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let local = std::mem::take(&mut self.local);
        let summary = WorkerSummary {
            worker_id: id,
            tasks_completed: self.tasks_completed,
            files_unavailable: self.files_unavailable,
            unique_words: local.len(),
            total_words: local.total_words(),
        };

        let count = Message::HistCount(local.len() as u64);
        let entries = local.into_sorted().into_iter().flat_map(|entry| {
            [Message::HistWord(entry.word), Message::HistFreq(entry.frequency)]
        });
        write_messages(stream, std::iter::once(count).chain(entries)).await?;

        log::info!(
            "{} sent {} unique words after {} tasks",
            id,
            summary.unique_words,
            summary.tasks_completed
        );
        Ok(summary)
    }

    fn describe(&self) -> String {
        match self.id {
            Some(id) => id.to_string(),
            None => format!("on {}", self.node_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tokio::io::DuplexStream;

    async fn hello(coord: &mut DuplexStream, id: usize, version: u32) {
        let msg = Message::Hello(HelloMessage {
            protocol_version: version,
            worker_id: WorkerId::new(id),
            node_id: "coordinator".to_string(),
        });
        write_message(coord, &msg).await.unwrap();
    }

    #[tokio::test]
    async fn test_session_counts_tasks_and_sends_histogram_once() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt");
        std::fs::write(&a, "The quick brown fox. The Fox runs.").unwrap();

        let (mut coord, worker_end) = tokio::io::duplex(4096);
        let worker = tokio::spawn(Worker::new("node-test").serve(worker_end));

        hello(&mut coord, 3, PROTOCOL_VERSION).await;
        match read_message(&mut coord).await.unwrap() {
            Message::Hello(reply) => {
                assert_eq!(reply.worker_id, WorkerId::new(3));
                assert_eq!(reply.node_id, "node-test");
            }
            other => panic!("expected Hello, got {:?}", other),
        }

        for (index, path) in [a.clone(), dir.path().join("missing.txt")].into_iter().enumerate() {
            let task = Message::Task(TaskMessage { task_index: index, path });
            write_message(&mut coord, &task).await.unwrap();
            assert_eq!(
                read_message(&mut coord).await.unwrap(),
                Message::Ready(ReadyMessage { worker_id: WorkerId::new(3) })
            );
        }

        write_message(&mut coord, &Message::Terminate).await.unwrap();
        assert_eq!(read_message(&mut coord).await.unwrap(), Message::HistCount(5));

        let mut received = Histogram::new();
        for _ in 0..5 {
            let word = match read_message(&mut coord).await.unwrap() {
                Message::HistWord(word) => word,
                other => panic!("expected HistWord, got {:?}", other),
            };
            let freq = match read_message(&mut coord).await.unwrap() {
                Message::HistFreq(freq) => freq,
                other => panic!("expected HistFreq, got {:?}", other),
            };
            received.add_count(word, freq).unwrap();
        }
        assert_eq!(received.get("the"), Some(2));
        assert_eq!(received.get("fox"), Some(2));

        let summary = worker.await.unwrap().unwrap();
        assert_eq!(summary.tasks_completed, 2);
        assert_eq!(summary.files_unavailable, 1);
        assert_eq!(summary.unique_words, 5);
        assert_eq!(summary.total_words, 7);

        // Nothing follows the histogram.
        assert_eq!(try_read_message(&mut coord).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_terminate_without_tasks_sends_empty_histogram() {
        let (mut coord, worker_end) = tokio::io::duplex(4096);
        let worker = tokio::spawn(Worker::new("node-test").serve(worker_end));

        hello(&mut coord, 0, PROTOCOL_VERSION).await;
        read_message(&mut coord).await.unwrap();
        write_message(&mut coord, &Message::Terminate).await.unwrap();

        assert_eq!(read_message(&mut coord).await.unwrap(), Message::HistCount(0));
        let summary = worker.await.unwrap().unwrap();
        assert_eq!(summary.tasks_completed, 0);
    }

    #[tokio::test]
    async fn test_version_mismatch_aborts() {
        let (mut coord, worker_end) = tokio::io::duplex(4096);
        let worker = tokio::spawn(Worker::new("node-test").serve(worker_end));

        hello(&mut coord, 1, PROTOCOL_VERSION + 1).await;
        match read_message(&mut coord).await.unwrap() {
            Message::Abort(abort) => {
                assert_eq!(abort.worker_id, Some(WorkerId::new(1)));
                assert!(abort.reason.contains("version"));
            }
            other => panic!("expected Abort, got {:?}", other),
        }

        let err = worker.await.unwrap().unwrap_err();
        assert!(matches!(err, WordCountError::ProtocolViolation { .. }));
    }

    #[tokio::test]
    async fn test_unexpected_label_aborts() {
        let (mut coord, worker_end) = tokio::io::duplex(4096);
        let worker = tokio::spawn(Worker::new("node-test").serve(worker_end));

        hello(&mut coord, 0, PROTOCOL_VERSION).await;
        read_message(&mut coord).await.unwrap();
        write_message(&mut coord, &Message::HistCount(1)).await.unwrap();

        assert!(matches!(read_message(&mut coord).await.unwrap(), Message::Abort(_)));
        assert!(worker.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_coordinator_disconnect_is_transport_error() {
        let (mut coord, worker_end) = tokio::io::duplex(4096);
        let worker = tokio::spawn(Worker::new("node-test").serve(worker_end));

        hello(&mut coord, 0, PROTOCOL_VERSION).await;
        read_message(&mut coord).await.unwrap();
        let task = Message::Task(TaskMessage {
            task_index: 0,
            path: PathBuf::from("/definitely/not/here.txt"),
        });
        write_message(&mut coord, &task).await.unwrap();
        read_message(&mut coord).await.unwrap();
        drop(coord);

        let err = worker.await.unwrap().unwrap_err();
        assert!(matches!(err, WordCountError::Transport { .. }));
    }
}
