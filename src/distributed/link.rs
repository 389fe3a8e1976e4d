//! Coordinator-side view of one worker
//!
//! A [`WorkerLink`] owns the write half of a worker connection, the receiving
//! end of that worker's data channel, and the worker's protocol state:
//!
//! ```text
//! Idle ──assign──▶ Assigned ──ready──▶ Idle ──terminate──▶ Terminating ──drain──▶ Collected
//! ```
//!
//! Every transition checks the current state, so a message that arrives out
//! of order fails the run with a protocol violation instead of being
//! misread. Data frames are only legal while `Terminating`; one queued
//! before termination is reported as soon as the coordinator next acts on
//! the link. The read half is owned by [`route_inbound`], which splits the
//! worker's frames into the shared control channel and the per-worker data
//! channel.

use crate::distributed::protocol::*;
use crate::error::{CountResult, WordCountError};
use crate::stats::histogram::Histogram;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

/// Protocol state of one worker, as seen by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Waiting for an instruction
    Idle,
    /// One task outstanding
    Assigned { task_index: usize },
    /// Termination sent, histogram not yet drained
    Terminating,
    /// Histogram drained and merged
    Collected,
}

/// Event on the shared control channel
#[derive(Debug)]
pub enum ControlEvent {
    Message(Message),
    /// The worker closed its connection
    Closed,
    /// Reading from the worker failed
    Failed(String),
}

/// Control event tagged with its sender
#[derive(Debug)]
pub struct Inbound {
    pub worker: WorkerId,
    pub event: ControlEvent,
}

pub type ControlSender = mpsc::UnboundedSender<Inbound>;
pub type DataSender = mpsc::UnboundedSender<CountResult<Message>>;
pub type DataReceiver = mpsc::UnboundedReceiver<CountResult<Message>>;

/// Read frames from one worker and route them by channel
///
/// Runs until the worker closes the connection, a read fails, or both
/// channels are gone.
pub async fn route_inbound<R>(
    worker: WorkerId,
    mut reader: R,
    control_tx: ControlSender,
    data_tx: DataSender,
) where
    R: AsyncRead + Unpin,
{
    loop {
        match try_read_message(&mut reader).await {
            Ok(Some(msg)) => {
                log::trace!("{} -> coordinator: {:?}", worker, msg.label());
                let delivered = match msg.channel() {
                    Channel::Control => control_tx
                        .send(Inbound {
                            worker,
                            event: ControlEvent::Message(msg),
                        })
                        .is_ok(),
                    Channel::Data => data_tx.send(Ok(msg)).is_ok(),
                };
                if !delivered {
                    break;
                }
            }
            Ok(None) => {
                let _ = control_tx.send(Inbound {
                    worker,
                    event: ControlEvent::Closed,
                });
                break;
            }
            Err(e) => {
                // Whichever channel the coordinator is blocked on reports it.
                let _ = control_tx.send(Inbound {
                    worker,
                    event: ControlEvent::Failed(e.to_string()),
                });
                let _ = data_tx.send(Err(e));
                break;
            }
        }
    }
}

/// Coordinator-side handle to one worker
pub struct WorkerLink<W> {
    id: WorkerId,
    node_id: String,
    writer: W,
    data_rx: DataReceiver,
    state: WorkerState,
    tasks_completed: usize,
    unique_words: usize,
}

impl<W> WorkerLink<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(id: WorkerId, node_id: String, writer: W, data_rx: DataReceiver) -> Self {
        Self {
            id,
            node_id,
            writer,
            data_rx,
            state: WorkerState::Idle,
            tasks_completed: 0,
            unique_words: 0,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn tasks_completed(&self) -> usize {
        self.tasks_completed
    }

    /// Distinct words in the drained histogram
    pub fn unique_words(&self) -> usize {
        self.unique_words
    }

    /// Send one task (Idle → Assigned)
    pub async fn assign(&mut self, task_index: usize, path: &Path) -> CountResult<()> {
        self.expect_state(WorkerState::Idle, "assign a task")?;
        let task = Message::Task(TaskMessage {
            task_index,
            path: path.to_path_buf(),
        });
        write_message(&mut self.writer, &task).await?;
        log::debug!("Assigned task {} ({}) to {}", task_index, path.display(), self.id);
        self.state = WorkerState::Assigned { task_index };
        Ok(())
    }

    /// Accept a ready-signal (Assigned → Idle)
    ///
    /// Returns the index of the task the worker finished.
    pub fn on_ready(&mut self, ready: ReadyMessage) -> CountResult<usize> {
        self.reject_stray_data()?;
        if ready.worker_id != self.id {
            return Err(WordCountError::protocol(
                self.id,
                format!("ready-signal carries identity {}", ready.worker_id),
            ));
        }
        match self.state {
            WorkerState::Assigned { task_index } => {
                self.state = WorkerState::Idle;
                self.tasks_completed += 1;
                Ok(task_index)
            }
            other => Err(WordCountError::protocol(
                self.id,
                format!("ready-signal while {:?}", other),
            )),
        }
    }

    /// Send the termination signal (Idle → Terminating)
    pub async fn terminate(&mut self) -> CountResult<()> {
        self.expect_state(WorkerState::Idle, "terminate")?;
        self.reject_stray_data()?;
        write_message(&mut self.writer, &Message::Terminate).await?;
        log::debug!("Sent TERMINATE to {}", self.id);
        self.state = WorkerState::Terminating;
        Ok(())
    }

    /// Receive the worker's final histogram (Terminating → Collected)
    ///
    /// Expects the entry count, then for each entry the word immediately
    /// followed by its frequency.
    pub async fn drain(&mut self) -> CountResult<Histogram> {
        self.expect_state(WorkerState::Terminating, "drain the histogram")?;

        let count = match self.next_data().await? {
            Message::HistCount(count) => count,
            other => return Err(self.unexpected("HistCount", &other)),
        };

        let mut received = Histogram::new();
        for _ in 0..count {
            let word = match self.next_data().await? {
                Message::HistWord(word) => word,
                other => return Err(self.unexpected("HistWord", &other)),
            };
            let frequency = match self.next_data().await? {
                Message::HistFreq(frequency) => frequency,
                other => return Err(self.unexpected("HistFreq", &other)),
            };
            if frequency == 0 {
                return Err(WordCountError::protocol(
                    self.id,
                    format!("zero frequency for word {:?}", word.as_str()),
                ));
            }
            if received.get(word.as_str()).is_some() {
                return Err(WordCountError::protocol(
                    self.id,
                    format!("word {:?} sent twice in one histogram", word.as_str()),
                ));
            }
            received.add_count(word, frequency)?;
        }

        log::debug!("Drained {} entries from {}", count, self.id);
        self.state = WorkerState::Collected;
        self.unique_words = received.len();
        Ok(received)
    }

    async fn next_data(&mut self) -> CountResult<Message> {
        match self.data_rx.recv().await {
            Some(result) => result,
            None => Err(WordCountError::transport(
                format!("data channel of {} closed during drain", self.id),
                std::io::ErrorKind::UnexpectedEof.into(),
            )),
        }
    }

    /// Fail if the worker sent histogram data outside a drain
    ///
    /// The router queues a data frame before it reads the next frame, so
    /// anything the worker sent ahead of its ready-signal is already here.
    fn reject_stray_data(&mut self) -> CountResult<()> {
        match self.data_rx.try_recv() {
            Ok(Ok(msg)) => Err(WordCountError::protocol(
                self.id,
                format!("{:?} while {:?}", msg.label(), self.state),
            )),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(()),
        }
    }

    fn expect_state(&self, expected: WorkerState, action: &str) -> CountResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(WordCountError::protocol(
                self.id,
                format!("cannot {} while {:?}", action, self.state),
            ))
        }
    }

    fn unexpected(&self, expected: &str, got: &Message) -> WordCountError {
        WordCountError::protocol(
            self.id,
            format!("expected {} during drain, got {:?}", expected, got.label()),
        )
    }
}
