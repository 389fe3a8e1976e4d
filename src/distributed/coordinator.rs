//! Distributed coordinator
//!
//! The coordinator owns the task list, the dispatch cursor, and the global
//! histogram. It runs in one of two shapes:
//!
//! - **Zero-worker mode**: every file is counted directly, in task order, and
//!   merged into the global histogram. No messages are exchanged.
//! - **Multi-worker mode**: tasks are dispatched one at a time to whichever
//!   worker reports ready first. Once the list is exhausted, each worker is
//!   terminated as it next reports ready and its histogram is drained and
//!   merged before the loop continues.
//!
//! Workers are any `AsyncRead + AsyncWrite` endpoints: TCP connections to
//! remote worker services, or in-memory pipes to in-process workers.

use crate::distributed::link::{route_inbound, ControlEvent, Inbound, WorkerLink, WorkerState};
use crate::distributed::node_service::local_node_id;
use crate::distributed::protocol::*;
use crate::error::{CountResult, WordCountError};
use crate::stats::aggregator::{GlobalAggregator, MergeSource};
use crate::stats::histogram::Histogram;
use crate::stats::tokenizer::count_task_file;
use crate::tasks::TaskList;
use crate::worker::Worker;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// In-memory pipe capacity for in-process workers
const DUPLEX_BUFFER: usize = 64 * 1024;

/// Per-worker outcome of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: WorkerId,
    pub node_id: String,
    pub tasks_completed: usize,
    /// Distinct words in the drained histogram
    pub unique_words: usize,
}

/// Result of a complete run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub histogram: Histogram,
    pub workers: Vec<WorkerReport>,
    pub files_dispatched: usize,
}

/// Task dispatcher and global aggregator
pub struct Coordinator {
    task_list: TaskList,
    cursor: usize,
}

impl Coordinator {
    pub fn new(task_list: TaskList) -> Self {
        Self {
            task_list,
            cursor: 0,
        }
    }

    pub fn task_list(&self) -> &TaskList {
        &self.task_list
    }

    /// Advance the dispatch cursor
    fn next_task(&mut self) -> Option<(usize, PathBuf)> {
        let index = self.cursor;
        let path = self.task_list.get(index)?.to_path_buf();
        self.cursor += 1;
        Some((index, path))
    }

    /// Count every file directly, in task order
    pub fn run_single_process(mut self) -> CountResult<RunOutcome> {
        log::info!("Counting {} files without workers", self.task_list.len());
        let mut aggregator = GlobalAggregator::new();

        while let Some((index, path)) = self.next_task() {
            if let Some(file_histogram) = count_task_file(&path)? {
                aggregator.merge(MergeSource::File(index), &file_histogram)?;
            }
        }

        Ok(RunOutcome {
            histogram: aggregator.into_histogram(),
            workers: Vec::new(),
            files_dispatched: self.cursor,
        })
    }

    /// Run a session against the given worker endpoints
    ///
    /// Endpoint `i` becomes worker `i`. With no endpoints this falls back to
    /// [`run_single_process`](Self::run_single_process) on the current thread.
    pub async fn run<S>(mut self, endpoints: Vec<S>) -> CountResult<RunOutcome>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        if endpoints.is_empty() {
            return self.run_single_process();
        }

        let (control_tx, mut control_rx) = mpsc::unbounded_channel();
        let mut links = Vec::with_capacity(endpoints.len());
        let mut routers = Vec::with_capacity(endpoints.len());

        for (index, stream) in endpoints.into_iter().enumerate() {
            let id = WorkerId::new(index);
            let (mut reader, mut writer) = tokio::io::split(stream);
            let node_id = match handshake(id, &mut reader, &mut writer).await {
                Ok(node_id) => node_id,
                Err(e) => {
                    // Earlier routers still own their read halves.
                    abort_routers(routers);
                    return Err(e);
                }
            };
            log::info!("{} connected (node {})", id, node_id);

            let (data_tx, data_rx) = mpsc::unbounded_channel();
            routers.push(tokio::spawn(route_inbound(id, reader, control_tx.clone(), data_tx)));
            links.push(WorkerLink::new(id, node_id, writer, data_rx));
        }
        drop(control_tx);

        let result = self.dispatch(&mut links, &mut control_rx).await;

        abort_routers(routers);

        let histogram = result?;
        let workers = links
            .iter()
            .map(|link| WorkerReport {
                worker_id: link.id(),
                node_id: link.node_id().to_string(),
                tasks_completed: link.tasks_completed(),
                unique_words: link.unique_words(),
            })
            .collect();

        Ok(RunOutcome {
            histogram,
            workers,
            files_dispatched: self.cursor,
        })
    }

    async fn dispatch<W>(
        &mut self,
        links: &mut [WorkerLink<W>],
        control_rx: &mut mpsc::UnboundedReceiver<Inbound>,
    ) -> CountResult<Histogram>
    where
        W: AsyncWrite + Unpin,
    {
        let mut aggregator = GlobalAggregator::new();
        let mut collected = 0usize;

        // Priming: exactly one message per worker.
        for link in links.iter_mut() {
            match self.next_task() {
                Some((index, path)) => link.assign(index, &path).await?,
                None => {
                    collect(link, &mut aggregator).await?;
                    collected += 1;
                }
            }
        }

        while collected < links.len() {
            let inbound = control_rx.recv().await.ok_or_else(|| {
                WordCountError::transport(
                    "all worker connections closed",
                    std::io::ErrorKind::UnexpectedEof.into(),
                )
            })?;
            let link = links.get_mut(inbound.worker.index()).ok_or_else(|| {
                WordCountError::protocol(inbound.worker, "message from unknown worker identity")
            })?;

            match inbound.event {
                ControlEvent::Message(Message::Ready(ready)) => {
                    let finished = link.on_ready(ready)?;
                    log::debug!("{} finished task {}", link.id(), finished);
                    match self.next_task() {
                        Some((index, path)) => link.assign(index, &path).await?,
                        None => {
                            collect(link, &mut aggregator).await?;
                            collected += 1;
                        }
                    }
                }
                ControlEvent::Message(Message::Abort(abort)) => {
                    return Err(WordCountError::WorkerAborted {
                        worker: link.id(),
                        reason: abort.reason,
                    });
                }
                ControlEvent::Message(other) => {
                    return Err(WordCountError::protocol(
                        link.id(),
                        format!("unexpected {:?} while {:?}", other.label(), link.state()),
                    ));
                }
                ControlEvent::Closed if link.state() == WorkerState::Collected => {}
                ControlEvent::Closed => {
                    return Err(WordCountError::transport(
                        format!("{} closed its connection while {:?}", link.id(), link.state()),
                        std::io::ErrorKind::UnexpectedEof.into(),
                    ));
                }
                ControlEvent::Failed(_) if link.state() == WorkerState::Collected => {}
                ControlEvent::Failed(reason) => {
                    return Err(WordCountError::transport(
                        format!("reading from {} failed: {}", link.id(), reason),
                        std::io::Error::new(std::io::ErrorKind::Other, reason),
                    ));
                }
            }
        }

        log::info!(
            "Collected {} workers, {} tasks dispatched",
            links.len(),
            self.cursor
        );
        Ok(aggregator.into_histogram())
    }
}

fn abort_routers(routers: Vec<JoinHandle<()>>) {
    for router in routers {
        router.abort();
    }
}

/// Terminate a worker, drain its histogram, and merge it
async fn collect<W>(link: &mut WorkerLink<W>, aggregator: &mut GlobalAggregator) -> CountResult<()>
where
    W: AsyncWrite + Unpin,
{
    link.terminate().await?;
    let partial = link.drain().await?;
    aggregator.merge(MergeSource::Worker(link.id()), &partial)
}

async fn handshake<R, W>(id: WorkerId, reader: &mut R, writer: &mut W) -> CountResult<String>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let hello = Message::Hello(HelloMessage {
        protocol_version: PROTOCOL_VERSION,
        worker_id: id,
        node_id: local_node_id(),
    });
    write_message(writer, &hello).await?;

    match read_message(reader).await? {
        Message::Hello(reply) => {
            if reply.protocol_version != PROTOCOL_VERSION {
                return Err(WordCountError::protocol(
                    id,
                    format!(
                        "protocol version mismatch: coordinator={}, worker={}",
                        PROTOCOL_VERSION, reply.protocol_version
                    ),
                ));
            }
            if reply.worker_id != id {
                return Err(WordCountError::protocol(
                    id,
                    format!("handshake echoed identity {}", reply.worker_id),
                ));
            }
            Ok(reply.node_id)
        }
        Message::Abort(abort) => Err(WordCountError::WorkerAborted {
            worker: id,
            reason: abort.reason,
        }),
        other => Err(WordCountError::protocol(
            id,
            format!("expected Hello, got {:?}", other.label()),
        )),
    }
}

/// Run with `workers` in-process workers connected over memory pipes
///
/// `workers == 0` selects zero-worker mode.
pub async fn run_in_process(task_list: TaskList, workers: usize) -> CountResult<RunOutcome> {
    let node_id = local_node_id();
    let mut endpoints = Vec::with_capacity(workers);
    let mut handles = Vec::with_capacity(workers);

    for _ in 0..workers {
        let (coordinator_end, worker_end) = tokio::io::duplex(DUPLEX_BUFFER);
        handles.push(tokio::spawn(Worker::new(node_id.clone()).serve(worker_end)));
        endpoints.push(coordinator_end);
    }

    let outcome = Coordinator::new(task_list).run(endpoints).await?;

    for handle in handles {
        match handle.await {
            Ok(result) => {
                result?;
            }
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                return Err(WordCountError::transport(
                    "worker task was cancelled",
                    std::io::Error::new(std::io::ErrorKind::Interrupted, e),
                ))
            }
        }
    }

    Ok(outcome)
}

/// Connect to remote worker services, one worker per address
pub async fn connect_workers(addresses: &[String]) -> Result<Vec<TcpStream>> {
    let mut streams = Vec::with_capacity(addresses.len());
    for (i, addr) in addresses.iter().enumerate() {
        println!("Connecting to worker service {} ({})...", i, addr);
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("Failed to connect to worker service {}", addr))?;
        stream
            .set_nodelay(true)
            .with_context(|| format!("Failed to configure connection to {}", addr))?;
        streams.push(stream);
    }
    println!("All {} worker services connected", streams.len());
    Ok(streams)
}
