//! Worker service for distributed mode
//!
//! Runs on each worker node. The service listens for coordinator
//! connections and serves each one as a single worker session: the
//! coordinator assigns tasks over the connection, and the node answers with
//! its histogram when terminated. Sessions are served one at a time.
//!
//! Input paths are opened on the worker node, so every node must see the
//! files named in the task list (shared filesystem or identical layout).

use crate::worker::{Worker, WorkerSummary};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// TCP worker endpoint
pub struct NodeService {
    listener: TcpListener,

    /// Node identifier (hostname)
    node_id: String,
}

impl NodeService {
    /// Listen on all interfaces at `listen_port`
    pub async fn bind(listen_port: u16) -> Result<Self> {
        Self::bind_addr(&format!("0.0.0.0:{}", listen_port)).await
    }

    pub async fn bind_addr(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind worker service on {}", addr))?;

        Ok(Self {
            listener,
            node_id: local_node_id(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read worker service address")
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Accept one coordinator and serve its session
    pub async fn serve_one(&self) -> Result<WorkerSummary> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        stream.set_nodelay(true).context("Failed to configure connection")?;

        println!("Coordinator connected from: {}", addr);

        let summary = Worker::new(self.node_id.clone())
            .serve(stream)
            .await
            .with_context(|| format!("Session with coordinator {} failed", addr))?;

        println!(
            "Session complete: {} tasks, {} unique words sent",
            summary.tasks_completed, summary.unique_words
        );
        Ok(summary)
    }

    /// Serve coordinator sessions
    ///
    /// With `once` the service exits after the first session, returning its
    /// error if it failed. Otherwise a failed session is reported and the
    /// service waits for the next coordinator.
    pub async fn run(self, once: bool) -> Result<()> {
        println!("Worker service listening on {}", self.local_addr()?);
        println!("Node ID: {}", self.node_id);

        loop {
            println!("Waiting for coordinator connection...");
            match self.serve_one().await {
                Ok(_) => {}
                Err(e) if once => return Err(e),
                Err(e) => eprintln!("Session failed: {:#}", e),
            }
            if once {
                return Ok(());
            }
        }
    }
}

/// Identifier of this node: its hostname, or `unknown`
pub fn local_node_id() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
