//! Distributed mode implementation
//!
//! # Architecture
//!
//! wordpulse uses a coordinator-worker architecture:
//!
//! - **Coordinator**: owns the task list and global histogram, dispatches one
//!   task at a time, drains and merges each worker's histogram
//! - **Worker service**: TCP endpoint on a node, serving one worker session
//!   per coordinator connection
//! - **Workers**: tokenize assigned files into a local histogram and return it
//!   once, on termination
//!
//! # Modules
//!
//! - `protocol`: labels, message definitions, and framing
//! - `link`: coordinator-side per-worker state and inbound routing
//! - `coordinator`: dispatch loop and aggregation
//! - `node_service`: TCP worker endpoint

pub mod protocol;
pub mod link;
pub mod coordinator;
pub mod node_service;

// Re-export key types
pub use protocol::{
    Channel,
    Label,
    Message,
    WorkerId,
    MAX_FRAME_LEN,
    PROTOCOL_VERSION,
};

pub use coordinator::{connect_workers, run_in_process, Coordinator, RunOutcome, WorkerReport};
pub use link::WorkerState;
pub use node_service::{local_node_id, NodeService};
