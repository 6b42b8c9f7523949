//! Coordination runtime between the bridge and its external game worker.
//!
//! The worker shares no memory with the bridge: state travels through a
//! single text file and work is requested with one-line stdin commands.

pub mod completion_detector_runtime;
pub mod shared_state_channel_runtime;
pub mod worker_supervisor_runtime;

pub use completion_detector_runtime::{
    CompletionDetector, CompletionOutcome, CompletionRequest, PollBudget, WorkerCommandSink,
};
pub use shared_state_channel_runtime::{
    ChannelError, FileStateBackend, SharedStateChannel, StateFileBackend,
};
pub use worker_supervisor_runtime::{
    WorkerCommand, WorkerError, WorkerLaunchConfig, WorkerLifecycle, WorkerSupervisor,
};
