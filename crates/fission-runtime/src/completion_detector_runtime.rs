//! Bounded polling for the worker's answer in the shared state file.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fission_game::CompletionMarker;
use tracing::{debug, info, warn};

use crate::shared_state_channel_runtime::SharedStateChannel;
use crate::worker_supervisor_runtime::{WorkerCommand, WorkerError, WorkerSupervisor};

const PROGRESS_LOG_EVERY: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollBudget {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Human-move budget: 40 polls, 100ms apart.
    pub const fn move_default() -> Self {
        Self::new(Duration::from_millis(100), 40)
    }

    /// AI-move budget: 50 polls, 200ms apart.
    pub const fn ai_default() -> Self {
        Self::new(Duration::from_millis(200), 50)
    }

    pub fn total(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

/// Delivers a single command line to whatever is processing requests.
#[async_trait]
pub trait WorkerCommandSink: Send + Sync {
    async fn send_command(&self, command: WorkerCommand) -> Result<(), WorkerError>;
}

#[async_trait]
impl WorkerCommandSink for tokio::sync::Mutex<WorkerSupervisor> {
    async fn send_command(&self, command: WorkerCommand) -> Result<(), WorkerError> {
        self.lock().await.send_command(command).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub command: WorkerCommand,
    /// Exact text written before the command was sent.
    pub request_text: &'a str,
    pub marker: CompletionMarker,
    pub budget: PollBudget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed { snapshot: String, attempts: u32 },
    TimedOut { attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct CompletionDetector {
    channel: Arc<SharedStateChannel>,
}

impl CompletionDetector {
    pub fn new(channel: Arc<SharedStateChannel>) -> Self {
        Self { channel }
    }

    /// Sends `request.command` and polls until a snapshot differing from
    /// `request.request_text` satisfies the marker, or the budget runs out.
    /// Read failures count as "no change yet".
    pub async fn run(
        &self,
        sink: &dyn WorkerCommandSink,
        request: CompletionRequest<'_>,
    ) -> Result<CompletionOutcome, WorkerError> {
        sink.send_command(request.command).await?;
        let command = request.command.as_line();
        let marker = request.marker.as_str();

        for attempt in 1..=request.budget.max_attempts {
            tokio::time::sleep(request.budget.interval).await;
            match self.channel.read_best_effort().await {
                Ok(snapshot) => {
                    if snapshot != request.request_text && request.marker.is_satisfied_by(&snapshot)
                    {
                        info!(command, marker, attempts = attempt, "worker completed request");
                        return Ok(CompletionOutcome::Completed {
                            snapshot,
                            attempts: attempt,
                        });
                    }
                }
                Err(error) => {
                    debug!(command, attempt, error = %error, "state read failed while polling");
                }
            }
            if attempt % PROGRESS_LOG_EVERY == 0 {
                debug!(
                    command,
                    marker,
                    attempt,
                    max_attempts = request.budget.max_attempts,
                    "still waiting for worker"
                );
            }
        }

        warn!(
            command,
            marker,
            attempts = request.budget.max_attempts,
            budget_ms = request.budget.total().as_millis() as u64,
            "worker did not complete request within budget"
        );
        Ok(CompletionOutcome::TimedOut {
            attempts: request.budget.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use fission_game::{
        append_ai_move_request, render_initial_snapshot, render_move_request, Board,
        MoveRequestSnapshot, Seat,
    };
    use tempfile::tempdir;

    use super::*;

    const FAST: PollBudget = PollBudget::new(Duration::from_millis(5), 20);

    /// Answers each command by writing the scripted reply to the channel.
    struct ScriptedSink {
        channel: Arc<SharedStateChannel>,
        reply: Option<String>,
        sent: Mutex<Vec<WorkerCommand>>,
        fail: bool,
    }

    impl ScriptedSink {
        fn new(channel: Arc<SharedStateChannel>, reply: Option<&str>) -> Self {
            Self {
                channel,
                reply: reply.map(str::to_string),
                sent: Mutex::new(Vec::new()),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl WorkerCommandSink for ScriptedSink {
        async fn send_command(&self, command: WorkerCommand) -> Result<(), WorkerError> {
            self.sent.lock().expect("sent lock").push(command);
            if self.fail {
                return Err(WorkerError::NotRunning);
            }
            if let Some(reply) = &self.reply {
                self.channel
                    .write_exclusive(reply)
                    .await
                    .expect("write reply");
            }
            Ok(())
        }
    }

    fn channel_in(dir: &std::path::Path) -> Arc<SharedStateChannel> {
        Arc::new(SharedStateChannel::open_file(dir.join("state.txt")))
    }

    fn move_request() -> String {
        render_move_request(&MoveRequestSnapshot {
            board: Board::empty(3, 3),
            row: 1,
            col: 1,
            mover: Seat::Red,
        })
    }

    #[test]
    fn unit_default_budgets_match_documented_totals() {
        assert_eq!(PollBudget::move_default().total(), Duration::from_secs(4));
        assert_eq!(PollBudget::ai_default().total(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn functional_move_completion_returns_worker_snapshot() {
        let temp = tempdir().expect("tempdir");
        let channel = channel_in(temp.path());
        let request = move_request();
        channel.write_exclusive(&request).await.expect("write request");
        let reply = "Move Processed:\nLastPlayer: RED\nMoveCount: 1\nGameOver: false\nWinner: None\nBoard:\n⚫ ⚫ ⚫\n⚫ 🔴1 ⚫\n⚫ ⚫ ⚫";
        let sink = ScriptedSink::new(channel.clone(), Some(reply));

        let outcome = CompletionDetector::new(channel)
            .run(
                &sink,
                CompletionRequest {
                    command: WorkerCommand::ProcessMove,
                    request_text: &request,
                    marker: CompletionMarker::MoveProcessed,
                    budget: FAST,
                },
            )
            .await
            .expect("run");
        match outcome {
            CompletionOutcome::Completed { snapshot, attempts } => {
                assert_eq!(snapshot, reply);
                assert_eq!(attempts, 1);
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(
            sink.sent.lock().expect("sent").as_slice(),
            &[WorkerCommand::ProcessMove]
        );
    }

    #[tokio::test]
    async fn regression_unchanged_request_times_out_after_exact_budget() {
        let temp = tempdir().expect("tempdir");
        let channel = channel_in(temp.path());
        let request = append_ai_move_request(&render_initial_snapshot(3, 3), Seat::Blue);
        channel.write_exclusive(&request).await.expect("write request");
        let sink = ScriptedSink::new(channel.clone(), None);

        let outcome = CompletionDetector::new(channel)
            .run(
                &sink,
                CompletionRequest {
                    command: WorkerCommand::ProcessAiMove,
                    request_text: &request,
                    marker: CompletionMarker::AiMoveApplied,
                    budget: FAST,
                },
            )
            .await
            .expect("run");
        assert_eq!(outcome, CompletionOutcome::TimedOut { attempts: 20 });
    }

    #[tokio::test]
    async fn regression_changed_text_without_marker_is_not_completion() {
        let temp = tempdir().expect("tempdir");
        let channel = channel_in(temp.path());
        let request = append_ai_move_request(&render_initial_snapshot(3, 3), Seat::Red);
        channel.write_exclusive(&request).await.expect("write request");
        let sink = ScriptedSink::new(channel.clone(), Some(&format!("{request}\n")));

        let outcome = CompletionDetector::new(channel)
            .run(
                &sink,
                CompletionRequest {
                    command: WorkerCommand::ProcessAiMove,
                    request_text: &request,
                    marker: CompletionMarker::AiMoveApplied,
                    budget: PollBudget::new(Duration::from_millis(5), 4),
                },
            )
            .await
            .expect("run");
        assert_eq!(outcome, CompletionOutcome::TimedOut { attempts: 4 });
    }

    #[tokio::test]
    async fn functional_missing_state_file_counts_as_no_change() {
        let temp = tempdir().expect("tempdir");
        let channel = channel_in(temp.path());
        let sink = ScriptedSink::new(channel.clone(), None);

        let outcome = CompletionDetector::new(channel)
            .run(
                &sink,
                CompletionRequest {
                    command: WorkerCommand::ProcessMove,
                    request_text: "",
                    marker: CompletionMarker::MoveProcessed,
                    budget: PollBudget::new(Duration::from_millis(5), 3),
                },
            )
            .await
            .expect("run");
        assert_eq!(outcome, CompletionOutcome::TimedOut { attempts: 3 });
    }

    #[tokio::test]
    async fn functional_send_failure_skips_polling() {
        let temp = tempdir().expect("tempdir");
        let channel = channel_in(temp.path());
        let mut sink = ScriptedSink::new(channel.clone(), None);
        sink.fail = true;

        let error = CompletionDetector::new(channel)
            .run(
                &sink,
                CompletionRequest {
                    command: WorkerCommand::ProcessMove,
                    request_text: "",
                    marker: CompletionMarker::MoveProcessed,
                    budget: FAST,
                },
            )
            .await
            .expect_err("send failure");
        assert!(matches!(error, WorkerError::NotRunning));
    }
}
