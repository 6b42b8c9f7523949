//! Lifecycle of the single external worker process.
//!
//! State machine: `NotRunning -> Starting -> Running -> {Exited, Killed} -> NotRunning`.
//! A monitor task owns the child and publishes terminal transitions over a
//! watch channel; the supervisor clears its handle once a terminal state is
//! observed so the next request can lazily respawn.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use fission_game::{translate_game_config, GameConfig};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

const DEFAULT_WORKER_PROGRAM: &str = "python3";
const DEFAULT_WORKER_SCRIPT: &str = "bridge_mode.py";
const DEFAULT_WORKER_MODE_FLAG: &str = "--bridge-mode";
const DEFAULT_HANDOFF_FILE: &str = "backend_config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerLifecycle {
    NotRunning,
    Starting,
    Running { pid: u32 },
    Exited { code: Option<i32> },
    Killed,
}

impl WorkerLifecycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotRunning => "not_running",
            Self::Starting => "starting",
            Self::Running { .. } => "running",
            Self::Exited { .. } => "exited",
            Self::Killed => "killed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exited { .. } | Self::Killed)
    }

    pub fn pid(self) -> Option<u32> {
        match self {
            Self::Running { pid } => Some(pid),
            _ => None,
        }
    }
}

/// The two commands the worker understands on stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCommand {
    ProcessMove,
    ProcessAiMove,
}

impl WorkerCommand {
    pub fn as_line(self) -> &'static str {
        match self {
            Self::ProcessMove => "process_move",
            Self::ProcessAiMove => "process_ai_move",
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker entrypoint '{}' is not reachable: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write worker handoff config '{}': {reason}", path.display())]
    Handoff { path: PathBuf, reason: String },
    #[error("failed to spawn worker '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("worker process is not running")]
    NotRunning,
    #[error("failed to send '{command}' to worker: {source}")]
    CommandWrite {
        command: &'static str,
        #[source]
        source: io::Error,
    },
}

impl WorkerError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "worker_unavailable",
            Self::Handoff { .. } => "worker_handoff_failed",
            Self::Spawn { .. } => "worker_spawn_failed",
            Self::NotRunning => "worker_not_running",
            Self::CommandWrite { .. } => "worker_command_failed",
        }
    }
}

/// How to launch the worker. Relative `entrypoint` and `handoff_path` are
/// resolved against `working_dir`, which is also the worker's cwd.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerLaunchConfig {
    pub program: String,
    pub args: Vec<String>,
    pub entrypoint: Option<PathBuf>,
    pub working_dir: PathBuf,
    pub handoff_path: PathBuf,
}

impl Default for WorkerLaunchConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_WORKER_PROGRAM.to_string(),
            args: vec![
                DEFAULT_WORKER_SCRIPT.to_string(),
                DEFAULT_WORKER_MODE_FLAG.to_string(),
            ],
            entrypoint: Some(PathBuf::from(DEFAULT_WORKER_SCRIPT)),
            working_dir: PathBuf::from("."),
            handoff_path: PathBuf::from(DEFAULT_HANDOFF_FILE),
        }
    }
}

impl WorkerLaunchConfig {
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    pub fn resolved_handoff_path(&self) -> PathBuf {
        self.resolve(&self.handoff_path)
    }

    pub fn resolved_entrypoint(&self) -> Option<PathBuf> {
        self.entrypoint.as_deref().map(|path| self.resolve(path))
    }
}

#[derive(Debug)]
struct WorkerHandle {
    pid: Option<u32>,
    stdin: Option<ChildStdin>,
    lifecycle: watch::Receiver<WorkerLifecycle>,
    kill_tx: Option<oneshot::Sender<()>>,
}

impl WorkerHandle {
    fn state(&self) -> WorkerLifecycle {
        *self.lifecycle.borrow()
    }
}

/// Owns at most one worker process.
#[derive(Debug)]
pub struct WorkerSupervisor {
    launch: WorkerLaunchConfig,
    current: Option<WorkerHandle>,
}

impl WorkerSupervisor {
    pub fn new(launch: WorkerLaunchConfig) -> Self {
        Self {
            launch,
            current: None,
        }
    }

    pub fn lifecycle(&self) -> WorkerLifecycle {
        self.current
            .as_ref()
            .map(WorkerHandle::state)
            .unwrap_or(WorkerLifecycle::NotRunning)
    }

    /// True only for a handle that has a pid and has not been observed to exit.
    pub fn is_alive(&self) -> bool {
        self.current.as_ref().is_some_and(|handle| {
            handle.pid.is_some() && matches!(handle.state(), WorkerLifecycle::Running { .. })
        })
    }

    /// Drops a handle whose process already exited. Returns true when one was cleared.
    pub fn reap_exited(&mut self) -> bool {
        let exited = self
            .current
            .as_ref()
            .is_some_and(|handle| !matches!(handle.state(), WorkerLifecycle::Running { .. }));
        if exited {
            if let Some(handle) = self.current.take() {
                record_transition(handle.pid, handle.state(), WorkerLifecycle::NotRunning);
            }
        }
        exited
    }

    /// Writes the handoff config and spawns a fresh worker, stopping any
    /// previous one first.
    pub async fn start(
        &mut self,
        config: &GameConfig,
        stop_grace: Duration,
    ) -> Result<u32, WorkerError> {
        if self.current.is_some() {
            self.stop(stop_grace).await;
        }
        record_transition(None, WorkerLifecycle::NotRunning, WorkerLifecycle::Starting);

        self.write_handoff(config).await?;

        if let Some(entrypoint) = self.launch.resolved_entrypoint() {
            if let Err(source) = tokio::fs::metadata(&entrypoint).await {
                warn!(path = %entrypoint.display(), error = %source, "worker entrypoint not found");
                record_transition(
                    None,
                    WorkerLifecycle::Starting,
                    WorkerLifecycle::NotRunning,
                );
                return Err(WorkerError::Unavailable {
                    path: entrypoint,
                    source,
                });
            }
        }

        let mut command = Command::new(self.launch.program.as_str());
        command
            .args(&self.launch.args)
            .current_dir(&self.launch.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let mut child = command.spawn().map_err(|source| {
            record_transition(None, WorkerLifecycle::Starting, WorkerLifecycle::NotRunning);
            WorkerError::Spawn {
                program: self.launch.program.clone(),
                source,
            }
        })?;

        let pid = child.id();
        if let Some(stdout) = child.stdout.take() {
            spawn_worker_output_reader(stdout, "stdout", pid);
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_worker_output_reader(stderr, "stderr", pid);
        }
        let stdin = child.stdin.take();

        let initial = match pid {
            Some(pid) => WorkerLifecycle::Running { pid },
            None => WorkerLifecycle::Exited { code: None },
        };
        record_transition(pid, WorkerLifecycle::Starting, initial);
        let (lifecycle_tx, lifecycle_rx) = watch::channel(initial);
        let (kill_tx, kill_rx) = oneshot::channel();
        tokio::spawn(monitor_worker(child, kill_rx, lifecycle_tx, pid));

        self.current = Some(WorkerHandle {
            pid,
            stdin,
            lifecycle: lifecycle_rx,
            kill_tx: Some(kill_tx),
        });
        pid.ok_or(WorkerError::NotRunning)
    }

    /// Kills the worker (`start_kill`, SIGKILL on unix) and waits at most
    /// `grace` for the exit to be observed. The worker gets no chance to
    /// shut down cleanly; `grace` only bounds how long this call blocks.
    pub async fn stop(&mut self, grace: Duration) -> WorkerLifecycle {
        let Some(mut handle) = self.current.take() else {
            return WorkerLifecycle::NotRunning;
        };
        handle.stdin.take();
        if let Some(kill_tx) = handle.kill_tx.take() {
            let _ = kill_tx.send(());
        }
        let from = handle.state();
        let terminal = match tokio::time::timeout(
            grace,
            handle.lifecycle.wait_for(WorkerLifecycle::is_terminal),
        )
        .await
        {
            Ok(Ok(state)) => *state,
            Ok(Err(_)) => WorkerLifecycle::Killed,
            Err(_) => {
                warn!(
                    pid = handle.pid,
                    grace_ms = grace.as_millis() as u64,
                    "worker did not report exit within grace period"
                );
                WorkerLifecycle::Killed
            }
        };
        record_transition(handle.pid, from, terminal);
        terminal
    }

    /// Writes one command line to the worker's stdin. No acknowledgement is
    /// read back; answers arrive through the state file.
    pub async fn send_command(&mut self, command: WorkerCommand) -> Result<(), WorkerError> {
        if !self.is_alive() {
            return Err(WorkerError::NotRunning);
        }
        let handle = self.current.as_mut().ok_or(WorkerError::NotRunning)?;
        let stdin = handle.stdin.as_mut().ok_or(WorkerError::NotRunning)?;
        let line = format!("{}\n", command.as_line());
        let write_result = match stdin.write_all(line.as_bytes()).await {
            Ok(()) => stdin.flush().await,
            Err(error) => Err(error),
        };
        write_result.map_err(|source| WorkerError::CommandWrite {
            command: command.as_line(),
            source,
        })?;
        debug!(pid = handle.pid, command = command.as_line(), "sent worker command");
        Ok(())
    }

    async fn write_handoff(&self, config: &GameConfig) -> Result<(), WorkerError> {
        let path = self.launch.resolved_handoff_path();
        let handoff_error = |reason: String| WorkerError::Handoff {
            path: path.clone(),
            reason,
        };
        let document = translate_game_config(config)
            .to_json_pretty()
            .map_err(|error| handoff_error(error.to_string()))?;
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| handoff_error(error.to_string()))?;
        }
        tokio::fs::write(&path, document)
            .await
            .map_err(|error| handoff_error(error.to_string()))?;
        info!(path = %path.display(), mode = %config.mode, "wrote worker handoff config");
        Ok(())
    }
}

fn record_transition(pid: Option<u32>, from: WorkerLifecycle, to: WorkerLifecycle) {
    info!(
        pid,
        from = from.as_str(),
        to = to.as_str(),
        "worker lifecycle transition"
    );
}

async fn monitor_worker(
    mut child: Child,
    kill_rx: oneshot::Receiver<()>,
    lifecycle_tx: watch::Sender<WorkerLifecycle>,
    pid: Option<u32>,
) {
    let terminal = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => {
                info!(pid, code = status.code(), "worker process exited");
                WorkerLifecycle::Exited { code: status.code() }
            }
            Err(error) => {
                warn!(pid, error = %error, "failed to observe worker exit");
                WorkerLifecycle::Exited { code: None }
            }
        },
        _ = kill_rx => {
            if let Err(error) = child.start_kill() {
                warn!(pid, error = %error, "failed to signal worker");
            }
            let _ = child.wait().await;
            WorkerLifecycle::Killed
        }
    };
    lifecycle_tx.send_replace(terminal);
}

fn spawn_worker_output_reader<R>(reader: R, stream: &'static str, pid: Option<u32>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if stream == "stderr" {
                        warn!(pid, stream, "worker: {trimmed}");
                    } else {
                        debug!(pid, stream, "worker: {trimmed}");
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    warn!(pid, stream, error = %error, "worker output reader failed");
                    break;
                }
            }
        }
    });
}
