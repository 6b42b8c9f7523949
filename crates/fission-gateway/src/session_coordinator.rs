//! Session-lifetime orchestration of the worker, the shared state file and
//! the completion detector.
//!
//! The coordinator is the only holder of session state: the active config,
//! the supervised worker and the channel write lock. Requests may run
//! concurrently; worker (re)starts are serialized by the supervisor mutex.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fission_game::{
    append_ai_move_request, decode_game_state, random_move, render_cleared_snapshot,
    render_initial_snapshot, render_move_request, AiKind, BoardPosition, ClearedSnapshotKind,
    CompletionMarker, GameConfig, GameConfigRequest, GameState, MoveRequestSnapshot, Seat,
    ValidationError, MAX_BOARD_DIMENSION,
};
use fission_runtime::{
    ChannelError, CompletionDetector, CompletionOutcome, CompletionRequest, PollBudget,
    SharedStateChannel, WorkerCommand, WorkerError, WorkerLaunchConfig, WorkerLifecycle,
    WorkerSupervisor,
};
use thiserror::Error;
use tracing::{debug, info, warn};

const DEFAULT_STATE_FILE: &str = "improved_gamestate.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCoordinatorConfig {
    pub state_file: PathBuf,
    pub worker: WorkerLaunchConfig,
    pub move_budget: PollBudget,
    pub ai_budget: PollBudget,
    /// Grace given to a previous worker when a new game is initialized.
    pub init_stop_grace: Duration,
    /// Grace given to the worker on stop, reset and shutdown.
    pub stop_grace: Duration,
    /// Pause after writing the fresh board, before the worker is started.
    pub init_settle: Duration,
    /// Pause after the pre-warm start so the worker can read the fresh board.
    pub start_settle: Duration,
    /// Pause after a lazy restart before the first command is sent.
    pub worker_warmup: Duration,
}

impl Default for SessionCoordinatorConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            worker: WorkerLaunchConfig::default(),
            move_budget: PollBudget::move_default(),
            ai_budget: PollBudget::ai_default(),
            init_stop_grace: Duration::from_millis(1_000),
            stop_grace: Duration::from_millis(500),
            init_settle: Duration::from_millis(100),
            start_settle: Duration::from_millis(200),
            worker_warmup: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("AI move for {seat} timed out after {attempts} attempts; please try again")]
    AiTimeout { seat: Seat, attempts: u32 },
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(error) => error.code(),
            Self::Worker(error) => error.code(),
            Self::Channel(ChannelError::Unavailable { .. }) => "state_unavailable",
            Self::Channel(ChannelError::Io { .. }) => "state_io_error",
            Self::AiTimeout { .. } => "ai_move_timeout",
        }
    }
}

/// Result of a human move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The worker answered with its post-move snapshot.
    Applied(GameState),
    /// The poll budget ran out; the state is the unprocessed request.
    Pending(GameState),
    /// The command could not be delivered; the state is the unprocessed request.
    Unprocessed(GameState),
}

impl MoveOutcome {
    pub fn state(&self) -> &GameState {
        match self {
            Self::Applied(state) | Self::Pending(state) | Self::Unprocessed(state) => state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiMoveOutcome {
    Applied(GameState),
    /// The worker timed out on a random-AI turn and a local move was chosen
    /// instead. `state` is the snapshot the move applies to.
    Fallback {
        state: GameState,
        position: BoardPosition,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub worker: WorkerLifecycle,
    pub has_config: bool,
    pub state_file: PathBuf,
}

pub struct SessionCoordinator {
    settings: SessionCoordinatorConfig,
    current_config: Mutex<Option<GameConfig>>,
    /// Bumped whenever init, stop or reset begins replacing the session.
    session_generation: AtomicU64,
    supervisor: tokio::sync::Mutex<WorkerSupervisor>,
    channel: Arc<SharedStateChannel>,
    detector: CompletionDetector,
}

impl SessionCoordinator {
    pub fn new(settings: SessionCoordinatorConfig) -> Self {
        let channel = Arc::new(SharedStateChannel::open_file(settings.state_file.clone()));
        Self::with_channel(settings, channel)
    }

    pub fn with_channel(
        settings: SessionCoordinatorConfig,
        channel: Arc<SharedStateChannel>,
    ) -> Self {
        Self {
            current_config: Mutex::new(None),
            session_generation: AtomicU64::new(0),
            supervisor: tokio::sync::Mutex::new(WorkerSupervisor::new(settings.worker.clone())),
            detector: CompletionDetector::new(Arc::clone(&channel)),
            channel,
            settings,
        }
    }

    pub fn settings(&self) -> &SessionCoordinatorConfig {
        &self.settings
    }

    pub fn state_file(&self) -> &Path {
        self.channel.path()
    }

    pub fn current_config(&self) -> Option<GameConfig> {
        self.current_config
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn begin_session_change(&self) {
        self.session_generation.fetch_add(1, Ordering::SeqCst);
    }

    fn session_changed_since(&self, generation: u64) -> bool {
        self.session_generation.load(Ordering::SeqCst) != generation
    }

    fn replace_config(&self, config: Option<GameConfig>) {
        match self.current_config.lock() {
            Ok(mut guard) => *guard = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
    }

    /// Starts a new game: stops the previous worker, stores the config,
    /// writes a fresh empty board and pre-warms a worker.
    pub async fn init(&self, request: GameConfigRequest) -> Result<GameConfig, SessionError> {
        let config = GameConfig::from_request(request)?;
        info!(
            operation = "init",
            mode = %config.mode,
            rows = config.rows,
            cols = config.cols,
            "initializing game"
        );

        self.begin_session_change();
        self.supervisor
            .lock()
            .await
            .stop(self.settings.init_stop_grace)
            .await;
        self.replace_config(Some(config.clone()));

        if let Err(error) = self
            .channel
            .write_exclusive(&render_cleared_snapshot(ClearedSnapshotKind::InitClear))
            .await
        {
            debug!(operation = "init", error = %error, "could not clear previous state");
        }
        self.channel
            .write_exclusive(&render_initial_snapshot(config.rows, config.cols))
            .await?;
        tokio::time::sleep(self.settings.init_settle).await;

        let pid = self
            .supervisor
            .lock()
            .await
            .start(&config, self.settings.init_stop_grace)
            .await?;
        info!(operation = "init", pid, "worker pre-warmed");
        tokio::time::sleep(self.settings.start_settle).await;
        Ok(config)
    }

    /// Current decoded state. A missing state file reads as an empty game.
    pub async fn state(&self) -> Result<GameState, SessionError> {
        match self.channel.read_best_effort().await {
            Ok(text) => Ok(decode_game_state(&text)),
            Err(error) if error.is_unavailable() => {
                debug!(operation = "state", "state file missing; reporting empty game");
                Ok(GameState::default())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Writes the pre-move board with the requested move and lets the worker
    /// resolve it.
    pub async fn apply_move(
        &self,
        request: MoveRequestSnapshot,
    ) -> Result<MoveOutcome, SessionError> {
        validate_move_request(&request)?;
        info!(
            operation = "move",
            seat = %request.mover,
            row = request.row,
            col = request.col,
            total_orbs = request.board.total_orbs(),
            "processing human move"
        );

        let request_text = render_move_request(&request);
        self.channel.write_exclusive(&request_text).await?;

        let start_config = self.current_config().unwrap_or_else(|| {
            GameConfig::human_vs_human(request.board.row_count(), request.board.col_count())
        });
        self.ensure_worker("move", &start_config).await?;

        let unprocessed = decode_game_state(&request_text);
        let outcome = self
            .detector
            .run(
                &self.supervisor,
                CompletionRequest {
                    command: WorkerCommand::ProcessMove,
                    request_text: &request_text,
                    marker: CompletionMarker::MoveProcessed,
                    budget: self.settings.move_budget,
                },
            )
            .await;

        match outcome {
            Ok(CompletionOutcome::Completed { snapshot, .. }) => {
                Ok(MoveOutcome::Applied(decode_game_state(&snapshot)))
            }
            Ok(CompletionOutcome::TimedOut { attempts }) => {
                warn!(operation = "move", attempts, "move accepted but not processed in time");
                Ok(MoveOutcome::Pending(unprocessed))
            }
            Err(error) => {
                warn!(operation = "move", error = %error, "worker command not delivered");
                Ok(MoveOutcome::Unprocessed(unprocessed))
            }
        }
    }

    /// Asks the worker to play for `seat` (or for the seat whose AI turn it is).
    ///
    /// A wait that outlives its session (init, stop or reset ran meanwhile)
    /// reports [`SessionError::AiTimeout`] and never touches the new board.
    pub async fn ai_move(&self, seat: Option<Seat>) -> Result<AiMoveOutcome, SessionError> {
        let generation = self.session_generation.load(Ordering::SeqCst);
        let config = self.current_config().ok_or(ValidationError::NoActiveConfig)?;
        let current_text = self.read_current_text().await?;
        let current_state = decode_game_state(&current_text);

        let seat = seat.unwrap_or_else(|| match config.ai_seats().as_slice() {
            [only] => *only,
            _ => current_state.current_player(),
        });
        if let Err(error) = config.validate_ai_turn(seat, &current_state) {
            info!(operation = "ai_move", seat = %seat, error = %error, "rejected AI move");
            return Err(error.into());
        }
        info!(operation = "ai_move", seat = %seat, mode = %config.mode, "processing AI move");

        self.ensure_worker("ai_move", &config).await?;
        let request_text = append_ai_move_request(&current_text, seat);
        self.channel.write_exclusive(&request_text).await?;

        let outcome = self
            .detector
            .run(
                &self.supervisor,
                CompletionRequest {
                    command: WorkerCommand::ProcessAiMove,
                    request_text: &request_text,
                    marker: CompletionMarker::AiMoveApplied,
                    budget: self.settings.ai_budget,
                },
            )
            .await?;

        let attempts = match outcome {
            CompletionOutcome::Completed { attempts, .. }
                if self.session_changed_since(generation) =>
            {
                attempts
            }
            CompletionOutcome::Completed { snapshot, .. } => {
                return Ok(AiMoveOutcome::Applied(decode_game_state(&snapshot)));
            }
            CompletionOutcome::TimedOut { attempts } => attempts,
        };
        if self.session_changed_since(generation) {
            warn!(
                operation = "ai_move",
                seat = %seat,
                attempts,
                "session replaced while waiting for AI move"
            );
            return Err(SessionError::AiTimeout { seat, attempts });
        }

        if config.ai_kind_for(seat) == AiKind::Random {
            let fallback_text = self.read_current_text().await.unwrap_or(request_text);
            let state = decode_game_state(&fallback_text);
            if let Some(position) = random_move(&state, seat) {
                info!(
                    operation = "ai_move",
                    seat = %seat,
                    attempts,
                    row = position.row,
                    col = position.col,
                    "using local random fallback move"
                );
                return Ok(AiMoveOutcome::Fallback { state, position });
            }
        }
        warn!(operation = "ai_move", seat = %seat, attempts, "AI move timed out");
        Err(SessionError::AiTimeout { seat, attempts })
    }

    /// Ends the session and leaves a stopped marker in the state file.
    pub async fn stop(&self) -> Result<(), SessionError> {
        self.end_session("stop", ClearedSnapshotKind::Stopped).await
    }

    /// Like stop, but marks the state file as awaiting a new game.
    pub async fn reset(&self) -> Result<(), SessionError> {
        self.end_session("reset", ClearedSnapshotKind::Reset).await
    }

    pub async fn status(&self) -> SessionStatus {
        let worker = self.supervisor.lock().await.lifecycle();
        SessionStatus {
            worker,
            has_config: self.current_config().is_some(),
            state_file: self.state_file().to_path_buf(),
        }
    }

    /// Stops the worker without touching the state file or the config.
    pub async fn shutdown(&self) {
        let terminal = self
            .supervisor
            .lock()
            .await
            .stop(self.settings.stop_grace)
            .await;
        info!(operation = "shutdown", worker = terminal.as_str(), "coordinator shut down");
    }

    async fn end_session(
        &self,
        operation: &'static str,
        kind: ClearedSnapshotKind,
    ) -> Result<(), SessionError> {
        self.begin_session_change();
        let terminal = self
            .supervisor
            .lock()
            .await
            .stop(self.settings.stop_grace)
            .await;
        self.replace_config(None);
        self.channel
            .write_exclusive(&render_cleared_snapshot(kind))
            .await?;
        info!(operation, worker = terminal.as_str(), "session cleared");
        Ok(())
    }

    async fn read_current_text(&self) -> Result<String, SessionError> {
        match self.channel.read_best_effort().await {
            Ok(text) => Ok(text),
            Err(error) if error.is_unavailable() => Ok(String::new()),
            Err(error) => Err(error.into()),
        }
    }

    /// Restarts the worker when its handle is missing or stale.
    async fn ensure_worker(
        &self,
        operation: &'static str,
        config: &GameConfig,
    ) -> Result<(), SessionError> {
        {
            let mut supervisor = self.supervisor.lock().await;
            if supervisor.is_alive() {
                return Ok(());
            }
            if supervisor.reap_exited() {
                info!(operation, "worker exited; restarting");
            } else {
                info!(operation, "worker not running; starting");
            }
            supervisor.start(config, self.settings.stop_grace).await?;
        }
        tokio::time::sleep(self.settings.worker_warmup).await;
        Ok(())
    }
}

fn validate_move_request(request: &MoveRequestSnapshot) -> Result<(), ValidationError> {
    let board = &request.board;
    if board.row_count() == 0 || board.col_count() == 0 {
        return Err(ValidationError::InvalidMove("board must not be empty".to_string()));
    }
    if !board.is_rectangular() {
        return Err(ValidationError::InvalidMove(
            "board rows must all have the same length".to_string(),
        ));
    }
    if board.row_count() > MAX_BOARD_DIMENSION || board.col_count() > MAX_BOARD_DIMENSION {
        return Err(ValidationError::InvalidMove(format!(
            "board dimensions must not exceed {MAX_BOARD_DIMENSION}"
        )));
    }
    if request.row >= board.row_count() || request.col >= board.col_count() {
        return Err(ValidationError::InvalidMove(format!(
            "cell ({}, {}) is outside the {}x{} board",
            request.row,
            request.col,
            board.row_count(),
            board.col_count()
        )));
    }
    Ok(())
}
