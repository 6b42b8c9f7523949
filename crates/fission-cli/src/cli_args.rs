use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use fission_gateway::{GameBridgeServerConfig, SessionCoordinatorConfig};
use fission_runtime::{PollBudget, WorkerLaunchConfig};

const WORKER_MODE_FLAG: &str = "--bridge-mode";

fn parse_positive_u32(value: &str) -> Result<u32, String> {
    let parsed = value
        .parse::<u32>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "fission-bridge",
    about = "HTTP bridge driving an external chain-reaction game worker",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long,
        env = "FISSION_BIND",
        default_value = "127.0.0.1:3001",
        help = "Socket address the HTTP bridge listens on"
    )]
    pub(crate) bind: String,

    #[arg(
        long = "worker-program",
        env = "FISSION_WORKER_PROGRAM",
        default_value = "python3",
        help = "Executable used to launch the game worker"
    )]
    pub(crate) worker_program: String,

    #[arg(
        long = "worker-script",
        env = "FISSION_WORKER_SCRIPT",
        default_value = "bridge_mode.py",
        help = "Worker entrypoint checked for reachability before every start; relative to --worker-dir"
    )]
    pub(crate) worker_script: PathBuf,

    #[arg(
        long = "worker-arg",
        env = "FISSION_WORKER_ARGS",
        value_delimiter = ',',
        allow_hyphen_values = true,
        help = "Arguments passed to the worker program. Defaults to '<worker-script> --bridge-mode'"
    )]
    pub(crate) worker_args: Vec<String>,

    #[arg(
        long = "worker-dir",
        env = "FISSION_WORKER_DIR",
        default_value = ".",
        help = "Working directory of the worker; relative state and handoff paths resolve against it"
    )]
    pub(crate) worker_dir: PathBuf,

    #[arg(
        long = "state-file",
        env = "FISSION_STATE_FILE",
        default_value = "improved_gamestate.txt",
        help = "Shared state file exchanged with the worker"
    )]
    pub(crate) state_file: PathBuf,

    #[arg(
        long = "handoff-file",
        env = "FISSION_HANDOFF_FILE",
        default_value = "backend_config.json",
        help = "Worker config file written before every worker start"
    )]
    pub(crate) handoff_file: PathBuf,

    #[arg(
        long = "move-poll-interval-ms",
        env = "FISSION_MOVE_POLL_INTERVAL_MS",
        default_value_t = 100,
        value_parser = parse_positive_u64,
        help = "Delay between state-file polls while waiting for a human move"
    )]
    pub(crate) move_poll_interval_ms: u64,

    #[arg(
        long = "move-poll-attempts",
        env = "FISSION_MOVE_POLL_ATTEMPTS",
        default_value_t = 40,
        value_parser = parse_positive_u32,
        help = "Polls before a human move is reported as accepted but not yet applied"
    )]
    pub(crate) move_poll_attempts: u32,

    #[arg(
        long = "ai-poll-interval-ms",
        env = "FISSION_AI_POLL_INTERVAL_MS",
        default_value_t = 200,
        value_parser = parse_positive_u64,
        help = "Delay between state-file polls while waiting for an AI move"
    )]
    pub(crate) ai_poll_interval_ms: u64,

    #[arg(
        long = "ai-poll-attempts",
        env = "FISSION_AI_POLL_ATTEMPTS",
        default_value_t = 50,
        value_parser = parse_positive_u32,
        help = "Polls before an AI move times out"
    )]
    pub(crate) ai_poll_attempts: u32,

    #[arg(
        long = "init-stop-grace-ms",
        env = "FISSION_INIT_STOP_GRACE_MS",
        default_value_t = 1_000,
        help = "Grace period for the previous worker to exit when a new game starts"
    )]
    pub(crate) init_stop_grace_ms: u64,

    #[arg(
        long = "stop-grace-ms",
        env = "FISSION_STOP_GRACE_MS",
        default_value_t = 500,
        help = "Grace period for the worker to exit on stop, reset and shutdown"
    )]
    pub(crate) stop_grace_ms: u64,

    #[arg(
        long = "worker-warmup-ms",
        env = "FISSION_WORKER_WARMUP_MS",
        default_value_t = 500,
        help = "Pause after a lazy worker restart before the first command is sent"
    )]
    pub(crate) worker_warmup_ms: u64,
}

impl Cli {
    pub(crate) fn into_server_config(self) -> GameBridgeServerConfig {
        let args = if self.worker_args.is_empty() {
            vec![
                self.worker_script.display().to_string(),
                WORKER_MODE_FLAG.to_string(),
            ]
        } else {
            self.worker_args
        };
        let defaults = SessionCoordinatorConfig::default();
        GameBridgeServerConfig {
            bind: self.bind,
            coordinator: SessionCoordinatorConfig {
                state_file: resolve_against(&self.worker_dir, &self.state_file),
                worker: WorkerLaunchConfig {
                    program: self.worker_program,
                    args,
                    entrypoint: Some(self.worker_script),
                    handoff_path: self.handoff_file,
                    working_dir: self.worker_dir,
                },
                move_budget: PollBudget::new(
                    Duration::from_millis(self.move_poll_interval_ms),
                    self.move_poll_attempts,
                ),
                ai_budget: PollBudget::new(
                    Duration::from_millis(self.ai_poll_interval_ms),
                    self.ai_poll_attempts,
                ),
                init_stop_grace: Duration::from_millis(self.init_stop_grace_ms),
                stop_grace: Duration::from_millis(self.stop_grace_ms),
                worker_warmup: Duration::from_millis(self.worker_warmup_ms),
                ..defaults
            },
        }
    }
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_defaults_match_coordinator_defaults() {
        let config = Cli::parse_from(["fission-bridge"]).into_server_config();
        assert_eq!(config.bind, "127.0.0.1:3001");
        let coordinator = config.coordinator;
        assert_eq!(
            coordinator,
            SessionCoordinatorConfig {
                state_file: PathBuf::from("./improved_gamestate.txt"),
                ..SessionCoordinatorConfig::default()
            }
        );
    }

    #[test]
    fn unit_worker_dir_anchors_relative_paths_and_explicit_args_win() {
        let config = Cli::parse_from([
            "fission-bridge",
            "--worker-dir",
            "/srv/game/Backend",
            "--worker-program",
            "python",
            "--worker-arg",
            "-u",
            "--worker-arg",
            "bridge_mode.py",
            "--state-file",
            "/tmp/state.txt",
            "--ai-poll-attempts",
            "7",
        ])
        .into_server_config();
        let coordinator = config.coordinator;
        assert_eq!(coordinator.state_file, PathBuf::from("/tmp/state.txt"));
        assert_eq!(coordinator.worker.program, "python");
        assert_eq!(coordinator.worker.args, vec!["-u", "bridge_mode.py"]);
        assert_eq!(
            coordinator.worker.resolved_handoff_path(),
            PathBuf::from("/srv/game/Backend/backend_config.json")
        );
        assert_eq!(coordinator.ai_budget.max_attempts, 7);
    }

    #[test]
    fn regression_zero_poll_attempts_are_rejected() {
        let error = Cli::try_parse_from(["fission-bridge", "--move-poll-attempts", "0"])
            .expect_err("zero attempts");
        assert!(error.to_string().contains("greater than 0"));
    }
}
