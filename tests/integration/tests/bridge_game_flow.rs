#![cfg(unix)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fission_game::decode_game_state;
use fission_gateway::{
    build_game_bridge_router, GameBridgeServerState, SessionCoordinator, SessionCoordinatorConfig,
};
use fission_runtime::{PollBudget, WorkerLaunchConfig};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tokio::net::TcpListener;

/// Places one orb per command without resolving explosions. Human moves use
/// the Player/Row/Col request lines; AI moves take the first empty cell.
/// A third argument of `once` makes the worker exit after one command.
const PLAYING_WORKER: &str = r#"state="$1"
log="$2"
apply() {
  awk -v mode="$1" '
    /^Player:/ { mover = $2; next }
    /^Row:/ { row = $2; next }
    /^Col:/ { col = $2; next }
    /^MoveCount:/ { count = $2; next }
    /^AI_MOVE_REQUEST:/ { split($0, parts, ":"); mover = parts[2]; next }
    /^Board:/ { inboard = 1; next }
    inboard && NF > 0 {
      for (c = 1; c <= NF; c++) cell[nrows, c] = $c
      width = NF
      nrows++
      next
    }
    END {
      title = "Move Processed:"
      if (mode == "ai") {
        title = "Random AI Move:"
        found = 0
        for (i = 0; i < nrows && !found; i++)
          for (c = 1; c <= width && !found; c++)
            if (cell[i, c] == "⚫") { row = i; col = c - 1; found = 1 }
      }
      token = cell[row, col + 1]
      n = token
      if (token == "⚫") n = 0; else sub(/^(🔴|🔵)/, "", n)
      glyph = (mover == "RED") ? "🔴" : "🔵"
      cell[row, col + 1] = glyph (n + 1)
      print title
      print "LastPlayer: " mover
      print "MoveCount: " (count + 1)
      print "GameOver: false"
      print "Winner: None"
      print "Board:"
      for (i = 0; i < nrows; i++) {
        line = cell[i, 1]
        for (c = 2; c <= width; c++) line = line " " cell[i, c]
        print line
      }
    }
  ' "$state" > "$state.next" && mv "$state.next" "$state"
}
while IFS= read -r line; do
  echo "$line" >> "$log"
  case "$line" in
    process_move) apply move ;;
    process_ai_move) apply ai ;;
  esac
  if [ "$3" = "once" ]; then
    exit 0
  fi
done
"#;

struct Bridge {
    temp: TempDir,
    state: Arc<GameBridgeServerState>,
    addr: SocketAddr,
    server: tokio::task::JoinHandle<()>,
    client: Client,
}

impl Bridge {
    async fn spawn(extra_worker_args: &[&str]) -> Self {
        let temp = tempdir().expect("tempdir");
        let script = temp.path().join("worker.sh");
        std::fs::write(&script, PLAYING_WORKER).expect("write worker");
        let state_file = temp.path().join("improved_gamestate.txt");
        let mut args = vec![
            script.display().to_string(),
            state_file.display().to_string(),
            temp.path().join("commands.log").display().to_string(),
        ];
        args.extend(extra_worker_args.iter().map(|arg| arg.to_string()));

        let config = SessionCoordinatorConfig {
            state_file,
            worker: WorkerLaunchConfig {
                program: "sh".to_string(),
                args,
                entrypoint: Some(script),
                working_dir: temp.path().to_path_buf(),
                handoff_path: PathBuf::from("backend_config.json"),
            },
            move_budget: PollBudget::new(Duration::from_millis(20), 100),
            ai_budget: PollBudget::new(Duration::from_millis(20), 100),
            init_stop_grace: Duration::from_millis(300),
            stop_grace: Duration::from_millis(300),
            init_settle: Duration::from_millis(5),
            start_settle: Duration::from_millis(20),
            worker_warmup: Duration::from_millis(50),
        };
        let state = Arc::new(GameBridgeServerState::new(SessionCoordinator::new(config)));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral listener");
        let addr = listener.local_addr().expect("resolve listener addr");
        let app = build_game_bridge_router(Arc::clone(&state));
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        Self {
            temp,
            state,
            addr,
            server,
            client: Client::new(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .post(format!("http://{}{path}", self.addr))
            .json(&body)
            .send()
            .await
            .expect("send request");
        let status = response.status().as_u16();
        (status, response.json().await.expect("parse json"))
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let response = self
            .client
            .get(format!("http://{}{path}", self.addr))
            .send()
            .await
            .expect("send request");
        let status = response.status().as_u16();
        (status, response.json().await.expect("parse json"))
    }

    async fn play(&self, board: &Value, row: usize, col: usize, seat: &str) -> Value {
        let (status, body) = self
            .post(
                "/game/move",
                json!({"board": board, "row": row, "col": col, "currentSeat": seat}),
            )
            .await;
        assert_eq!(status, 200, "{body}");
        assert_eq!(body["success"], true);
        assert!(body.get("message").is_none(), "move was not processed: {body}");
        body["gameState"].clone()
    }

    async fn shutdown(self) {
        self.state.coordinator().shutdown().await;
        self.server.abort();
    }
}

fn cell(game_state: &Value, row: usize, col: usize) -> (&str, u64) {
    let cell = &game_state["board"][row][col];
    (
        cell["player"].as_str().expect("player"),
        cell["orbs"].as_u64().expect("orbs"),
    )
}

fn read_commands(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn integration_human_vs_random_ai_game_flow() {
    let bridge = Bridge::spawn(&[]).await;
    let (status, body) = bridge
        .post(
            "/game/init",
            json!({
                "rows": 3,
                "cols": 3,
                "mode": "USER_VS_AI",
                "firstPlayer": "HUMAN",
                "aiType": "RANDOM",
            }),
        )
        .await;
    assert_eq!(status, 200, "{body}");

    let handoff: Value = serde_json::from_str(
        &std::fs::read_to_string(bridge.path("backend_config.json")).expect("handoff"),
    )
    .expect("handoff json");
    assert_eq!(
        handoff,
        json!({
            "rows": 3,
            "cols": 3,
            "mode": "User vs AI",
            "aiType": "Random",
            "firstPlayer": "Human",
        })
    );

    let (_, body) = bridge.get("/game/state").await;
    let initial = body["gameState"].clone();
    assert_eq!(initial["currentPlayer"], "RED");

    let after_human = bridge.play(&initial["board"], 0, 0, "RED").await;
    assert_eq!(cell(&after_human, 0, 0), ("RED", 1));
    assert_eq!(after_human["moveCount"], 1);
    assert_eq!(after_human["lastPlayer"], "RED");
    assert_eq!(after_human["currentPlayer"], "BLUE");

    let (status, body) = bridge.post("/game/ai-move", json!({})).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["message"], "AI move completed");
    let after_ai = body["gameState"].clone();
    assert_eq!(cell(&after_ai, 0, 1), ("BLUE", 1));
    assert_eq!(after_ai["moveCount"], 2);
    assert_eq!(after_ai["currentPlayer"], "RED");
    assert_eq!(after_ai["scores"], json!({"RED": 1, "BLUE": 1}));

    let (status, body) = bridge.post("/game/ai-move", json!({"seat": "BLUE"})).await;
    assert_eq!(status, 400, "AI may not move twice: {body}");

    let after_second = bridge.play(&after_ai["board"], 2, 2, "RED").await;
    assert_eq!(cell(&after_second, 2, 2), ("RED", 1));
    assert_eq!(after_second["moveCount"], 3);
    assert_eq!(after_second["currentPlayer"], "BLUE");

    let on_disk = decode_game_state(
        &std::fs::read_to_string(bridge.path("improved_gamestate.txt")).expect("state text"),
    );
    assert_eq!(on_disk.move_count, 3);
    assert_eq!(
        read_commands(&bridge.path("commands.log")),
        vec!["process_move", "process_ai_move", "process_move"]
    );

    let (status, _) = bridge.post("/game/stop", json!({})).await;
    assert_eq!(status, 200);
    let (_, body) = bridge.get("/game/state").await;
    assert_eq!(body["gameState"]["board"], json!([]));
    bridge.shutdown().await;
}

#[tokio::test]
async fn integration_exited_worker_is_restarted_for_next_move() {
    let bridge = Bridge::spawn(&["once"]).await;
    let (status, _) = bridge
        .post("/game/init", json!({"rows": 4, "cols": 4}))
        .await;
    assert_eq!(status, 200);
    let (_, body) = bridge.get("/game/state").await;

    let first = bridge.play(&body["gameState"]["board"], 3, 3, "RED").await;
    assert_eq!(cell(&first, 3, 3), ("RED", 1));

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let (_, status) = bridge.get("/game/status").await;
        if status["worker"]["state"] == "exited" {
            break;
        }
        assert!(Instant::now() < deadline, "worker never exited: {status}");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let second = bridge.play(&first["board"], 0, 0, "BLUE").await;
    assert_eq!(cell(&second, 0, 0), ("BLUE", 1));
    assert_eq!(cell(&second, 3, 3), ("RED", 1));
    assert_eq!(second["moveCount"], 2);
    assert_eq!(
        read_commands(&bridge.path("commands.log")),
        vec!["process_move", "process_move"]
    );
    bridge.shutdown().await;
}

#[tokio::test]
async fn integration_reinit_replaces_worker_and_board() {
    let bridge = Bridge::spawn(&[]).await;
    bridge
        .post("/game/init", json!({"rows": 3, "cols": 3}))
        .await;
    let (_, first_status) = bridge.get("/game/status").await;
    let first_pid = first_status["worker"]["pid"].as_u64().expect("first pid");

    let (status, _) = bridge
        .post(
            "/game/init",
            json!({"rows": 5, "cols": 4, "mode": "AI_VS_AI",
                   "redAI": {"type": "MINIMAX", "difficulty": "HARD"},
                   "blueAI": {"type": "RANDOM"}}),
        )
        .await;
    assert_eq!(status, 200);
    let (_, second_status) = bridge.get("/game/status").await;
    let second_pid = second_status["worker"]["pid"].as_u64().expect("second pid");
    assert_ne!(first_pid, second_pid);

    let (_, body) = bridge.get("/game/state").await;
    let board = body["gameState"]["board"].as_array().expect("board");
    assert_eq!(board.len(), 5);
    assert!(board.iter().all(|row| row.as_array().map(Vec::len) == Some(4)));

    let handoff: Value = serde_json::from_str(
        &std::fs::read_to_string(bridge.path("backend_config.json")).expect("handoff"),
    )
    .expect("handoff json");
    assert_eq!(handoff["mode"], "AI vs AI");
    assert_eq!(handoff["firstPlayer"], "Red");
    assert_eq!(handoff["redAI"]["type"], "Smart");
    assert_eq!(handoff["redAI"]["difficulty"], "Hard");
    assert_eq!(handoff["blueAI"], json!({"type": "Random"}));
    bridge.shutdown().await;
}
