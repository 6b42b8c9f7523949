//! Game bridge server bootstrap and router wiring.

use super::*;

/// Serves the bridge until ctrl-c, then stops the worker.
pub async fn run_game_bridge_server(config: GameBridgeServerConfig) -> Result<()> {
    let bind_addr = config
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid --bind '{}'", config.bind))?;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind game bridge server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound game bridge server address")?;

    let coordinator = SessionCoordinator::new(config.coordinator);
    info!(
        addr = %local_addr,
        state_file = %coordinator.state_file().display(),
        worker_program = %coordinator.settings().worker.program,
        "game bridge server listening"
    );

    let state = Arc::new(GameBridgeServerState::new(coordinator));
    let app = build_game_bridge_router(Arc::clone(&state));
    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    state.coordinator.shutdown().await;
    serve_result.context("game bridge server exited unexpectedly")?;
    Ok(())
}

pub fn build_game_bridge_router(state: Arc<GameBridgeServerState>) -> Router {
    Router::new()
        .route(GAME_INIT_ENDPOINT, post(handle_game_init))
        .route(GAME_STATE_ENDPOINT, get(handle_game_state))
        .route(GAME_MOVE_ENDPOINT, post(handle_game_move))
        .route(GAME_AI_MOVE_ENDPOINT, post(handle_game_ai_move))
        .route(GAME_STOP_ENDPOINT, post(handle_game_stop))
        .route(GAME_RESET_ENDPOINT, post(handle_game_reset))
        .route(GAME_STATUS_ENDPOINT, get(handle_game_status))
        .with_state(state)
}
