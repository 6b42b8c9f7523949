//! Request handlers for the `/game/*` routes.

use super::*;

pub(super) async fn handle_game_init(
    State(state): State<Arc<GameBridgeServerState>>,
    body: Bytes,
) -> Response {
    let request = match parse_game_json_body(&body) {
        Ok(request) => request,
        Err(error) => return error.into_response(),
    };
    match state.coordinator.init(request).await {
        Ok(config) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Game initialized",
                "config": config,
            })),
        )
            .into_response(),
        Err(error) => session_error_response("init", error),
    }
}

pub(super) async fn handle_game_state(State(state): State<Arc<GameBridgeServerState>>) -> Response {
    match state.coordinator.state().await {
        Ok(game_state) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "gameState": GameStateView::from(&game_state),
            })),
        )
            .into_response(),
        Err(error) => session_error_response("state", error),
    }
}

pub(super) async fn handle_game_move(
    State(state): State<Arc<GameBridgeServerState>>,
    body: Bytes,
) -> Response {
    let request = match parse_game_json_body::<MoveRequestBody>(&body)
        .and_then(MoveRequestBody::into_move_request)
    {
        Ok(request) => request,
        Err(error) => return error.into_response(),
    };
    let outcome = match state.coordinator.apply_move(request).await {
        Ok(outcome) => outcome,
        Err(error) => return session_error_response("move", error),
    };
    let view = GameStateView::from(outcome.state());
    let payload = match outcome {
        MoveOutcome::Applied(_) => json!({
            "success": true,
            "gameState": view,
        }),
        MoveOutcome::Pending(_) => json!({
            "success": true,
            "message": "Move recorded (worker timeout)",
            "gameState": view,
        }),
        MoveOutcome::Unprocessed(_) => json!({
            "success": true,
            "message": "Move recorded (no worker processing)",
            "gameState": view,
        }),
    };
    (StatusCode::OK, Json(payload)).into_response()
}

pub(super) async fn handle_game_ai_move(
    State(state): State<Arc<GameBridgeServerState>>,
    body: Bytes,
) -> Response {
    let seat = match parse_optional_game_json_body::<AiMoveRequestBody>(&body)
        .and_then(|request| request.requested_seat())
    {
        Ok(seat) => seat,
        Err(error) => return error.into_response(),
    };
    let payload = match state.coordinator.ai_move(seat).await {
        Ok(AiMoveOutcome::Applied(game_state)) => json!({
            "success": true,
            "message": "AI move completed",
            "gameState": GameStateView::from(&game_state),
        }),
        Ok(AiMoveOutcome::Fallback {
            state: game_state,
            position,
        }) => json!({
            "success": true,
            "message": "AI move completed (fallback)",
            "gameState": GameStateView::from(&game_state),
            "aiMove": position,
        }),
        Err(error) => return session_error_response("ai_move", error),
    };
    (StatusCode::OK, Json(payload)).into_response()
}

pub(super) async fn handle_game_stop(State(state): State<Arc<GameBridgeServerState>>) -> Response {
    match state.coordinator.stop().await {
        Ok(()) => success_message("Worker stopped and game state cleared"),
        Err(error) => session_error_response("stop", error),
    }
}

pub(super) async fn handle_game_reset(State(state): State<Arc<GameBridgeServerState>>) -> Response {
    match state.coordinator.reset().await {
        Ok(()) => success_message("Game reset successfully"),
        Err(error) => session_error_response("reset", error),
    }
}

pub(super) async fn handle_game_status(
    State(state): State<Arc<GameBridgeServerState>>,
) -> Response {
    let status = state.coordinator.status().await;
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "worker": {
                "state": status.worker.as_str(),
                "pid": status.worker.pid(),
            },
            "hasConfig": status.has_config,
            "stateFile": status.state_file.display().to_string(),
            "generatedUnixMs": current_unix_timestamp_ms(),
        })),
    )
        .into_response()
}

fn success_message(message: &'static str) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": message,
        })),
    )
        .into_response()
}

fn session_error_response(operation: &'static str, error: SessionError) -> Response {
    let api_error = GameApiError::from(error);
    if api_error.status.is_server_error() {
        warn!(operation, code = api_error.code, error = %api_error.message, "request failed");
    } else {
        info!(operation, code = api_error.code, error = %api_error.message, "request rejected");
    }
    api_error.into_response()
}
