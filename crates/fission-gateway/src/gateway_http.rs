//! axum surface of the game bridge.
//!
//! Handlers are thin: they parse the body, call the [`SessionCoordinator`]
//! and render its outcome. Every failure leaves as a JSON error envelope.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::session_coordinator::{
    AiMoveOutcome, MoveOutcome, SessionCoordinator, SessionCoordinatorConfig, SessionError,
};

mod endpoints;
mod game_handlers;
mod server_bootstrap;
mod types;

use endpoints::*;
use game_handlers::*;
pub use server_bootstrap::{build_game_bridge_router, run_game_bridge_server};
use types::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameBridgeServerConfig {
    pub bind: String,
    pub coordinator: SessionCoordinatorConfig,
}

/// Shared handler state.
pub struct GameBridgeServerState {
    coordinator: SessionCoordinator,
}

impl GameBridgeServerState {
    pub fn new(coordinator: SessionCoordinator) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &SessionCoordinator {
        &self.coordinator
    }
}

fn parse_game_json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, GameApiError> {
    serde_json::from_slice::<T>(body).map_err(|error| {
        GameApiError::bad_request(
            "malformed_json",
            format!("failed to parse request body: {error}"),
        )
    })
}

/// Like [`parse_game_json_body`], but an empty body yields the default value.
fn parse_optional_game_json_body<T: DeserializeOwned + Default>(
    body: &Bytes,
) -> Result<T, GameApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    parse_game_json_body(body)
}

fn current_unix_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
