//! Route paths served by the game bridge.

pub(super) const GAME_INIT_ENDPOINT: &str = "/game/init";
pub(super) const GAME_STATE_ENDPOINT: &str = "/game/state";
pub(super) const GAME_MOVE_ENDPOINT: &str = "/game/move";
pub(super) const GAME_AI_MOVE_ENDPOINT: &str = "/game/ai-move";
pub(super) const GAME_STOP_ENDPOINT: &str = "/game/stop";
pub(super) const GAME_RESET_ENDPOINT: &str = "/game/reset";
pub(super) const GAME_STATUS_ENDPOINT: &str = "/game/status";
