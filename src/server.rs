//! HTTP surface
//!
//! `POST /interactions` receives every platform interaction and returns
//! its immediate response. `GET /api/status` serves the bot metrics.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::debug;

use crate::bot::Bot;
use crate::comms::interaction::{Interaction, InteractionResponse};
use crate::comms::monitor::BotMetrics;

pub fn router(bot: Arc<Bot>) -> Router {
    Router::new()
        .route("/interactions", post(interactions))
        .route("/api/status", get(api_status))
        .with_state(bot)
}

async fn interactions(State(bot): State<Arc<Bot>>, Json(interaction): Json<Interaction>) -> Json<InteractionResponse> {
    debug!("[SERVER] Interaction {} (type {})", interaction.id, interaction.kind_code);
    Json(bot.handle(interaction).await)
}

async fn api_status(State(bot): State<Arc<Bot>>) -> Json<BotMetrics> {
    Json(bot.monitor().lock().await.get_metrics())
}
