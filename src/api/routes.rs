use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use super::handlers::{change_chart, download_csv, get_coins, get_insights, health, price_chart, refresh};
use super::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/coins", get(get_coins))
        .route("/coins.csv", get(download_csv))
        .route("/charts/price", get(price_chart))
        .route("/charts/change", get(change_chart))
        .route("/insights", get(get_insights))
        .route("/refresh", post(refresh))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}
