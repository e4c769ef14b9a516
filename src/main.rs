mod accounts;
mod app;
mod config;
mod state;

use crate::app::{build_app, serve};
use crate::state::AppState;

/// Debug for this crate is opt-in through `RUST_LOG`: the log notifier
/// writes mail bodies at debug.
const DEFAULT_LOG_FILTER: &str = "storefront_accounts=info,axum=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = AppState::init().await?;
    let (host, port) = (state.config.host.clone(), state.config.port);

    serve(build_app(state), &host, port).await
}
