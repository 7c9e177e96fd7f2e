use bibliogest::{chat::services::delete_past_messages, AppState, Session};
use time::OffsetDateTime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "bibliogest=debug,sqlx=warn".to_string());
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

    // Sweep expired chat messages for the user this process runs as.
    match std::env::var("SESSION_USER") {
        Ok(user_id) if !user_id.trim().is_empty() => {
            let session = Session::new(user_id.trim());
            let now = OffsetDateTime::now_utc().unix_timestamp();
            let deleted = delete_past_messages(&state, &session, now).await?;
            tracing::info!(user_id = %session.user_id, deleted, "startup sweep finished");
        }
        _ => tracing::info!("SESSION_USER not set; skipping chat sweep"),
    }

    Ok(())
}
