pub mod api;
pub mod config;
pub mod core_state;
pub mod models;
pub mod db;
pub mod cache;
pub mod identity;
pub mod notifications;
pub mod slots; // midwife session slots and day picker
pub mod age;
pub mod appointment; // booking, cancellation, midwife directory
pub mod vaccination; // schedule x records status merge
pub mod reminders;
pub mod monitoring; // child profiles and growth
pub mod events;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::core_state::CoreState;

const NOTIFICATION_POLL: Duration = Duration::from_secs(30);

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Run the backend until Ctrl-C.
pub async fn run() -> Result<(), String> {
    init_tracing();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let app_config = AppConfig::from_env();
    let core = Arc::new(CoreState::open(&app_config).map_err(|e| e.to_string())?);

    let auth_watch = Arc::clone(&core).watch_auth_state();
    let delivery = core.spawn_notification_delivery(NOTIFICATION_POLL);

    let server = api::start_api_server(Arc::clone(&core), app_config.bind_addr).await?;
    tracing::info!(addr = %server.info.addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Cannot listen for Ctrl-C, shutting down");
    }

    server.stop().await;
    auth_watch.abort();
    if let Some(task) = delivery {
        task.abort();
    }
    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
