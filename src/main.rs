use anyhow::Context;
use hiretrack::config::AppConfig;
use hiretrack::import::StagingArea;
use hiretrack::store::resolve_ownership;
use hiretrack::{create_app, AppState};
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;

    let db = Database::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    if config.run_migrations {
        Migrator::up(&db, None).await.context("failed to run migrations")?;
        tracing::info!("Migrations applied");
    }

    // Resolved once; handlers never re-check the schema
    let schema_has_ownership = resolve_ownership(&db, config.ownership).await;
    tracing::info!("Candidate ownership column enabled: {}", schema_has_ownership);

    let state = AppState::new(db, &config, schema_has_ownership);
    if config.upload_ttl_hours > 0 {
        spawn_upload_sweeper(state.staging.clone(), Duration::from_secs(config.upload_ttl_hours.saturating_mul(3600)));
    }
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

/// Removes uploads that were never confirmed or discarded.
fn spawn_upload_sweeper(staging: Arc<StagingArea>, ttl: Duration) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(15 * 60));
        loop {
            ticker.tick().await;
            if let Err(e) = staging.sweep_expired(ttl).await {
                tracing::error!(?e, "upload sweep failed");
            }
        }
    });
}
