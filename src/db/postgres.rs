use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Creates the PostgreSQL pool used for wardrobe reads and rating writes
///
/// Acquisition is bounded so a saturated pool surfaces as an error the engine
/// can degrade on, rather than a request that hangs.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    tracing::info!("Connected to PostgreSQL");
    Ok(pool)
}
