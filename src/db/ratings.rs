use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// A durable rating of a saved outfit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingRecord {
    pub user_id: Uuid,
    pub outfit_id: Uuid,
    pub rating: u8,
    pub reason: Option<String>,
    pub rated_at: DateTime<Utc>,
}

/// Durable storage for ratings of saved outfits
///
/// Only ever receives the UUID of a saved outfit; ephemeral ids cannot be
/// expressed here.
#[async_trait::async_trait]
pub trait RatingStore: Send + Sync {
    /// Insert or replace the rating keyed by (user, outfit)
    async fn upsert_rating(
        &self,
        user_id: Uuid,
        outfit_id: Uuid,
        rating: u8,
        reason: Option<&str>,
    ) -> EngineResult<()>;
}

/// Ratings stored in PostgreSQL
///
/// `outfit_ratings.outfit_id` references the saved outfits table, so rating an
/// outfit that was never saved fails with a foreign-key violation.
#[derive(Clone)]
pub struct PgRatingStore {
    pool: PgPool,
}

impl PgRatingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RatingStore for PgRatingStore {
    async fn upsert_rating(
        &self,
        user_id: Uuid,
        outfit_id: Uuid,
        rating: u8,
        reason: Option<&str>,
    ) -> EngineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO outfit_ratings (user_id, outfit_id, rating, reason, rated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (user_id, outfit_id)
            DO UPDATE SET rating = EXCLUDED.rating,
                          reason = EXCLUDED.reason,
                          rated_at = EXCLUDED.rated_at
            "#,
        )
        .bind(user_id)
        .bind(outfit_id)
        .bind(rating as i16)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Rating store held in memory, for tests and local runs
///
/// Mirrors the foreign-key behaviour of the Postgres store: only outfits
/// registered with [`InMemoryRatingStore::with_saved_outfits`] accept ratings.
#[derive(Default)]
pub struct InMemoryRatingStore {
    saved_outfits: HashSet<Uuid>,
    rows: Mutex<HashMap<(Uuid, Uuid), RatingRecord>>,
    attempts: AtomicUsize,
}

impl InMemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_saved_outfits(outfits: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            saved_outfits: outfits.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn rows(&self) -> Vec<RatingRecord> {
        self.rows.lock().values().cloned().collect()
    }

    /// Number of upserts attempted, including rejected ones
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RatingStore for InMemoryRatingStore {
    async fn upsert_rating(
        &self,
        user_id: Uuid,
        outfit_id: Uuid,
        rating: u8,
        reason: Option<&str>,
    ) -> EngineResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if !self.saved_outfits.contains(&outfit_id) {
            return Err(EngineError::NotFound(format!("saved outfit {}", outfit_id)));
        }

        self.rows.lock().insert(
            (user_id, outfit_id),
            RatingRecord {
                user_id,
                outfit_id,
                rating,
                reason: reason.map(str::to_string),
                rated_at: Utc::now(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_replaces_previous_rating() {
        let outfit = Uuid::new_v4();
        let user = Uuid::new_v4();
        let store = InMemoryRatingStore::with_saved_outfits([outfit]);

        store.upsert_rating(user, outfit, 2, None).await.unwrap();
        store
            .upsert_rating(user, outfit, 5, Some("grew on me"))
            .await
            .unwrap();

        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rating, 5);
        assert_eq!(rows[0].reason.as_deref(), Some("grew on me"));
        assert_eq!(store.attempts(), 2);
    }

    #[tokio::test]
    async fn test_unsaved_outfit_is_rejected() {
        let store = InMemoryRatingStore::new();
        let result = store
            .upsert_rating(Uuid::new_v4(), Uuid::new_v4(), 4, None)
            .await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
        assert!(store.rows().is_empty());
    }
}
