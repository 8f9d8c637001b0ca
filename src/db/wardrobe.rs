use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::EngineResult,
    models::{ItemAttributes, WardrobeItem},
};

/// Read access to users' wardrobes
///
/// Wardrobe management owns these records; the engine never writes them.
#[async_trait::async_trait]
pub trait WardrobeRepository: Send + Sync {
    /// All items owned by the user, in a stable order
    async fn items_for_user(&self, user_id: Uuid) -> EngineResult<Vec<WardrobeItem>>;

    /// A single item, if it exists and belongs to the user
    async fn item(&self, user_id: Uuid, item_id: Uuid) -> EngineResult<Option<WardrobeItem>>;
}

/// Wardrobe items stored in PostgreSQL
#[derive(Clone)]
pub struct PgWardrobeRepository {
    pool: PgPool,
}

impl PgWardrobeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn from_row(row: &PgRow) -> Result<WardrobeItem, sqlx::Error> {
        let wear_count: i32 = row.try_get("wear_count")?;
        Ok(WardrobeItem {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            attributes: ItemAttributes {
                category: row.try_get("category")?,
                color: row.try_get("color")?,
                pattern: row.try_get("pattern")?,
                style: row.try_get("style")?,
            },
            tags: row.try_get::<Option<Vec<String>>, _>("tags")?.unwrap_or_default(),
            wear_count: wear_count.max(0) as u32,
            last_worn: row.try_get("last_worn")?,
        })
    }
}

#[async_trait::async_trait]
impl WardrobeRepository for PgWardrobeRepository {
    async fn items_for_user(&self, user_id: Uuid) -> EngineResult<Vec<WardrobeItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, category, color, pattern, style, tags, wear_count, last_worn
            FROM wardrobe_items
            WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(Self::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(user_id = %user_id, items = items.len(), "Loaded wardrobe");
        Ok(items)
    }

    async fn item(&self, user_id: Uuid, item_id: Uuid) -> EngineResult<Option<WardrobeItem>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, category, color, pattern, style, tags, wear_count, last_worn
            FROM wardrobe_items
            WHERE user_id = $1 AND id = $2
            "#,
        )
        .bind(user_id)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::from_row).transpose()?)
    }
}

/// Wardrobes held in memory, for tests and local runs
#[derive(Default)]
pub struct InMemoryWardrobe {
    items: RwLock<HashMap<Uuid, Vec<WardrobeItem>>>,
}

impl InMemoryWardrobe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds items, filed under each item's owner
    pub async fn add_items(&self, items: impl IntoIterator<Item = WardrobeItem>) {
        let mut wardrobes = self.items.write().await;
        for item in items {
            wardrobes.entry(item.user_id).or_default().push(item);
        }
    }
}

#[async_trait::async_trait]
impl WardrobeRepository for InMemoryWardrobe {
    async fn items_for_user(&self, user_id: Uuid) -> EngineResult<Vec<WardrobeItem>> {
        Ok(self
            .items
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn item(&self, user_id: Uuid, item_id: Uuid) -> EngineResult<Option<WardrobeItem>> {
        Ok(self
            .items
            .read()
            .await
            .get(&user_id)
            .and_then(|items| items.iter().find(|item| item.id == item_id).cloned()))
    }
}
