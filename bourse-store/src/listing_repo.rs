use async_trait::async_trait;
use bourse_core::repository::{ListingRepository, RepoResult};
use bourse_core::CoreError;
use bourse_shared::{Listing, ListingStatus, PriceHistoryEntry};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

pub struct StoreListingRepository {
    pool: PgPool,
}

impl StoreListingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ListingRow {
    id: Uuid,
    asset_id: Uuid,
    asset_type: String,
    status: String,
    asking_price: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    price: f64,
    previous_price: f64,
    reason: String,
    rule_id: Uuid,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl ListingRepository for StoreListingRepository {
    async fn get_listing(&self, id: Uuid) -> RepoResult<Option<Listing>> {
        let row: Option<ListingRow> = sqlx::query_as(
            "SELECT id, asset_id, asset_type, status, asking_price, created_at, updated_at FROM listings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let history: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT price, previous_price, reason, rule_id, created_at
            FROM listing_price_history
            WHERE listing_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Listing {
            id: row.id,
            asset_id: row.asset_id,
            asset_type: row.asset_type,
            status: ListingStatus::parse_lossy(&row.status),
            asking_price: row.asking_price,
            price_history: history
                .into_iter()
                .map(|h| PriceHistoryEntry {
                    price: h.price,
                    previous_price: h.previous_price,
                    timestamp: h.created_at,
                    reason: h.reason,
                    rule_id: h.rule_id,
                })
                .collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    async fn count_active_listings(&self, asset_type: &str) -> RepoResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM listings WHERE asset_type = $1 AND status = 'active'",
        )
        .bind(asset_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn competitor_prices(&self, asset_id: Uuid, exclude: Option<Uuid>) -> RepoResult<Vec<f64>> {
        let prices: Vec<f64> = sqlx::query_scalar(
            r#"
            SELECT asking_price FROM listings
            WHERE asset_id = $1 AND status = 'active' AND ($2::UUID IS NULL OR id <> $2)
            "#,
        )
        .bind(asset_id)
        .bind(exclude)
        .fetch_all(&self.pool)
        .await?;

        Ok(prices)
    }

    async fn apply_price_change(&self, listing_id: Uuid, entry: &PriceHistoryEntry) -> RepoResult<Listing> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE listings SET asking_price = $2, updated_at = $3 WHERE id = $1")
            .bind(listing_id)
            .bind(entry.price)
            .bind(entry.timestamp)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("listing {}", listing_id)).into());
        }

        sqlx::query(
            r#"
            INSERT INTO listing_price_history (listing_id, price, previous_price, reason, rule_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(listing_id)
        .bind(entry.price)
        .bind(entry.previous_price)
        .bind(&entry.reason)
        .bind(entry.rule_id)
        .bind(entry.timestamp)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("Price change committed for listing {}", listing_id);

        self.get_listing(listing_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("listing {}", listing_id)).into())
    }
}
