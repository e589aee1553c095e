use async_trait::async_trait;
use bourse_core::repository::{MarketDataRepository, RepoResult};
use bourse_shared::{AssetOwnershipRecord, MarketSnapshot, TrendDirection};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreMarketDataRepository {
    pool: PgPool,
}

impl StoreMarketDataRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    asset_id: Uuid,
    asset_type: String,
    snapshot_date: NaiveDate,
    average_price: f64,
    price_target: Option<f64>,
    demand_score: f64,
    price_volatility: f64,
    trend_direction: String,
    liquidity: f64,
    trading_volume: i64,
}

impl From<SnapshotRow> for MarketSnapshot {
    fn from(row: SnapshotRow) -> Self {
        MarketSnapshot {
            asset_id: row.asset_id,
            asset_type: row.asset_type,
            snapshot_date: row.snapshot_date,
            average_price: row.average_price,
            price_target: row.price_target,
            demand_score: row.demand_score,
            price_volatility: row.price_volatility,
            trend_direction: TrendDirection::parse_lossy(&row.trend_direction),
            liquidity: row.liquidity,
            trading_volume: row.trading_volume,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OwnershipRow {
    asset_id: Uuid,
    asset_type: String,
    original_price: f64,
    current_valuation: Option<f64>,
}

#[async_trait]
impl MarketDataRepository for StoreMarketDataRepository {
    async fn latest_snapshot(&self, asset_id: Uuid) -> RepoResult<Option<MarketSnapshot>> {
        let row: Option<SnapshotRow> = sqlx::query_as(
            r#"
            SELECT asset_id, asset_type, snapshot_date, average_price, price_target, demand_score,
                   price_volatility, trend_direction, liquidity, trading_volume
            FROM market_snapshots
            WHERE asset_id = $1
            ORDER BY snapshot_date DESC
            LIMIT 1
            "#,
        )
        .bind(asset_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MarketSnapshot::from))
    }

    async fn snapshot_history(&self, asset_id: Uuid, days: u32) -> RepoResult<Vec<MarketSnapshot>> {
        let rows: Vec<SnapshotRow> = sqlx::query_as(
            r#"
            SELECT asset_id, asset_type, snapshot_date, average_price, price_target, demand_score,
                   price_volatility, trend_direction, liquidity, trading_volume
            FROM market_snapshots
            WHERE asset_id = $1 AND snapshot_date >= CURRENT_DATE - $2::INT
            ORDER BY snapshot_date ASC
            "#,
        )
        .bind(asset_id)
        .bind(i32::try_from(days)?)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MarketSnapshot::from).collect())
    }

    async fn get_ownership(&self, asset_id: Uuid) -> RepoResult<Option<AssetOwnershipRecord>> {
        let row: Option<OwnershipRow> = sqlx::query_as(
            "SELECT asset_id, asset_type, original_price, current_valuation FROM asset_ownership WHERE asset_id = $1",
        )
        .bind(asset_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| AssetOwnershipRecord {
            asset_id: r.asset_id,
            asset_type: r.asset_type,
            original_price: r.original_price,
            current_valuation: r.current_valuation,
        }))
    }
}
