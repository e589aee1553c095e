use std::str::FromStr;

use async_trait::async_trait;
use bourse_core::repository::{PricingRuleRepository, RepoResult};
use bourse_shared::{ActiveHours, PricingRule, RuleConditions, RuleStatus};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

const RULE_COLUMNS: &str = "id, name, conditions, actions, asset_types, categories, base_price, \
     min_price, max_price, adjustment_factor, active_start_hour, active_end_hour, priority, status, \
     usage_count, last_triggered, created_at, updated_at";

pub struct StorePricingRuleRepository {
    pool: PgPool,
}

impl StorePricingRuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RuleRow {
    id: Uuid,
    name: String,
    conditions: Value,
    actions: Value,
    asset_types: Vec<String>,
    categories: Vec<String>,
    base_price: Option<f64>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    adjustment_factor: f64,
    active_start_hour: Option<i32>,
    active_end_hour: Option<i32>,
    priority: i32,
    status: String,
    usage_count: i64,
    last_triggered: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RuleRow> for PricingRule {
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn try_from(row: RuleRow) -> Result<Self, Self::Error> {
        let conditions: RuleConditions = serde_json::from_value(row.conditions)?;

        let active_hours = match (row.active_start_hour, row.active_end_hour) {
            (Some(start), Some(end)) => Some(ActiveHours::new(start.try_into()?, end.try_into()?)),
            _ => None,
        };

        Ok(PricingRule {
            id: row.id,
            name: row.name,
            conditions,
            actions: row.actions,
            asset_types: row.asset_types.into_iter().collect(),
            categories: row.categories.into_iter().collect(),
            base_price: row.base_price,
            min_price: row.min_price,
            max_price: row.max_price,
            adjustment_factor: row.adjustment_factor,
            active_hours,
            priority: row.priority,
            status: RuleStatus::from_str(&row.status)?,
            usage_count: row.usage_count,
            last_triggered: row.last_triggered,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_rules(rows: Vec<RuleRow>) -> RepoResult<Vec<PricingRule>> {
    rows.into_iter().map(PricingRule::try_from).collect()
}

fn hours_columns(rule: &PricingRule) -> (Option<i32>, Option<i32>) {
    match rule.active_hours {
        Some(hours) => (Some(hours.start as i32), Some(hours.end as i32)),
        None => (None, None),
    }
}

#[async_trait]
impl PricingRuleRepository for StorePricingRuleRepository {
    async fn list_active_rules(&self, asset_type: &str) -> RepoResult<Vec<PricingRule>> {
        let rows: Vec<RuleRow> = sqlx::query_as(&format!(
            "SELECT {} FROM pricing_rules \
             WHERE status = 'active' AND $1 = ANY(asset_types) \
             ORDER BY priority DESC, created_at ASC, id ASC",
            RULE_COLUMNS
        ))
        .bind(asset_type)
        .fetch_all(&self.pool)
        .await?;

        into_rules(rows)
    }

    async fn list_rules(&self, asset_type: Option<&str>) -> RepoResult<Vec<PricingRule>> {
        let rows: Vec<RuleRow> = if let Some(at) = asset_type {
            sqlx::query_as(&format!(
                "SELECT {} FROM pricing_rules WHERE $1 = ANY(asset_types) \
                 ORDER BY priority DESC, created_at ASC, id ASC",
                RULE_COLUMNS
            ))
            .bind(at)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(&format!(
                "SELECT {} FROM pricing_rules ORDER BY priority DESC, created_at ASC, id ASC",
                RULE_COLUMNS
            ))
            .fetch_all(&self.pool)
            .await?
        };

        into_rules(rows)
    }

    async fn get_rule(&self, id: Uuid) -> RepoResult<Option<PricingRule>> {
        let row: Option<RuleRow> =
            sqlx::query_as(&format!("SELECT {} FROM pricing_rules WHERE id = $1", RULE_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(PricingRule::try_from).transpose()
    }

    async fn create_rule(&self, rule: &PricingRule) -> RepoResult<Uuid> {
        let (start, end) = hours_columns(rule);

        sqlx::query(
            r#"
            INSERT INTO pricing_rules (id, name, rule_type, conditions, actions, asset_types, categories,
                base_price, min_price, max_price, adjustment_factor, active_start_hour, active_end_hour,
                priority, status, usage_count, last_triggered, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(rule.id)
        .bind(&rule.name)
        .bind(rule.rule_type().as_str())
        .bind(serde_json::to_value(&rule.conditions)?)
        .bind(&rule.actions)
        .bind(rule.asset_types.iter().cloned().collect::<Vec<_>>())
        .bind(rule.categories.iter().cloned().collect::<Vec<_>>())
        .bind(rule.base_price)
        .bind(rule.min_price)
        .bind(rule.max_price)
        .bind(rule.adjustment_factor)
        .bind(start)
        .bind(end)
        .bind(rule.priority)
        .bind(rule.status.as_str())
        .bind(rule.usage_count)
        .bind(rule.last_triggered)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(rule.id)
    }

    async fn update_rule(&self, rule: &PricingRule) -> RepoResult<bool> {
        let (start, end) = hours_columns(rule);

        // Usage statistics and creation time stay as stored
        let result = sqlx::query(
            r#"
            UPDATE pricing_rules
            SET name = $2, rule_type = $3, conditions = $4, actions = $5, asset_types = $6,
                categories = $7, base_price = $8, min_price = $9, max_price = $10,
                adjustment_factor = $11, active_start_hour = $12, active_end_hour = $13,
                priority = $14, status = $15, updated_at = $16
            WHERE id = $1
            "#,
        )
        .bind(rule.id)
        .bind(&rule.name)
        .bind(rule.rule_type().as_str())
        .bind(serde_json::to_value(&rule.conditions)?)
        .bind(&rule.actions)
        .bind(rule.asset_types.iter().cloned().collect::<Vec<_>>())
        .bind(rule.categories.iter().cloned().collect::<Vec<_>>())
        .bind(rule.base_price)
        .bind(rule.min_price)
        .bind(rule.max_price)
        .bind(rule.adjustment_factor)
        .bind(start)
        .bind(end)
        .bind(rule.priority)
        .bind(rule.status.as_str())
        .bind(rule.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_rule_status(&self, id: Uuid, status: RuleStatus) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE pricing_rules SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_rule_trigger(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query(
            "UPDATE pricing_rules SET usage_count = usage_count + 1, last_triggered = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
