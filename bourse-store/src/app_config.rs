use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    /// Without a database the service runs on the in-memory store
    pub database: Option<DatabaseConfig>,
    pub redis: Option<RedisConfig>,
    pub kafka: Option<KafkaConfig>,
    #[serde(default)]
    pub pricing: PricingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_repriced_topic")]
    pub repriced_topic: String,
}

fn default_repriced_topic() -> String { "pricing.listing_repriced".to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct PricingSettings {
    #[serde(default = "default_window_days")]
    pub analysis_window_days: u32,
    #[serde(default = "default_demand_weight")]
    pub demand_weight: f64,
    #[serde(default = "default_trend_tilt")]
    pub trend_tilt: f64,
    /// Requests per client per minute, enforced only when redis is configured
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i64,
}

fn default_window_days() -> u32 { 30 }
fn default_demand_weight() -> f64 { 0.2 }
fn default_trend_tilt() -> f64 { 0.02 }
fn default_rate_limit() -> i64 { 120 }

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            analysis_window_days: default_window_days(),
            demand_weight: default_demand_weight(),
            trend_tilt: default_trend_tilt(),
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `BOURSE_SERVER__PORT=8080` sets `server.port`
            .add_source(config::Environment::with_prefix("BOURSE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_sections_and_pricing_defaults() {
        let s = config::Config::builder()
            .add_source(config::File::from_str(
                "[server]\nport = 3000\n\n[kafka]\nbrokers = \"localhost:9092\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let cfg: Config = s.try_deserialize().unwrap();
        assert_eq!(cfg.server.port, 3000);
        assert!(cfg.database.is_none());
        assert!(cfg.redis.is_none());
        assert_eq!(cfg.kafka.unwrap().repriced_topic, "pricing.listing_repriced");
        assert_eq!(cfg.pricing.analysis_window_days, 30);
        assert_eq!(cfg.pricing.rate_limit_per_minute, 120);
    }
}
