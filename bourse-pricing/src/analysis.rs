use bourse_shared::{MarketSnapshot, TrendDirection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Relative move between series halves that counts as a trend
pub const TREND_THRESHOLD: f64 = 0.05;

/// Sample size at which confidence stops growing
const FULL_CONFIDENCE_SAMPLES: f64 = 10.0;

/// Round to two decimals (cents)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mean = mean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Percent change from `from` to `to`; zero when `from` is zero
pub fn percent_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        return 0.0;
    }
    (to - from) / from * 100.0
}

/// Classify a time-ordered series by comparing the mean of its first half
/// against the mean of its second half.
pub fn classify_trend(series: &[f64]) -> TrendDirection {
    match half_change(series) {
        Some(change) if change > TREND_THRESHOLD => TrendDirection::Rising,
        Some(change) if change < -TREND_THRESHOLD => TrendDirection::Falling,
        _ => TrendDirection::Stable,
    }
}

/// Relative change of the second half's mean over the first half's mean
fn half_change(series: &[f64]) -> Option<f64> {
    if series.len() < 2 {
        return None;
    }

    let (first, second) = series.split_at(series.len() / 2);
    let first_mean = mean(first);
    if first_mean == 0.0 {
        return None;
    }

    Some((mean(second) - first_mean) / first_mean)
}

/// Confidence in [0, 1] from how much data backs a figure and how noisy it is
pub fn confidence_score(sample_size: usize, volatility: f64) -> f64 {
    let coverage = (sample_size as f64 / FULL_CONFIDENCE_SAMPLES).min(1.0);
    let volatility = if volatility.is_finite() {
        volatility.clamp(0.0, 1.0)
    } else {
        1.0
    };

    round2(coverage * (1.0 - volatility * 0.5))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl PriceStats {
    pub fn from_prices(prices: &[f64]) -> Option<Self> {
        if prices.is_empty() {
            return None;
        }

        Some(Self {
            count: prices.len(),
            mean: round2(mean(prices)),
            median: round2(median(prices)),
            std_dev: round2(std_dev(prices)),
            min: prices.iter().copied().fold(f64::INFINITY, f64::min),
            max: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Market picture for one asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketAnalysis {
    pub asset_id: Uuid,
    pub latest_snapshot: Option<MarketSnapshot>,
    pub competitor_stats: Option<PriceStats>,
    /// Trend of the daily average price over the analysis window
    pub price_trend: TrendDirection,
    pub trend_change_percent: f64,
    pub snapshot_count: usize,
    pub confidence: f64,
}

/// Build the market picture from time-ordered snapshots and competitor prices
pub fn analyze(asset_id: Uuid, snapshots: &[MarketSnapshot], competitor_prices: &[f64]) -> MarketAnalysis {
    let series: Vec<f64> = snapshots.iter().map(|s| s.average_price).collect();
    let latest_snapshot = snapshots.last().cloned();

    let volatility = match &latest_snapshot {
        Some(snapshot) => snapshot.price_volatility,
        None => {
            // Coefficient of variation of competitor prices stands in
            let avg = mean(competitor_prices);
            if avg > 0.0 { std_dev(competitor_prices) / avg } else { 0.0 }
        }
    };

    MarketAnalysis {
        asset_id,
        competitor_stats: PriceStats::from_prices(competitor_prices),
        price_trend: classify_trend(&series),
        trend_change_percent: round2(half_change(&series).unwrap_or(0.0) * 100.0),
        snapshot_count: snapshots.len(),
        confidence: confidence_score(snapshots.len() + competitor_prices.len(), volatility),
        latest_snapshot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptive_stats() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

        assert_eq!(mean(&values), 5.0);
        assert_eq!(median(&values), 4.5);
        assert_eq!(std_dev(&values), 2.0);
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);

        assert_eq!(mean(&[]), 0.0);
        assert_eq!(median(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
    }

    #[test]
    fn test_trend_classification() {
        assert_eq!(classify_trend(&[100.0, 100.0, 110.0, 112.0]), TrendDirection::Rising);
        assert_eq!(classify_trend(&[100.0, 100.0, 90.0, 92.0]), TrendDirection::Falling);
        assert_eq!(classify_trend(&[100.0, 101.0, 102.0, 103.0]), TrendDirection::Stable);

        // Exactly 5% is not a trend
        assert_eq!(classify_trend(&[100.0, 105.0]), TrendDirection::Stable);

        // Too little data
        assert_eq!(classify_trend(&[100.0]), TrendDirection::Stable);
        assert_eq!(classify_trend(&[]), TrendDirection::Stable);
    }

    #[test]
    fn test_confidence_grows_with_samples_and_drops_with_volatility() {
        assert_eq!(confidence_score(0, 0.0), 0.0);
        assert_eq!(confidence_score(5, 0.0), 0.5);
        assert_eq!(confidence_score(20, 0.0), 1.0);
        assert_eq!(confidence_score(10, 1.0), 0.5);
        assert!(confidence_score(10, 0.2) > confidence_score(10, 0.6));
        assert_eq!(confidence_score(10, f64::NAN), 0.5);
    }

    #[test]
    fn test_price_stats() {
        let stats = PriceStats::from_prices(&[120.0, 80.0, 100.0]).unwrap();

        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean, 100.0);
        assert_eq!(stats.median, 100.0);
        assert_eq!(stats.min, 80.0);
        assert_eq!(stats.max, 120.0);
        assert!(PriceStats::from_prices(&[]).is_none());
    }
}
