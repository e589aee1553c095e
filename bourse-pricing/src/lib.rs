pub mod analysis;
pub mod engine;
pub mod optimizer;
pub mod rules;

pub use analysis::{MarketAnalysis, PriceStats};
pub use engine::{AppliedRule, BatchPricingReport, PriceComputation, PricingConfig, PricingEngine, PricingError};
pub use optimizer::PriceRecommendation;
pub use rules::PriceConstraints;
