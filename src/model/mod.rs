pub mod claims;
pub mod config;

pub use claims::{AnalysisResult, ClaimRecord, ClaimRequest, Icon, UsageMetrics};
pub use config::{AnalysisConfig, Config, ModelPrice, PricingConfig, ProviderConfig};
