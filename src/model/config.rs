use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

const ENV_CONFIG_PATH: &str = "NEUTRALVIEW_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.openai.com/v1";

/// Claim analysis settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Model identifier sent to the provider
    pub model: String,
    /// Sampling temperature, kept low for stable scoring
    pub temperature: f32,
    /// Upper bound on a single provider call
    pub timeout_secs: u64,
    /// Retry once with a stricter prompt after malformed output
    pub strict_retry: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            strict_retry: false,
        }
    }
}

impl AnalysisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Text-generation provider endpoint settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
        }
    }
}

/// Price of a model in USD per 1K tokens
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ModelPrice {
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

impl ModelPrice {
    pub const fn new(prompt_per_1k: f64, completion_per_1k: f64) -> Self {
        Self {
            prompt_per_1k,
            completion_per_1k,
        }
    }

    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        (prompt_tokens as f64 * self.prompt_per_1k
            + completion_tokens as f64 * self.completion_per_1k)
            / 1000.0
    }
}

/// Per-model price table
#[derive(Debug, Clone)]
pub struct PricingConfig {
    models: HashMap<String, ModelPrice>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let models = [
            ("gpt-4", ModelPrice::new(0.03, 0.06)),
            ("gpt-4-32k", ModelPrice::new(0.06, 0.12)),
            ("gpt-4-turbo", ModelPrice::new(0.01, 0.03)),
            ("gpt-4o", ModelPrice::new(0.0025, 0.01)),
            ("gpt-4o-mini", ModelPrice::new(0.00015, 0.0006)),
            ("gpt-3.5-turbo", ModelPrice::new(0.0005, 0.0015)),
        ]
        .into_iter()
        .map(|(name, price)| (name.to_string(), price))
        .collect();

        Self { models }
    }
}

impl PricingConfig {
    /// Default table with entries from the config file taking precedence
    pub fn with_overrides(overrides: HashMap<String, ModelPrice>) -> Self {
        let mut pricing = Self::default();
        pricing.models.extend(overrides);
        pricing
    }

    /// Price for a model, falling back to the longest configured prefix
    /// (so dated snapshots like `gpt-4-0613` use the `gpt-4` price)
    pub fn price_for(&self, model: &str) -> Option<ModelPrice> {
        if let Some(price) = self.models.get(model) {
            return Some(*price);
        }

        self.models
            .iter()
            .filter(|(name, _)| model.starts_with(name.as_str()))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, price)| *price)
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub pricing: HashMap<String, ModelPrice>,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub provider: ProviderConfig,
    pub pricing: PricingConfig,
    pub port: u16,
    pub host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            provider: ProviderConfig::default(),
            pricing: PricingConfig::default(),
            port: 5000,
            host: "127.0.0.1".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let config_path = std::env::var(ENV_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let file = Self::load_config_file(&config_path).unwrap_or_default();

        Self {
            analysis: file.analysis,
            provider: file.provider,
            pricing: PricingConfig::with_overrides(file.pricing),
            port,
            host,
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                let contents = contents.trim();
                if contents.is_empty() {
                    tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
                    return Some(ConfigFile::default());
                }

                match Self::parse_config_file(contents) {
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "Loaded configuration from file");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config file, using defaults"
                        );
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read config file, using defaults"
                );
                None
            }
        }
    }

    fn parse_config_file(contents: &str) -> Result<ConfigFile, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_file_keeps_defaults() {
        let file = Config::parse_config_file(
            r#"
analysis:
  model: gpt-4o
  strict_retry: true
pricing:
  my-local-model:
    prompt_per_1k: 0.0
    completion_per_1k: 0.0
"#,
        )
        .unwrap();

        assert_eq!(file.analysis.model, "gpt-4o");
        assert!(file.analysis.strict_retry);
        assert_eq!(file.analysis.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(file.analysis.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(file.provider.base_url, DEFAULT_PROVIDER_BASE_URL);
        assert_eq!(file.pricing.len(), 1);
    }

    #[test]
    fn test_pricing_overrides_and_prefix_match() {
        let mut overrides = HashMap::new();
        overrides.insert("gpt-4".to_string(), ModelPrice::new(0.01, 0.02));
        let pricing = PricingConfig::with_overrides(overrides);

        assert_eq!(pricing.price_for("gpt-4"), Some(ModelPrice::new(0.01, 0.02)));
        // Dated snapshot falls back to its family price
        assert_eq!(pricing.price_for("gpt-4-0613"), Some(ModelPrice::new(0.01, 0.02)));
        // Longest prefix wins
        assert_eq!(
            pricing.price_for("gpt-4o-mini-2024-07-18"),
            Some(ModelPrice::new(0.00015, 0.0006))
        );
        assert_eq!(pricing.price_for("llama-3"), None);
    }

    #[test]
    fn test_model_price_cost() {
        let price = ModelPrice::new(0.03, 0.06);
        let cost = price.cost(1000, 500);
        assert!((cost - 0.06).abs() < 1e-12);
    }
}
