use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub listen_port: u16,
    pub database_url: String,
    pub max_db_connections: u32,
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub redis_url: Option<String>,
    pub demo_mode: bool,
    pub log_dir: String,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub checkout: CheckoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Base URL of the hosted backend, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    pub service_key: String,
    pub function_name: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// plan id -> Gumroad product URL
    #[serde(default)]
    pub products: BTreeMap<String, String>,
}

impl AppConfig {
    /// Defaults, then `fincontract.toml` (or `FINCONTRACT_CONFIG`), then
    /// `FINCONTRACT_*` environment variables. `DATABASE_URL` is honoured as a default.
    pub fn load() -> Result<Self> {
        let file = std::env::var("FINCONTRACT_CONFIG").unwrap_or_else(|_| "fincontract".to_string());
        Self::from_sources(&file, Self::environment())
    }

    /// `FINCONTRACT_CORS_ORIGINS` takes a comma-separated list.
    fn environment() -> config::Environment {
        config::Environment::with_prefix("FINCONTRACT")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("cors_origins")
    }

    fn from_sources(file: &str, env: config::Environment) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("listen_port", 8080)?
            .set_default(
                "database_url",
                std::env::var("DATABASE_URL").unwrap_or_default(),
            )?
            .set_default("max_db_connections", 20)?
            .set_default("jwt_secret", "")?
            .set_default("jwt_audience", "authenticated")?
            .set_default("demo_mode", false)?
            .set_default("log_dir", ".")?
            .set_default("analysis.base_url", "")?
            .set_default("analysis.service_key", "")?
            .set_default("analysis.function_name", "legal-widgets")?
            .set_default("analysis.timeout_secs", 60)?
            .add_source(config::File::with_name(file).required(false))
            .add_source(env)
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            anyhow::bail!("database_url must be set (FINCONTRACT_DATABASE_URL or DATABASE_URL)");
        }
        if self.jwt_secret.trim().is_empty() {
            anyhow::bail!("jwt_secret must be set (FINCONTRACT_JWT_SECRET)");
        }
        if !self.demo_mode && self.analysis.base_url.trim().is_empty() {
            anyhow::bail!("analysis.base_url is required unless demo_mode is enabled");
        }
        if self.analysis.timeout_secs == 0 {
            anyhow::bail!("analysis.timeout_secs must be greater than 0");
        }
        for (plan, url) in &self.checkout.products {
            url::Url::parse(url)
                .with_context(|| format!("checkout product URL for plan '{}' is invalid", plan))?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub fn test_config() -> AppConfig {
    let mut products = BTreeMap::new();
    products.insert("premium".to_string(), "https://fincontract.gumroad.com/l/premium".to_string());
    products.insert("pro".to_string(), "https://fincontract.gumroad.com/l/pro".to_string());
    AppConfig {
        listen_port: 0,
        database_url: "postgres://localhost/fincontract_test".to_string(),
        max_db_connections: 1,
        jwt_secret: "test-secret".to_string(),
        jwt_audience: "authenticated".to_string(),
        redis_url: None,
        demo_mode: true,
        log_dir: ".".to_string(),
        cors_origins: Vec::new(),
        analysis: AnalysisConfig {
            base_url: String::new(),
            service_key: String::new(),
            function_name: "legal-widgets".to_string(),
            timeout_secs: 5,
        },
        checkout: CheckoutConfig { products },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_from(vars: &[(&str, &str)]) -> config::Environment {
        let vars: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::environment().source(Some(vars))
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("FINCONTRACT_DATABASE_URL", "postgres://localhost/fincontract"),
        ("FINCONTRACT_JWT_SECRET", "secret"),
        ("FINCONTRACT_DEMO_MODE", "true"),
    ];

    #[test]
    fn cors_origins_from_environment() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("FINCONTRACT_CORS_ORIGINS", "https://a.example,https://b.example"));
        let config = AppConfig::from_sources("fincontract-absent", env_from(&vars)).unwrap();
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert!(config.demo_mode);

        let mut vars = REQUIRED.to_vec();
        vars.push(("FINCONTRACT_CORS_ORIGINS", "https://a.example"));
        let config = AppConfig::from_sources("fincontract-absent", env_from(&vars)).unwrap();
        assert_eq!(config.cors_origins, vec!["https://a.example"]);
    }

    #[test]
    fn nested_keys_from_environment() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("FINCONTRACT_ANALYSIS__TIMEOUT_SECS", "15"));
        let config = AppConfig::from_sources("fincontract-absent", env_from(&vars)).unwrap();
        assert_eq!(config.analysis.timeout_secs, 15);
        assert_eq!(config.analysis.function_name, "legal-widgets");
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_config_is_valid() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn hosted_mode_requires_base_url() {
        let mut config = test_config();
        config.demo_mode = false;
        assert!(config.validate().is_err());
        config.analysis.base_url = "https://example.supabase.co".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_secret_is_rejected() {
        let mut config = test_config();
        config.jwt_secret = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_checkout_url_is_rejected() {
        let mut config = test_config();
        config
            .checkout
            .products
            .insert("broken".to_string(), "not a url".to_string());
        assert!(config.validate().is_err());
    }
}
