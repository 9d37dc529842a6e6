use std::env;

/// Zerodha (Kite Connect) configuration.
#[derive(Debug, Clone)]
pub struct ZerodhaConfig {
    /// API key. Absent key selects fixture mode.
    pub api_key: Option<String>,
    /// API secret.
    pub api_secret: Option<String>,
    /// REST base URL.
    pub base_url: String,
}

impl Default for ZerodhaConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            base_url: "https://api.kite.trade".to_string(),
        }
    }
}

/// FYERS configuration.
#[derive(Debug, Clone)]
pub struct FyersConfig {
    /// App id. Absent id selects fixture mode.
    pub app_id: Option<String>,
    /// App secret, hashed together with the auth code during connect.
    pub app_secret: Option<String>,
    /// REST base URL.
    pub base_url: String,
}

impl Default for FyersConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            app_secret: None,
            base_url: "https://api.fyers.in/api/v2".to_string(),
        }
    }
}

/// Collateral pledge configuration.
#[derive(Debug, Clone)]
pub struct PledgeConfig {
    /// Haircut applied to symbols without a table entry.
    pub default_haircut: f64,
    /// Seed the workflow with the demo pledged holdings.
    pub seed_fixture_holdings: bool,
}

impl Default for PledgeConfig {
    fn default() -> Self {
        Self {
            default_haircut: 0.20,
            seed_fixture_holdings: false,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Zerodha adapter settings.
    pub zerodha: ZerodhaConfig,
    /// FYERS adapter settings.
    pub fyers: FyersConfig,
    /// Pledge workflow settings.
    pub pledge: PledgeConfig,
    /// Path to the trained margin-model artifact. Missing file degrades the
    /// engine to the rule strategy.
    pub model_path: String,
    /// Index whose daily change drives the rule strategy's index factor.
    pub primary_index: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zerodha: ZerodhaConfig::default(),
            fyers: FyersConfig::default(),
            pledge: PledgeConfig::default(),
            model_path: "models/margin_optimizer.json".to_string(),
            primary_index: "NIFTY".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            zerodha: ZerodhaConfig {
                api_key: env::var("ZERODHA_API_KEY").ok(),
                api_secret: env::var("ZERODHA_API_SECRET").ok(),
                base_url: env::var("ZERODHA_BASE_URL")
                    .unwrap_or_else(|_| "https://api.kite.trade".to_string()),
            },
            fyers: FyersConfig {
                app_id: env::var("FYERS_APP_ID").ok(),
                app_secret: env::var("FYERS_APP_SECRET").ok(),
                base_url: env::var("FYERS_BASE_URL")
                    .unwrap_or_else(|_| "https://api.fyers.in/api/v2".to_string()),
            },
            pledge: PledgeConfig {
                default_haircut: env::var("PLEDGE_DEFAULT_HAIRCUT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.20),
                seed_fixture_holdings: env::var("PLEDGE_SEED_FIXTURE")
                    .ok()
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(true),
            },
            model_path: env::var("MARGIN_MODEL_PATH")
                .unwrap_or_else(|_| "models/margin_optimizer.json".to_string()),
            primary_index: env::var("PRIMARY_INDEX").unwrap_or_else(|_| "NIFTY".to_string()),
        }
    }
}
