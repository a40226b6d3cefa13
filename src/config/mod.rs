use rust_decimal::Decimal;
use std::env;

/// Thresholds and weights for the scoring pipeline.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Trades below this USD value score zero on size/impact and are not
    /// persisted.
    pub min_trade_value_usd: Decimal,
    /// Smallest price move (percent) that counts as impact.
    pub min_impact_pct: Decimal,
    /// How far around a trade to look for before/after prices.
    pub impact_window_secs: i64,
    pub alert_threshold: Decimal,
    pub weight_size_impact: Decimal,
    pub weight_account_history: Decimal,
    pub weight_conviction: Decimal,
    /// Account age at or below which the age sub-score maxes out.
    pub new_account_age_days: i64,
    /// Idle period above which dormancy starts scoring.
    pub dormancy_threshold_days: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_trade_value_usd: Decimal::from(1_000),
            min_impact_pct: Decimal::from(5),
            impact_window_secs: 3_600,
            alert_threshold: Decimal::from(70),
            weight_size_impact: Decimal::from(40),
            weight_account_history: Decimal::from(35),
            weight_conviction: Decimal::from(25),
            new_account_age_days: 30,
            dormancy_threshold_days: 30,
        }
    }
}

/// Thresholds for the behavioural tag classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub whale_value_usd: Decimal,
    pub sniper_min_score: Decimal,
    pub sniper_min_impact_pct: Decimal,
    pub dumping_min_impact_pct: Decimal,
    pub early_mover_hours: i64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            whale_value_usd: Decimal::from(50_000),
            sniper_min_score: Decimal::from(70),
            sniper_min_impact_pct: Decimal::from(10),
            dumping_min_impact_pct: Decimal::from(10),
            early_mover_hours: 48,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Upstream API overrides (None = production endpoints)
    pub data_api_url: Option<String>,
    pub gamma_api_url: Option<String>,
    pub clob_api_url: Option<String>,

    // Scan loop
    pub watch_markets: Vec<String>,
    pub scan_interval_secs: u64,
    pub scan_lookback_hours: i64,
    pub sync_ttl_minutes: i64,
    /// Upstream account lookups allowed per scan before the provider starts
    /// returning the skipped sentinel.
    pub account_lookup_budget: usize,

    pub scoring: ScoringConfig,
    pub classifier: ClassifierConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let markets_raw = env::var("WATCH_MARKETS").unwrap_or_default();
        let watch_markets: Vec<String> = markets_raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,

            data_api_url: env::var("DATA_API_URL").ok(),
            gamma_api_url: env::var("GAMMA_API_URL").ok(),
            clob_api_url: env::var("CLOB_API_URL").ok(),

            watch_markets,
            scan_interval_secs: env::var("SCAN_INTERVAL_SECS")
                .unwrap_or_else(|_| "300".into())
                .parse()?,
            scan_lookback_hours: env::var("SCAN_LOOKBACK_HOURS")
                .unwrap_or_else(|_| "24".into())
                .parse()?,
            sync_ttl_minutes: env::var("SYNC_TTL_MINUTES")
                .unwrap_or_else(|_| "30".into())
                .parse()?,
            account_lookup_budget: env::var("ACCOUNT_LOOKUP_BUDGET")
                .unwrap_or_else(|_| "50".into())
                .parse()?,

            scoring: ScoringConfig {
                min_trade_value_usd: env::var("MIN_TRADE_VALUE_USD")
                    .unwrap_or_else(|_| "1000".into())
                    .parse()?,
                min_impact_pct: env::var("MIN_IMPACT_PCT")
                    .unwrap_or_else(|_| "5".into())
                    .parse()?,
                impact_window_secs: env::var("IMPACT_WINDOW_SECS")
                    .unwrap_or_else(|_| "3600".into())
                    .parse()?,
                alert_threshold: env::var("ALERT_THRESHOLD")
                    .unwrap_or_else(|_| "70".into())
                    .parse()?,
                weight_size_impact: env::var("WEIGHT_SIZE_IMPACT")
                    .unwrap_or_else(|_| "40".into())
                    .parse()?,
                weight_account_history: env::var("WEIGHT_ACCOUNT_HISTORY")
                    .unwrap_or_else(|_| "35".into())
                    .parse()?,
                weight_conviction: env::var("WEIGHT_CONVICTION")
                    .unwrap_or_else(|_| "25".into())
                    .parse()?,
                new_account_age_days: env::var("NEW_ACCOUNT_AGE_DAYS")
                    .unwrap_or_else(|_| "30".into())
                    .parse()?,
                dormancy_threshold_days: env::var("DORMANCY_THRESHOLD_DAYS")
                    .unwrap_or_else(|_| "30".into())
                    .parse()?,
            },
            classifier: ClassifierConfig {
                whale_value_usd: env::var("WHALE_VALUE_USD")
                    .unwrap_or_else(|_| "50000".into())
                    .parse()?,
                sniper_min_score: env::var("SNIPER_MIN_SCORE")
                    .unwrap_or_else(|_| "70".into())
                    .parse()?,
                sniper_min_impact_pct: env::var("SNIPER_MIN_IMPACT_PCT")
                    .unwrap_or_else(|_| "10".into())
                    .parse()?,
                dumping_min_impact_pct: env::var("DUMPING_MIN_IMPACT_PCT")
                    .unwrap_or_else(|_| "10".into())
                    .parse()?,
                early_mover_hours: env::var("EARLY_MOVER_HOURS")
                    .unwrap_or_else(|_| "48".into())
                    .parse()?,
            },
        })
    }

    /// Reject configurations that would make scoring meaningless. Called once
    /// at startup; failures are fatal.
    pub fn validate(&self) -> anyhow::Result<()> {
        let s = &self.scoring;
        if s.weight_size_impact < Decimal::ZERO
            || s.weight_account_history < Decimal::ZERO
            || s.weight_conviction < Decimal::ZERO
        {
            anyhow::bail!("signal weights must be non-negative");
        }
        if s.weight_size_impact + s.weight_account_history + s.weight_conviction
            <= Decimal::ZERO
        {
            anyhow::bail!("signal weights must not all be zero");
        }
        if s.min_trade_value_usd <= Decimal::ZERO {
            anyhow::bail!("MIN_TRADE_VALUE_USD must be positive");
        }
        if s.min_impact_pct <= Decimal::ZERO {
            anyhow::bail!("MIN_IMPACT_PCT must be positive");
        }
        if s.alert_threshold < Decimal::ZERO || s.alert_threshold > Decimal::ONE_HUNDRED {
            anyhow::bail!("ALERT_THRESHOLD must be within [0, 100]");
        }
        if s.impact_window_secs <= 0 {
            anyhow::bail!("IMPACT_WINDOW_SECS must be positive");
        }
        if s.new_account_age_days <= 0 || s.dormancy_threshold_days <= 0 {
            anyhow::bail!("account age and dormancy thresholds must be positive");
        }
        let c = &self.classifier;
        if c.whale_value_usd <= Decimal::ZERO {
            anyhow::bail!("WHALE_VALUE_USD must be positive");
        }
        if c.early_mover_hours <= 0 {
            anyhow::bail!("EARLY_MOVER_HOURS must be positive");
        }
        if self.scan_lookback_hours <= 0 {
            anyhow::bail!("SCAN_LOOKBACK_HOURS must be positive");
        }
        if self.sync_ttl_minutes <= 0 {
            anyhow::bail!("SYNC_TTL_MINUTES must be positive");
        }
        Ok(())
    }
}
