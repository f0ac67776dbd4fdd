//! Layered configuration for the Velo simulator.
//!
//! Configuration is loaded in layers with increasing priority:
//! 1. Compiled-in defaults (two venues, conservative risk limits)
//! 2. TOML configuration file (if provided)
//! 3. Environment variable overrides (prefix `VELO_`, nested with `__`,
//!    e.g. `VELO_RISK_LIMITS__MAX_ORDER_SIZE=500`)
//!
//! After loading, [`SimConfig::validate`] enforces the structural
//! invariants the pipeline depends on (power-of-two queue sizes, venue
//! count bounds).

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::types::{Qty, VenueId};

// ── Default value functions ────────────────────────────────────────────

fn default_market_data_core() -> usize {
    2
}

fn default_order_book_core() -> usize {
    4
}

fn default_strategy_core() -> usize {
    6
}

fn default_execution_core() -> usize {
    8
}

fn default_monitoring_core() -> usize {
    10
}

/// Default queue capacity: 65 536 slots (power of two).
fn default_queue_size() -> usize {
    65_536
}

fn default_num_exchanges() -> usize {
    2
}

/// Default venue set: two simulated venues with different latency and
/// fill behavior.
fn default_exchanges() -> Vec<ExchangeConfig> {
    vec![
        ExchangeConfig {
            id: 0,
            name: "ALPHA".to_string(),
            latency_ns: 1_000,
            fill_probability: 0.95,
            enabled: true,
        },
        ExchangeConfig {
            id: 1,
            name: "BETA".to_string(),
            latency_ns: 1_500,
            fill_probability: 0.90,
            enabled: true,
        },
    ]
}

fn default_feed_rate() -> f64 {
    1_000_000.0
}

fn default_num_instruments() -> u32 {
    2
}

/// Default initial mid price: $150.00.
fn default_initial_price() -> f64 {
    150.0
}

fn default_volatility() -> f64 {
    0.001
}

fn default_simulation_duration_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_max_position_per_instrument() -> i64 {
    10_000
}

fn default_max_total_position() -> i64 {
    50_000
}

fn default_max_capital() -> f64 {
    10_000_000.0
}

fn default_max_order_size() -> Qty {
    1_000
}

fn default_max_orders_per_second() -> u32 {
    10_000
}

/// Fat-finger threshold: 5% deviation from the market price.
fn default_max_price_deviation_pct() -> f64 {
    5.0
}

/// Drawdown from peak P&L that trips the kill switch: 2%.
fn default_max_drawdown_pct() -> f64 {
    2.0
}

fn default_mm_spread_bps() -> f64 {
    10.0
}

fn default_mm_max_inventory() -> i64 {
    100
}

fn default_mm_order_size() -> Qty {
    10
}

fn default_pairs_lookback() -> usize {
    100
}

fn default_pairs_entry_z() -> f64 {
    2.0
}

fn default_pairs_exit_z() -> f64 {
    0.5
}

fn default_momentum_fast() -> usize {
    10
}

fn default_momentum_slow() -> usize {
    30
}

fn default_momentum_breakout_bps() -> f64 {
    5.0
}

// ── Configuration structs ──────────────────────────────────────────────

/// Per-venue simulator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    /// Venue identifier.
    pub id: VenueId,
    /// Human-readable venue name.
    pub name: String,
    /// Simulated one-way latency in nanoseconds.
    pub latency_ns: u64,
    /// Probability in [0, 1] that an order is accepted.
    pub fill_probability: f64,
    /// Whether the router may select this venue.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Pre-trade risk limits.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskLimits {
    /// Maximum absolute position per instrument.
    #[serde(default = "default_max_position_per_instrument")]
    pub max_position_per_instrument: i64,
    /// Maximum aggregate absolute position across instruments.
    #[serde(default = "default_max_total_position")]
    pub max_total_position: i64,
    /// Maximum capital deployed, in currency units.
    #[serde(default = "default_max_capital")]
    pub max_capital: f64,
    /// Maximum single order quantity.
    #[serde(default = "default_max_order_size")]
    pub max_order_size: Qty,
    /// Maximum orders per sliding one-second window.
    #[serde(default = "default_max_orders_per_second")]
    pub max_orders_per_second: u32,
    /// Fat-finger threshold as percent deviation from the market price.
    #[serde(default = "default_max_price_deviation_pct")]
    pub max_price_deviation_pct: f64,
    /// Drawdown from peak P&L (percent) that trips the kill switch.
    #[serde(default = "default_max_drawdown_pct")]
    pub max_drawdown_pct: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_per_instrument: default_max_position_per_instrument(),
            max_total_position: default_max_total_position(),
            max_capital: default_max_capital(),
            max_order_size: default_max_order_size(),
            max_orders_per_second: default_max_orders_per_second(),
            max_price_deviation_pct: default_max_price_deviation_pct(),
            max_drawdown_pct: default_max_drawdown_pct(),
        }
    }
}

/// Strategy parameter block.
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    /// Market maker base spread in basis points.
    #[serde(default = "default_mm_spread_bps")]
    pub market_maker_spread_bps: f64,
    /// Market maker maximum absolute inventory.
    #[serde(default = "default_mm_max_inventory")]
    pub market_maker_max_inventory: i64,
    /// Market maker quote size.
    #[serde(default = "default_mm_order_size")]
    pub market_maker_order_size: Qty,
    /// Pairs lookback window length.
    #[serde(default = "default_pairs_lookback")]
    pub pairs_lookback_window: usize,
    /// Pairs entry z-score threshold.
    #[serde(default = "default_pairs_entry_z")]
    pub pairs_entry_z: f64,
    /// Pairs exit z-score threshold.
    #[serde(default = "default_pairs_exit_z")]
    pub pairs_exit_z: f64,
    /// Momentum fast EMA window.
    #[serde(default = "default_momentum_fast")]
    pub momentum_fast_window: usize,
    /// Momentum slow EMA window.
    #[serde(default = "default_momentum_slow")]
    pub momentum_slow_window: usize,
    /// Momentum breakout threshold in basis points.
    #[serde(default = "default_momentum_breakout_bps")]
    pub momentum_breakout_bps: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            market_maker_spread_bps: default_mm_spread_bps(),
            market_maker_max_inventory: default_mm_max_inventory(),
            market_maker_order_size: default_mm_order_size(),
            pairs_lookback_window: default_pairs_lookback(),
            pairs_entry_z: default_pairs_entry_z(),
            pairs_exit_z: default_pairs_exit_z(),
            momentum_fast_window: default_momentum_fast(),
            momentum_slow_window: default_momentum_slow(),
            momentum_breakout_bps: default_momentum_breakout_bps(),
        }
    }
}

/// Top-level simulator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    // Core assignments; even-numbered by default to avoid SMT siblings.
    #[serde(default = "default_market_data_core")]
    pub market_data_core: usize,
    #[serde(default = "default_order_book_core")]
    pub order_book_core: usize,
    #[serde(default = "default_strategy_core")]
    pub strategy_core: usize,
    #[serde(default = "default_execution_core")]
    pub execution_core: usize,
    #[serde(default = "default_monitoring_core")]
    pub monitoring_core: usize,

    /// Market-data queue capacity (power of two).
    #[serde(default = "default_queue_size")]
    pub market_data_queue_size: usize,
    /// Order queue capacity (power of two).
    #[serde(default = "default_queue_size")]
    pub order_queue_size: usize,
    /// Execution-report queue capacity (power of two).
    #[serde(default = "default_queue_size")]
    pub execution_report_queue_size: usize,

    /// Number of venues to activate (at most [`MAX_CONFIG_EXCHANGES`]).
    #[serde(default = "default_num_exchanges")]
    pub num_exchanges: usize,
    /// Venue configurations; the first `num_exchanges` entries are used.
    #[serde(default = "default_exchanges")]
    pub exchanges: Vec<ExchangeConfig>,

    /// Pre-trade risk limits.
    #[serde(default)]
    pub risk_limits: RiskLimits,

    /// Target feed throughput in messages per second.
    #[serde(default = "default_feed_rate")]
    pub feed_rate_msgs_per_sec: f64,
    /// Number of instruments to simulate.
    #[serde(default = "default_num_instruments")]
    pub num_instruments: u32,
    /// Initial mid price in currency units.
    #[serde(default = "default_initial_price")]
    pub initial_price: f64,
    /// Per-tick random-walk volatility.
    #[serde(default = "default_volatility")]
    pub volatility: f64,

    /// Strategy parameters.
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Hard deadline for the main loop, in milliseconds.
    #[serde(default = "default_simulation_duration_ms")]
    pub simulation_duration_ms: u64,
}

/// Maximum number of venues that may be configured.
pub const MAX_CONFIG_EXCHANGES: usize = 4;

impl Default for SimConfig {
    fn default() -> Self {
        // An empty source yields pure compiled-in defaults; the expect is
        // safe because every field carries a serde default.
        Config::builder()
            .build()
            .and_then(|c| c.try_deserialize())
            .expect("compiled-in defaults must deserialize")
    }
}

impl SimConfig {
    /// Load configuration using layered sources.
    ///
    /// 1. Compiled-in defaults.
    /// 2. TOML file at `config_path` (if `Some`).
    /// 3. Environment variable overrides with prefix `VELO_` and `__` as
    ///    the nesting separator (e.g. `VELO_RISK_LIMITS__MAX_ORDER_SIZE=500`).
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            let path_str = path.to_str().context("config path is not valid UTF-8")?;
            builder = builder.add_source(File::with_name(path_str).required(true));
        }

        // The prefix separator must be set explicitly to `_` because the
        // `config` crate defaults it to the nesting separator when one is
        // provided.
        builder = builder.add_source(
            Environment::with_prefix("VELO")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: SimConfig = builder
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<()> {
        for (name, size) in [
            ("market_data_queue_size", self.market_data_queue_size),
            ("order_queue_size", self.order_queue_size),
            (
                "execution_report_queue_size",
                self.execution_report_queue_size,
            ),
        ] {
            if size < 2 || !size.is_power_of_two() {
                bail!("{name} must be a power of two >= 2, got {size}");
            }
        }

        if self.num_exchanges == 0 || self.num_exchanges > MAX_CONFIG_EXCHANGES {
            bail!(
                "num_exchanges must be in 1..={MAX_CONFIG_EXCHANGES}, got {}",
                self.num_exchanges
            );
        }
        if self.num_exchanges > self.exchanges.len() {
            bail!(
                "num_exchanges ({}) exceeds configured exchanges ({})",
                self.num_exchanges,
                self.exchanges.len()
            );
        }
        for ex in &self.exchanges {
            if !(0.0..=1.0).contains(&ex.fill_probability) {
                bail!(
                    "exchange {} fill_probability must be in [0, 1], got {}",
                    ex.name,
                    ex.fill_probability
                );
            }
        }

        if self.num_instruments == 0 {
            bail!("num_instruments must be > 0");
        }
        if self.initial_price <= 0.0 {
            bail!("initial_price must be positive");
        }
        if self.volatility < 0.0 {
            bail!("volatility must be non-negative");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    /// Serializes tests that manipulate environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn clear_env() {
        std::env::remove_var("VELO_NUM_EXCHANGES");
        std::env::remove_var("VELO_RISK_LIMITS__MAX_ORDER_SIZE");
        std::env::remove_var("VELO_SIMULATION_DURATION_MS");
    }

    /// Create a temporary TOML config file and return its path.
    fn write_temp_toml(content: &str) -> (tempfile::NamedTempFile, PathBuf) {
        let mut f = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("create temp file");
        write!(f, "{}", content).expect("write temp file");
        let path = f.path().to_path_buf();
        (f, path)
    }

    #[test]
    fn test_load_defaults_only() {
        let _lock = lock_env();
        clear_env();

        let cfg = SimConfig::load(None).expect("load defaults");
        assert_eq!(cfg.market_data_core, 2);
        assert_eq!(cfg.execution_core, 8);
        assert_eq!(cfg.market_data_queue_size, 65_536);
        assert_eq!(cfg.num_exchanges, 2);
        assert_eq!(cfg.exchanges.len(), 2);
        assert_eq!(cfg.exchanges[0].name, "ALPHA");
        assert_eq!(cfg.risk_limits.max_order_size, 1_000);
        assert_eq!(cfg.risk_limits.max_orders_per_second, 10_000);
        assert_eq!(cfg.strategy.momentum_slow_window, 30);
        assert_eq!(cfg.simulation_duration_ms, 10_000);
    }

    #[test]
    fn test_load_from_toml() {
        let _lock = lock_env();
        clear_env();

        let toml_content = r#"
num_exchanges = 1
simulation_duration_ms = 500
order_queue_size = 1024

[[exchanges]]
id = 0
name = "SOLO"
latency_ns = 750
fill_probability = 1.0

[risk_limits]
max_order_size = 50
max_drawdown_pct = 3.5

[strategy]
market_maker_spread_bps = 25.0
"#;
        let (_f, path) = write_temp_toml(toml_content);
        let cfg = SimConfig::load(Some(path)).expect("load from toml");

        assert_eq!(cfg.num_exchanges, 1);
        assert_eq!(cfg.simulation_duration_ms, 500);
        assert_eq!(cfg.order_queue_size, 1024);
        assert_eq!(cfg.exchanges.len(), 1);
        assert_eq!(cfg.exchanges[0].name, "SOLO");
        assert_eq!(cfg.risk_limits.max_order_size, 50);
        assert!((cfg.risk_limits.max_drawdown_pct - 3.5).abs() < 1e-12);
        assert!((cfg.strategy.market_maker_spread_bps - 25.0).abs() < 1e-12);
        // Untouched fields keep defaults.
        assert_eq!(cfg.market_data_queue_size, 65_536);
    }

    #[test]
    fn test_env_var_overrides() {
        let _lock = lock_env();
        clear_env();
        std::env::set_var("VELO_RISK_LIMITS__MAX_ORDER_SIZE", "250");

        let cfg = SimConfig::load(None).expect("load with env override");
        assert_eq!(cfg.risk_limits.max_order_size, 250);

        std::env::remove_var("VELO_RISK_LIMITS__MAX_ORDER_SIZE");
    }

    #[test]
    fn test_non_power_of_two_queue_rejected() {
        let _lock = lock_env();
        clear_env();

        let (_f, path) = write_temp_toml("market_data_queue_size = 1000\n");
        let err = SimConfig::load(Some(path)).unwrap_err();
        assert!(format!("{err}").contains("power of two"));
    }

    #[test]
    fn test_too_many_exchanges_rejected() {
        let _lock = lock_env();
        clear_env();

        let (_f, path) = write_temp_toml("num_exchanges = 5\n");
        let err = SimConfig::load(Some(path)).unwrap_err();
        assert!(format!("{err}").contains("num_exchanges"));
    }

    #[test]
    fn test_num_exchanges_exceeding_list_rejected() {
        let _lock = lock_env();
        clear_env();

        let (_f, path) = write_temp_toml("num_exchanges = 3\n");
        let err = SimConfig::load(Some(path)).unwrap_err();
        assert!(format!("{err}").contains("exceeds configured"));
    }

    #[test]
    fn test_bad_fill_probability_rejected() {
        let _lock = lock_env();
        clear_env();

        let toml_content = r#"
num_exchanges = 1

[[exchanges]]
id = 0
name = "BROKEN"
latency_ns = 100
fill_probability = 1.5
"#;
        let (_f, path) = write_temp_toml(toml_content);
        let err = SimConfig::load(Some(path)).unwrap_err();
        assert!(format!("{err}").contains("fill_probability"));
    }

    #[test]
    fn test_default_trait_matches_load() {
        let _lock = lock_env();
        clear_env();

        let a = SimConfig::default();
        let b = SimConfig::load(None).unwrap();
        assert_eq!(a.market_data_queue_size, b.market_data_queue_size);
        assert_eq!(a.risk_limits.max_order_size, b.risk_limits.max_order_size);
        assert_eq!(a.num_exchanges, b.num_exchanges);
    }
}
