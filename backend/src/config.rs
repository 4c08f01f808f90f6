use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;
use crate::pipeline::resolver::Field;
use crate::pipeline::validator::Bounds;

pub const DEFAULT_SPOT_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart/XAGX-USD";
pub const DEFAULT_CONVERSION_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart/INR=X";
pub const DEFAULT_SECONDARY_URL: &str =
    "https://www.nseindia.com/api/quote-equity?symbol=SILVERBEES";

/// Grams per troy ounce as used for every derivation of this deployment.
///
/// The physical value is 31.1035; the published series has always been
/// derived with 31.3, so that stays the default. Changing it only affects
/// records appended afterwards.
pub const DEFAULT_UNIT_CONVERSION_CONSTANT: f64 = 31.3;

/// How often the scheduler starts a cycle.
pub const DEFAULT_SCRAPE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Number of records handed to charting consumers when they don't ask.
pub const DEFAULT_HISTORY_LIMIT: usize = 24;

/// What to do with an on-demand trigger that arrives while a cycle runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CyclePolicy {
    /// Reject the trigger with a busy signal.
    #[default]
    Coalesce,
    /// Wait for the in-flight cycle, then run a fresh one.
    Queue,
}

impl FromStr for CyclePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coalesce" => Ok(Self::Coalesce),
            "queue" => Ok(Self::Queue),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SourceConfig {
    pub url: String,

    /// Upper bound for one fetch, connect through body. A source that
    /// exceeds it counts as failed for the cycle; it is not retried.
    pub timeout: Duration,
}

/// Exclusive plausibility ranges, one per scraped or operator-supplied field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldBounds {
    /// USD per troy ounce. Silver has traded between ~14 and ~50 over the
    /// last decade; (10, 500) survives years of drift and still rejects page
    /// counters, years and other markup noise.
    pub spot: Bounds,

    /// INR per USD. Wide enough for a decade of depreciation, narrow enough
    /// to reject the inverse rate (~0.012) or a percentage.
    pub conversion: Bounds,

    /// INR per ETF unit.
    pub secondary: Bounds,

    /// INR per gram added on top of the derived price.
    pub margin: Bounds,
}

impl Default for FieldBounds {
    fn default() -> Self {
        Self {
            spot: Bounds::new(10.0, 500.0),
            conversion: Bounds::new(40.0, 200.0),
            secondary: Bounds::new(10.0, 1_000.0),
            margin: Bounds::new(-1_000.0, 1_000.0),
        }
    }
}

/// Last-resort values, only reached on the very first cycle or after total
/// loss of history.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldDefaults {
    /// Roughly where spot traded when the series started.
    pub spot: f64,

    /// Roughly where USD/INR traded when the series started.
    pub conversion: f64,

    /// Also the fixed margin when no margin file is configured.
    pub margin: f64,

    /// There is no sensible guess for the ETF, so it stays absent.
    pub secondary: Option<f64>,
}

impl Default for FieldDefaults {
    fn default() -> Self {
        Self {
            spot: 76.0,
            conversion: 83.5,
            margin: 2.0,
            secondary: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string.
    pub database_url: String,

    // =========================
    // Sources
    // =========================
    pub spot: SourceConfig,
    pub conversion: SourceConfig,
    pub secondary: SourceConfig,

    // =========================
    // Validation & fallback
    // =========================
    pub bounds: FieldBounds,
    pub defaults: FieldDefaults,

    // =========================
    // Derivation
    // =========================
    pub unit_conversion_constant: f64,

    /// Optional file holding the margin as a bare number. It is re-read on
    /// every cycle so operators can adjust it without a restart.
    pub margin_file: Option<PathBuf>,

    // =========================
    // Scheduling
    // =========================
    pub scrape_interval: Duration,
    pub cycle_policy: CyclePolicy,
    pub history_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://argentum.db?mode=rwc".to_string(),
            spot: SourceConfig {
                url: DEFAULT_SPOT_URL.to_string(),
                timeout: Duration::from_secs(15),
            },
            conversion: SourceConfig {
                url: DEFAULT_CONVERSION_URL.to_string(),
                timeout: Duration::from_secs(15),
            },
            secondary: SourceConfig {
                url: DEFAULT_SECONDARY_URL.to_string(),
                timeout: Duration::from_secs(10),
            },
            bounds: FieldBounds::default(),
            defaults: FieldDefaults::default(),
            unit_conversion_constant: DEFAULT_UNIT_CONVERSION_CONSTANT,
            margin_file: None,
            scrape_interval: DEFAULT_SCRAPE_INTERVAL,
            cycle_policy: CyclePolicy::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let d = Self::default();

        Self {
            database_url: env_or("DATABASE_URL", d.database_url),
            spot: SourceConfig {
                url: env_or("SPOT_URL", d.spot.url),
                timeout: env_secs("SPOT_TIMEOUT_SECS", d.spot.timeout),
            },
            conversion: SourceConfig {
                url: env_or("CONVERSION_URL", d.conversion.url),
                timeout: env_secs("CONVERSION_TIMEOUT_SECS", d.conversion.timeout),
            },
            secondary: SourceConfig {
                url: env_or("SECONDARY_URL", d.secondary.url),
                timeout: env_secs("SECONDARY_TIMEOUT_SECS", d.secondary.timeout),
            },
            bounds: FieldBounds {
                spot: env_bounds("SPOT", d.bounds.spot),
                conversion: env_bounds("CONVERSION", d.bounds.conversion),
                secondary: env_bounds("SECONDARY", d.bounds.secondary),
                margin: env_bounds("MARGIN", d.bounds.margin),
            },
            defaults: FieldDefaults {
                spot: env_or("DEFAULT_SPOT", d.defaults.spot),
                conversion: env_or("DEFAULT_CONVERSION", d.defaults.conversion),
                margin: env_or("DEFAULT_MARGIN", d.defaults.margin),
                secondary: parse_env("DEFAULT_SECONDARY").or(d.defaults.secondary),
            },
            unit_conversion_constant: env_or("UNIT_CONVERSION_CONSTANT", d.unit_conversion_constant),
            margin_file: std::env::var("MARGIN_FILE").ok().map(PathBuf::from),
            scrape_interval: env_secs("SCRAPE_INTERVAL_SECS", d.scrape_interval),
            cycle_policy: env_or("CYCLE_POLICY", d.cycle_policy),
            history_limit: env_or("HISTORY_LIMIT", d.history_limit),
        }
    }

    /// Rejects configurations that would make derivation meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = self.unit_conversion_constant;
        if !c.is_finite() || c <= 0.0 {
            return Err(ConfigError::InvalidUnitConstant(c));
        }

        for (field, b) in [
            (Field::SpotPrice, self.bounds.spot),
            (Field::ConversionRate, self.bounds.conversion),
            (Field::SecondaryPrice, self.bounds.secondary),
            (Field::Margin, self.bounds.margin),
        ] {
            if !(b.min < b.max) {
                return Err(ConfigError::InvalidBounds {
                    field,
                    min: b.min,
                    max: b.max,
                });
            }
        }

        for (name, src) in [
            ("spot", &self.spot),
            ("conversion", &self.conversion),
            ("secondary", &self.secondary),
        ] {
            if src.url.trim().is_empty() {
                return Err(ConfigError::EmptyUrl(name));
            }
            if src.timeout.is_zero() {
                return Err(ConfigError::ZeroTimeout(name));
            }
        }

        let d = &self.defaults;
        for (field, value) in [
            (Field::SpotPrice, Some(d.spot)),
            (Field::ConversionRate, Some(d.conversion)),
            (Field::Margin, Some(d.margin)),
            (Field::SecondaryPrice, d.secondary),
        ] {
            if let Some(value) = value.filter(|v| !v.is_finite()) {
                return Err(ConfigError::NonFiniteDefault { field, value });
            }
        }

        if self.scrape_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }

        Ok(())
    }
}

/// Parsed value of `key`, or `None` when unset or unparseable (logged).
fn parse_env<T>(key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(key, value = %raw, error = %e, "invalid config value; keeping default");
            None
        }
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    parse_env(key).unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    Duration::from_secs(env_or(key, default.as_secs()))
}

/// `<PREFIX>_MIN` / `<PREFIX>_MAX`, each falling back independently.
fn env_bounds(prefix: &str, default: Bounds) -> Bounds {
    Bounds::new(
        env_or(&format!("{prefix}_MIN"), default.min),
        env_or(&format!("{prefix}_MAX"), default.max),
    )
}
