// src/config.rs
use log::warn;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 3030;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_STATEMENT_BASE_URL: &str = "https://www.marketwatch.com/investing/stock";
pub const DEFAULT_QUOTE_BASE_URL: &str = "https://finance.yahoo.com/quote";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub symbols_path: PathBuf,
    /// Remote catalog in the same JSON shape; takes precedence over the file.
    pub symbols_url: Option<String>,
    pub snapshot_dir: PathBuf,
    pub fetch_timeout_secs: u64,
    pub statement_base_url: String,
    pub quote_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: DEFAULT_PORT,
            symbols_path: PathBuf::from("assets/symbols.json"),
            symbols_url: None,
            snapshot_dir: PathBuf::from("app/snapshots"),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            statement_base_url: DEFAULT_STATEMENT_BASE_URL.to_string(),
            quote_base_url: DEFAULT_QUOTE_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenv().ok()` first to pick up `.env`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();
        Config {
            port: parsed(&lookup, "PORT", defaults.port),
            symbols_path: lookup("SYMBOLS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.symbols_path),
            symbols_url: lookup("SYMBOLS_URL").filter(|url| !url.is_empty()),
            snapshot_dir: lookup("SNAPSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_dir),
            fetch_timeout_secs: parsed(&lookup, "FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs),
            statement_base_url: lookup("STATEMENT_BASE_URL").unwrap_or(defaults.statement_base_url),
            quote_base_url: lookup("QUOTE_BASE_URL").unwrap_or(defaults.quote_base_url),
        }
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("${} is not valid ({:?}), defaulting to {}", name, raw, default);
            default
        }),
        None => {
            warn!("${} not set, defaulting to {}", name, default);
            default
        }
    }
}
