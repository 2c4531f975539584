use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config::from_env()
});

#[derive(Debug, Clone)]
pub struct Config {
    pub max_positions: usize,
    pub max_pages: u32,
    pub ledger_path: String,
    pub export_dir: String,
    pub bind_addr: String,
    pub search_url: String,
    pub request_timeout_secs: u64,
    pub session_timeout_secs: u64,
    pub pace_min_secs: u64,
    pub pace_max_secs: u64,
    pub single_pace_min_secs: u64,
    pub single_pace_max_secs: u64,
    pub workers: usize,
}

impl Config {
    pub fn from_env() -> Config {
        Config {
            max_positions: get_env_parsed("RANKFINDER_MAX_POSITIONS", 100),
            max_pages: get_env_parsed("RANKFINDER_MAX_PAGES", 50),
            ledger_path: get_env_or_default("RANKFINDER_LEDGER_PATH", "rank_progress.csv"),
            export_dir: get_env_or_default("RANKFINDER_EXPORT_DIR", "."),
            bind_addr: get_env_or_default("RANKFINDER_BIND_ADDR", "127.0.0.1:5000"),
            search_url: get_env_or_default(
                "RANKFINDER_SEARCH_URL",
                "https://www.google.com/search?tbm=lcl",
            ),
            request_timeout_secs: get_env_parsed("RANKFINDER_REQUEST_TIMEOUT_SECS", 30),
            session_timeout_secs: get_env_parsed("RANKFINDER_SESSION_TIMEOUT_SECS", 600),
            pace_min_secs: get_env_parsed("RANKFINDER_PACE_MIN_SECS", 4),
            pace_max_secs: get_env_parsed("RANKFINDER_PACE_MAX_SECS", 8),
            single_pace_min_secs: get_env_parsed("RANKFINDER_SINGLE_PACE_MIN_SECS", 6),
            single_pace_max_secs: get_env_parsed("RANKFINDER_SINGLE_PACE_MAX_SECS", 10),
            workers: get_env_parsed("RANKFINDER_WORKERS", 1),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_parsed<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => parse_or_default(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_or_default<T>(key: &str, raw: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    raw.trim().parse().unwrap_or_else(|_| {
        log::warn!("{key}={raw:?} is not a valid value, using {default}");
        default
    })
}
