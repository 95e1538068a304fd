use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub database_path: String,
    pub cors_origin: String,
    pub store: StoreConfig,
    pub scheduler: SchedulerConfig,
    pub session: SessionConfig,
    pub ingest: IngestConfig,
    pub request_deadline_secs: u64,
}

/// Connection-pool and pragma settings for the sqlite-backed [`crate::store::Store`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub pool_max_connections: u32,
    pub pool_acquire_timeout_secs: u64,
    pub slow_query_threshold_ms: u64,
    pub slow_query_window: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            pool_max_connections: 10,
            pool_acquire_timeout_secs: 5,
            slow_query_threshold_ms: 100,
            slow_query_window: 200,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub initial_easiness_factor: f64,
    pub min_easiness_factor: f64,
    pub max_interval_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_easiness_factor: 2.5,
            min_easiness_factor: 1.3,
            max_interval_days: 365,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub default_daily_minutes: u32,
    pub review_budget_fraction: f64,
    pub language_balance: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_daily_minutes: 30,
            review_budget_fraction: 0.2,
            language_balance: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_backoff_factor: f64,
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
    pub batch_size: usize,
    pub sources_path: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_attempts: 3,
            retry_initial_delay_ms: 500,
            retry_backoff_factor: 2.0,
            min_delay_secs: 1.0,
            max_delay_secs: 3.0,
            batch_size: 100,
            sources_path: "./config/sources.json".to_string(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("enable_file_logs", &self.enable_file_logs)
            .field("log_dir", &self.log_dir)
            .field("database_path", &self.database_path)
            .field("cors_origin", &self.cors_origin)
            .field("store", &self.store)
            .field("scheduler", &self.scheduler)
            .field("session", &self.session)
            .field("ingest", &self.ingest)
            .field("request_deadline_secs", &self.request_deadline_secs)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            database_path: normalized_db_path(&env_or("DATABASE_PATH", "./data/tutor.sqlite3")),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            store: StoreConfig {
                pool_max_connections: env_or_parse("STORE_POOL_MAX_CONNECTIONS", 10_u32),
                pool_acquire_timeout_secs: env_or_parse("STORE_POOL_ACQUIRE_TIMEOUT_SECS", 5_u64),
                slow_query_threshold_ms: env_or_parse("STORE_SLOW_QUERY_THRESHOLD_MS", 100_u64),
                slow_query_window: env_or_parse("STORE_SLOW_QUERY_WINDOW", 200_usize),
            },
            scheduler: SchedulerConfig {
                initial_easiness_factor: env_or_parse("SCHEDULER_INITIAL_EF", 2.5_f64),
                min_easiness_factor: env_or_parse("SCHEDULER_MIN_EF", 1.3_f64),
                max_interval_days: env_or_parse("SCHEDULER_MAX_INTERVAL_DAYS", 365_i64),
            },
            session: SessionConfig {
                default_daily_minutes: env_or_parse("SESSION_DEFAULT_DAILY_MINUTES", 30_u32),
                review_budget_fraction: env_or_parse("SESSION_REVIEW_BUDGET_FRACTION", 0.2_f64),
                language_balance: env_or_parse("SESSION_LANGUAGE_BALANCE", 0.5_f64),
            },
            ingest: IngestConfig {
                request_timeout_secs: env_or_parse("INGEST_REQUEST_TIMEOUT_SECS", 30_u64),
                max_attempts: env_or_parse("INGEST_MAX_ATTEMPTS", 3_u32),
                retry_initial_delay_ms: env_or_parse("INGEST_RETRY_INITIAL_DELAY_MS", 500_u64),
                retry_backoff_factor: env_or_parse("INGEST_RETRY_BACKOFF_FACTOR", 2.0_f64),
                min_delay_secs: env_or_parse("INGEST_MIN_DELAY_SECS", 1.0_f64),
                max_delay_secs: env_or_parse("INGEST_MAX_DELAY_SECS", 3.0_f64),
                batch_size: env_or_parse("INGEST_BATCH_SIZE", 100_usize),
                sources_path: env_or("INGEST_SOURCES_PATH", "./config/sources.json"),
            },
            request_deadline_secs: env_or_parse("REQUEST_DEADLINE_SECS", 10_u64),
        }
    }
}

fn normalized_db_path(raw: &str) -> String {
    let path = Path::new(raw);
    if path.is_absolute() {
        return path.to_string_lossy().to_string();
    }

    let project_root = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    project_root.join(path).to_string_lossy().to_string()
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Failed to parse env var, using default");
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn managed_keys() -> &'static [&'static str] {
        &[
            "HOST",
            "PORT",
            "RUST_LOG",
            "STORE_POOL_MAX_CONNECTIONS",
            "SESSION_DEFAULT_DAILY_MINUTES",
            "INGEST_MAX_ATTEMPTS",
        ]
    }

    fn clear_keys(keys: &[&str]) {
        for key in keys {
            env::remove_var(key);
        }
    }

    #[test]
    fn loads_defaults_when_missing() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.store.pool_max_connections, 10);
        assert_eq!(cfg.session.default_daily_minutes, 30);
    }

    #[test]
    fn parses_numeric_values() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "4000");
        env::set_var("STORE_POOL_MAX_CONNECTIONS", "25");
        env::set_var("INGEST_MAX_ATTEMPTS", "7");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.store.pool_max_connections, 25);
        assert_eq!(cfg.ingest.max_attempts, 7);
    }

    #[test]
    fn invalid_values_fall_back() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "bad");
        env::set_var("STORE_POOL_MAX_CONNECTIONS", "x");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.store.pool_max_connections, 10);
    }
}
