use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage_path: String,
    pub db_path: String,
    /// How many calendar days ahead the slot search scans.
    pub horizon_days: u32,
    /// Maximum number of slot candidates returned per search.
    pub max_candidates: usize,
    /// Days a finished event is kept before the sweeper purges it.
    pub event_retention_days: u32,
    /// Delay before the first retention sweep after process start.
    pub sweep_startup_delay_secs: u64,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for AppConfig {
    fn default() -> Self {
        let storage_path = env::var("RALLY_STORAGE_PATH").unwrap_or("./".to_string());
        let db_path = format!("{}/db", storage_path);

        Self {
            storage_path,
            db_path,
            horizon_days: env_parse("RALLY_HORIZON_DAYS", 90),
            max_candidates: env_parse("RALLY_MAX_CANDIDATES", 10),
            event_retention_days: env_parse("RALLY_EVENT_RETENTION_DAYS", 30),
            sweep_startup_delay_secs: env_parse("RALLY_SWEEP_STARTUP_DELAY_SECS", 30),
        }
    }
}
