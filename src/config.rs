#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub internal_api_key: String,
    pub recalc_interval_secs: u64,
    pub store_timeout_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            internal_api_key: std::env::var("INTERNAL_API_KEY")
                .unwrap_or_else(|_| "dev-internal-key".to_string()),
            recalc_interval_secs: std::env::var("RECALC_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(300),
            store_timeout_ms: std::env::var("STORE_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(2000),
        }
    }
}
