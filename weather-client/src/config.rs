use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com/v1/forecast";
const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub weather_api_url: String,
    pub geocoding_api_url: String,
    pub weather_ttl_seconds: u64,
    pub geocoding_ttl_seconds: u64,
    pub cache_max_age_seconds: u64,
    pub sweep_interval_seconds: u64,
    pub max_concurrent_requests: usize,
    pub max_queue_depth: Option<usize>,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub geocoding_result_count: usize,
    /// JSON file backing the persisted preferences of the binary.
    pub preferences_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            weather_api_url: DEFAULT_WEATHER_URL.to_string(),
            geocoding_api_url: DEFAULT_GEOCODING_URL.to_string(),
            weather_ttl_seconds: 15 * 60,
            geocoding_ttl_seconds: 24 * 60 * 60,
            cache_max_age_seconds: 24 * 60 * 60,
            sweep_interval_seconds: 60 * 60,
            max_concurrent_requests: 3,
            max_queue_depth: None,
            request_timeout_secs: 10,
            max_retries: 0,
            geocoding_result_count: 5,
            preferences_path: default_preferences_path(),
        }
    }
}

fn default_preferences_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("weather-dash").join("preferences.json"))
        .unwrap_or_else(|| PathBuf::from("weather-dash-preferences.json"))
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            weather_api_url: env::var("WEATHER_API_URL").unwrap_or(defaults.weather_api_url),
            geocoding_api_url: env::var("GEOCODING_API_URL").unwrap_or(defaults.geocoding_api_url),
            weather_ttl_seconds: parsed("WEATHER_TTL_SECONDS").unwrap_or(defaults.weather_ttl_seconds),
            geocoding_ttl_seconds: parsed("GEOCODING_TTL_SECONDS")
                .unwrap_or(defaults.geocoding_ttl_seconds),
            cache_max_age_seconds: parsed("CACHE_MAX_AGE_SECONDS")
                .unwrap_or(defaults.cache_max_age_seconds),
            sweep_interval_seconds: parsed("SWEEP_INTERVAL_SECONDS")
                .unwrap_or(defaults.sweep_interval_seconds),
            max_concurrent_requests: parsed("MAX_CONCURRENT_REQUESTS")
                .unwrap_or(defaults.max_concurrent_requests),
            max_queue_depth: parsed("MAX_QUEUE_DEPTH").or(defaults.max_queue_depth),
            request_timeout_secs: parsed("REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout_secs),
            max_retries: parsed("MAX_RETRIES").unwrap_or(defaults.max_retries),
            geocoding_result_count: parsed("GEOCODING_RESULT_COUNT")
                .unwrap_or(defaults.geocoding_result_count),
            preferences_path: env::var("PREFERENCES_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.preferences_path),
        }
    }

    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy {
            forecast: Duration::from_secs(self.weather_ttl_seconds),
            geocoding: Duration::from_secs(self.geocoding_ttl_seconds),
            hard_ceiling: Duration::from_secs(self.cache_max_age_seconds),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }
}

/// Cached data classes with their own freshness windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataClass {
    /// current, hourly and daily conditions
    Forecast,
    Geocoding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub forecast: Duration,
    pub geocoding: Duration,
    /// Age at which the sweep removes an entry regardless of class.
    pub hard_ceiling: Duration,
}

impl TtlPolicy {
    pub fn ttl(&self, class: DataClass) -> Duration {
        match class {
            DataClass::Forecast => self.forecast,
            DataClass::Geocoding => self.geocoding,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        ClientConfig::default().ttl_policy()
    }
}
