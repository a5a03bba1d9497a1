use crate::cache::{CacheStore, SweepHandle};
use crate::config::{ClientConfig, DataClass};
use crate::coordinator::RequestCoordinator;
use crate::forecast::{Coordinates, ForecastService};
use crate::geocoding::GeocodingService;
use crate::limiter::ConcurrencyLimiter;
use crate::payload::Payload;
use crate::preferences::{self, PreferenceStore};
use common::errors::AppError;
use common::http_client::HttpClient;
use common::models::{CityCandidate, SavedCity, WeatherPayload};
use std::sync::Arc;
use tracing::info;

/// Entry point for UI event handlers
///
/// Owns one cache, one limiter and one coordinator shared by both services.
/// Each instance is independent, so tests can build a fresh one per case.
pub struct WeatherClient {
    config: ClientConfig,
    coordinator: Arc<RequestCoordinator<Payload>>,
    store: Arc<dyn PreferenceStore>,
    forecast: ForecastService,
    geocoding: GeocodingService,
}

impl WeatherClient {
    pub fn new(config: ClientConfig, store: Arc<dyn PreferenceStore>) -> Result<Self, AppError> {
        let http_client = Arc::new(HttpClient::new(
            config.request_timeout_secs,
            config.max_retries,
        )?);
        let limiter = Arc::new(ConcurrencyLimiter::with_queue_depth(
            config.max_concurrent_requests,
            config.max_queue_depth,
        ));
        let coordinator = Arc::new(RequestCoordinator::new(Arc::new(CacheStore::new()), limiter));
        let ttl = config.ttl_policy();

        let forecast = ForecastService::new(
            http_client.clone(),
            coordinator.clone(),
            store.clone(),
            config.weather_api_url.clone(),
            ttl.ttl(DataClass::Forecast),
        );
        let geocoding = GeocodingService::new(
            http_client,
            coordinator.clone(),
            config.geocoding_api_url.clone(),
            ttl.ttl(DataClass::Geocoding),
            config.geocoding_result_count,
        );

        Ok(Self {
            config,
            coordinator,
            store,
            forecast,
            geocoding,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Arc<RequestCoordinator<Payload>> {
        &self.coordinator
    }

    pub fn store(&self) -> &Arc<dyn PreferenceStore> {
        &self.store
    }

    pub fn forecast(&self) -> &ForecastService {
        &self.forecast
    }

    pub fn geocoding(&self) -> &GeocodingService {
        &self.geocoding
    }

    pub async fn get_weather_data(
        &self,
        coordinates: Option<Coordinates>,
    ) -> Result<Arc<WeatherPayload>, AppError> {
        self.forecast.get_weather_data(coordinates).await
    }

    pub async fn try_search_city(&self, name: &str) -> Result<Vec<CityCandidate>, AppError> {
        self.geocoding.try_search_city(name).await
    }

    pub async fn search_city(&self, name: &str) -> Vec<CityCandidate> {
        self.geocoding.search_city(name).await
    }

    /// Remember `city` as the fallback location and return its coordinates.
    pub fn select_city(&self, city: &CityCandidate) -> Coordinates {
        preferences::save_last_city(self.store.as_ref(), &SavedCity::from(city));
        Coordinates::new(city.latitude, city.longitude)
    }

    /// Start the hourly eviction of entries past the hard ceiling.
    ///
    /// Must be called from within a tokio runtime. Keep the handle alive for
    /// as long as maintenance should run.
    pub fn start_maintenance(&self) -> SweepHandle {
        let every = self.config.sweep_interval();
        let max_age = self.config.ttl_policy().hard_ceiling;
        info!(
            every_secs = every.as_secs(),
            max_age_secs = max_age.as_secs(),
            "Starting cache maintenance"
        );
        self.coordinator.cache().spawn_sweeper(every, max_age)
    }
}
