use crate::coordinator::RequestCoordinator;
use crate::payload::Payload;
use crate::preferences::{self, PreferenceStore};
use common::errors::AppError;
use common::http_client::HttpClient;
use common::models::WeatherPayload;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

pub const DAILY_FIELDS: &str = "temperature_2m_min,temperature_2m_max,weather_code,sunrise,sunset";
pub const HOURLY_FIELDS: &str = "temperature_2m,weather_code";
pub const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,precipitation,weather_code,wind_speed_10m,uv_index,is_day,visibility,pressure_msl";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    fn is_usable(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

pub struct ForecastService {
    http_client: Arc<HttpClient>,
    coordinator: Arc<RequestCoordinator<Payload>>,
    store: Arc<dyn PreferenceStore>,
    base_url: String,
    ttl: Duration,
}

impl ForecastService {
    pub fn new(
        http_client: Arc<HttpClient>,
        coordinator: Arc<RequestCoordinator<Payload>>,
        store: Arc<dyn PreferenceStore>,
        base_url: String,
        ttl: Duration,
    ) -> Self {
        Self {
            http_client,
            coordinator,
            store,
            base_url,
            ttl,
        }
    }

    /// Current, hourly and daily conditions for a location.
    ///
    /// Without usable coordinates the last selected city is used instead.
    /// Every failure comes back as an [`AppError`]; nothing panics or is
    /// retried here.
    #[instrument(skip(self))]
    pub async fn get_weather_data(
        &self,
        coordinates: Option<Coordinates>,
    ) -> Result<Arc<WeatherPayload>, AppError> {
        let coordinates = match coordinates.filter(Coordinates::is_usable) {
            Some(c) => c,
            None => self.fallback_location()?,
        };

        let params = [
            ("latitude", coordinates.latitude.to_string()),
            ("longitude", coordinates.longitude.to_string()),
            ("daily", DAILY_FIELDS.to_string()),
            ("hourly", HOURLY_FIELDS.to_string()),
            ("current", CURRENT_FIELDS.to_string()),
            ("timezone", "auto".to_string()),
        ];

        let http_client = self.http_client.clone();
        let result = self
            .coordinator
            .fetch_with_cache(&self.base_url, params, self.ttl, move |url: String| async move {
                info!(
                    latitude = coordinates.latitude,
                    longitude = coordinates.longitude,
                    "Fetching weather from API"
                );
                let weather: WeatherPayload = http_client.get_json(&url).await?;
                Ok::<_, AppError>(Payload::Forecast(Arc::new(weather)))
            })
            .await;

        match result {
            Ok(Payload::Forecast(weather)) => Ok(weather),
            Ok(Payload::Cities(_)) => Err(AppError::internal(
                "Forecast cache key resolved to a city list",
            )),
            Err(e) => {
                warn!(error = %e, "Weather fetch failed");
                Err(e)
            }
        }
    }

    fn fallback_location(&self) -> Result<Coordinates, AppError> {
        let city = preferences::last_city(self.store.as_ref()).ok_or(AppError::NoLocation)?;
        info!(city = %city.name, "No coordinates given, using last city");
        let coordinates = Coordinates::new(city.lat, city.lon);
        if coordinates.is_usable() {
            Ok(coordinates)
        } else {
            Err(AppError::NoLocation)
        }
    }
}
