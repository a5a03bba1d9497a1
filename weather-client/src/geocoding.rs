use crate::coordinator::RequestCoordinator;
use crate::payload::Payload;
use common::errors::AppError;
use common::http_client::HttpClient;
use common::models::{CityCandidate, GeocodingResponse};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

pub struct GeocodingService {
    http_client: Arc<HttpClient>,
    coordinator: Arc<RequestCoordinator<Payload>>,
    base_url: String,
    ttl: Duration,
    count: usize,
}

impl GeocodingService {
    pub fn new(
        http_client: Arc<HttpClient>,
        coordinator: Arc<RequestCoordinator<Payload>>,
        base_url: String,
        ttl: Duration,
        count: usize,
    ) -> Self {
        Self {
            http_client,
            coordinator,
            base_url,
            ttl,
            count: count.max(1),
        }
    }

    /// City candidates for a free-text name, at most `count` of them.
    ///
    /// A blank name matches nothing and makes no request.
    #[instrument(skip(self), fields(name = %name))]
    pub async fn try_search_city(&self, name: &str) -> Result<Vec<CityCandidate>, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(Vec::new());
        }

        let params = [("name", name.to_string()), ("count", self.count.to_string())];
        let http_client = self.http_client.clone();
        let count = self.count;

        let result = self
            .coordinator
            .fetch_with_cache(&self.base_url, params, self.ttl, move |url: String| async move {
                info!("Fetching city candidates from API");
                let response: GeocodingResponse = http_client.get_json(&url).await?;
                let mut cities = response.results;
                cities.truncate(count);
                Ok::<_, AppError>(Payload::Cities(Arc::new(cities)))
            })
            .await?;

        match result {
            Payload::Cities(cities) => Ok(Arc::unwrap_or_clone(cities)),
            Payload::Forecast(_) => Err(AppError::internal(
                "Geocoding cache key resolved to a forecast",
            )),
        }
    }

    /// Same as [`try_search_city`](Self::try_search_city), except that any
    /// failure yields an empty list. Callers cannot tell "no match" from
    /// "search failed".
    pub async fn search_city(&self, name: &str) -> Vec<CityCandidate> {
        match self.try_search_city(name).await {
            Ok(cities) => cities,
            Err(e) => {
                warn!(name = %name, error = %e, "City search failed");
                Vec::new()
            }
        }
    }
}
