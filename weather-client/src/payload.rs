use common::models::{CityCandidate, WeatherPayload};
use std::sync::Arc;

/// Decoded response body as held in the shared cache
///
/// Both data classes live in one store; the endpoint is part of every key,
/// so a key only ever maps to one variant.
#[derive(Debug, Clone)]
pub enum Payload {
    Forecast(Arc<WeatherPayload>),
    Cities(Arc<Vec<CityCandidate>>),
}
