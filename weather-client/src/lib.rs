//! Caching and request-coordination layer in front of the Open-Meteo
//! forecast and geocoding APIs.

pub mod cache;
pub mod cache_key;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod forecast;
pub mod geocoding;
pub mod limiter;
pub mod payload;
pub mod preferences;
pub mod units;

pub use cache::{CacheStore, SweepHandle};
pub use client::WeatherClient;
pub use config::{ClientConfig, DataClass, TtlPolicy};
pub use coordinator::RequestCoordinator;
pub use forecast::{Coordinates, ForecastService};
pub use geocoding::GeocodingService;
pub use limiter::ConcurrencyLimiter;
pub use payload::Payload;
pub use preferences::{FileStore, MemoryStore, PreferenceStore};
