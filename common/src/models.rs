use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Forecast response from the weather endpoint
///
/// `hourly` and `daily` are struct-of-arrays: every vector is indexed by the
/// same time step as its `time` vector.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherPayload {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub timezone: Option<String>,
    pub current: CurrentConditions,
    pub hourly: HourlySeries,
    pub daily: DailySeries,
}

/// Current conditions, all values in metric units
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CurrentConditions {
    pub time: String,
    pub temperature_2m: f64,
    pub relative_humidity_2m: f64,
    pub apparent_temperature: f64,
    pub precipitation: f64,
    pub weather_code: u32,
    pub wind_speed_10m: f64,
    #[serde(default)]
    pub uv_index: Option<f64>,
    #[serde(default)]
    pub is_day: Option<u8>,
    #[serde(default)]
    pub visibility: Option<f64>,
    #[serde(default)]
    pub pressure_msl: Option<f64>,
}

impl CurrentConditions {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_wmo_code(self.weather_code)
    }

    pub fn is_daytime(&self) -> bool {
        self.is_day.map(|d| d != 0).unwrap_or(true)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct HourlySeries {
    pub time: Vec<String>,
    pub temperature_2m: Vec<f64>,
    pub weather_code: Vec<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct DailySeries {
    pub time: Vec<String>,
    pub temperature_2m_min: Vec<f64>,
    pub temperature_2m_max: Vec<f64>,
    pub weather_code: Vec<u32>,
    #[serde(default)]
    pub sunrise: Vec<String>,
    #[serde(default)]
    pub sunset: Vec<String>,
}

/// One hour of the hourly series
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyPoint {
    pub time: NaiveDateTime,
    pub temperature: f64,
    pub condition: WeatherCondition,
}

/// One day of the daily series
#[derive(Debug, Clone, PartialEq)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub low: f64,
    pub high: f64,
    pub condition: WeatherCondition,
    pub sunrise: Option<NaiveDateTime>,
    pub sunset: Option<NaiveDateTime>,
}

const LOCAL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

fn parse_local_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, LOCAL_TIME_FORMAT).ok()
}

impl HourlySeries {
    /// Zip the parallel arrays into rows. Steps with an unparsable timestamp
    /// are skipped; arrays of unequal length truncate to the shortest.
    pub fn points(&self) -> Vec<HourlyPoint> {
        self.time
            .iter()
            .zip(&self.temperature_2m)
            .zip(&self.weather_code)
            .filter_map(|((time, temperature), code)| {
                Some(HourlyPoint {
                    time: parse_local_time(time)?,
                    temperature: *temperature,
                    condition: WeatherCondition::from_wmo_code(*code),
                })
            })
            .collect()
    }
}

impl DailySeries {
    pub fn days(&self) -> Vec<DayForecast> {
        self.time
            .iter()
            .zip(&self.temperature_2m_min)
            .zip(&self.temperature_2m_max)
            .zip(&self.weather_code)
            .enumerate()
            .filter_map(|(idx, (((date, low), high), code))| {
                Some(DayForecast {
                    date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?,
                    low: *low,
                    high: *high,
                    condition: WeatherCondition::from_wmo_code(*code),
                    sunrise: self.sunrise.get(idx).and_then(|s| parse_local_time(s)),
                    sunset: self.sunset.get(idx).and_then(|s| parse_local_time(s)),
                })
            })
            .collect()
    }
}

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Overcast,
    Fog,
    Drizzle,
    Rain,
    Snow,
    RainShowers,
    SnowShowers,
    Thunderstorm,
    ThunderstormWithHail,
    Unknown,
}

impl WeatherCondition {
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: u32) -> Self {
        match code {
            0 => Self::Clear,
            1 | 2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 | 48 => Self::Fog,
            51 | 53 | 55 | 56 | 57 => Self::Drizzle,
            61 | 63 | 65 | 66 | 67 => Self::Rain,
            71 | 73 | 75 | 77 => Self::Snow,
            80..=82 => Self::RainShowers,
            85 | 86 => Self::SnowShowers,
            95 => Self::Thunderstorm,
            96 | 99 => Self::ThunderstormWithHail,
            _ => Self::Unknown,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear sky",
            Self::PartlyCloudy => "Partly cloudy",
            Self::Overcast => "Overcast",
            Self::Fog => "Foggy",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::Snow => "Snow",
            Self::RainShowers => "Rain showers",
            Self::SnowShowers => "Snow showers",
            Self::Thunderstorm => "Thunderstorm",
            Self::ThunderstormWithHail => "Thunderstorm with hail",
            Self::Unknown => "Unknown",
        }
    }
}

/// City candidate returned by the geocoding endpoint
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CityCandidate {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub admin1: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl CityCandidate {
    /// "Berlin, Land Berlin, Germany" style label for dropdowns
    pub fn display_name(&self) -> String {
        let mut parts = vec![self.name.as_str()];
        if let Some(admin1) = self.admin1.as_deref()
            && !admin1.is_empty()
            && admin1 != self.name
        {
            parts.push(admin1);
        }
        if !self.country.is_empty() {
            parts.push(&self.country);
        }
        parts.join(", ")
    }
}

/// Geocoding endpoint envelope; `results` is omitted when nothing matches
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct GeocodingResponse {
    #[serde(default)]
    pub results: Vec<CityCandidate>,
}

/// Last selected city as persisted by the display layer
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SavedCity {
    pub name: String,
    #[serde(default)]
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl From<&CityCandidate> for SavedCity {
    fn from(city: &CityCandidate) -> Self {
        Self {
            name: city.name.clone(),
            country: city.country.clone(),
            lat: city.latitude,
            lon: city.longitude,
        }
    }
}
