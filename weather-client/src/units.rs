//! Display-unit conversion from the canonical metric values the API returns.
//!
//! No rounding happens here; formatting is left to the display layer.

use serde::{Deserialize, Serialize};

const KMH_TO_MPH: f64 = 0.621371;
const MM_TO_INCHES: f64 = 0.0393701;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WindSpeedUnit {
    #[default]
    Kmh,
    Mph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PrecipitationUnit {
    #[default]
    Mm,
    Inches,
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

pub fn kmh_to_mph(kmh: f64) -> f64 {
    kmh * KMH_TO_MPH
}

pub fn mph_to_kmh(mph: f64) -> f64 {
    mph / KMH_TO_MPH
}

pub fn mm_to_inches(mm: f64) -> f64 {
    mm * MM_TO_INCHES
}

pub fn inches_to_mm(inches: f64) -> f64 {
    inches / MM_TO_INCHES
}

impl TemperatureUnit {
    pub fn convert(self, celsius: f64) -> f64 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius_to_fahrenheit(celsius),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }
}

impl WindSpeedUnit {
    pub fn convert(self, kmh: f64) -> f64 {
        match self {
            Self::Kmh => kmh,
            Self::Mph => kmh_to_mph(kmh),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Kmh => "km/h",
            Self::Mph => "mph",
        }
    }
}

impl PrecipitationUnit {
    pub fn convert(self, mm: f64) -> f64 {
        match self {
            Self::Mm => mm,
            Self::Inches => mm_to_inches(mm),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Mm => "mm",
            Self::Inches => "in",
        }
    }
}

/// Unit choices as persisted under the `units` preference key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UnitPreferences {
    pub system: UnitSystem,
    pub temperature: TemperatureUnit,
    pub wind_speed: WindSpeedUnit,
    pub precipitation: PrecipitationUnit,
}

impl UnitPreferences {
    pub fn for_system(system: UnitSystem) -> Self {
        match system {
            UnitSystem::Metric => Self::default(),
            UnitSystem::Imperial => Self {
                system,
                temperature: TemperatureUnit::Fahrenheit,
                wind_speed: WindSpeedUnit::Mph,
                precipitation: PrecipitationUnit::Inches,
            },
        }
    }

    /// Flip metric/imperial, resetting every unit to the new system's default.
    pub fn toggle_system(self) -> Self {
        match self.system {
            UnitSystem::Metric => Self::for_system(UnitSystem::Imperial),
            UnitSystem::Imperial => Self::for_system(UnitSystem::Metric),
        }
    }

    pub fn with_temperature(self, temperature: TemperatureUnit) -> Self {
        Self { temperature, ..self }
    }

    pub fn with_wind_speed(self, wind_speed: WindSpeedUnit) -> Self {
        Self { wind_speed, ..self }
    }

    pub fn with_precipitation(self, precipitation: PrecipitationUnit) -> Self {
        Self {
            precipitation,
            ..self
        }
    }
}
