use common::models::WeatherPayload;
use common::tracing::init_tracing_pretty;
use std::sync::Arc;
use tracing::{error, info, warn};
use weather_client::preferences;
use weather_client::units::{UnitPreferences, UnitSystem};
use weather_client::{ClientConfig, FileStore, WeatherClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing_pretty();

    let config = ClientConfig::from_env();
    let store = Arc::new(FileStore::open(&config.preferences_path)?);
    info!(path = %store.path().display(), "Loaded preferences");
    let client = WeatherClient::new(config, store.clone())?;
    let _maintenance = client.start_maintenance();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    for (flag, system) in [("--imperial", UnitSystem::Imperial), ("--metric", UnitSystem::Metric)] {
        if let Some(pos) = args.iter().position(|a| a == flag) {
            args.remove(pos);
            preferences::save_unit_preferences(store.as_ref(), &UnitPreferences::for_system(system));
        }
    }
    let query = args.join(" ");

    let coordinates = if query.trim().is_empty() {
        if let Some(city) = preferences::last_city(store.as_ref()) {
            println!("Showing {}, {}", city.name, city.country);
        }
        None
    } else {
        let cities = client.try_search_city(&query).await?;
        let Some(city) = cities.first() else {
            warn!(query = %query, "No matching city");
            println!("No city matches \"{}\"", query);
            return Ok(());
        };
        for candidate in &cities {
            println!("  {}", candidate.display_name());
        }
        Some(client.select_city(city))
    };

    let weather = match client.get_weather_data(coordinates).await {
        Ok(weather) => weather,
        Err(e) => {
            error!(kind = ?e.kind(), error = %e, "Could not load weather");
            if e.is_retryable() {
                eprintln!("Could not reach the weather service, please try again.");
            }
            return Err(e.into());
        }
    };

    // A refresh within the TTL is answered from the cache.
    let refreshed = client.get_weather_data(coordinates).await?;
    info!(
        from_cache = Arc::ptr_eq(&weather, &refreshed),
        "Repeated forecast lookup"
    );

    print_weather(&weather, preferences::unit_preferences(store.as_ref()));
    Ok(())
}

fn print_weather(weather: &WeatherPayload, units: UnitPreferences) {
    let current = &weather.current;
    let temp = units.temperature;

    println!();
    println!(
        "{} {:.0}{} (feels like {:.0}{})",
        current.condition().description(),
        temp.convert(current.temperature_2m),
        temp.label(),
        temp.convert(current.apparent_temperature),
        temp.label(),
    );
    println!("Humidity {:.0}%", current.relative_humidity_2m);
    println!(
        "Wind {:.1} {}",
        units.wind_speed.convert(current.wind_speed_10m),
        units.wind_speed.label()
    );
    println!(
        "Precipitation {:.1} {}",
        units.precipitation.convert(current.precipitation),
        units.precipitation.label()
    );

    println!();
    for day in weather.daily.days() {
        println!(
            "{}  {:>4.0}{} / {:>4.0}{}  {}",
            day.date.format("%a %d %b"),
            temp.convert(day.low),
            temp.label(),
            temp.convert(day.high),
            temp.label(),
            day.condition.description(),
        );
    }
}
