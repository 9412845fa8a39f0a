use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cities deliveries can be quoted for, each tied to the weather station
/// reporting for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum City {
    Tallinn,
    Tartu,
    Parnu,
}

impl City {
    pub fn as_str(&self) -> &'static str {
        match self {
            City::Tallinn => "tallinn",
            City::Tartu => "tartu",
            City::Parnu => "parnu",
        }
    }

    /// Name of the weather station observing this city in the feed.
    pub fn station(&self) -> &'static str {
        match self {
            City::Tallinn => "Tallinn-Harku",
            City::Tartu => "Tartu-Tõravere",
            City::Parnu => "Pärnu",
        }
    }

    /// Map a feed station name back to the city it reports for.
    pub fn from_station(station: &str) -> Option<City> {
        City::all().iter().copied().find(|city| city.station() == station)
    }

    pub const fn all() -> &'static [City] {
        &[City::Tallinn, City::Tartu, City::Parnu]
    }
}

impl std::fmt::Display for City {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for City {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "tallinn" => Ok(City::Tallinn),
            "tartu" => Ok(City::Tartu),
            "parnu" | "pärnu" => Ok(City::Parnu),
            _ => Err(anyhow::anyhow!(
                "Unknown city '{value}'. Supported cities: tallinn, tartu, parnu."
            )),
        }
    }
}

/// Vehicle types food can be delivered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vehicle {
    Car,
    Scooter,
    Bike,
}

impl Vehicle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vehicle::Car => "car",
            Vehicle::Scooter => "scooter",
            Vehicle::Bike => "bike",
        }
    }

    pub const fn all() -> &'static [Vehicle] {
        &[Vehicle::Car, Vehicle::Scooter, Vehicle::Bike]
    }
}

impl std::fmt::Display for Vehicle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Vehicle {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "car" => Ok(Vehicle::Car),
            "scooter" => Ok(Vehicle::Scooter),
            "bike" => Ok(Vehicle::Bike),
            _ => Err(anyhow::anyhow!(
                "Unknown vehicle '{value}'. Supported vehicles: car, scooter, bike."
            )),
        }
    }
}

/// Fixed base delivery charge for a (city, vehicle) pair. Unique per pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionalFee {
    pub city: City,
    pub vehicle: Vehicle,
    pub fee: f64,
}

/// A city's observed weather at one point in time.
///
/// Produced by the feed collector and immutable once stored; the engine only
/// ever reads the snapshot with the maximum timestamp for a city. The
/// phenomenon text is stored lowercase. Numeric values are absent when the
/// station did not report them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: City,
    /// Seconds since the Unix epoch, as reported by the feed document.
    pub timestamp: i64,
    pub air_temperature: Option<f64>,
    pub wind_speed: Option<f64>,
    pub phenomenon: Option<String>,
}

impl WeatherSnapshot {
    /// Observation time as a UTC datetime, if the timestamp is in range.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}
