//! The weather-conditioned fee engine.
//!
//! A quote combines the fixed regional base fee for a (city, vehicle) pair
//! with a surcharge derived from the latest weather snapshot and the
//! vehicle's fee rules. A matching rule without a fee forbids the vehicle
//! outright.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{City, Vehicle, WeatherSnapshot};
use crate::repository::{RegionalFeeRepository, WeatherDataRepository, WeatherFeeRepository};
use crate::rule::{Category, Condition};

/// A successful fee computation, with the base/surcharge split retained for
/// display. `total` is rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quote {
    pub city: City,
    pub vehicle: Vehicle,
    pub regional_fee: f64,
    pub weather_fee: f64,
    pub total: f64,
}

/// Stateless quote computer over injected repositories. Safe to share and
/// call concurrently; every call reads its inputs as of call time.
#[derive(Clone)]
pub struct FeeEngine {
    regional: Arc<dyn RegionalFeeRepository>,
    rules: Arc<dyn WeatherFeeRepository>,
    weather: Arc<dyn WeatherDataRepository>,
}

impl FeeEngine {
    pub fn new(
        regional: Arc<dyn RegionalFeeRepository>,
        rules: Arc<dyn WeatherFeeRepository>,
        weather: Arc<dyn WeatherDataRepository>,
    ) -> Self {
        Self { regional, rules, weather }
    }

    /// Compute the delivery fee for a (city, vehicle) pair.
    ///
    /// Fails with [`Error::Unavailable`] when no regional fee exists for the
    /// pair, and with [`Error::Forbidden`] when an applicable rule has no
    /// fee. A missing snapshot means no surcharge, not an error.
    pub async fn quote(&self, city: City, vehicle: Vehicle) -> Result<Quote> {
        let regional = self
            .regional
            .find(city, vehicle)
            .await?
            .ok_or(Error::Unavailable { city, vehicle })?;

        let weather_fee = self.weather_fee(city, vehicle).await?;
        let total = round_to_cents(regional.fee + weather_fee);

        Ok(Quote { city, vehicle, regional_fee: regional.fee, weather_fee, total })
    }

    async fn weather_fee(&self, city: City, vehicle: Vehicle) -> Result<f64> {
        let Some(snapshot) = self.weather.latest(city).await? else {
            return Ok(0.0);
        };

        let rules = self.rules.for_vehicle(vehicle).await?;

        // Highest applicable fee per category, so one phenomenon text
        // matching several rules ("snow shower" hits both "snow" and
        // "shower") is charged once, not summed.
        let mut maxima = [0.0_f64; Category::all().len()];

        for rule in &rules {
            if !applies(&rule.condition, &snapshot) {
                continue;
            }
            match rule.fee {
                Some(fee) => {
                    let slot = &mut maxima[rule.category().index()];
                    *slot = slot.max(fee);
                }
                None => {
                    return Err(Error::Forbidden {
                        vehicle,
                        reason: condition_detail(rule.category(), &snapshot),
                    });
                }
            }
        }

        Ok(maxima.iter().sum())
    }
}

fn applies(condition: &Condition, snapshot: &WeatherSnapshot) -> bool {
    match condition {
        Condition::AirTemperature(range) => {
            snapshot.air_temperature.is_some_and(|value| range.contains(value))
        }
        Condition::WindSpeed(range) => {
            snapshot.wind_speed.is_some_and(|value| range.contains(value))
        }
        Condition::Phenomenon(needle) => snapshot
            .phenomenon
            .as_deref()
            .is_some_and(|text| text.to_lowercase().contains(needle.as_str())),
    }
}

/// Human-readable description of the observed value behind a forbidding
/// rule, e.g. "wind speed: 25.0 m/s".
fn condition_detail(category: Category, snapshot: &WeatherSnapshot) -> String {
    match category {
        Category::AirTemperature => {
            format!("air temperature: {:.1} °C", snapshot.air_temperature.unwrap_or_default())
        }
        Category::WindSpeed => {
            format!("wind speed: {:.1} m/s", snapshot.wind_speed.unwrap_or_default())
        }
        Category::Phenomenon => {
            format!("phenomenon: {}", snapshot.phenomenon.as_deref().unwrap_or_default())
        }
    }
}

/// Round half-up to two decimal places on the cent value.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
