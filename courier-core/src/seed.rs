//! Default data set: the standard regional base fees and weather fee rules.
//!
//! Seeding only happens when both stores are empty, so restarting against a
//! populated backend never duplicates or resets administrative edits.

use tracing::info;

use crate::error::Result;
use crate::model::{City, RegionalFee, Vehicle};
use crate::repository::{RegionalFeeRepository, WeatherFeeRepository};
use crate::rule::{Condition, Range};

pub async fn seed_defaults(
    regional: &dyn RegionalFeeRepository,
    rules: &dyn WeatherFeeRepository,
) -> Result<()> {
    if !regional.is_empty().await? || !rules.is_empty().await? {
        return Ok(());
    }

    seed_regional_fees(regional).await?;
    seed_weather_rules(rules).await?;
    info!("seeded default regional fees and weather fee rules");
    Ok(())
}

async fn seed_regional_fees(regional: &dyn RegionalFeeRepository) -> Result<()> {
    let fees = [
        (City::Tallinn, Vehicle::Car, 4.0),
        (City::Tallinn, Vehicle::Scooter, 3.5),
        (City::Tallinn, Vehicle::Bike, 3.0),
        (City::Tartu, Vehicle::Car, 3.5),
        (City::Tartu, Vehicle::Scooter, 3.0),
        (City::Tartu, Vehicle::Bike, 2.5),
        (City::Parnu, Vehicle::Car, 3.0),
        (City::Parnu, Vehicle::Scooter, 2.5),
        (City::Parnu, Vehicle::Bike, 2.0),
    ];

    for (city, vehicle, fee) in fees {
        regional.insert(RegionalFee { city, vehicle, fee }).await?;
    }
    Ok(())
}

async fn seed_weather_rules(rules: &dyn WeatherFeeRepository) -> Result<()> {
    let cold = || Condition::AirTemperature(Range::new(None, Some(-10.0)));
    let chilly = || Condition::AirTemperature(Range::new(Some(-10.0), Some(0.0)));

    for vehicle in [Vehicle::Scooter, Vehicle::Bike] {
        rules.insert(vehicle, cold(), Some(1.0)).await?;
        rules.insert(vehicle, chilly(), Some(0.5)).await?;

        for phenomenon in ["snow", "sleet"] {
            rules.insert(vehicle, Condition::Phenomenon(phenomenon.to_string()), Some(1.0)).await?;
        }
        for phenomenon in ["rain", "shower"] {
            rules.insert(vehicle, Condition::Phenomenon(phenomenon.to_string()), Some(0.5)).await?;
        }
        for phenomenon in ["glaze", "hail", "thunder"] {
            rules.insert(vehicle, Condition::Phenomenon(phenomenon.to_string()), None).await?;
        }
    }

    rules
        .insert(Vehicle::Bike, Condition::WindSpeed(Range::new(Some(10.0), Some(20.0))), Some(0.5))
        .await?;
    rules.insert(Vehicle::Bike, Condition::WindSpeed(Range::new(Some(20.0), None)), None).await?;

    Ok(())
}
