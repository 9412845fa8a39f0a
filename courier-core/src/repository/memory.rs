//! In-memory repository implementations backed by `RwLock`ed maps.
//!
//! Lock scopes never span an await point; a poisoned lock surfaces as a
//! storage failure rather than a panic, matching the propagation policy for
//! the storage layer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::model::{City, RegionalFee, Vehicle, WeatherSnapshot};
use crate::repository::{RegionalFeeRepository, WeatherDataRepository, WeatherFeeRepository};
use crate::rule::{Condition, WeatherFeeRule};

fn poisoned() -> Error {
    Error::Storage("poisoned in-memory store lock".to_string())
}

#[derive(Debug, Default)]
pub struct MemoryRegionalFees {
    entries: RwLock<HashMap<(City, Vehicle), f64>>,
}

#[async_trait]
impl RegionalFeeRepository for MemoryRegionalFees {
    async fn find(&self, city: City, vehicle: Vehicle) -> Result<Option<RegionalFee>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(&(city, vehicle)).map(|&fee| RegionalFee { city, vehicle, fee }))
    }

    async fn all(&self) -> Result<Vec<RegionalFee>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        let mut fees: Vec<RegionalFee> = entries
            .iter()
            .map(|(&(city, vehicle), &fee)| RegionalFee { city, vehicle, fee })
            .collect();
        fees.sort_by_key(|fee| (fee.city.as_str(), fee.vehicle.as_str()));
        Ok(fees)
    }

    async fn exists(&self, city: City, vehicle: Vehicle) -> Result<bool> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.contains_key(&(city, vehicle)))
    }

    async fn insert(&self, fee: RegionalFee) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert((fee.city, fee.vehicle), fee.fee);
        Ok(())
    }

    async fn remove(&self, city: City, vehicle: Vehicle) -> Result<bool> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        Ok(entries.remove(&(city, vehicle)).is_some())
    }

    async fn is_empty(&self) -> Result<bool> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.is_empty())
    }
}

#[derive(Debug, Default)]
pub struct MemoryWeatherFees {
    next_id: AtomicU64,
    rules: RwLock<HashMap<u64, WeatherFeeRule>>,
}

#[async_trait]
impl WeatherFeeRepository for MemoryWeatherFees {
    async fn all(&self) -> Result<Vec<WeatherFeeRule>> {
        let rules = self.rules.read().map_err(|_| poisoned())?;
        let mut all: Vec<WeatherFeeRule> = rules.values().cloned().collect();
        all.sort_by_key(|rule| rule.id);
        Ok(all)
    }

    async fn find(&self, id: u64) -> Result<Option<WeatherFeeRule>> {
        let rules = self.rules.read().map_err(|_| poisoned())?;
        Ok(rules.get(&id).cloned())
    }

    async fn for_vehicle(&self, vehicle: Vehicle) -> Result<Vec<WeatherFeeRule>> {
        let rules = self.rules.read().map_err(|_| poisoned())?;
        let mut matching: Vec<WeatherFeeRule> =
            rules.values().filter(|rule| rule.vehicle == vehicle).cloned().collect();
        matching.sort_by_key(|rule| rule.id);
        Ok(matching)
    }

    async fn insert(
        &self,
        vehicle: Vehicle,
        condition: Condition,
        fee: Option<f64>,
    ) -> Result<WeatherFeeRule> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let rule = WeatherFeeRule::new(id, vehicle, condition, fee);
        let mut rules = self.rules.write().map_err(|_| poisoned())?;
        rules.insert(id, rule.clone());
        Ok(rule)
    }

    async fn replace(&self, rule: WeatherFeeRule) -> Result<bool> {
        let mut rules = self.rules.write().map_err(|_| poisoned())?;
        match rules.get_mut(&rule.id) {
            Some(stored) => {
                *stored = rule;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, id: u64) -> Result<bool> {
        let mut rules = self.rules.write().map_err(|_| poisoned())?;
        Ok(rules.remove(&id).is_some())
    }

    async fn is_empty(&self) -> Result<bool> {
        let rules = self.rules.read().map_err(|_| poisoned())?;
        Ok(rules.is_empty())
    }
}

#[derive(Debug, Default)]
pub struct MemoryWeatherData {
    snapshots: RwLock<Vec<WeatherSnapshot>>,
}

#[async_trait]
impl WeatherDataRepository for MemoryWeatherData {
    async fn latest(&self, city: City) -> Result<Option<WeatherSnapshot>> {
        let snapshots = self.snapshots.read().map_err(|_| poisoned())?;
        Ok(snapshots
            .iter()
            .filter(|snapshot| snapshot.city == city)
            .max_by_key(|snapshot| snapshot.timestamp)
            .cloned())
    }

    async fn store_all(&self, mut batch: Vec<WeatherSnapshot>) -> Result<()> {
        let mut snapshots = self.snapshots.write().map_err(|_| poisoned())?;
        snapshots.append(&mut batch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Range;

    #[tokio::test]
    async fn rule_roundtrip_is_field_identical() {
        let store = MemoryWeatherFees::default();
        let inserted = store
            .insert(
                Vehicle::Bike,
                Condition::WindSpeed(Range::new(Some(10.0), Some(20.0))),
                Some(0.5),
            )
            .await
            .unwrap();

        let loaded = store.find(inserted.id).await.unwrap().expect("rule should exist");
        assert_eq!(inserted, loaded);
    }

    #[tokio::test]
    async fn inserted_rules_get_distinct_ids() {
        let store = MemoryWeatherFees::default();
        let first = store
            .insert(Vehicle::Bike, Condition::Phenomenon("snow".to_string()), Some(1.0))
            .await
            .unwrap();
        let second = store
            .insert(Vehicle::Car, Condition::Phenomenon("hail".to_string()), None)
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn for_vehicle_filters_and_replace_updates_in_place() {
        let store = MemoryWeatherFees::default();
        let bike = store
            .insert(Vehicle::Bike, Condition::Phenomenon("snow".to_string()), Some(1.0))
            .await
            .unwrap();
        store
            .insert(Vehicle::Car, Condition::Phenomenon("snow".to_string()), Some(2.0))
            .await
            .unwrap();

        let mut updated = bike.clone();
        updated.fee = Some(1.5);
        assert!(store.replace(updated.clone()).await.unwrap());

        let bikes = store.for_vehicle(Vehicle::Bike).await.unwrap();
        assert_eq!(bikes, vec![updated]);
    }

    #[tokio::test]
    async fn replace_and_remove_report_missing_ids() {
        let store = MemoryWeatherFees::default();
        let ghost = WeatherFeeRule::new(
            42,
            Vehicle::Bike,
            Condition::Phenomenon("snow".to_string()),
            None,
        );

        assert!(!store.replace(ghost).await.unwrap());
        assert!(!store.remove(42).await.unwrap());
    }

    #[tokio::test]
    async fn regional_fee_key_is_unique_per_city_and_vehicle() {
        let store = MemoryRegionalFees::default();
        store
            .insert(RegionalFee { city: City::Tallinn, vehicle: Vehicle::Car, fee: 4.0 })
            .await
            .unwrap();
        store
            .insert(RegionalFee { city: City::Tallinn, vehicle: Vehicle::Car, fee: 4.5 })
            .await
            .unwrap();

        let found = store.find(City::Tallinn, Vehicle::Car).await.unwrap().unwrap();
        assert_eq!(found.fee, 4.5);
        assert_eq!(store.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn latest_snapshot_wins_by_timestamp() {
        let store = MemoryWeatherData::default();
        store
            .store_all(vec![
                WeatherSnapshot {
                    city: City::Tartu,
                    timestamp: 100,
                    air_temperature: Some(-3.0),
                    wind_speed: Some(4.0),
                    phenomenon: None,
                },
                WeatherSnapshot {
                    city: City::Tartu,
                    timestamp: 200,
                    air_temperature: Some(-5.0),
                    wind_speed: Some(6.0),
                    phenomenon: Some("light snow".to_string()),
                },
                WeatherSnapshot {
                    city: City::Tallinn,
                    timestamp: 300,
                    air_temperature: Some(1.0),
                    wind_speed: Some(2.0),
                    phenomenon: None,
                },
            ])
            .await
            .unwrap();

        let latest = store.latest(City::Tartu).await.unwrap().unwrap();
        assert_eq!(latest.timestamp, 200);
        assert_eq!(latest.phenomenon.as_deref(), Some("light snow"));

        assert!(store.latest(City::Parnu).await.unwrap().is_none());
    }
}
