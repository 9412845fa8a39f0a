use async_trait::async_trait;

use crate::error::Result;
use crate::model::{City, RegionalFee, Vehicle, WeatherSnapshot};
use crate::rule::{Condition, WeatherFeeRule};

pub mod memory;

/// Keyed store of base delivery fees, unique per (city, vehicle).
#[async_trait]
pub trait RegionalFeeRepository: Send + Sync {
    async fn find(&self, city: City, vehicle: Vehicle) -> Result<Option<RegionalFee>>;

    async fn all(&self) -> Result<Vec<RegionalFee>>;

    async fn exists(&self, city: City, vehicle: Vehicle) -> Result<bool>;

    async fn insert(&self, fee: RegionalFee) -> Result<()>;

    /// Remove the entry for the key; returns whether one existed.
    async fn remove(&self, city: City, vehicle: Vehicle) -> Result<bool>;

    async fn is_empty(&self) -> Result<bool>;
}

/// Store of weather fee rules, keyed by a store-assigned id.
#[async_trait]
pub trait WeatherFeeRepository: Send + Sync {
    async fn all(&self) -> Result<Vec<WeatherFeeRule>>;

    async fn find(&self, id: u64) -> Result<Option<WeatherFeeRule>>;

    /// All rules for a vehicle, across every category.
    async fn for_vehicle(&self, vehicle: Vehicle) -> Result<Vec<WeatherFeeRule>>;

    /// Persist a new rule, assigning its id.
    async fn insert(
        &self,
        vehicle: Vehicle,
        condition: Condition,
        fee: Option<f64>,
    ) -> Result<WeatherFeeRule>;

    /// Replace the rule with `rule.id`; returns whether it existed.
    async fn replace(&self, rule: WeatherFeeRule) -> Result<bool>;

    /// Remove the rule; returns whether it existed.
    async fn remove(&self, id: u64) -> Result<bool>;

    async fn is_empty(&self) -> Result<bool>;
}

/// Store of weather snapshots fed by the observations collector.
#[async_trait]
pub trait WeatherDataRepository: Send + Sync {
    /// The snapshot with the maximum timestamp for the city, if any.
    async fn latest(&self, city: City) -> Result<Option<WeatherSnapshot>>;

    async fn store_all(&self, snapshots: Vec<WeatherSnapshot>) -> Result<()>;
}
