//! Administrative write boundary for rules and regional fees.
//!
//! Field invariants run first, then the cross-rule checks against a fresh
//! read of the stored set, then the write. Mutations are serialized behind a
//! mutex so two concurrent writers cannot both pass validation against a
//! stale view and commit conflicting rules.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Conflict, Error, Result};
use crate::model::{City, RegionalFee, Vehicle};
use crate::repository::{RegionalFeeRepository, WeatherFeeRepository};
use crate::rule::{FieldViolation, RuleDraft, WeatherFeeRule};
use crate::validator;

pub struct RuleService {
    rules: Arc<dyn WeatherFeeRepository>,
    write_lock: Mutex<()>,
}

impl RuleService {
    pub fn new(rules: Arc<dyn WeatherFeeRepository>) -> Self {
        Self { rules, write_lock: Mutex::new(()) }
    }

    pub async fn list(&self) -> Result<Vec<WeatherFeeRule>> {
        self.rules.all().await
    }

    pub async fn get(&self, id: u64) -> Result<WeatherFeeRule> {
        self.rules.find(id).await?.ok_or(Error::RuleNotFound { id })
    }

    /// Validate and persist a new rule, returning it with its assigned id.
    pub async fn create(&self, draft: RuleDraft) -> Result<WeatherFeeRule> {
        let (vehicle, condition, fee) = draft.into_parts()?;

        let _guard = self.write_lock.lock().await;
        let existing = self.rules.for_vehicle(vehicle).await?;
        validator::check(vehicle, &condition, fee, &existing)?;

        let rule = self.rules.insert(vehicle, condition, fee).await?;
        debug!(id = rule.id, vehicle = %rule.vehicle, "weather fee rule created");
        Ok(rule)
    }

    /// Validate and persist an edit of an existing rule. The rule being
    /// edited is excluded from the conflict set, so re-saving it with a
    /// compatible change does not collide with its previous version.
    pub async fn update(&self, id: u64, draft: RuleDraft) -> Result<WeatherFeeRule> {
        let (vehicle, condition, fee) = draft.into_parts()?;

        let _guard = self.write_lock.lock().await;
        if self.rules.find(id).await?.is_none() {
            return Err(Error::RuleNotFound { id });
        }

        let existing: Vec<WeatherFeeRule> = self
            .rules
            .for_vehicle(vehicle)
            .await?
            .into_iter()
            .filter(|rule| rule.id != id)
            .collect();
        validator::check(vehicle, &condition, fee, &existing)?;

        let rule = WeatherFeeRule::new(id, vehicle, condition, fee);
        self.rules.replace(rule.clone()).await?;
        debug!(id, vehicle = %rule.vehicle, "weather fee rule updated");
        Ok(rule)
    }

    /// Deletion is unconditional; there is no soft-delete.
    pub async fn delete(&self, id: u64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if !self.rules.remove(id).await? {
            return Err(Error::RuleNotFound { id });
        }
        debug!(id, "weather fee rule deleted");
        Ok(())
    }
}

pub struct RegionalFeeService {
    fees: Arc<dyn RegionalFeeRepository>,
    write_lock: Mutex<()>,
}

impl RegionalFeeService {
    pub fn new(fees: Arc<dyn RegionalFeeRepository>) -> Self {
        Self { fees, write_lock: Mutex::new(()) }
    }

    pub async fn list(&self) -> Result<Vec<RegionalFee>> {
        self.fees.all().await
    }

    pub async fn get(&self, city: City, vehicle: Vehicle) -> Result<RegionalFee> {
        self.fees
            .find(city, vehicle)
            .await?
            .ok_or(Error::RegionalFeeNotFound { city, vehicle })
    }

    pub async fn create(&self, fee: RegionalFee) -> Result<RegionalFee> {
        check_fee_value(fee.fee)?;

        let _guard = self.write_lock.lock().await;
        if self.fees.exists(fee.city, fee.vehicle).await? {
            return Err(Error::Conflict(Conflict::DuplicateRegionalFee {
                city: fee.city,
                vehicle: fee.vehicle,
            }));
        }
        self.fees.insert(fee).await?;
        debug!(city = %fee.city, vehicle = %fee.vehicle, "regional fee created");
        Ok(fee)
    }

    /// Replace the entry at `(city, vehicle)`. The key is the identity: when
    /// the new value carries a different pair, uniqueness of the new key is
    /// re-checked and the old entry is removed.
    pub async fn update(&self, city: City, vehicle: Vehicle, fee: RegionalFee) -> Result<RegionalFee> {
        check_fee_value(fee.fee)?;

        let _guard = self.write_lock.lock().await;
        if !self.fees.exists(city, vehicle).await? {
            return Err(Error::RegionalFeeNotFound { city, vehicle });
        }

        let key_changed = (fee.city, fee.vehicle) != (city, vehicle);
        if key_changed && self.fees.exists(fee.city, fee.vehicle).await? {
            return Err(Error::Conflict(Conflict::DuplicateRegionalFee {
                city: fee.city,
                vehicle: fee.vehicle,
            }));
        }

        if key_changed {
            self.fees.remove(city, vehicle).await?;
        }
        self.fees.insert(fee).await?;
        debug!(city = %fee.city, vehicle = %fee.vehicle, "regional fee updated");
        Ok(fee)
    }

    pub async fn delete(&self, city: City, vehicle: Vehicle) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if !self.fees.remove(city, vehicle).await? {
            return Err(Error::RegionalFeeNotFound { city, vehicle });
        }
        debug!(city = %city, vehicle = %vehicle, "regional fee deleted");
        Ok(())
    }
}

fn check_fee_value(fee: f64) -> Result<()> {
    if fee < 0.0 {
        return Err(Error::InvalidRule(FieldViolation::NegativeFee));
    }
    Ok(())
}
