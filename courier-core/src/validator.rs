//! Cross-rule conflict checks run at rule creation/update time.
//!
//! These keep the rule set internally consistent so the engine never has to
//! resolve contradictions at quote time: no two rules of the same
//! (vehicle, category) may cover overlapping numeric ranges, and no
//! phenomenon rule may be unreachable because a broader match already
//! charges at least as much.

use crate::error::Conflict;
use crate::model::Vehicle;
use crate::rule::{Condition, WeatherFeeRule};

/// Decide whether a candidate rule may be persisted next to `existing`.
///
/// `existing` is the current rule set as of call time; when validating an
/// update the edited rule itself must not be part of it. The checks are
/// independent and the first failure is returned, naming the colliding
/// rule's id.
pub fn check(
    vehicle: Vehicle,
    condition: &Condition,
    fee: Option<f64>,
    existing: &[WeatherFeeRule],
) -> Result<(), Conflict> {
    match condition {
        Condition::Phenomenon(needle) => check_phenomenon(vehicle, needle, fee, existing),
        Condition::AirTemperature(range) | Condition::WindSpeed(range) => {
            let category = condition.category();
            for rule in existing {
                if rule.vehicle != vehicle || rule.category() != category {
                    continue;
                }
                let Some(held) = rule.condition.range() else {
                    continue;
                };
                if range.overlaps(held) {
                    return Err(Conflict::OverlappingRange { id: rule.id });
                }
            }
            Ok(())
        }
    }
}

fn check_phenomenon(
    vehicle: Vehicle,
    needle: &str,
    fee: Option<f64>,
    existing: &[WeatherFeeRule],
) -> Result<(), Conflict> {
    let candidate_fee = fee.unwrap_or(f64::INFINITY);

    for rule in existing {
        if rule.vehicle != vehicle {
            continue;
        }
        let Some(held) = rule.condition.phenomenon() else {
            continue;
        };

        if held == needle {
            return Err(Conflict::DuplicatePhenomenon { id: rule.id });
        }

        // A broader match charging at least as much makes the candidate
        // unreachable: "rain" at 1.0 shadows "heavy rain" at 0.5.
        if needle.contains(held) && rule.fee_or_infinite() >= candidate_fee {
            return Err(Conflict::ShadowedPhenomenon { id: rule.id });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Range;

    fn ranged(id: u64, vehicle: Vehicle, above: Option<f64>, below: Option<f64>) -> WeatherFeeRule {
        WeatherFeeRule::new(
            id,
            vehicle,
            Condition::WindSpeed(Range::new(above, below)),
            Some(0.5),
        )
    }

    fn phenom(id: u64, vehicle: Vehicle, text: &str, fee: Option<f64>) -> WeatherFeeRule {
        WeatherFeeRule::new(id, vehicle, Condition::Phenomenon(text.to_string()), fee)
    }

    #[test]
    fn overlapping_ranges_conflict() {
        let existing = vec![ranged(7, Vehicle::Car, Some(20.0), Some(30.0))];
        let candidate = Condition::WindSpeed(Range::new(Some(15.0), Some(25.0)));

        let err = check(Vehicle::Car, &candidate, Some(1.0), &existing).unwrap_err();
        assert_eq!(err, Conflict::OverlappingRange { id: 7 });
    }

    #[test]
    fn overlap_rejection_is_symmetric() {
        let a = Range::new(Some(15.0), Some(25.0));
        let b = Range::new(Some(20.0), Some(30.0));

        let with_b = vec![ranged(1, Vehicle::Car, b.above, b.below)];
        let with_a = vec![ranged(2, Vehicle::Car, a.above, a.below)];

        assert!(check(Vehicle::Car, &Condition::WindSpeed(a), Some(1.0), &with_b).is_err());
        assert!(check(Vehicle::Car, &Condition::WindSpeed(b), Some(1.0), &with_a).is_err());
    }

    #[test]
    fn touching_ranges_do_not_conflict() {
        let existing = vec![ranged(1, Vehicle::Bike, Some(10.0), Some(20.0))];
        let candidate = Condition::WindSpeed(Range::new(Some(20.0), None));

        assert!(check(Vehicle::Bike, &candidate, None, &existing).is_ok());
    }

    #[test]
    fn open_ended_ranges_overlap_when_they_cross() {
        let existing = vec![ranged(3, Vehicle::Bike, Some(10.0), None)];
        let candidate = Condition::WindSpeed(Range::new(None, Some(15.0)));

        let err = check(Vehicle::Bike, &candidate, Some(0.5), &existing).unwrap_err();
        assert_eq!(err, Conflict::OverlappingRange { id: 3 });
    }

    #[test]
    fn ranges_of_other_vehicles_or_categories_are_ignored() {
        let existing = vec![
            ranged(1, Vehicle::Car, Some(0.0), Some(100.0)),
            WeatherFeeRule::new(
                2,
                Vehicle::Bike,
                Condition::AirTemperature(Range::new(Some(0.0), Some(100.0))),
                Some(0.5),
            ),
        ];
        let candidate = Condition::WindSpeed(Range::new(Some(10.0), Some(20.0)));

        assert!(check(Vehicle::Bike, &candidate, Some(0.5), &existing).is_ok());
    }

    #[test]
    fn broader_phenomenon_with_higher_fee_shadows_candidate() {
        let existing = vec![phenom(11, Vehicle::Bike, "rain", Some(1.0))];
        let candidate = Condition::Phenomenon("heavy rain".to_string());

        let err = check(Vehicle::Bike, &candidate, Some(0.5), &existing).unwrap_err();
        assert_eq!(err, Conflict::ShadowedPhenomenon { id: 11 });
    }

    #[test]
    fn broader_phenomenon_with_lower_fee_does_not_shadow() {
        let existing = vec![phenom(11, Vehicle::Bike, "rain", Some(0.5))];
        let candidate = Condition::Phenomenon("heavy rain".to_string());

        assert!(check(Vehicle::Bike, &candidate, Some(1.0), &existing).is_ok());
    }

    #[test]
    fn equal_fee_shadows() {
        let existing = vec![phenom(4, Vehicle::Scooter, "snow", Some(1.0))];
        let candidate = Condition::Phenomenon("light snow".to_string());

        let err = check(Vehicle::Scooter, &candidate, Some(1.0), &existing).unwrap_err();
        assert_eq!(err, Conflict::ShadowedPhenomenon { id: 4 });
    }

    #[test]
    fn forbidding_rule_shadows_any_priced_candidate() {
        let existing = vec![phenom(9, Vehicle::Bike, "thunder", None)];
        let candidate = Condition::Phenomenon("thunderstorm".to_string());

        let err = check(Vehicle::Bike, &candidate, Some(2.0), &existing).unwrap_err();
        assert_eq!(err, Conflict::ShadowedPhenomenon { id: 9 });
    }

    #[test]
    fn forbidding_candidate_is_shadowed_only_by_a_forbidding_rule() {
        let priced = vec![phenom(1, Vehicle::Bike, "snow", Some(9.0))];
        let candidate = Condition::Phenomenon("snow shower".to_string());
        assert!(check(Vehicle::Bike, &candidate, None, &priced).is_ok());

        let forbidding = vec![phenom(2, Vehicle::Bike, "snow", None)];
        let err = check(Vehicle::Bike, &candidate, None, &forbidding).unwrap_err();
        assert_eq!(err, Conflict::ShadowedPhenomenon { id: 2 });
    }

    #[test]
    fn exact_duplicate_phenomenon_is_rejected_regardless_of_fee() {
        let existing = vec![phenom(5, Vehicle::Bike, "sleet", Some(0.5))];
        let candidate = Condition::Phenomenon("sleet".to_string());

        let err = check(Vehicle::Bike, &candidate, Some(3.0), &existing).unwrap_err();
        assert_eq!(err, Conflict::DuplicatePhenomenon { id: 5 });
    }

    #[test]
    fn phenomenon_of_another_vehicle_is_ignored() {
        let existing = vec![phenom(5, Vehicle::Scooter, "rain", Some(1.0))];
        let candidate = Condition::Phenomenon("heavy rain".to_string());

        assert!(check(Vehicle::Bike, &candidate, Some(0.5), &existing).is_ok());
    }
}
