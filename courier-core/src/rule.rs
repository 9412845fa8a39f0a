use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Vehicle;

/// The dimension a weather fee rule conditions on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    AirTemperature,
    WindSpeed,
    Phenomenon,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AirTemperature => "air temperature",
            Category::WindSpeed => "wind speed",
            Category::Phenomenon => "phenomenon",
        }
    }

    pub const fn all() -> &'static [Category] {
        &[Category::AirTemperature, Category::WindSpeed, Category::Phenomenon]
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Category::AirTemperature => 0,
            Category::WindSpeed => 1,
            Category::Phenomenon => 2,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric interval with optional bounds. Matching at a rule's own bounds
/// is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub above: Option<f64>,
    pub below: Option<f64>,
}

impl Range {
    pub fn new(above: Option<f64>, below: Option<f64>) -> Self {
        Self { above, below }
    }

    /// Whether `value` falls inside this range, bounds included.
    pub fn contains(&self, value: f64) -> bool {
        match (self.above, self.below) {
            (Some(above), Some(below)) => value >= above && value <= below,
            (Some(above), None) => value >= above,
            (None, Some(below)) => value <= below,
            (None, None) => false,
        }
    }

    /// Strict overlap test used by the conflict validator: an absent bound
    /// counts as infinite, and ranges that merely touch at an endpoint do
    /// not overlap.
    pub fn overlaps(&self, other: &Range) -> bool {
        let a1 = self.above.unwrap_or(f64::NEG_INFINITY);
        let b1 = self.below.unwrap_or(f64::INFINITY);
        let a2 = other.above.unwrap_or(f64::NEG_INFINITY);
        let b2 = other.below.unwrap_or(f64::INFINITY);
        a1 < b2 && b1 > a2
    }
}

/// What a rule matches against: a value range for the numeric categories, or
/// a lowercase substring for phenomena. Invalid combinations (a phenomenon
/// with bounds, a numeric condition without any) cannot be represented; they
/// are rejected when a [`RuleDraft`] is checked at the write boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    AirTemperature(Range),
    WindSpeed(Range),
    Phenomenon(String),
}

impl Condition {
    pub fn category(&self) -> Category {
        match self {
            Condition::AirTemperature(_) => Category::AirTemperature,
            Condition::WindSpeed(_) => Category::WindSpeed,
            Condition::Phenomenon(_) => Category::Phenomenon,
        }
    }

    pub fn range(&self) -> Option<&Range> {
        match self {
            Condition::AirTemperature(range) | Condition::WindSpeed(range) => Some(range),
            Condition::Phenomenon(_) => None,
        }
    }

    pub fn phenomenon(&self) -> Option<&str> {
        match self {
            Condition::Phenomenon(needle) => Some(needle),
            _ => None,
        }
    }
}

/// A single conditional surcharge or prohibition. An absent fee means the
/// vehicle is forbidden while the condition holds.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherFeeRule {
    pub id: u64,
    pub vehicle: Vehicle,
    pub condition: Condition,
    pub fee: Option<f64>,
}

impl WeatherFeeRule {
    pub fn new(id: u64, vehicle: Vehicle, condition: Condition, fee: Option<f64>) -> Self {
        Self { id, vehicle, condition, fee }
    }

    pub fn category(&self) -> Category {
        self.condition.category()
    }

    /// The fee used when comparing against other rules: forbidden compares
    /// as infinite, so a forbidding rule outranks any priced one.
    pub(crate) fn fee_or_infinite(&self) -> f64 {
        self.fee.unwrap_or(f64::INFINITY)
    }
}

/// Field-level invariant violations of a single rule, independent of the
/// rest of the rule set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldViolation {
    #[error("the fee must be a non-negative number")]
    NegativeFee,
    #[error("the phenomenon must be set for that weather condition")]
    MissingPhenomenon,
    #[error("the above and below values must not be set for that weather condition")]
    UnexpectedBounds,
    #[error("the phenomenon must not be set for that weather condition")]
    UnexpectedPhenomenon,
    #[error("either above or below must be set for that weather condition")]
    MissingBounds,
    #[error("the value of above must be less than or equal to below if both are set")]
    InvertedRange,
}

/// The flat wire shape a rule is created or edited through. Carries every
/// optional field; [`RuleDraft::into_parts`] checks the field invariants and
/// produces the typed condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDraft {
    pub vehicle: Vehicle,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub above: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub below: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phenomenon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,
}

impl RuleDraft {
    /// Validate the field invariants and split the draft into its typed
    /// parts. The phenomenon text is normalized to lowercase here, so every
    /// stored rule holds it in canonical form.
    pub fn into_parts(self) -> Result<(Vehicle, Condition, Option<f64>), FieldViolation> {
        if self.fee.is_some_and(|fee| fee < 0.0) {
            return Err(FieldViolation::NegativeFee);
        }

        let condition = match self.category {
            Category::Phenomenon => {
                if self.above.is_some() || self.below.is_some() {
                    return Err(FieldViolation::UnexpectedBounds);
                }
                match self.phenomenon {
                    Some(text) if !text.is_empty() => Condition::Phenomenon(text.to_lowercase()),
                    _ => return Err(FieldViolation::MissingPhenomenon),
                }
            }
            Category::AirTemperature | Category::WindSpeed => {
                if self.phenomenon.is_some() {
                    return Err(FieldViolation::UnexpectedPhenomenon);
                }
                if self.above.is_none() && self.below.is_none() {
                    return Err(FieldViolation::MissingBounds);
                }
                if let (Some(above), Some(below)) = (self.above, self.below) {
                    if above > below {
                        return Err(FieldViolation::InvertedRange);
                    }
                }
                let range = Range::new(self.above, self.below);
                match self.category {
                    Category::AirTemperature => Condition::AirTemperature(range),
                    _ => Condition::WindSpeed(range),
                }
            }
        };

        Ok((self.vehicle, condition, self.fee))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(category: Category) -> RuleDraft {
        RuleDraft {
            vehicle: Vehicle::Bike,
            category,
            above: None,
            below: None,
            phenomenon: None,
            fee: Some(1.0),
        }
    }

    #[test]
    fn phenomenon_draft_lowercases_text() {
        let mut d = draft(Category::Phenomenon);
        d.phenomenon = Some("Light Snow Shower".to_string());

        let (vehicle, condition, fee) = d.into_parts().unwrap();
        assert_eq!(vehicle, Vehicle::Bike);
        assert_eq!(condition, Condition::Phenomenon("light snow shower".to_string()));
        assert_eq!(fee, Some(1.0));
    }

    #[test]
    fn phenomenon_draft_rejects_missing_or_empty_text() {
        assert_eq!(
            draft(Category::Phenomenon).into_parts(),
            Err(FieldViolation::MissingPhenomenon)
        );

        let mut d = draft(Category::Phenomenon);
        d.phenomenon = Some(String::new());
        assert_eq!(d.into_parts(), Err(FieldViolation::MissingPhenomenon));
    }

    #[test]
    fn phenomenon_draft_rejects_bounds() {
        let mut d = draft(Category::Phenomenon);
        d.phenomenon = Some("snow".to_string());
        d.above = Some(0.0);
        assert_eq!(d.into_parts(), Err(FieldViolation::UnexpectedBounds));
    }

    #[test]
    fn numeric_draft_requires_a_bound() {
        assert_eq!(
            draft(Category::WindSpeed).into_parts(),
            Err(FieldViolation::MissingBounds)
        );
    }

    #[test]
    fn numeric_draft_rejects_phenomenon_text() {
        let mut d = draft(Category::AirTemperature);
        d.below = Some(0.0);
        d.phenomenon = Some("snow".to_string());
        assert_eq!(d.into_parts(), Err(FieldViolation::UnexpectedPhenomenon));
    }

    #[test]
    fn numeric_draft_rejects_inverted_range() {
        let mut d = draft(Category::AirTemperature);
        d.above = Some(5.0);
        d.below = Some(-5.0);
        assert_eq!(d.into_parts(), Err(FieldViolation::InvertedRange));
    }

    #[test]
    fn negative_fee_rejected() {
        let mut d = draft(Category::WindSpeed);
        d.above = Some(10.0);
        d.fee = Some(-0.5);
        assert_eq!(d.into_parts(), Err(FieldViolation::NegativeFee));
    }

    #[test]
    fn absent_fee_means_forbidden_and_is_accepted() {
        let mut d = draft(Category::WindSpeed);
        d.above = Some(20.0);
        d.fee = None;

        let (_, condition, fee) = d.into_parts().unwrap();
        assert_eq!(condition, Condition::WindSpeed(Range::new(Some(20.0), None)));
        assert_eq!(fee, None);
    }

    #[test]
    fn range_contains_is_inclusive_at_bounds() {
        let range = Range::new(Some(10.0), Some(20.0));
        assert!(range.contains(10.0));
        assert!(range.contains(20.0));
        assert!(!range.contains(9.9));
        assert!(!range.contains(20.1));

        let open_below = Range::new(None, Some(-10.0));
        assert!(open_below.contains(-40.0));
        assert!(open_below.contains(-10.0));
        assert!(!open_below.contains(-9.9));
    }

    #[test]
    fn range_overlap_is_strict_at_endpoints() {
        let a = Range::new(Some(10.0), Some(20.0));
        let b = Range::new(Some(20.0), Some(30.0));
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));

        let c = Range::new(Some(15.0), Some(25.0));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
    }

    #[test]
    fn unbounded_range_overlaps_everything() {
        let all = Range::new(None, None);
        let narrow = Range::new(Some(1.0), Some(2.0));
        assert!(all.overlaps(&narrow));
        assert!(narrow.overlaps(&all));
    }

    #[test]
    fn draft_deserializes_from_flat_json() {
        let d: RuleDraft = serde_json::from_str(
            r#"{"vehicle":"bike","category":"WIND_SPEED","above":20.0}"#,
        )
        .unwrap();
        assert_eq!(d.vehicle, Vehicle::Bike);
        assert_eq!(d.category, Category::WindSpeed);
        assert_eq!(d.above, Some(20.0));
        assert_eq!(d.fee, None);
    }
}
