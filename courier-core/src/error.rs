use thiserror::Error;

use crate::model::{City, Vehicle};
use crate::rule::FieldViolation;

pub type Result<T> = std::result::Result<T, Error>;

/// Typed outcomes of the fee engine and the rule write boundary.
///
/// `Unavailable` and `Forbidden` are quote outcomes the caller must be able
/// to tell apart; neither is a fee of zero. The remaining variants cover the
/// administrative surface.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// The vehicle is not offered in the requested city at all.
    #[error("the selected vehicle type ({vehicle}) is not available in the specified city ({city})")]
    Unavailable { city: City, vehicle: Vehicle },

    /// Current weather disallows the vehicle. Carries the condition that
    /// triggered it, e.g. "wind speed: 25.0 m/s".
    #[error("usage of the selected vehicle type ({vehicle}) is forbidden due to current weather conditions ({reason})")]
    Forbidden { vehicle: Vehicle, reason: String },

    /// A candidate rule collides with the existing rule set.
    #[error("conflict: {0}")]
    Conflict(#[from] Conflict),

    /// A rule or fee violates a field-level invariant.
    #[error("invalid rule: {0}")]
    InvalidRule(#[from] FieldViolation),

    #[error("weather fee rule not found with id: {id}")]
    RuleNotFound { id: u64 },

    #[error("regional fee not found for city: {city} and vehicle: {vehicle}")]
    RegionalFeeNotFound { city: City, vehicle: Vehicle },

    /// Transient storage-layer failure; propagated, never masked.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// The ways a candidate rule can collide with an already stored one.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Conflict {
    #[error("a rule with an overlapping range exists (id: {id})")]
    OverlappingRange { id: u64 },

    #[error("an equal or higher fee exists for a less specific phenomenon (id: {id})")]
    ShadowedPhenomenon { id: u64 },

    #[error("a rule for this vehicle and phenomenon already exists (id: {id})")]
    DuplicatePhenomenon { id: u64 },

    #[error("a regional fee already exists for city: {city} and vehicle: {vehicle}")]
    DuplicateRegionalFee { city: City, vehicle: Vehicle },
}
