//! Core library for the `courier` delivery fee service.
//!
//! This crate defines:
//! - The domain model (cities, vehicles, weather snapshots, fee rules)
//! - The weather-conditioned fee engine and the rule-conflict validator
//! - Repository abstractions with in-memory implementations
//! - The weather observations feed client and parser
//! - Configuration handling and the default data set
//!
//! It is used by `courier-cli`, but can also be reused by other binaries or
//! services.

pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod model;
pub mod repository;
pub mod rule;
pub mod seed;
pub mod service;
pub mod validator;

pub use config::{Config, FeedConfig, ServerConfig};
pub use engine::{FeeEngine, Quote};
pub use error::{Conflict, Error, Result};
pub use feed::FeedClient;
pub use model::{City, RegionalFee, Vehicle, WeatherSnapshot};
pub use rule::{Category, Condition, Range, RuleDraft, WeatherFeeRule};
pub use service::{RegionalFeeService, RuleService};
