//! Shared types for the rendezvous planner.
//!
//! - [`models`]: people, destinations and the validated [`Problem`]
//! - [`input`]: serde records and their validation
//! - [`config`]: optimizer and activity settings
//! - [`distance`]: the pairwise distance table
//! - [`scanner`]: the interval feasibility scan

pub mod availability;
pub mod config;
pub mod distance;
pub mod error;
pub mod input;
pub mod models;
pub mod scanner;
pub mod utils;

pub use availability::{Availability, Run};
pub use config::{ActivityConfig, CapacityConfig, OptimizerConfig, SolverBackend};
pub use distance::DistanceTable;
pub use error::InputError;
pub use input::{DestinationRecord, PersonRecord, PlanningInput};
pub use models::{Activity, Destination, Location, Node, Person, Problem, MAX_INTERVAL_SCORE};
pub use scanner::{IntervalScanner, ScanReport};
