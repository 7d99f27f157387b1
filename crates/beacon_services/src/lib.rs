//! Beacon Services Layer
//!
//! Settings and scenario loading, plus assembly of configured robots
//! into the entity tree, anchor table and RAB medium.

pub mod error;
pub mod robot;
pub mod scenario;
pub mod settings;

pub use error::ServiceError;
pub use robot::Robot;
pub use scenario::Scenario;
pub use settings::{GridSettings, Settings, SimulationSettings};
