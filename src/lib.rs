pub mod cli;
pub mod config;
pub mod error;
pub mod map;
pub mod planner;
pub mod scoring;
pub mod solver;
pub mod transport;

pub use error::PlanError;
