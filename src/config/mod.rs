pub mod generation;
pub mod planner;

pub use generation::GenerationParams;
pub use planner::{PlannerConfig, StageToggles};
