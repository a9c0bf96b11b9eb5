use std::io;

use crate::planner::Stage;
use crate::solver::SolveStatus;

/// Errors raised while decoding, validating or planning a map.
#[derive(Debug)]
pub enum PlanError {
    /// Tile count does not match `rows * cols`.
    InvalidMapDimensions { rows: u32, cols: u32, tiles: usize },
    /// A tile sits at a linear index that disagrees with its row/col.
    TileOutOfPlace { index: usize, row: u32, col: u32 },
    /// A terrain, feature, resource or improvement value with no table entry.
    UnknownCategory { kind: &'static str, code: String },
    /// The solver did not prove optimality and the caller did not accept feasible results.
    OptimizationNotOptimal { stage: Stage, status: SolveStatus },
    /// The solver status was accepted but it produced no assignment to apply.
    NoAssignment { stage: Stage, status: SolveStatus },
    /// A stage that needs placed cities found none.
    NoCities { stage: Stage },
    Decode(String),
    Encode(String),
    Io(io::Error),
}

impl PlanError {
    /// Fatal errors abort the whole request; the rest are reported per stage.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            PlanError::OptimizationNotOptimal { .. }
                | PlanError::NoAssignment { .. }
                | PlanError::NoCities { .. }
        )
    }
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::InvalidMapDimensions { rows, cols, tiles } => write!(
                f,
                "Invalid map dimensions: {}x{} needs {} tiles, got {}",
                rows,
                cols,
                *rows as u64 * *cols as u64,
                tiles
            ),
            PlanError::TileOutOfPlace { index, row, col } => write!(
                f,
                "Tile at index {} claims row {} col {}, which is not its row-major position",
                index, row, col
            ),
            PlanError::UnknownCategory { kind, code } => {
                write!(f, "Unknown {} category: {}", kind, code)
            }
            PlanError::OptimizationNotOptimal { stage, status } => {
                write!(f, "{} placement not optimal: solver status {:?}", stage, status)
            }
            PlanError::NoAssignment { stage, status } => write!(
                f,
                "{} placement: solver status {:?} came without an assignment",
                stage, status
            ),
            PlanError::NoCities { stage } => {
                write!(f, "{} placement needs at least one city on the map", stage)
            }
            PlanError::Decode(e) => write!(f, "Decode error: {}", e),
            PlanError::Encode(e) => write!(f, "Encode error: {}", e),
            PlanError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for PlanError {}

impl From<io::Error> for PlanError {
    fn from(e: io::Error) -> Self {
        PlanError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_outcomes_are_not_fatal() {
        let err = PlanError::OptimizationNotOptimal {
            stage: Stage::Campuses,
            status: SolveStatus::Timeout,
        };
        assert!(!err.is_fatal());
        assert!(!PlanError::NoCities { stage: Stage::Regions }.is_fatal());
    }

    #[test]
    fn map_errors_are_fatal() {
        let err = PlanError::InvalidMapDimensions {
            rows: 3,
            cols: 3,
            tiles: 8,
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("needs 9 tiles, got 8"));

        let err = PlanError::UnknownCategory {
            kind: "base terrain",
            code: "99".to_string(),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("base terrain"));
    }

    #[test]
    fn not_optimal_message_names_stage() {
        let err = PlanError::OptimizationNotOptimal {
            stage: Stage::Cities,
            status: SolveStatus::Infeasible,
        };
        let msg = err.to_string();
        assert!(msg.contains("City"));
        assert!(msg.contains("Infeasible"));
    }
}
