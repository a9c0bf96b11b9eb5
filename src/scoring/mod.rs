pub mod adjacency;
pub mod yields;

pub use adjacency::{base_adjacency, scale_adjacency, unscale_adjacency};
pub use yields::{annotate_yields, Strategy, YieldOverrides, YieldRange, YieldTable, Yields};
