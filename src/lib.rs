pub mod error;
pub mod light;
pub mod merge;
pub mod placement;
pub mod plugin;
pub mod probe;
pub mod query;
pub mod transform;
pub mod types;
pub mod volume;

pub use plugin::ProbePlacementPlugin;
