pub mod geometry;
pub mod stats;

pub use geometry::{Position, Vec2};
pub use stats::DelayStats;
