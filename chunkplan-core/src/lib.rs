#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod fragment;
pub mod geometry;
pub mod planner;
pub mod select;

pub mod plan {
    pub mod builder;
    pub mod read_plan;
}

pub mod exec {
    pub mod memory;
    pub mod reader;
}

// Re-exports: stable API surface
pub use config::{PlannerConfig, ScoreAggregation};
pub use error::{PlanError, Result};
pub use fragment::{FragmentType, XorFragment, XorSlot};
pub use geometry::{BLOCK_SIZE, BLOCKS_PER_CHUNK, BlockRange, MAX_XOR_LEVEL, MIN_XOR_LEVEL};
pub use plan::read_plan::{BlockRef, CombineInstruction, PlanStats, ReadOperation, ReadPlan};
pub use planner::ChunkReadPlanner;
pub use select::{ReadStrategy, Score, ScoreMap, SelectionResult, select_parts};
