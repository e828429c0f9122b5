use crate::fragment::FragmentType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid xor level {0}")]
    InvalidXorLevel(u8),

    #[error("invalid data part {part} for xor level {level}")]
    InvalidXorPart { level: u8, part: u8 },

    #[error("cannot parse fragment type {0:?}")]
    UnknownFragmentName(String),

    #[error("unknown fragment id {0}")]
    UnknownFragmentId(u8),

    #[error("no score for fragment {0}")]
    MissingScore(FragmentType),

    #[error("invalid score {score} for fragment {fragment}")]
    InvalidScore { fragment: FragmentType, score: f32 },

    // Caller defects: the planner was asked for something it cannot answer.
    #[error("planner was not prepared")]
    NotPrepared,

    #[error("reading is not possible from the available fragments")]
    ReadingImpossible,

    #[error("empty block range requested")]
    EmptyRange,

    #[error("block range {first_block}+{count} exceeds chunk")]
    RangeOutOfBounds { first_block: u32, count: u32 },

    #[error("plan does not cover block {block} of fragment {fragment}")]
    Uncovered { fragment: FragmentType, block: u32 },

    // Execution against a fragment source.
    #[error("fragment {0} is not available")]
    FragmentUnavailable(FragmentType),

    #[error("short read from {fragment}: expected {expected} bytes, got {actual}")]
    ShortRead {
        fragment: FragmentType,
        expected: usize,
        actual: usize,
    },

    #[error("combine step references block {block} of operation {operation}, which was not read")]
    DanglingBlockRef { operation: usize, block: u32 },

    #[error("combine step writes output block {0} outside the request")]
    OutputOutOfRange(u32),

    #[error("chunk image has {actual} bytes, expected {expected}")]
    ChunkSizeMismatch { expected: usize, actual: usize },

    #[error("reconstructed range {first_block}+{count} differs from direct read")]
    Mismatch { first_block: u32, count: u32 },
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, PlanError>;
