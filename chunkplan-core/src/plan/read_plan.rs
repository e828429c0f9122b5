use crate::fragment::FragmentType;
use crate::geometry::BlockRange;
use serde::{Deserialize, Serialize};

/// Contiguous run of blocks to fetch, in the source fragment's own local
/// block coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOperation {
    pub source: FragmentType,
    pub range: BlockRange,
}

impl ReadOperation {
    pub fn local_block_start(&self) -> u32 {
        self.range.start
    }

    pub fn local_block_count(&self) -> u32 {
        self.range.len()
    }

    /// Byte offset inside the fragment file.
    pub fn byte_offset(&self) -> u64 {
        self.range.byte_offset()
    }

    pub fn byte_len(&self) -> u64 {
        self.range.byte_len()
    }
}

/// A block inside the buffer returned by one operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    pub operation: usize,
    pub block: u32,
}

/// How one output block of the request is produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum CombineInstruction {
    Copy { output: u32, from: BlockRef },
    /// Byte-wise XOR of all listed blocks.
    Xor { output: u32, from: Vec<BlockRef> },
}

impl CombineInstruction {
    /// Output block position, relative to the first requested block.
    pub fn output(&self) -> u32 {
        match self {
            CombineInstruction::Copy { output, .. } | CombineInstruction::Xor { output, .. } => {
                *output
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PlanStats {
    pub operations: usize,
    pub blocks_read: u32,
    pub copied_blocks: u32,
    pub xor_blocks: u32,
}

/// Reads plus the combine step that turns their buffers into the requested
/// blocks `[first_block, first_block + block_count)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadPlan {
    first_block: u32,
    block_count: u32,
    operations: Vec<ReadOperation>,
    combine: Vec<CombineInstruction>,
}

impl ReadPlan {
    pub(crate) fn new(
        first_block: u32,
        block_count: u32,
        operations: Vec<ReadOperation>,
        combine: Vec<CombineInstruction>,
    ) -> Self {
        Self {
            first_block,
            block_count,
            operations,
            combine,
        }
    }

    pub fn first_block(&self) -> u32 {
        self.first_block
    }

    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    pub fn operations(&self) -> &[ReadOperation] {
        &self.operations
    }

    /// One instruction per output block, in output order.
    pub fn combine(&self) -> &[CombineInstruction] {
        &self.combine
    }

    /// Start block of every operation when all reads share one buffer, laid
    /// out back to back in operation order.
    pub fn buffer_offsets(&self) -> Vec<u32> {
        self.operations
            .iter()
            .scan(0u32, |acc, op| {
                let at = *acc;
                *acc += op.local_block_count();
                Some(at)
            })
            .collect()
    }

    pub fn stats(&self) -> PlanStats {
        let xor_blocks = self
            .combine
            .iter()
            .filter(|c| matches!(c, CombineInstruction::Xor { .. }))
            .count() as u32;
        PlanStats {
            operations: self.operations.len(),
            blocks_read: self.operations.iter().map(|op| op.local_block_count()).sum(),
            copied_blocks: self.combine.len() as u32 - xor_blocks,
            xor_blocks,
        }
    }
}
