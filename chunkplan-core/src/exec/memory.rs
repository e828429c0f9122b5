use super::reader::{FragmentReader, execute_plan};
use crate::error::{PlanError, Result};
use crate::fragment::{FragmentType, XorSlot};
use crate::geometry::{BLOCKS_PER_CHUNK, BlockRange, global_index_of, local_index_of};
use crate::planner::ChunkReadPlanner;
use std::collections::HashMap;

pub struct MemoryFragments {
    block_size: usize,
    chunk: Vec<u8>,
    fragments: HashMap<FragmentType, Vec<u8>>,
}

impl MemoryFragments {
    /// Materialize `parts` from `chunk`, which must be exactly one chunk of
    /// `BLOCKS_PER_CHUNK` blocks of `block_size` bytes.
    pub fn from_chunk(chunk: Vec<u8>, block_size: usize, parts: &[FragmentType]) -> Result<Self> {
        let expected = BLOCKS_PER_CHUNK as usize * block_size;
        if chunk.len() != expected || block_size == 0 {
            return Err(PlanError::ChunkSizeMismatch {
                expected,
                actual: chunk.len(),
            });
        }
        let fragments = parts
            .iter()
            .map(|&f| (f, stripe(&chunk, block_size, f)))
            .collect();
        Ok(Self {
            block_size,
            chunk,
            fragments,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Fragments currently held, in canonical order.
    pub fn available(&self) -> Vec<FragmentType> {
        let mut v: Vec<_> = self.fragments.keys().copied().collect();
        v.sort();
        v
    }

    pub fn fragment(&self, fragment: FragmentType) -> Option<&[u8]> {
        self.fragments.get(&fragment).map(Vec::as_slice)
    }

    /// Drop a fragment, as if its chunkserver went away.
    pub fn remove(&mut self, fragment: FragmentType) -> bool {
        self.fragments.remove(&fragment).is_some()
    }

    /// Bytes a direct read of the full replica would return.
    pub fn expected_range(&self, first_block: u32, count: u32) -> Result<&[u8]> {
        let start = first_block as usize * self.block_size;
        let end = start + count as usize * self.block_size;
        self.chunk
            .get(start..end)
            .ok_or(PlanError::RangeOutOfBounds { first_block, count })
    }
}

impl FragmentReader for MemoryFragments {
    fn read_blocks(&self, fragment: FragmentType, range: BlockRange) -> Result<Vec<u8>> {
        let data = self
            .fragments
            .get(&fragment)
            .ok_or(PlanError::FragmentUnavailable(fragment))?;
        // Reads past the end come back short.
        let end = (range.end as usize * self.block_size).min(data.len());
        let start = (range.start as usize * self.block_size).min(end);
        Ok(data[start..end].to_vec())
    }
}

fn stripe(chunk: &[u8], block_size: usize, fragment: FragmentType) -> Vec<u8> {
    let x = match fragment {
        FragmentType::Standard => return chunk.to_vec(),
        FragmentType::Xor(x) => x,
    };
    let level = x.level();
    let mut out = vec![0u8; fragment.blocks_stored() as usize * block_size];
    match x.slot() {
        XorSlot::Data(part) => {
            for (depth, dst) in out.chunks_exact_mut(block_size).enumerate() {
                let at = global_index_of(level, part, depth as u32) as usize * block_size;
                dst.copy_from_slice(&chunk[at..at + block_size]);
            }
        }
        XorSlot::Parity => {
            for (block, src) in chunk.chunks_exact(block_size).enumerate() {
                let at = local_index_of(level, block as u32) as usize * block_size;
                for (d, s) in out[at..at + block_size].iter_mut().zip(src) {
                    *d ^= s;
                }
            }
        }
    }
    out
}

/// Plan, execute and compare one range against the direct read.
pub fn verify_range(
    planner: &ChunkReadPlanner,
    fragments: &MemoryFragments,
    first_block: u32,
    count: u32,
) -> Result<()> {
    let plan = planner.build_plan_for(first_block, count)?;
    let got = execute_plan(&plan, fragments, fragments.block_size())?;
    if got != fragments.expected_range(first_block, count)? {
        return Err(PlanError::Mismatch { first_block, count });
    }
    Ok(())
}

/// Block ranges that exercise chunk edges and stripe boundaries.
pub fn boundary_ranges() -> Vec<(u32, u32)> {
    let b = BLOCKS_PER_CHUNK;
    let mut out = Vec::new();
    for first in 0..4 {
        for count in 1..=4 {
            out.push((first, count));
        }
    }
    for k in 1..=4 {
        out.push((b - k, k));
        out.push((b - k, 1));
        out.push((k - 1, b - (k - 1)));
    }
    out.push((b - 5, 5));
    out.push((b / 2 - 3, 7));
    out.sort_unstable();
    out.dedup();
    out
}
