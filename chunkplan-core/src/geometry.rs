use serde::{Deserialize, Serialize};

pub const BLOCKS_PER_CHUNK: u32 = 1024;
pub const BLOCK_SIZE: u32 = 64 * 1024;

pub const MIN_XOR_LEVEL: u8 = 2;
pub const MAX_XOR_LEVEL: u8 = 9;

/// Data part (1-based) that holds global block `block`.
#[inline]
pub fn data_slot_of(level: u8, block: u32) -> u8 {
    (block % level as u32) as u8 + 1
}

/// Depth of global block `block` inside its data part.
#[inline]
pub fn local_index_of(level: u8, block: u32) -> u32 {
    block / level as u32
}

/// Global block stored at `depth` of data part `part`.
#[inline]
pub fn global_index_of(level: u8, part: u8, depth: u32) -> u32 {
    depth * level as u32 + (part as u32 - 1)
}

/// Local run of data part `part` covering the global range `[first_block, first_block + count)`.
///
/// The blocks of one part inside a contiguous global range are always a
/// contiguous run of depths, so the result is a single (possibly empty) range.
pub fn slot_local_range(level: u8, part: u8, first_block: u32, count: u32) -> BlockRange {
    let level = level as u32;
    let off = part as u32 - 1;
    let start = first_block.saturating_sub(off).div_ceil(level);
    let end = (first_block + count).saturating_sub(off).div_ceil(level);
    BlockRange::new(start, end.max(start))
}

/// Number of blocks physically present in data part `part` of a level.
#[inline]
pub fn blocks_in_data_part(level: u8, part: u8) -> u32 {
    (BLOCKS_PER_CHUNK - (part as u32 - 1)).div_ceil(level as u32)
}

/// Parity is as deep as the first data part.
#[inline]
pub fn blocks_in_parity_part(level: u8) -> u32 {
    BLOCKS_PER_CHUNK.div_ceil(level as u32)
}

/// Half-open range of blocks `[start, end)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRange {
    pub start: u32,
    pub end: u32,
}

impl BlockRange {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn with_len(start: u32, len: u32) -> Self {
        Self::new(start, start + len)
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, block: u32) -> bool {
        self.start <= block && block < self.end
    }

    pub fn intersect(&self, other: &BlockRange) -> BlockRange {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start >= end {
            BlockRange::default()
        } else {
            BlockRange::new(start, end)
        }
    }

    /// Union as at most two disjoint runs, lower one first.
    /// Overlapping or touching ranges merge into one.
    pub fn union(&self, other: &BlockRange) -> (BlockRange, Option<BlockRange>) {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => (*other, None),
            (_, true) => (*self, None),
            _ if self.start <= other.end && other.start <= self.end => (
                BlockRange::new(self.start.min(other.start), self.end.max(other.end)),
                None,
            ),
            _ if self.start < other.start => (*self, Some(*other)),
            _ => (*other, Some(*self)),
        }
    }

    pub fn byte_offset(&self) -> u64 {
        self.start as u64 * BLOCK_SIZE as u64
    }

    pub fn byte_len(&self) -> u64 {
        self.len() as u64 * BLOCK_SIZE as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_striping() {
        assert_eq!(data_slot_of(3, 0), 1);
        assert_eq!(data_slot_of(3, 2), 3);
        assert_eq!(data_slot_of(3, 5), 3);
        assert_eq!(local_index_of(3, 5), 1);
        assert_eq!(global_index_of(3, 3, 1), 5);
        for b in 0..64 {
            let p = data_slot_of(7, b);
            assert_eq!(global_index_of(7, p, local_index_of(7, b)), b);
        }
    }

    #[test]
    fn test_slot_local_range_matches_per_block() {
        for level in MIN_XOR_LEVEL..=MAX_XOR_LEVEL {
            for first in 0..20 {
                for count in 1..25 {
                    for part in 1..=level {
                        let depths: Vec<u32> = (first..first + count)
                            .filter(|&b| data_slot_of(level, b) == part)
                            .map(|b| local_index_of(level, b))
                            .collect();
                        let r = slot_local_range(level, part, first, count);
                        let expected: Vec<u32> = (r.start..r.end).collect();
                        assert_eq!(depths, expected, "L={level} p={part} {first}+{count}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_blocks_per_part() {
        // 1024 = 3 * 341 + 1: only part 1 reaches depth 341
        assert_eq!(blocks_in_data_part(3, 1), 342);
        assert_eq!(blocks_in_data_part(3, 2), 341);
        assert_eq!(blocks_in_data_part(3, 3), 341);
        assert_eq!(blocks_in_parity_part(3), 342);
        assert_eq!(blocks_in_data_part(2, 2), 512);
        for level in MIN_XOR_LEVEL..=MAX_XOR_LEVEL {
            let total: u32 = (1..=level).map(|p| blocks_in_data_part(level, p)).sum();
            assert_eq!(total, BLOCKS_PER_CHUNK);
        }
    }

    #[test]
    fn test_union() {
        let a = BlockRange::new(0, 3);
        assert_eq!(a.union(&BlockRange::new(3, 5)), (BlockRange::new(0, 5), None));
        assert_eq!(a.union(&BlockRange::new(1, 2)), (BlockRange::new(0, 3), None));
        assert_eq!(
            BlockRange::new(6, 8).union(&a),
            (a, Some(BlockRange::new(6, 8)))
        );
        assert_eq!(a.union(&BlockRange::default()), (a, None));
        assert_eq!(BlockRange::new(4, 4).union(&a), (a, None));
    }

    #[test]
    fn test_intersect() {
        let a = BlockRange::new(2, 10);
        assert_eq!(a.intersect(&BlockRange::new(0, 4)), BlockRange::new(2, 4));
        assert!(a.intersect(&BlockRange::new(10, 12)).is_empty());
    }

    #[test]
    fn test_byte_span() {
        let r = BlockRange::with_len(2, 3);
        assert_eq!(r.byte_offset(), 2 * BLOCK_SIZE as u64);
        assert_eq!(r.byte_len(), 3 * BLOCK_SIZE as u64);
    }
}
