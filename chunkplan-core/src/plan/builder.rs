use super::read_plan::{BlockRef, CombineInstruction, ReadOperation, ReadPlan};
use crate::error::{PlanError, Result};
use crate::fragment::FragmentType;
use crate::geometry::{
    BLOCKS_PER_CHUNK, BlockRange, blocks_in_data_part, data_slot_of, local_index_of,
    slot_local_range,
};
use crate::select::{ReadStrategy, SelectionResult};
use tracing::debug;

#[derive(Default)]
struct Operations {
    ops: Vec<ReadOperation>,
}

impl Operations {
    fn push(&mut self, source: FragmentType, range: BlockRange) {
        if !range.is_empty() {
            self.ops.push(ReadOperation { source, range });
        }
    }

    fn locate(&self, source: FragmentType, depth: u32) -> Result<BlockRef> {
        self.ops
            .iter()
            .enumerate()
            .find(|(_, op)| op.source == source && op.range.contains(depth))
            .map(|(i, op)| BlockRef {
                operation: i,
                block: depth - op.range.start,
            })
            .ok_or(PlanError::Uncovered {
                fragment: source,
                block: depth,
            })
    }
}

/// Per fragment the needed depths form at most two runs; each run is one read.
pub fn build_plan(selection: &SelectionResult, first_block: u32, count: u32) -> Result<ReadPlan> {
    let strategy = selection.strategy().ok_or(PlanError::ReadingImpossible)?;
    if count == 0 {
        return Err(PlanError::EmptyRange);
    }
    if first_block
        .checked_add(count)
        .is_none_or(|end| end > BLOCKS_PER_CHUNK)
    {
        return Err(PlanError::RangeOutOfBounds { first_block, count });
    }

    let plan = match strategy {
        ReadStrategy::Standard => standard_plan(first_block, count),
        ReadStrategy::Striped { level } => striped_plan(level, first_block, count)?,
        ReadStrategy::Reconstructing { level, missing } => {
            reconstructing_plan(level, missing, first_block, count)?
        }
    };

    let stats = plan.stats();
    debug!(
        first_block,
        count,
        operations = stats.operations,
        blocks_read = stats.blocks_read,
        xor_blocks = stats.xor_blocks,
        "read plan built"
    );
    Ok(plan)
}

fn standard_plan(first_block: u32, count: u32) -> ReadPlan {
    let op = ReadOperation {
        source: FragmentType::Standard,
        range: BlockRange::with_len(first_block, count),
    };
    let combine = (0..count)
        .map(|k| CombineInstruction::Copy {
            output: k,
            from: BlockRef {
                operation: 0,
                block: k,
            },
        })
        .collect();
    ReadPlan::new(first_block, count, vec![op], combine)
}

fn striped_plan(level: u8, first_block: u32, count: u32) -> Result<ReadPlan> {
    let mut ops = Operations::default();
    for part in 1..=level {
        ops.push(
            FragmentType::xor_data(level, part)?,
            slot_local_range(level, part, first_block, count),
        );
    }

    let mut combine = Vec::with_capacity(count as usize);
    for k in 0..count {
        let block = first_block + k;
        let source = FragmentType::xor_data(level, data_slot_of(level, block))?;
        combine.push(CombineInstruction::Copy {
            output: k,
            from: ops.locate(source, local_index_of(level, block))?,
        });
    }
    Ok(ReadPlan::new(first_block, count, ops.ops, combine))
}

fn reconstructing_plan(level: u8, missing: u8, first_block: u32, count: u32) -> Result<ReadPlan> {
    let parity = FragmentType::xor_parity(level)?;
    let lost = slot_local_range(level, missing, first_block, count);

    let mut ops = Operations::default();
    for part in (1..=level).filter(|&p| p != missing) {
        let direct = slot_local_range(level, part, first_block, count);
        // Past the last full stripe row a part may have no block at a lost
        // depth; it contributes zeros there and is not read.
        let rebuild = lost.intersect(&BlockRange::new(0, blocks_in_data_part(level, part)));
        let source = FragmentType::xor_data(level, part)?;
        let (low, high) = direct.union(&rebuild);
        ops.push(source, low);
        if let Some(high) = high {
            ops.push(source, high);
        }
    }
    ops.push(parity, lost);

    let mut combine = Vec::with_capacity(count as usize);
    for k in 0..count {
        let block = first_block + k;
        let part = data_slot_of(level, block);
        let depth = local_index_of(level, block);
        if part != missing {
            combine.push(CombineInstruction::Copy {
                output: k,
                from: ops.locate(FragmentType::xor_data(level, part)?, depth)?,
            });
            continue;
        }
        let mut from = Vec::with_capacity(level as usize);
        for other in (1..=level).filter(|&p| p != missing) {
            if depth < blocks_in_data_part(level, other) {
                from.push(ops.locate(FragmentType::xor_data(level, other)?, depth)?);
            }
        }
        from.push(ops.locate(parity, depth)?);
        combine.push(CombineInstruction::Xor { output: k, from });
    }
    Ok(ReadPlan::new(first_block, count, ops.ops, combine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;
    use crate::select::select_parts;

    fn selection(parts: &[FragmentType]) -> SelectionResult {
        let scores = parts.iter().map(|&p| (p, 1.0)).collect();
        select_parts(parts, &scores, &PlannerConfig::default()).unwrap()
    }

    fn xor(level: u8, part: u8) -> FragmentType {
        FragmentType::xor_data(level, part).unwrap()
    }

    #[test]
    fn test_standard_plan_is_single_read() {
        let plan = build_plan(&selection(&[FragmentType::Standard]), 5, 3).unwrap();
        assert_eq!(
            plan.operations(),
            &[ReadOperation {
                source: FragmentType::Standard,
                range: BlockRange::new(5, 8),
            }]
        );
        assert_eq!(plan.stats().copied_blocks, 3);
    }

    #[test]
    fn test_striped_plan_skips_untouched_parts() {
        // block 4 of level 3 lives in part 2 at depth 1
        let plan = build_plan(&selection(&[xor(3, 1), xor(3, 2), xor(3, 3)]), 4, 1).unwrap();
        assert_eq!(
            plan.operations(),
            &[ReadOperation {
                source: xor(3, 2),
                range: BlockRange::new(1, 2),
            }]
        );
        assert_eq!(
            plan.combine(),
            &[CombineInstruction::Copy {
                output: 0,
                from: BlockRef {
                    operation: 0,
                    block: 0
                }
            }]
        );
    }

    #[test]
    fn test_reconstruction_at_last_partial_row() {
        // 1024 = 3 * 341 + 1: block 1023 is part 1 at depth 341, parts 2 and 3
        // stop at depth 340
        let parity = FragmentType::xor_parity(3).unwrap();
        let plan = build_plan(&selection(&[xor(3, 2), xor(3, 3), parity]), 1023, 1).unwrap();
        assert_eq!(
            plan.operations(),
            &[ReadOperation {
                source: parity,
                range: BlockRange::new(341, 342),
            }]
        );
        assert_eq!(
            plan.combine(),
            &[CombineInstruction::Xor {
                output: 0,
                from: vec![BlockRef {
                    operation: 0,
                    block: 0
                }]
            }]
        );
    }

    #[test]
    fn test_preconditions() {
        let sel = selection(&[FragmentType::Standard]);
        assert!(matches!(build_plan(&sel, 0, 0), Err(PlanError::EmptyRange)));
        assert!(matches!(
            build_plan(&sel, BLOCKS_PER_CHUNK - 1, 2),
            Err(PlanError::RangeOutOfBounds { .. })
        ));
        assert!(matches!(
            build_plan(&sel, u32::MAX, 2),
            Err(PlanError::RangeOutOfBounds { .. })
        ));
        assert!(matches!(
            build_plan(&SelectionResult::impossible(), 0, 1),
            Err(PlanError::ReadingImpossible)
        ));
    }
}
