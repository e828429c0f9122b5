use crate::error::{PlanError, Result};
use crate::fragment::FragmentType;
use crate::geometry::BlockRange;
use crate::plan::read_plan::{BlockRef, CombineInstruction, ReadPlan};
use rayon::prelude::*;
use tracing::trace;

/// Source of fragment blocks, addressed in each fragment's local coordinates.
pub trait FragmentReader: Send + Sync {
    fn read_blocks(&self, fragment: FragmentType, range: BlockRange) -> Result<Vec<u8>>;
}

/// Run every read of `plan` (in parallel) and assemble the requested blocks.
pub fn execute_plan<R: FragmentReader + ?Sized>(
    plan: &ReadPlan,
    reader: &R,
    block_size: usize,
) -> Result<Vec<u8>> {
    let buffers = plan
        .operations()
        .par_iter()
        .map(|op| {
            let buf = reader.read_blocks(op.source, op.range)?;
            let expected = op.local_block_count() as usize * block_size;
            if buf.len() != expected {
                return Err(PlanError::ShortRead {
                    fragment: op.source,
                    expected,
                    actual: buf.len(),
                });
            }
            trace!(
                fragment = %op.source,
                start = op.range.start,
                blocks = op.range.len(),
                "fragment read"
            );
            Ok(buf)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut out = vec![0u8; plan.block_count() as usize * block_size];
    for ins in plan.combine() {
        let at = ins.output() as usize * block_size;
        let dst = out
            .get_mut(at..at + block_size)
            .ok_or(PlanError::OutputOutOfRange(ins.output()))?;
        match ins {
            CombineInstruction::Copy { from, .. } => {
                dst.copy_from_slice(block_of(&buffers, from, block_size)?);
            }
            CombineInstruction::Xor { from, .. } => {
                dst.fill(0);
                for r in from {
                    for (d, s) in dst.iter_mut().zip(block_of(&buffers, r, block_size)?) {
                        *d ^= s;
                    }
                }
            }
        }
    }
    Ok(out)
}

fn block_of<'a>(buffers: &'a [Vec<u8>], r: &BlockRef, block_size: usize) -> Result<&'a [u8]> {
    let at = r.block as usize * block_size;
    buffers
        .get(r.operation)
        .and_then(|b| b.get(at..at + block_size))
        .ok_or(PlanError::DanglingBlockRef {
            operation: r.operation,
            block: r.block,
        })
}
