use std::path::Path;

use chunkplan_core::error::{PlanError, Result};
use chunkplan_core::exec::memory::{MemoryFragments, boundary_ranges, verify_range};
use chunkplan_core::exec::reader::execute_plan;
use chunkplan_core::{
    BLOCK_SIZE, BLOCKS_PER_CHUNK, ChunkReadPlanner, CombineInstruction, FragmentType,
    PlannerConfig, ReadPlan, ReadStrategy, ScoreMap,
};
use tracing::{debug, info};

use crate::presentation::cli::PartArgs;

pub fn load_config(path: Option<&Path>) -> Result<PlannerConfig> {
    match path {
        Some(p) => {
            let config = PlannerConfig::from_json_file(p)?;
            debug!(path = %p.display(), ?config, "planner config loaded");
            Ok(config)
        }
        None => Ok(PlannerConfig::default()),
    }
}

fn scores_from_args(args: &PartArgs) -> ScoreMap {
    let mut scores: ScoreMap = args
        .parts
        .iter()
        .map(|&f| (f, args.default_score))
        .collect();
    scores.extend(args.scores.iter().copied());
    scores
}

fn prepared_planner(config: PlannerConfig, args: &PartArgs) -> Result<ChunkReadPlanner> {
    let mut planner = ChunkReadPlanner::with_config(config);
    planner.prepare(&args.parts, &scores_from_args(args))?;
    Ok(planner)
}

fn strategy_label(strategy: ReadStrategy) -> String {
    match strategy {
        ReadStrategy::Standard => "standard replica".to_string(),
        ReadStrategy::Striped { level } => format!("xor level {level}"),
        ReadStrategy::Reconstructing { level, missing } => {
            format!("xor level {level}, rebuilding part {missing} from parity")
        }
    }
}

pub fn handle_select(config: PlannerConfig, args: &PartArgs) -> Result<()> {
    let planner = prepared_planner(config, args)?;
    let Some(sel) = planner.selection().filter(|s| s.is_possible()) else {
        println!("reading impossible");
        return Ok(());
    };
    if let Some(strategy) = sel.strategy() {
        println!("strategy: {}", strategy_label(strategy));
    }
    if let Some(score) = sel.score() {
        println!("score:    {score}");
    }
    for part in sel.parts() {
        println!("  {part}");
    }
    Ok(())
}

pub fn handle_plan(
    config: PlannerConfig,
    args: &PartArgs,
    first: u32,
    count: Option<u32>,
    json: bool,
) -> Result<()> {
    let planner = prepared_planner(config, args)?;
    let count = match count {
        Some(count) => count,
        None if first < BLOCKS_PER_CHUNK => BLOCKS_PER_CHUNK - first,
        None => {
            return Err(PlanError::RangeOutOfBounds {
                first_block: first,
                count: 0,
            });
        }
    };
    let plan = planner.build_plan_for(first, count)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", render_plan(&plan));
    }
    Ok(())
}

fn render_plan(plan: &ReadPlan) -> String {
    let mut out = format!(
        "blocks {}..{}\n",
        plan.first_block(),
        plan.first_block() + plan.block_count()
    );
    for (i, op) in plan.operations().iter().enumerate() {
        out.push_str(&format!(
            "#{:<3} {:<12} local {:>4}..{:<4} off={} len={}\n",
            i,
            op.source.to_string(),
            op.range.start,
            op.range.end,
            op.byte_offset(),
            op.byte_len()
        ));
    }
    for ins in plan.combine() {
        let line = match ins {
            CombineInstruction::Copy { output, from } => {
                format!("out {:>4} <- #{}[{}]", output, from.operation, from.block)
            }
            CombineInstruction::Xor { output, from } => {
                let srcs: Vec<String> = from
                    .iter()
                    .map(|r| format!("#{}[{}]", r.operation, r.block))
                    .collect();
                format!("out {:>4} <- xor {}", output, srcs.join(" "))
            }
        };
        out.push_str(&line);
        out.push('\n');
    }
    let stats = plan.stats();
    out.push_str(&format!(
        "{} reads, {} blocks read, {} copied, {} rebuilt\n",
        stats.operations, stats.blocks_read, stats.copied_blocks, stats.xor_blocks
    ));
    out
}

pub fn handle_simulate(
    config: PlannerConfig,
    args: &PartArgs,
    block_size: usize,
    seed: &str,
) -> Result<()> {
    let planner = prepared_planner(config, args)?;
    if !planner.is_reading_possible() {
        return Err(PlanError::ReadingImpossible);
    }

    let mut image = vec![0u8; BLOCKS_PER_CHUNK as usize * block_size];
    let mut hasher = blake3::Hasher::new();
    hasher.update(seed.as_bytes());
    hasher.finalize_xof().fill(&mut image);
    let fragments = MemoryFragments::from_chunk(image, block_size, &args.parts)?;

    let ranges = boundary_ranges();
    for &(first, count) in &ranges {
        verify_range(&planner, &fragments, first, count)?;
    }

    let full = execute_plan(
        &planner.build_plan_for(0, BLOCKS_PER_CHUNK)?,
        &fragments,
        block_size,
    )?;
    let expected = fragments.expected_range(0, BLOCKS_PER_CHUNK)?;
    println!("chunk   blake3={}", hex::encode(blake3::hash(expected).as_bytes()));
    println!("rebuilt blake3={}", hex::encode(blake3::hash(&full).as_bytes()));
    info!(ranges = ranges.len(), block_size, "simulation passed");
    eprintln!("simulate: OK ({} ranges)", ranges.len());
    Ok(())
}

pub fn handle_describe(part: FragmentType) -> Result<()> {
    let blocks = part.blocks_stored();
    println!(
        "{}  id={} blocks={} bytes={}",
        part,
        part.id(),
        blocks,
        blocks as u64 * BLOCK_SIZE as u64
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(parts: &[&str], scores: &[(&str, f32)]) -> PartArgs {
        PartArgs {
            parts: parts.iter().map(|p| p.parse().unwrap()).collect(),
            scores: scores
                .iter()
                .map(|(p, s)| (p.parse().unwrap(), *s))
                .collect(),
            default_score: 1.0,
        }
    }

    #[test]
    fn test_score_overrides() {
        let a = args(&["xor_1_of_2", "xor_2_of_2"], &[("xor_2_of_2", 0.5)]);
        let scores = scores_from_args(&a);
        assert_eq!(scores[&"xor_1_of_2".parse::<FragmentType>().unwrap()], 1.0);
        assert_eq!(scores[&"xor_2_of_2".parse::<FragmentType>().unwrap()], 0.5);
    }

    #[test]
    fn test_render_plan() {
        let a = args(&["xor_1_of_3", "xor_2_of_3", "xor_p_of_3"], &[]);
        let planner = prepared_planner(PlannerConfig::default(), &a).unwrap();
        let text = render_plan(&planner.build_plan_for(0, 6).unwrap());
        assert!(text.starts_with("blocks 0..6\n"));
        assert!(text.contains("out    2 <- xor #0[0] #1[0] #2[0]"));
        assert!(text.ends_with("3 reads, 6 blocks read, 4 copied, 2 rebuilt\n"));
    }

    #[test]
    fn test_plan_first_past_chunk_is_out_of_bounds() {
        let a = args(&["standard"], &[]);
        assert!(matches!(
            handle_plan(PlannerConfig::default(), &a, BLOCKS_PER_CHUNK, None, false),
            Err(PlanError::RangeOutOfBounds { first_block: 1024, .. })
        ));
        handle_plan(PlannerConfig::default(), &a, BLOCKS_PER_CHUNK - 1, None, false).unwrap();
    }

    #[test]
    fn test_simulate_rejects_impossible_sets() {
        let a = args(&["xor_1_of_3"], &[]);
        assert!(matches!(
            handle_simulate(PlannerConfig::default(), &a, 4, "seed"),
            Err(PlanError::ReadingImpossible)
        ));
    }

    #[test]
    fn test_simulate_reconstructing_level() {
        let a = args(
            &[
                "xor_1_of_6",
                "xor_2_of_6",
                "xor_4_of_6",
                "xor_5_of_6",
                "xor_6_of_6",
                "xor_p_of_6",
            ],
            &[],
        );
        handle_simulate(PlannerConfig::default(), &a, 3, "seed").unwrap();
    }

    #[test]
    fn test_load_config() {
        assert_eq!(load_config(None).unwrap(), PlannerConfig::default());
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"aggregation": "mean"}}"#).unwrap();
        let c = load_config(Some(f.path())).unwrap();
        assert_eq!(c.aggregation, chunkplan_core::ScoreAggregation::Mean);
    }
}
