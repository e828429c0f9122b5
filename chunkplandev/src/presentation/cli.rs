use chunkplan_core::FragmentType;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "chunkplan dev CLI (alpha)", long_about = None)]
pub struct Cli {
    /// Planner config (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct PartArgs {
    /// Available fragment: `standard`, `xor_<n>_of_<L>` or `xor_p_of_<L>` (repeatable)
    #[arg(long = "part")]
    pub parts: Vec<FragmentType>,

    /// Score override as `<fragment>=<score>` (repeatable)
    #[arg(long = "score", value_parser = parse_score)]
    pub scores: Vec<(FragmentType, f32)>,

    /// Score for fragments without an override
    #[arg(long, default_value_t = 1.0)]
    pub default_score: f32,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show which fragments a read would use
    Select {
        #[command(flatten)]
        parts: PartArgs,
    },

    /// Print the read plan for a block range
    Plan {
        #[command(flatten)]
        parts: PartArgs,

        #[arg(long, default_value_t = 0)]
        first: u32,

        /// Number of blocks; defaults to the rest of the chunk
        #[arg(long)]
        count: Option<u32>,

        /// Emit the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Execute plans against a synthetic chunk and verify every edge range
    Simulate {
        #[command(flatten)]
        parts: PartArgs,

        /// Bytes per block in the synthetic chunk
        #[arg(long, default_value_t = 16)]
        block_size: usize,

        /// Seed for the chunk contents
        #[arg(long, default_value = "chunkplan")]
        seed: String,
    },

    /// Print a fragment's wire id and stored size
    Describe { part: FragmentType },
}

fn parse_score(s: &str) -> Result<(FragmentType, f32), String> {
    let (name, score) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <fragment>=<score>, got {s:?}"))?;
    let fragment = name.parse::<FragmentType>().map_err(|e| e.to_string())?;
    let score = score
        .parse::<f32>()
        .map_err(|e| format!("bad score {score:?}: {e}"))?;
    Ok((fragment, score))
}
