use crate::config::PlannerConfig;
use crate::error::{PlanError, Result};
use crate::fragment::{FragmentType, XorSlot};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, trace};

pub type Score = f32;
pub type ScoreMap = HashMap<FragmentType, Score>;

/// How a selected fragment set answers reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ReadStrategy {
    Standard,
    /// Every data part of `level` is present.
    Striped { level: u8 },
    /// Data part `missing` is rebuilt from the other parts and parity.
    Reconstructing { level: u8, missing: u8 },
}

impl ReadStrategy {
    pub fn needs_reconstruction(&self) -> bool {
        matches!(self, ReadStrategy::Reconstructing { .. })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SelectionResult {
    parts: Vec<FragmentType>,
    strategy: Option<ReadStrategy>,
    score: Option<Score>,
}

impl SelectionResult {
    pub fn impossible() -> Self {
        Self::default()
    }

    pub fn is_possible(&self) -> bool {
        self.strategy.is_some()
    }

    /// Canonical order, deduplicated; empty iff reading is impossible.
    pub fn parts(&self) -> &[FragmentType] {
        &self.parts
    }

    pub fn strategy(&self) -> Option<ReadStrategy> {
        self.strategy
    }

    /// Aggregated score of the chosen set.
    pub fn score(&self) -> Option<Score> {
        self.score
    }
}

#[derive(Default)]
struct LevelParts {
    data: BTreeSet<u8>,
    parity: bool,
}

struct Layout {
    level: u8,
    strategy: ReadStrategy,
    parts: Vec<FragmentType>,
}

struct Candidate {
    level: u8,
    strategy: ReadStrategy,
    parts: Vec<FragmentType>,
    score: Score,
}

pub fn select_parts(
    available: &[FragmentType],
    scores: &ScoreMap,
    config: &PlannerConfig,
) -> Result<SelectionResult> {
    let unique: BTreeSet<FragmentType> = available.iter().copied().collect();

    if unique.contains(&FragmentType::Standard) {
        let score = score_of(scores, FragmentType::Standard)?;
        debug!(available = unique.len(), "standard replica selected");
        return Ok(SelectionResult {
            parts: vec![FragmentType::Standard],
            strategy: Some(ReadStrategy::Standard),
            score: Some(score),
        });
    }

    let mut levels: BTreeMap<u8, LevelParts> = BTreeMap::new();
    for f in &unique {
        if let FragmentType::Xor(x) = f {
            let entry = levels.entry(x.level()).or_default();
            match x.slot() {
                XorSlot::Data(part) => {
                    entry.data.insert(part);
                }
                XorSlot::Parity => entry.parity = true,
            }
        }
    }

    let mut layouts = Vec::new();
    for (&level, parts) in &levels {
        match layout_for(level, parts)? {
            Some(layout) => layouts.push(layout),
            None => trace!(
                level,
                present = parts.data.len(),
                parity = parts.parity,
                "level unusable"
            ),
        }
    }
    // only the group that can win is scored
    if layouts.iter().any(|l| !l.strategy.needs_reconstruction()) {
        layouts.retain(|l| !l.strategy.needs_reconstruction());
    }

    let mut best: Option<Candidate> = None;
    for layout in layouts {
        let candidate = layout.scored(scores, config)?;
        trace!(
            level = candidate.level,
            score = candidate.score,
            strategy = ?candidate.strategy,
            "level usable"
        );
        if best
            .as_ref()
            .is_none_or(|b| rank(&candidate, b, config) == Ordering::Greater)
        {
            best = Some(candidate);
        }
    }

    match best {
        Some(c) => {
            debug!(level = c.level, score = c.score, strategy = ?c.strategy, "xor level selected");
            Ok(SelectionResult {
                parts: c.parts,
                strategy: Some(c.strategy),
                score: Some(c.score),
            })
        }
        None => {
            debug!(available = unique.len(), "no fragment combination can serve reads");
            Ok(SelectionResult::impossible())
        }
    }
}

fn layout_for(level: u8, present: &LevelParts) -> Result<Option<Layout>> {
    let missing = level as usize - present.data.len();
    let mut parts = present
        .data
        .iter()
        .map(|&part| FragmentType::xor_data(level, part))
        .collect::<Result<Vec<_>>>()?;

    let strategy = match missing {
        0 => ReadStrategy::Striped { level },
        1 if present.parity => {
            let Some(lost) = (1..=level).find(|p| !present.data.contains(p)) else {
                return Ok(None);
            };
            parts.push(FragmentType::xor_parity(level)?);
            ReadStrategy::Reconstructing {
                level,
                missing: lost,
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(Layout {
        level,
        strategy,
        parts,
    }))
}

impl Layout {
    fn scored(self, scores: &ScoreMap, config: &PlannerConfig) -> Result<Candidate> {
        let part_scores = self
            .parts
            .iter()
            .map(|&f| score_of(scores, f))
            .collect::<Result<Vec<_>>>()?;
        Ok(Candidate {
            level: self.level,
            strategy: self.strategy,
            score: config.aggregation.aggregate(&part_scores),
            parts: self.parts,
        })
    }
}

fn rank(a: &Candidate, b: &Candidate, config: &PlannerConfig) -> Ordering {
    let by_level = if config.prefer_wider_levels {
        a.level.cmp(&b.level)
    } else {
        b.level.cmp(&a.level)
    };
    b.strategy
        .needs_reconstruction()
        .cmp(&a.strategy.needs_reconstruction())
        .then(a.score.total_cmp(&b.score))
        .then(by_level)
}

fn score_of(scores: &ScoreMap, fragment: FragmentType) -> Result<Score> {
    let score = *scores
        .get(&fragment)
        .ok_or(PlanError::MissingScore(fragment))?;
    if !score.is_finite() || score < 0.0 {
        return Err(PlanError::InvalidScore { fragment, score });
    }
    Ok(score)
}
