use crate::config::PlannerConfig;
use crate::error::{PlanError, Result};
use crate::fragment::FragmentType;
use crate::plan::builder::build_plan;
use crate::plan::read_plan::ReadPlan;
use crate::select::{ScoreMap, SelectionResult, select_parts};

/// Read planner for one chunk.
///
/// `prepare` snapshots which fragments exist and how good they are; any
/// number of `build_plan_for` calls then plan reads against that selection.
/// Call `prepare` again to re-plan after availability changes.
#[derive(Clone, Debug, Default)]
pub struct ChunkReadPlanner {
    config: PlannerConfig,
    selection: Option<SelectionResult>,
}

impl ChunkReadPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PlannerConfig) -> Self {
        Self {
            config,
            selection: None,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn prepare(&mut self, available: &[FragmentType], scores: &ScoreMap) -> Result<()> {
        self.selection = None;
        self.selection = Some(select_parts(available, scores, &self.config)?);
        Ok(())
    }

    pub fn selection(&self) -> Option<&SelectionResult> {
        self.selection.as_ref()
    }

    /// False until a successful `prepare`.
    pub fn is_reading_possible(&self) -> bool {
        self.selection.as_ref().is_some_and(|s| s.is_possible())
    }

    pub fn parts_to_use(&self) -> &[FragmentType] {
        self.selection
            .as_ref()
            .map(SelectionResult::parts)
            .unwrap_or_default()
    }

    pub fn build_plan_for(&self, first_block: u32, count: u32) -> Result<ReadPlan> {
        let selection = self.selection.as_ref().ok_or(PlanError::NotPrepared)?;
        build_plan(selection, first_block, count)
    }
}
