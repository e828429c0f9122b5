use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the scores of a candidate fragment set fold into one rank value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreAggregation {
    /// Slowest member gates the whole parallel read.
    #[default]
    Bottleneck,
    Mean,
}

impl ScoreAggregation {
    pub fn aggregate(&self, scores: &[f32]) -> f32 {
        match self {
            ScoreAggregation::Bottleneck => scores.iter().copied().fold(f32::INFINITY, f32::min),
            ScoreAggregation::Mean if scores.is_empty() => 0.0,
            ScoreAggregation::Mean => scores.iter().sum::<f32>() / scores.len() as f32,
        }
    }
}

/// Tie-break policy for choosing among usable XOR levels.
///
/// Levels needing no reconstruction always win over levels that do; this
/// config only orders levels inside those two groups.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    pub aggregation: ScoreAggregation,
    /// On equal scores prefer the wider level (more, smaller fragments).
    pub prefer_wider_levels: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            aggregation: ScoreAggregation::Bottleneck,
            prefer_wider_levels: true,
        }
    }
}

impl PlannerConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlanError;
    use std::io::Write;

    #[test]
    fn test_aggregate() {
        let s = [0.5, 2.0, 1.5];
        assert_eq!(ScoreAggregation::Bottleneck.aggregate(&s), 0.5);
        assert!((ScoreAggregation::Mean.aggregate(&s) - (4.0 / 3.0)).abs() < 1e-6);
    }

    #[test]
    fn test_defaults_when_fields_missing() {
        let c = PlannerConfig::from_json_str("{}").unwrap();
        assert_eq!(c, PlannerConfig::default());
        let c = PlannerConfig::from_json_str(r#"{"aggregation":"mean"}"#).unwrap();
        assert_eq!(c.aggregation, ScoreAggregation::Mean);
        assert!(c.prefer_wider_levels);
    }

    #[test]
    fn test_rejects_unknown_fields() {
        assert!(matches!(
            PlannerConfig::from_json_str(r#"{"aggregaton":"mean"}"#),
            Err(PlanError::Json(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"prefer_wider_levels": false}}"#).unwrap();
        let c = PlannerConfig::from_json_file(f.path()).unwrap();
        assert!(!c.prefer_wider_levels);
        assert_eq!(c.aggregation, ScoreAggregation::Bottleneck);

        let missing = f.path().with_extension("nope");
        assert!(matches!(
            PlannerConfig::from_json_file(&missing),
            Err(PlanError::Io(_))
        ));
    }
}
