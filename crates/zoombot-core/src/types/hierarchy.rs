//! Ordered ladder of timeframes used for zooming in and out.

use serde::{Deserialize, Serialize};

use super::Timeframe;
use crate::error::HierarchyError;

/// Timeframes ranked from finest (rank 0) to coarsest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Timeframe>", into = "Vec<Timeframe>")]
pub struct TimeframeHierarchy {
    levels: Vec<Timeframe>,
}

impl TimeframeHierarchy {
    /// Build a hierarchy from an ordered list.
    ///
    /// The list must be non-empty and strictly increasing in duration.
    pub fn new(levels: Vec<Timeframe>) -> Result<Self, HierarchyError> {
        if levels.is_empty() {
            return Err(HierarchyError::Invalid(
                "hierarchy needs at least one timeframe".into(),
            ));
        }
        if let Some(pair) = levels.windows(2).find(|w| w[0].as_secs() >= w[1].as_secs()) {
            return Err(HierarchyError::Invalid(format!(
                "{} must be finer than {}",
                pair[0], pair[1]
            )));
        }
        Ok(Self { levels })
    }

    /// Rank of a timeframe (0 = finest), if it belongs to the hierarchy.
    pub fn rank(&self, timeframe: Timeframe) -> Option<usize> {
        self.levels.iter().position(|&tf| tf == timeframe)
    }

    /// Whether the timeframe is part of the hierarchy.
    pub fn contains(&self, timeframe: Timeframe) -> bool {
        self.rank(timeframe).is_some()
    }

    /// Next lower-duration timeframe.
    pub fn finer(&self, timeframe: Timeframe) -> Result<Timeframe, HierarchyError> {
        let rank = self
            .rank(timeframe)
            .ok_or(HierarchyError::UnknownTimeframe(timeframe))?;
        rank.checked_sub(1)
            .map(|r| self.levels[r])
            .ok_or(HierarchyError::NoFinerTimeframe(timeframe))
    }

    /// Next higher-duration timeframe.
    pub fn coarser(&self, timeframe: Timeframe) -> Result<Timeframe, HierarchyError> {
        let rank = self
            .rank(timeframe)
            .ok_or(HierarchyError::UnknownTimeframe(timeframe))?;
        self.levels
            .get(rank + 1)
            .copied()
            .ok_or(HierarchyError::NoCoarserTimeframe(timeframe))
    }

    /// All levels, finest first.
    pub fn levels(&self) -> &[Timeframe] {
        &self.levels
    }

    pub fn finest(&self) -> Timeframe {
        self.levels[0]
    }

    pub fn coarsest(&self) -> Timeframe {
        self.levels[self.levels.len() - 1]
    }
}

impl Default for TimeframeHierarchy {
    fn default() -> Self {
        Self {
            levels: vec![
                Timeframe::Minute1,
                Timeframe::Minute5,
                Timeframe::Hour1,
                Timeframe::Hour4,
                Timeframe::Daily,
            ],
        }
    }
}

impl TryFrom<Vec<Timeframe>> for TimeframeHierarchy {
    type Error = HierarchyError;

    fn try_from(levels: Vec<Timeframe>) -> Result<Self, Self::Error> {
        Self::new(levels)
    }
}

impl From<TimeframeHierarchy> for Vec<Timeframe> {
    fn from(hierarchy: TimeframeHierarchy) -> Self {
        hierarchy.levels
    }
}
