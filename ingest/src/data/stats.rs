//! Named diagnostic counters
//!
//! Import never fails on bad input; dropped events are counted here instead.

use std::collections::BTreeMap;

use serde::Serialize;

// ============================================================================
// STATS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    /// Flow event on a track with no open slice
    FlowNoEnclosingSlice,
    /// Flow begin for an id that already has an open endpoint
    FlowDuplicateId,
    /// Flow step for an id that was never begun
    FlowStepWithoutStart,
    /// Flow end for an id that was never begun
    FlowEndWithoutStart,
    /// Slice end on a track with no open slice
    MisplacedEndEvent,
    /// Slice end before its begin, or a duration outside `i64`
    InvalidSliceDuration,
}

impl Stat {
    pub const ALL: [Stat; 6] = [
        Stat::FlowNoEnclosingSlice,
        Stat::FlowDuplicateId,
        Stat::FlowStepWithoutStart,
        Stat::FlowEndWithoutStart,
        Stat::MisplacedEndEvent,
        Stat::InvalidSliceDuration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlowNoEnclosingSlice => "flow_no_enclosing_slice",
            Self::FlowDuplicateId => "flow_duplicate_id",
            Self::FlowStepWithoutStart => "flow_step_without_start",
            Self::FlowEndWithoutStart => "flow_end_without_start",
            Self::MisplacedEndEvent => "misplaced_end_event",
            Self::InvalidSliceDuration => "invalid_slice_duration",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Counter per `Stat`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatsTable {
    counts: [u64; Stat::ALL.len()],
}

impl StatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, stat: Stat) {
        self.counts[stat.index()] += 1;
    }

    pub fn get(&self, stat: Stat) -> u64 {
        self.counts[stat.index()]
    }

    /// Counters with a non-zero value
    pub fn non_zero(&self) -> impl Iterator<Item = (Stat, u64)> + '_ {
        Stat::ALL
            .iter()
            .map(|stat| (*stat, self.get(*stat)))
            .filter(|(_, count)| *count > 0)
    }

    /// All counters by name, for reporting
    pub fn to_map(&self) -> BTreeMap<&'static str, u64> {
        Stat::ALL
            .iter()
            .map(|stat| (stat.as_str(), self.get(*stat)))
            .collect()
    }
}
