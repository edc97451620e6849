//! Trace storage
//!
//! - `types` - row handles (`TrackId`, `SliceId`, `FlowId`, `StringId`)
//! - `tables` - string pool, slice table and the append-only flow table
//! - `stats` - named counters for dropped or anomalous events

mod stats;
mod tables;
mod types;

pub use stats::{Stat, StatsTable};
pub use tables::{FlowRow, FlowTable, SliceRow, SliceTable, StringPool};
pub use types::{FlowId, SliceId, StringId, TrackId};

/// All tables produced by one import session
#[derive(Debug, Default, Clone)]
pub struct TraceStorage {
    strings: StringPool,
    slices: SliceTable,
    flows: FlowTable,
    stats: StatsTable,
}

impl TraceStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern_string(&mut self, value: &str) -> StringId {
        self.strings.intern(value)
    }

    pub fn string_pool(&self) -> &StringPool {
        &self.strings
    }

    pub fn slice_table(&self) -> &SliceTable {
        &self.slices
    }

    pub fn slice_table_mut(&mut self) -> &mut SliceTable {
        &mut self.slices
    }

    pub fn flow_table(&self) -> &FlowTable {
        &self.flows
    }

    pub fn flow_table_mut(&mut self) -> &mut FlowTable {
        &mut self.flows
    }

    pub fn stats(&self) -> &StatsTable {
        &self.stats
    }

    pub fn increment_stat(&mut self, stat: Stat) {
        self.stats.increment(stat);
    }
}
