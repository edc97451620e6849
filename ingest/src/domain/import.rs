//! Trace event replay
//!
//! `TraceImporter` applies decoded events in arrival order to the slice
//! stack, the flow tracker and storage. Opening a slice resolves any flow
//! ends parked on its track.
//!
//! Events are JSON objects tagged by `type`:
//!
//! ```json
//! {"type": "slice_begin", "track": 1, "ts": 100, "name": "draw"}
//! {"type": "flow_begin", "track": 1, "flow": 7}
//! {"type": "flow_end", "track": 2, "flow": 7, "bind_enclosing_slice": false}
//! {"type": "flow_v1", "track": 1, "phase": "s", "source_id": 3, "category": "gfx", "name": "frame"}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::{FlowId, FlowRow, SliceId, Stat, TraceStorage, TrackId};
use crate::domain::flows::FlowTracker;
use crate::domain::slices::SliceStack;

// ============================================================================
// EVENTS
// ============================================================================

/// Phase of a legacy flow event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum V1Phase {
    #[serde(rename = "s")]
    Begin,
    #[serde(rename = "t")]
    Step,
    #[serde(rename = "f")]
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    SliceBegin {
        track: TrackId,
        #[serde(default)]
        ts: i64,
        #[serde(default)]
        name: String,
    },
    SliceEnd {
        track: TrackId,
        #[serde(default)]
        ts: i64,
    },
    FlowBegin {
        track: TrackId,
        flow: FlowId,
    },
    FlowStep {
        track: TrackId,
        flow: FlowId,
    },
    FlowEnd {
        track: TrackId,
        flow: FlowId,
        #[serde(default = "default_bind")]
        bind_enclosing_slice: bool,
    },
    /// Legacy flow event identified by `(source_id, category, name)`
    FlowV1 {
        track: TrackId,
        phase: V1Phase,
        source_id: u64,
        #[serde(default)]
        category: String,
        #[serde(default)]
        name: String,
        /// Bind an end to the enclosing slice instead of the next one
        #[serde(default)]
        bind_to_enclosing: bool,
    },
}

fn default_bind() -> bool {
    true
}

// ============================================================================
// IMPORTER
// ============================================================================

/// Single-pass event importer for one trace
#[derive(Debug, Default)]
pub struct TraceImporter {
    storage: TraceStorage,
    slices: SliceStack,
    flows: FlowTracker,
    events: u64,
}

impl TraceImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &TraceEvent) {
        self.events += 1;
        tracing::trace!(event = ?event, "Applying event");

        match event {
            TraceEvent::SliceBegin { track, ts, name } => {
                let name = self.storage.intern_string(name);
                let slice = self.slices.begin(&mut self.storage, *track, *ts, name);
                self.flows
                    .close_pending_events_on_track(&mut self.storage, *track, slice);
            }
            TraceEvent::SliceEnd { track, ts } => {
                self.slices.end(&mut self.storage, *track, *ts);
            }
            TraceEvent::FlowBegin { track, flow } => {
                self.flows.begin(&self.slices, &mut self.storage, *track, *flow);
            }
            TraceEvent::FlowStep { track, flow } => {
                self.flows.step(&self.slices, &mut self.storage, *track, *flow);
            }
            TraceEvent::FlowEnd {
                track,
                flow,
                bind_enclosing_slice,
            } => {
                self.flows.end(
                    &self.slices,
                    &mut self.storage,
                    *track,
                    *flow,
                    *bind_enclosing_slice,
                );
            }
            TraceEvent::FlowV1 {
                track,
                phase,
                source_id,
                category,
                name,
                bind_to_enclosing,
            } => {
                let category = self.storage.intern_string(category);
                let name = self.storage.intern_string(name);
                let flow = self.flows.flow_id_for_v1_event(*source_id, category, name);
                match phase {
                    V1Phase::Begin => {
                        self.flows.begin(&self.slices, &mut self.storage, *track, flow)
                    }
                    V1Phase::Step => self.flows.step(&self.slices, &mut self.storage, *track, flow),
                    V1Phase::End => self.flows.end(
                        &self.slices,
                        &mut self.storage,
                        *track,
                        flow,
                        *bind_to_enclosing,
                    ),
                }
            }
        }
    }

    pub fn apply_all<'a>(&mut self, events: impl IntoIterator<Item = &'a TraceEvent>) {
        for event in events {
            self.apply(event);
        }
    }

    pub fn storage(&self) -> &TraceStorage {
        &self.storage
    }

    pub fn flows(&self) -> &FlowTracker {
        &self.flows
    }

    fn slice_summaries(&self) -> Vec<SliceSummary> {
        let strings = self.storage.string_pool();
        self.storage
            .slice_table()
            .rows()
            .iter()
            .enumerate()
            .map(|(index, row)| SliceSummary {
                id: SliceId(index as u32),
                track: row.track,
                name: strings.get(row.name).unwrap_or_default().to_string(),
                ts: row.ts,
                dur: row.dur,
                depth: row.depth,
            })
            .collect()
    }

    pub fn summary(&self) -> ReplaySummary {
        ReplaySummary {
            events: self.events,
            slices: self.slice_summaries(),
            flows: self.storage.flow_table().rows().to_vec(),
            stats: self.storage.stats().to_map(),
        }
    }
}

/// Result of replaying an event list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub events: u64,
    pub slices: Vec<SliceSummary>,
    pub flows: Vec<FlowRow>,
    pub stats: BTreeMap<&'static str, u64>,
}

/// One slice with its name resolved from the string pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliceSummary {
    pub id: SliceId,
    pub track: TrackId,
    pub name: String,
    pub ts: i64,
    pub dur: Option<i64>,
    pub depth: u32,
}

impl ReplaySummary {
    /// Value of one counter
    pub fn stat(&self, stat: Stat) -> u64 {
        self.stats.get(stat.as_str()).copied().unwrap_or(0)
    }
}
