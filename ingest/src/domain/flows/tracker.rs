//! Flow graph reconstruction
//!
//! Flow events reference slices by track: the endpoint of a flow is the
//! innermost slice open on that track when the event arrives. `FlowTracker`
//! keeps one open endpoint per flow id and appends an edge to the flow table
//! each time a step or end connects a new slice to it.
//!
//! An end event that does not bind to the enclosing slice is parked on its
//! track and resolved against the next slice that opens there.
//!
//! Nothing here fails. Inconsistent events drop their edge, bump a counter
//! in the stats table and are logged at debug level.

use std::collections::HashMap;

use crate::data::{FlowId, SliceId, Stat, StringId, TraceStorage, TrackId};
use crate::domain::slices::SliceContext;

/// Identity of a legacy flow event before it has a `FlowId`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct V1FlowId {
    pub source_id: u64,
    pub category: StringId,
    pub name: StringId,
}

#[derive(Debug, Default)]
pub struct FlowTracker {
    /// Open endpoint per flow
    flow_to_slice: HashMap<FlowId, SliceId>,
    /// Unbound flow ends waiting for the next slice on the track
    pending: HashMap<TrackId, Vec<FlowId>>,
    v1_ids: HashMap<V1FlowId, FlowId>,
    next_v1_id: u64,
}

impl FlowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the enclosing slice on `track` as the start of `flow`
    pub fn begin(
        &mut self,
        slices: &dyn SliceContext,
        storage: &mut TraceStorage,
        track: TrackId,
        flow: FlowId,
    ) {
        let Some(slice) = enclosing_slice(slices, storage, track, flow) else {
            return;
        };
        if let Some(existing) = self.flow_to_slice.get(&flow) {
            tracing::debug!(flow = %flow, existing = %existing, slice = %slice, "Duplicate flow begin");
            storage.increment_stat(Stat::FlowDuplicateId);
            return;
        }
        self.flow_to_slice.insert(flow, slice);
    }

    /// Connect the open endpoint of `flow` to the enclosing slice, which
    /// becomes the new open endpoint
    pub fn step(
        &mut self,
        slices: &dyn SliceContext,
        storage: &mut TraceStorage,
        track: TrackId,
        flow: FlowId,
    ) {
        let Some(slice) = enclosing_slice(slices, storage, track, flow) else {
            return;
        };
        let Some(open) = self.flow_to_slice.get_mut(&flow) else {
            tracing::debug!(flow = %flow, track = %track, "Flow step without start");
            storage.increment_stat(Stat::FlowStepWithoutStart);
            return;
        };
        storage.flow_table_mut().insert(*open, slice);
        *open = slice;
    }

    /// Terminate `flow`.
    ///
    /// With `bind_enclosing_slice` the edge ends at the enclosing slice on
    /// `track` and the flow is closed. Otherwise the flow waits for the next
    /// slice that opens on `track`.
    pub fn end(
        &mut self,
        slices: &dyn SliceContext,
        storage: &mut TraceStorage,
        track: TrackId,
        flow: FlowId,
        bind_enclosing_slice: bool,
    ) {
        if !bind_enclosing_slice {
            self.pending.entry(track).or_default().push(flow);
            return;
        }
        let Some(slice) = enclosing_slice(slices, storage, track, flow) else {
            return;
        };
        let Some(open) = self.flow_to_slice.remove(&flow) else {
            tracing::debug!(flow = %flow, track = %track, "Flow end without start");
            storage.increment_stat(Stat::FlowEndWithoutStart);
            return;
        };
        storage.flow_table_mut().insert(open, slice);
    }

    /// Resolve flows parked on `track` against the slice that just opened.
    ///
    /// The open endpoint of each resolved flow is kept, so a later step on
    /// the same id still connects from it.
    pub fn close_pending_events_on_track(
        &mut self,
        storage: &mut TraceStorage,
        track: TrackId,
        slice: SliceId,
    ) {
        let Some(pending) = self.pending.remove(&track) else {
            return;
        };
        for flow in pending {
            match self.flow_to_slice.get(&flow) {
                Some(open) => storage.flow_table_mut().insert(*open, slice),
                None => {
                    tracing::debug!(flow = %flow, track = %track, "Pending flow end without start");
                    storage.increment_stat(Stat::FlowEndWithoutStart);
                }
            }
        }
    }

    /// Id for a legacy flow event, allocated on first use of the triple
    pub fn flow_id_for_v1_event(
        &mut self,
        source_id: u64,
        category: StringId,
        name: StringId,
    ) -> FlowId {
        let key = V1FlowId {
            source_id,
            category,
            name,
        };
        *self.v1_ids.entry(key).or_insert_with(|| {
            let id = FlowId(self.next_v1_id);
            self.next_v1_id += 1;
            id
        })
    }

    /// Current open endpoint of `flow`
    pub fn open_slice(&self, flow: FlowId) -> Option<SliceId> {
        self.flow_to_slice.get(&flow).copied()
    }

    /// Flows parked on `track`, in arrival order
    pub fn pending_on_track(&self, track: TrackId) -> &[FlowId] {
        self.pending.get(&track).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn enclosing_slice(
    slices: &dyn SliceContext,
    storage: &mut TraceStorage,
    track: TrackId,
    flow: FlowId,
) -> Option<SliceId> {
    let slice = slices.topmost_open_slice(track);
    if slice.is_none() {
        tracing::debug!(flow = %flow, track = %track, "Flow event without enclosing slice");
        storage.increment_stat(Stat::FlowNoEnclosingSlice);
    }
    slice
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
