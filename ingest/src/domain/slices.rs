//! Per-track stacks of open slices

use std::collections::HashMap;

use crate::data::{SliceId, SliceRow, Stat, StringId, TraceStorage, TrackId};

/// Read access to the innermost open slice of a track
pub trait SliceContext {
    fn topmost_open_slice(&self, track: TrackId) -> Option<SliceId>;
}

/// Open slices per track, innermost last
#[derive(Debug, Default)]
pub struct SliceStack {
    stacks: HashMap<TrackId, Vec<SliceId>>,
}

impl SliceStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a slice on `track`, nested under the current top
    pub fn begin(
        &mut self,
        storage: &mut TraceStorage,
        track: TrackId,
        ts: i64,
        name: StringId,
    ) -> SliceId {
        let stack = self.stacks.entry(track).or_default();
        let id = storage.slice_table_mut().insert(SliceRow {
            track,
            name,
            ts,
            dur: None,
            depth: stack.len() as u32,
            parent: stack.last().copied(),
        });
        stack.push(id);
        id
    }

    /// Close the innermost slice on `track`
    pub fn end(&mut self, storage: &mut TraceStorage, track: TrackId, ts: i64) -> Option<SliceId> {
        let Some(id) = self.stacks.get_mut(&track).and_then(Vec::pop) else {
            tracing::debug!(track = %track, ts, "Slice end without open slice");
            storage.increment_stat(Stat::MisplacedEndEvent);
            return None;
        };
        if storage.slice_table_mut().set_end(id, ts).is_none() {
            tracing::debug!(track = %track, slice = %id, ts, "Slice end with invalid duration");
            storage.increment_stat(Stat::InvalidSliceDuration);
        }
        Some(id)
    }
}

impl SliceContext for SliceStack {
    fn topmost_open_slice(&self, track: TrackId) -> Option<SliceId> {
        self.stacks.get(&track).and_then(|stack| stack.last().copied())
    }
}
