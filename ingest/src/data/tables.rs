//! In-memory tables: string pool, slices and flows

use std::collections::HashMap;

use serde::Serialize;

use super::types::{SliceId, StringId, TrackId};

// ============================================================================
// STRING POOL
// ============================================================================

/// Deduplicating string storage; `StringId(0)` is always the empty string
#[derive(Debug, Clone)]
pub struct StringPool {
    strings: Vec<String>,
    ids: HashMap<String, StringId>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self {
            strings: vec![String::new()],
            ids: HashMap::from([(String::new(), StringId(0))]),
        }
    }
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, value: &str) -> StringId {
        if let Some(id) = self.ids.get(value) {
            return *id;
        }
        let id = StringId(self.strings.len() as u32);
        self.strings.push(value.to_string());
        self.ids.insert(value.to_string(), id);
        id
    }

    pub fn get(&self, id: StringId) -> Option<&str> {
        self.strings.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

// ============================================================================
// SLICES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliceRow {
    pub track: TrackId,
    pub name: StringId,
    pub ts: i64,
    /// `None` while the slice is open
    pub dur: Option<i64>,
    pub depth: u32,
    pub parent: Option<SliceId>,
}

#[derive(Debug, Default, Clone)]
pub struct SliceTable {
    rows: Vec<SliceRow>,
}

impl SliceTable {
    pub fn insert(&mut self, row: SliceRow) -> SliceId {
        let id = SliceId(self.rows.len() as u32);
        self.rows.push(row);
        id
    }

    pub fn get(&self, id: SliceId) -> Option<&SliceRow> {
        self.rows.get(id.0 as usize)
    }

    /// Close a slice at `ts` and return its duration.
    ///
    /// Returns `None` for unknown ids, and for an end before the begin or a
    /// duration that overflows `i64`. The duration stays unset in those cases.
    pub fn set_end(&mut self, id: SliceId, ts: i64) -> Option<i64> {
        let row = self.rows.get_mut(id.0 as usize)?;
        let dur = ts.checked_sub(row.ts).filter(|dur| *dur >= 0)?;
        row.dur = Some(dur);
        Some(dur)
    }

    pub fn rows(&self) -> &[SliceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// FLOWS
// ============================================================================

/// Directed edge between two slices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlowRow {
    pub slice_out: SliceId,
    pub slice_in: SliceId,
}

/// Append-only edge table in arrival order
#[derive(Debug, Default, Clone)]
pub struct FlowTable {
    rows: Vec<FlowRow>,
}

impl FlowTable {
    pub fn insert(&mut self, slice_out: SliceId, slice_in: SliceId) {
        self.rows.push(FlowRow {
            slice_out,
            slice_in,
        });
    }

    pub fn rows(&self) -> &[FlowRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
