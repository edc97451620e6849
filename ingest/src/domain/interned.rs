//! Interned message payloads
//!
//! Trace producers intern repeated payloads (source locations, event names,
//! ...) once and refer to them by `(field_id, iid)` afterwards, where
//! `field_id` is the field number of the payload inside the interning
//! container. `InternedDataStore` keeps the latest payload per id.

use std::collections::HashMap;
use std::sync::Arc;

use crate::utils::protowire::FieldReader;

/// Shared, immutable view over one interned payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternedMessageView {
    field_id: u32,
    iid: u64,
    payload: Arc<[u8]>,
}

impl InternedMessageView {
    pub fn new(field_id: u32, iid: u64, payload: impl Into<Arc<[u8]>>) -> Self {
        Self {
            field_id,
            iid,
            payload: payload.into(),
        }
    }

    pub fn field_id(&self) -> u32 {
        self.field_id
    }

    pub fn iid(&self) -> u64 {
        self.iid
    }

    pub fn bytes(&self) -> &[u8] {
        &self.payload
    }

    /// Raw fields of the payload
    pub fn fields(&self) -> FieldReader<'_> {
        FieldReader::new(&self.payload)
    }
}

/// In-memory interned payload store for one import session
#[derive(Debug, Default, Clone)]
pub struct InternedDataStore {
    entries: HashMap<(u32, u64), InternedMessageView>,
}

impl InternedDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a payload; a later entry with the same id replaces the earlier
    /// one, matching incremental-state resets in the trace.
    pub fn insert(&mut self, field_id: u32, iid: u64, payload: impl Into<Arc<[u8]>>) {
        let view = InternedMessageView::new(field_id, iid, payload);
        if self.entries.insert((field_id, iid), view).is_some() {
            tracing::trace!(field_id, iid, "Interned entry replaced");
        }
    }

    pub fn get(&self, field_id: u32, iid: u64) -> Option<InternedMessageView> {
        self.entries.get(&(field_id, iid)).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
