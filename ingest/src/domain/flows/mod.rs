//! Flow events to slice-to-slice edges

mod tracker;

pub use tracker::{FlowTracker, V1FlowId};
