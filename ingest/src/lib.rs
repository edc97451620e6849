//! Trace event ingestion: flow graph reconstruction and schema-driven
//! protobuf args extraction.

mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;
