//! Trace ingestion domain logic
//!
//! - `args` - protobuf message to key/value args conversion
//! - `descriptors` - runtime protobuf schema registry
//! - `flows` - flow event to slice edge reconstruction
//! - `import` - ordered replay of trace events
//! - `interned` - interned payload store
//! - `slices` - per-track open slice stacks

pub mod args;
pub mod descriptors;
pub mod flows;
pub mod import;
pub mod interned;
pub mod slices;

pub use args::{ArgsCollector, ArgsError, ArgsSink, ProtoToArgsParser};
pub use descriptors::DescriptorPool;
pub use flows::FlowTracker;
pub use import::{ReplaySummary, SliceSummary, TraceEvent, TraceImporter};
pub use interned::InternedDataStore;
pub use slices::{SliceContext, SliceStack};
