//! Protobuf message to key/value args conversion
//!
//! - `ProtoToArgsParser` - schema-driven walker with overrides and interned
//!   references
//! - `ArgsSink` - destination of typed emissions
//! - `ArgsCollector` - in-memory sink producing `ArgRow`s
//! - `Key` / `KeyScope` - flat and full key paths

mod collector;
mod error;
mod key;
mod parser;
mod sink;

pub use collector::{ArgRow, ArgValue, ArgsCollector};
pub use error::ArgsError;
pub use key::{Key, KeyScope};
pub use parser::{OverrideOutcome, ParsingOverride, ProtoToArgsParser};
pub use sink::ArgsSink;
