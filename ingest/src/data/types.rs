//! Row handles shared by all tables

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Opaque track handle
    TrackId(u32)
);

id_type!(
    /// Row index in the slice table
    SliceId(u32)
);

id_type!(
    /// Explicit or synthesized flow id
    FlowId(u64)
);

id_type!(
    /// Handle into the string pool
    StringId(u32)
);
