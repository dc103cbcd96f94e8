//! Typed identifiers.
//!
//! Upstream platforms hand out opaque 64-bit snowflakes for everything; the
//! newtypes keep a channel id from being passed where an item id belongs.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

snowflake!(
    /// An isolation boundary (one coordination group, e.g. a server).
    ScopeId
);
snowflake!(
    /// A participant within a scope.
    MemberId
);
snowflake!(
    /// A text or voice channel within a scope.
    ChannelId
);
snowflake!(
    /// A trackable upstream artifact (a message).
    ItemId
);
