//! # queuewarden-proto
//!
//! Shared vocabulary between the queuewarden engine and whatever shim feeds
//! it upstream events.
//!
//! - Typed identifiers for scopes, members, channels and items
//! - The fixed annotation spectrum and its emoji encoding
//! - Snapshots of upstream items, channels and members
//! - The serde wire form of upstream events (one JSON object per line)

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod annotation;
pub mod error;
pub mod event;
pub mod ids;
pub mod item;

pub use annotation::{Annotation, AnnotationSet};
pub use error::ProtoError;
pub use event::{ScopeSetup, UpstreamEvent};
pub use ids::{ChannelId, ItemId, MemberId, ScopeId};
pub use item::{ChannelInfo, ChannelKind, Item, MemberInfo, Reaction};
