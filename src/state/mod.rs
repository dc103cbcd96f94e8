//! Runtime state: per-member entities, the table holding them, and the
//! scope activity monitor.

pub mod activity;
pub mod entity;
pub mod table;

pub use activity::{ActivityEvent, ActivityMonitor};
pub use entity::{EntityGuard, EntityState, Tracked};
pub use table::EntityTable;
