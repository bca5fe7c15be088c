//! Directory of Slack users, channels and emoji
//!
//! Built once at startup by the [`Refresher`] (snapshot first, Slack API on a
//! miss) and read by request handlers for the rest of the process lifetime:
//! - No eviction, no TTL, no background refresh
//! - Readiness per entity type only ever moves from not-ready to ready
//! - Emoji are optional: their absence never blocks user or channel reads

mod cache;
mod fallback;
mod readiness;
mod refresh;
mod snapshot;
pub(crate) mod types;

pub use cache::{CacheStats, DirectoryCache};
pub use fallback::fallback_emoji;
pub use readiness::ReadinessGate;
pub use refresh::{RefreshReport, RefreshSource, Refresher, SnapshotStores};
pub use snapshot::SnapshotStore;
pub use types::{
    ChannelDirectory, ChannelFields, ChannelKind, ChannelRecord, EmojiDirectory, EmojiRecord,
    EntityKind, UserDirectory, UserRecord,
};
