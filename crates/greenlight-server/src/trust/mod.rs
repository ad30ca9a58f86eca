//! Trust synchronization: authority feeds, snapshot ownership and the
//! background refresh task

pub mod refresh;
pub mod store;
pub mod sync;

pub use refresh::{refresh_all, refresh_policy, refresh_trust, spawn_refresh_task, RefreshError};
pub use store::TrustContext;
pub use sync::{AuthorityFeed, FeedPage, HttpFeed, SyncError};
