//! Greenlight Verification Server
//!
//! HTTP service that verifies EU Digital COVID Certificate health
//! credentials:
//! - Synchronizes signer certificates, valid key ids, settings and the
//!   UVCI revocation list from the national authority on a schedule
//! - Verifies credential signatures against the current trust snapshot
//! - Evaluates vaccination/test/recovery policy rules and composes the
//!   accept/reject decision
//!
//! ## API Endpoints
//!
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check with trust snapshot counts
//! - `GET /v1/verify?dgc=<credential>` - Verify an encoded credential
//!
//! Verification responses are plain text: `200` with the rule message on
//! acceptance, `400` with a category-prefixed message on rejection.

pub mod api;
pub mod config;
pub mod policy;
pub mod trust;

pub use api::create_router;
pub use api::handlers::AppState;
pub use config::ServerConfig;
pub use policy::{PolicySnapshot, SettingEntry, SettingsTable, ValidationResult};
pub use trust::store::TrustContext;
pub use trust::sync::{AuthorityFeed, FeedPage, HttpFeed, SyncError};
