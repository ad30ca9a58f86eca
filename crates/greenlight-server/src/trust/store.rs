//! Shared ownership of the published trust and policy snapshots
//!
//! The context holds the only mutable state in the process: which
//! snapshot is current. Snapshots themselves are immutable; publication
//! replaces the `Arc` under a short write lock, so readers observe either
//! the fully-old or the fully-new snapshot, never a mixture. Request
//! handlers clone the `Arc` once at the start of processing and keep using
//! it even if a refresh commits mid-request.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::info;

use greenlight_core::TrustSnapshot;

use crate::policy::PolicySnapshot;

/// A snapshot paired with the instant it was published
struct Published<T> {
    snapshot: Arc<T>,
    at: DateTime<Utc>,
}

impl<T> Published<T> {
    fn new(snapshot: T) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            at: Utc::now(),
        }
    }
}

/// Owner of the current trust and policy snapshots
pub struct TrustContext {
    trust: RwLock<Published<TrustSnapshot>>,
    policy: RwLock<Published<PolicySnapshot>>,
}

impl TrustContext {
    /// Create a context from the initial snapshots.
    pub fn new(trust: TrustSnapshot, policy: PolicySnapshot) -> Self {
        Self {
            trust: RwLock::new(Published::new(trust)),
            policy: RwLock::new(Published::new(policy)),
        }
    }

    /// The currently-published trust snapshot.
    pub fn trust(&self) -> Arc<TrustSnapshot> {
        self.trust.read().unwrap().snapshot.clone()
    }

    /// The currently-published policy snapshot.
    pub fn policy(&self) -> Arc<PolicySnapshot> {
        self.policy.read().unwrap().snapshot.clone()
    }

    /// Instant the current trust snapshot was published.
    pub fn trust_published_at(&self) -> DateTime<Utc> {
        self.trust.read().unwrap().at
    }

    /// Instant the current policy snapshot was published.
    pub fn policy_published_at(&self) -> DateTime<Utc> {
        self.policy.read().unwrap().at
    }

    /// Atomically replace the trust snapshot.
    pub fn publish_trust(&self, snapshot: TrustSnapshot) {
        let certificates = snapshot.certificate_count();
        let kids = snapshot.valid_kids().len();
        *self.trust.write().unwrap() = Published::new(snapshot);
        info!(certificates, valid_kids = kids, "trust snapshot published");
    }

    /// Atomically replace the policy snapshot.
    pub fn publish_policy(&self, snapshot: PolicySnapshot) {
        let revoked = snapshot.revoked.len();
        *self.policy.write().unwrap() = Published::new(snapshot);
        info!(revoked, "policy snapshot published");
    }
}
