//! Policy settings, revocation and rule dispatch
//!
//! The authority publishes a flat table of named settings; one reserved
//! entry carries the UVCI revocation list. A [`PolicySnapshot`] is the
//! immutable, atomically-published pair of (settings table, derived
//! revocation set) the dispatcher evaluates credentials against.

pub mod recovery;
pub mod test_rules;
pub mod vaccination;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use greenlight_core::{CredentialKind, DecodedCredential};

/// Reserved settings entry holding the revocation list; both its name and
/// its type equal this key
pub const BLACK_LIST_UVCI: &str = "black_list_uvci";

/// Delimiter between UVCIs in the revocation list value
const BLACKLIST_DELIMITER: char = ';';

/// A single `{name, type, value}` record from the settings feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub setting_type: String,
    pub value: String,
}

/// The settings table, queried by the `(name, type)` composite key
#[derive(Debug, Clone, Default)]
pub struct SettingsTable {
    entries: Vec<SettingEntry>,
}

impl SettingsTable {
    pub fn new(entries: Vec<SettingEntry>) -> Self {
        Self { entries }
    }

    /// Look up a raw setting value.
    pub fn get(&self, name: &str, setting_type: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name && e.setting_type == setting_type)
            .map(|e| e.value.as_str())
    }

    /// Look up a setting and parse it as an integer.
    pub fn integer(&self, name: &str, setting_type: &str) -> Option<i64> {
        self.get(name, setting_type)?.trim().parse().ok()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Set of individually revoked unique credential identifiers (UVCIs)
pub type RevocationSet = HashSet<String>;

/// Violations of the authority settings-feed contract
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The reserved revocation-list entry is absent. An empty revocation
    /// list is expressed as an empty value, never a missing entry, so
    /// absence means the feed is broken.
    #[error("settings feed is missing the '{BLACK_LIST_UVCI}' entry")]
    MissingRevocationList,
}

/// Derive the revocation set from the reserved settings entry: split on
/// `;`, trim each token, drop empties.
pub fn derive_revocation_set(settings: &SettingsTable) -> Result<RevocationSet, ConfigError> {
    let value = settings
        .get(BLACK_LIST_UVCI, BLACK_LIST_UVCI)
        .ok_or(ConfigError::MissingRevocationList)?;

    Ok(value
        .split(BLACKLIST_DELIMITER)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect())
}

/// Immutable pair of (settings table, derived revocation set)
#[derive(Debug, Clone)]
pub struct PolicySnapshot {
    pub settings: SettingsTable,
    pub revoked: RevocationSet,
}

impl PolicySnapshot {
    /// Build a snapshot from a freshly fetched settings table, deriving
    /// the revocation set. Fails if the revocation entry is absent.
    pub fn from_settings(entries: Vec<SettingEntry>) -> Result<Self, ConfigError> {
        let settings = SettingsTable::new(entries);
        let revoked = derive_revocation_set(&settings)?;
        info!(
            settings = settings.len(),
            revoked = revoked.len(),
            "policy snapshot built"
        );
        Ok(Self { settings, revoked })
    }
}

/// Pass/fail decision with a human-readable message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub accepted: bool,
    pub message: String,
}

impl ValidationResult {
    pub fn valid(message: impl Into<String>) -> Self {
        Self {
            accepted: true,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            message: message.into(),
        }
    }
}

/// Route a decoded credential to the rule evaluator for its kind.
///
/// The match is exhaustive over [`CredentialKind`]; a credential without a
/// recognizable section never reaches this point (the decoder rejects it),
/// so no arm can fall through to a stale result.
pub fn evaluate(policy: &PolicySnapshot, credential: &DecodedCredential) -> ValidationResult {
    evaluate_at(policy, credential, Utc::now())
}

/// [`evaluate`] with an explicit clock, for deterministic rule tests.
pub fn evaluate_at(
    policy: &PolicySnapshot,
    credential: &DecodedCredential,
    now: DateTime<Utc>,
) -> ValidationResult {
    match &credential.kind {
        CredentialKind::Vaccination(v) => {
            vaccination::evaluate(&policy.settings, &policy.revoked, v, now)
        }
        CredentialKind::Test(t) => test_rules::evaluate(&policy.settings, &policy.revoked, t, now),
        CredentialKind::Recovery(r) => recovery::evaluate(&policy.settings, &policy.revoked, r, now),
    }
}

/// Shared revocation guard: a listed UVCI forces rejection regardless of
/// every other rule outcome.
pub(crate) fn revoked_result(revoked: &RevocationSet, certificate_id: &str) -> Option<ValidationResult> {
    if revoked.contains(certificate_id) {
        Some(ValidationResult::invalid("INVALID: revoked certificate"))
    } else {
        None
    }
}
