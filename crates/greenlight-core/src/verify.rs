//! Signature verification against a trust snapshot
//!
//! A credential is trusted when any certificate in the snapshot validates
//! its signature; iteration order carries no semantic weight. Certificates
//! that cannot be parsed, or whose key material cannot be applied, count as
//! "does not validate" and never abort the scan. Every attempt is recorded
//! so callers can surface diagnostics instead of a bare catch-and-ignore.

use std::collections::HashSet;

use tracing::debug;

use crate::credential::DecodedCredential;
use crate::keys::SignerCertificate;

/// An immutable, consistent pair of (valid key-id set, certificate list).
///
/// Consistency is enforced by construction: certificates whose key id is
/// not in the valid-id set never enter the snapshot. Publication of a new
/// snapshot is the owner's concern (see `greenlight-server`); a snapshot
/// itself never mutates.
#[derive(Debug, Clone)]
pub struct TrustSnapshot {
    valid_kids: HashSet<String>,
    certificates: Vec<SignerCertificate>,
}

impl TrustSnapshot {
    /// Build a snapshot, dropping any certificate whose key id is not in
    /// `valid_kids`.
    pub fn new(valid_kids: HashSet<String>, certificates: Vec<SignerCertificate>) -> Self {
        let certificates = certificates
            .into_iter()
            .filter(|cert| valid_kids.contains(&cert.kid))
            .collect();
        Self {
            valid_kids,
            certificates,
        }
    }

    /// A snapshot trusting nothing.
    pub fn empty() -> Self {
        Self {
            valid_kids: HashSet::new(),
            certificates: Vec::new(),
        }
    }

    /// The set of currently-valid key ids.
    pub fn valid_kids(&self) -> &HashSet<String> {
        &self.valid_kids
    }

    /// The trusted certificates, in feed order.
    pub fn certificates(&self) -> &[SignerCertificate] {
        &self.certificates
    }

    /// Number of trusted certificates.
    pub fn certificate_count(&self) -> usize {
        self.certificates.len()
    }
}

/// Outcome of checking the credential against one certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The certificate's key validates the signature
    Verified,
    /// Key material was usable but the signature does not match
    SignatureMismatch,
    /// The certificate or its key material could not be used at all
    Unusable(String),
}

/// Per-certificate verification attempt, kept for diagnostics
#[derive(Debug, Clone)]
pub struct Attempt {
    /// Key id of the certificate tried
    pub kid: String,
    /// What happened
    pub outcome: AttemptOutcome,
}

/// Result of scanning a trust snapshot for a validating certificate
#[derive(Debug, Clone)]
pub struct SignatureCheck {
    /// Whether any trusted certificate validated the signature
    pub trusted: bool,
    /// Every attempt made, in scan order, ending with the first success
    pub attempts: Vec<Attempt>,
}

/// Check a credential's signature against every certificate in the
/// snapshot, returning on the first success.
///
/// Read-only with respect to the snapshot; safe to call concurrently from
/// any number of requests sharing the same snapshot reference.
pub fn verify_signature(
    credential: &DecodedCredential,
    snapshot: &TrustSnapshot,
) -> SignatureCheck {
    let mut attempts = Vec::new();

    for cert in snapshot.certificates() {
        let outcome = match cert
            .key_material()
            .and_then(|key| credential.check_signature(&key))
        {
            Ok(true) => AttemptOutcome::Verified,
            Ok(false) => AttemptOutcome::SignatureMismatch,
            Err(e) => {
                debug!(kid = %cert.kid, error = %e, "skipping unusable signer certificate");
                AttemptOutcome::Unusable(e.to_string())
            }
        };

        let verified = outcome == AttemptOutcome::Verified;
        attempts.push(Attempt {
            kid: cert.kid.clone(),
            outcome,
        });

        if verified {
            return SignatureCheck {
                trusted: true,
                attempts,
            };
        }
    }

    SignatureCheck {
        trusted: false,
        attempts,
    }
}
