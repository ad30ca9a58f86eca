//! # Greenlight Core
//!
//! Core types and cryptographic primitives for verifying EU Digital COVID
//! Certificate (DGC) health credentials against an authority-curated trust
//! set.
//!
//! ## Key Concepts
//!
//! - **Credential**: the signed, encoded health-status record presented by a
//!   holder (`HC1:` Base45 string wrapping a COSE_Sign1 CWT)
//! - **Signer certificate**: an X.509 certificate published by the national
//!   authority; only certificates whose key id is currently valid are trusted
//! - **Trust snapshot**: an immutable, atomically-published pair of
//!   (valid key-id set, certificate list) used for signature verification
//!
//! This crate is purely computational: no network access and no shared
//! mutable state. Synchronization of the trust set from the remote authority
//! lives in `greenlight-server`.

pub mod credential;
pub mod decode;
pub mod error;
pub mod keys;
pub mod verify;

pub use credential::{
    CredentialKind, DecodedCredential, Holder, RecoveryRecord, TestRecord, VaccinationRecord,
};
pub use decode::decode;
pub use error::{DecodeError, KeyError};
pub use keys::{KeyMaterial, SignerCertificate};
pub use verify::{verify_signature, Attempt, AttemptOutcome, SignatureCheck, TrustSnapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
