//! Decoded health credential model
//!
//! A [`DecodedCredential`] is the structured form of an `HC1:` credential
//! string: the hcert section (exactly one of vaccination/test/recovery),
//! the holder identity fields, and the signature-check capability over the
//! original COSE_Sign1 envelope.
//!
//! The section is an exhaustive tagged union ([`CredentialKind`]) rather
//! than three optional fields, so downstream dispatch is forced to handle
//! every kind and the "no section present" case is rejected at decode time.

use p256::ecdsa::signature::Verifier;
use rsa::BigUint;
use sha2::Sha256;

use crate::error::KeyError;
use crate::keys::KeyMaterial;

/// Holder identity fields from the hcert `nam`/`dob` claims
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holder {
    /// Surname(s)
    pub surname: String,
    /// Forename(s)
    pub forename: String,
    /// Date of birth, ISO 8601 date string
    pub date_of_birth: String,
}

/// Vaccination section (`v`) of an hcert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaccinationRecord {
    /// Targeted disease (SNOMED CT code)
    pub targeted_disease: String,
    /// Medicinal product id (e.g. `EU/1/20/1528`)
    pub medicinal_product: String,
    /// Marketing authorization holder
    pub manufacturer: String,
    /// Dose number in the series
    pub dose_number: u32,
    /// Total doses in the series
    pub total_doses: u32,
    /// Date of vaccination, ISO 8601 date string
    pub date: String,
    /// Country of vaccination
    pub country: String,
    /// Certificate issuer
    pub issuer: String,
    /// Unique certificate identifier (UVCI)
    pub certificate_id: String,
}

/// Test section (`t`) of an hcert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    /// Targeted disease (SNOMED CT code)
    pub targeted_disease: String,
    /// Type of test (LOINC code: `LP6464-4` molecular, `LP217198-3` rapid)
    pub test_type: String,
    /// Test result (SNOMED CT code: `260415000` not detected,
    /// `260373001` detected)
    pub result: String,
    /// Date/time of sample collection, ISO 8601 timestamp
    pub sample_collected_at: String,
    /// Country of test
    pub country: String,
    /// Certificate issuer
    pub issuer: String,
    /// Unique certificate identifier (UVCI)
    pub certificate_id: String,
}

/// Recovery section (`r`) of an hcert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryRecord {
    /// Targeted disease (SNOMED CT code)
    pub targeted_disease: String,
    /// Date of first positive test result, ISO 8601 date string
    pub first_positive_date: String,
    /// Certificate valid from, ISO 8601 date string
    pub valid_from: String,
    /// Certificate valid until, ISO 8601 date string
    pub valid_until: String,
    /// Country of test
    pub country: String,
    /// Certificate issuer
    pub issuer: String,
    /// Unique certificate identifier (UVCI)
    pub certificate_id: String,
}

/// The hcert section carried by a credential, exactly one of three kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialKind {
    Vaccination(VaccinationRecord),
    Test(TestRecord),
    Recovery(RecoveryRecord),
}

impl CredentialKind {
    /// The unique certificate identifier (UVCI) of the section, used for
    /// individual revocation checks
    pub fn certificate_id(&self) -> &str {
        match self {
            CredentialKind::Vaccination(v) => &v.certificate_id,
            CredentialKind::Test(t) => &t.certificate_id,
            CredentialKind::Recovery(r) => &r.certificate_id,
        }
    }

    /// Human-readable name of the section kind
    pub fn name(&self) -> &'static str {
        match self {
            CredentialKind::Vaccination(_) => "vaccination",
            CredentialKind::Test(_) => "test",
            CredentialKind::Recovery(_) => "recovery",
        }
    }
}

/// A fully decoded health credential
///
/// `signed_data` is the COSE `Sig_structure` serialization of the original
/// envelope and `signature` its raw signature bytes; together they form the
/// signature-check capability used by
/// [`verify_signature`](crate::verify::verify_signature).
#[derive(Debug, Clone)]
pub struct DecodedCredential {
    /// The hcert section
    pub kind: CredentialKind,
    /// Holder identity
    pub holder: Holder,
    /// Key id from the COSE header, base64-encoded, if present
    pub kid: Option<String>,
    /// COSE `Sig_structure` bytes the signature was computed over
    pub signed_data: Vec<u8>,
    /// Raw signature bytes from the COSE envelope
    pub signature: Vec<u8>,
}

impl DecodedCredential {
    /// Check the credential signature against one candidate key.
    ///
    /// EC keys verify with ES256 (ECDSA P-256 over SHA-256, raw `r || s`
    /// signature); RSA keys verify with PS256 (RSASSA-PSS over SHA-256),
    /// matching DGC signing practice.
    ///
    /// Returns `Ok(false)` on an honest signature mismatch; `Err` is
    /// reserved for key material or signature bytes that cannot be
    /// interpreted at all.
    pub fn check_signature(&self, key: &KeyMaterial) -> Result<bool, KeyError> {
        match key {
            KeyMaterial::Ec { x, y } => {
                let mut sec1 = Vec::with_capacity(1 + x.len() + y.len());
                sec1.push(0x04);
                sec1.extend_from_slice(x);
                sec1.extend_from_slice(y);
                let vk = p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|_| KeyError::MalformedEcPoint)?;
                let sig = p256::ecdsa::Signature::from_slice(&self.signature)
                    .map_err(|e| KeyError::Signature(e.to_string()))?;
                Ok(vk.verify(&self.signed_data, &sig).is_ok())
            }
            KeyMaterial::Rsa { modulus, exponent } => {
                let key = rsa::RsaPublicKey::new(
                    BigUint::from_bytes_be(modulus),
                    BigUint::from_bytes_be(exponent),
                )
                .map_err(|e| KeyError::Rsa(e.to_string()))?;
                let vk = rsa::pss::VerifyingKey::<Sha256>::new(key);
                let sig = rsa::pss::Signature::try_from(self.signature.as_slice())
                    .map_err(|e| KeyError::Signature(e.to_string()))?;
                Ok(vk.verify(&self.signed_data, &sig).is_ok())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vaccination_kind() -> CredentialKind {
        CredentialKind::Vaccination(VaccinationRecord {
            targeted_disease: "840539006".into(),
            medicinal_product: "EU/1/20/1528".into(),
            manufacturer: "ORG-100030215".into(),
            dose_number: 2,
            total_doses: 2,
            date: "2021-06-01".into(),
            country: "IT".into(),
            issuer: "Ministero della Salute".into(),
            certificate_id: "01IT053059F7676042D9BEE9F874C4901F9B#3".into(),
        })
    }

    #[test]
    fn certificate_id_comes_from_the_active_section() {
        let kind = vaccination_kind();
        assert_eq!(
            kind.certificate_id(),
            "01IT053059F7676042D9BEE9F874C4901F9B#3"
        );
        assert_eq!(kind.name(), "vaccination");
    }

    #[test]
    fn check_signature_rejects_garbage_ec_point() {
        let credential = DecodedCredential {
            kind: vaccination_kind(),
            holder: Holder {
                surname: "ROSSI".into(),
                forename: "MARIO".into(),
                date_of_birth: "1980-01-01".into(),
            },
            kid: None,
            signed_data: b"payload".to_vec(),
            signature: vec![0u8; 64],
        };

        let bogus = KeyMaterial::Ec {
            x: vec![0u8; 32],
            y: vec![0u8; 32],
        };
        assert!(matches!(
            credential.check_signature(&bogus),
            Err(KeyError::MalformedEcPoint)
        ));
    }
}
