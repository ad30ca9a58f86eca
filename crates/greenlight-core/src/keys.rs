//! Signer certificates and key material extraction
//!
//! The authority feed delivers each signer certificate as a base64 body
//! tagged with its key id. Bodies are wrapped in standard certificate armor
//! at ingestion and parsed lazily at verification time, so one malformed
//! entry degrades to "does not validate" instead of poisoning the snapshot.

use x509_parser::pem::parse_x509_pem;
use x509_parser::public_key::PublicKey;

use crate::error::KeyError;

/// A trusted signer certificate from the authority feed. Immutable once
/// constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerCertificate {
    /// Key id (base64) the authority tagged the certificate with
    pub kid: String,
    /// PEM-armored certificate
    pub pem: String,
}

impl SignerCertificate {
    /// Wrap a raw base64 certificate body from the update feed in PEM armor.
    pub fn from_feed(kid: impl Into<String>, body: &str) -> Self {
        let mut pem = String::from("-----BEGIN CERTIFICATE-----\n");
        let body = body.trim();
        for chunk in body.as_bytes().chunks(64) {
            // Feed bodies are ASCII base64; chunk boundaries are safe.
            pem.push_str(std::str::from_utf8(chunk).unwrap_or_default());
            pem.push('\n');
        }
        pem.push_str("-----END CERTIFICATE-----\n");

        Self {
            kid: kid.into(),
            pem,
        }
    }

    /// Construct from an already-armored PEM string.
    pub fn from_pem(kid: impl Into<String>, pem: impl Into<String>) -> Self {
        Self {
            kid: kid.into(),
            pem: pem.into(),
        }
    }

    /// Extract the public key material from the certificate.
    pub fn key_material(&self) -> Result<KeyMaterial, KeyError> {
        let (_, pem) = parse_x509_pem(self.pem.as_bytes())
            .map_err(|e| KeyError::Pem(e.to_string()))?;
        let cert = pem
            .parse_x509()
            .map_err(|e| KeyError::Certificate(e.to_string()))?;

        match cert
            .public_key()
            .parsed()
            .map_err(|e| KeyError::Certificate(e.to_string()))?
        {
            PublicKey::EC(point) => {
                let data = point.data();
                // Uncompressed SEC1 point: 0x04 || x || y
                if data.first() != Some(&0x04) || data.len() % 2 != 1 {
                    return Err(KeyError::MalformedEcPoint);
                }
                let coord_len = (data.len() - 1) / 2;
                Ok(KeyMaterial::Ec {
                    x: data[1..1 + coord_len].to_vec(),
                    y: data[1 + coord_len..].to_vec(),
                })
            }
            PublicKey::RSA(rsa) => Ok(KeyMaterial::Rsa {
                modulus: rsa.modulus.to_vec(),
                exponent: rsa.exponent.to_vec(),
            }),
            other => Err(KeyError::UnsupportedAlgorithm(format!("{other:?}"))),
        }
    }
}

/// Public key material in the two algorithm families the authority issues
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// Elliptic-curve key as raw curve coordinates
    Ec { x: Vec<u8>, y: Vec<u8> },
    /// RSA key as big-endian modulus and public exponent
    Rsa { modulus: Vec<u8>, exponent: Vec<u8> },
}
