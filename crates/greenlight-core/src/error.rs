//! Error types for credential decoding and key handling

use thiserror::Error;

/// Errors raised while decoding a raw credential string into a
/// [`DecodedCredential`](crate::credential::DecodedCredential)
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The credential does not start with the `HC1:` transport prefix
    #[error("missing HC1 prefix")]
    MissingPrefix,

    /// The Base45 transport encoding is malformed
    #[error("invalid base45 payload: {0}")]
    Base45(String),

    /// The zlib-compressed CWT could not be inflated
    #[error("invalid compressed payload: {0}")]
    Inflate(String),

    /// The COSE_Sign1 envelope is malformed
    #[error("invalid COSE envelope: {0}")]
    Cose(String),

    /// The CBOR claims payload is malformed
    #[error("invalid CBOR payload: {0}")]
    Cbor(String),

    /// A required CWT/hcert claim is absent
    #[error("missing claim: {0}")]
    MissingClaim(&'static str),

    /// The hcert carries none of the vaccination/test/recovery sections
    #[error("unsupported credential kind")]
    UnsupportedCredentialKind,
}

/// Errors raised while extracting key material from a signer certificate
/// or while checking a signature against it
#[derive(Error, Debug)]
pub enum KeyError {
    /// The certificate armor could not be parsed
    #[error("invalid PEM: {0}")]
    Pem(String),

    /// The X.509 certificate structure is malformed
    #[error("invalid certificate: {0}")]
    Certificate(String),

    /// The certificate carries a key of an algorithm other than EC or RSA
    #[error("unsupported key algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The EC public key is not an uncompressed SEC1 point
    #[error("malformed EC public key point")]
    MalformedEcPoint,

    /// The RSA modulus/exponent pair does not form a usable public key
    #[error("invalid RSA public key: {0}")]
    Rsa(String),

    /// The credential signature bytes do not fit the key's signature scheme
    #[error("malformed signature: {0}")]
    Signature(String),
}
