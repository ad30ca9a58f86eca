//! End-to-end credential verification tests
//!
//! These tests build real encoded credentials (CBOR claims, COSE_Sign1
//! signed with a generated P-256 certificate, zlib + Base45 transport) and
//! exercise the decode → verify pipeline the server runs per request.

use std::collections::HashSet;
use std::io::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use coset::cbor::value::Value;
use coset::{iana, CoseSign1Builder, HeaderBuilder, TaggedCborSerializable};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use p256::pkcs8::DecodePrivateKey;
use signature::Signer;

use greenlight_core::{
    decode, verify_signature, AttemptOutcome, CredentialKind, DecodeError, SignerCertificate,
    TrustSnapshot,
};

/// A generated issuer: self-signed P-256 certificate plus its signing key.
struct Issuer {
    cert_body: String,
    signing_key: p256::ecdsa::SigningKey,
}

fn make_issuer() -> Issuer {
    let certified = rcgen::generate_simple_self_signed(["issuer.test".to_string()]).unwrap();
    let signing_key =
        p256::ecdsa::SigningKey::from_pkcs8_der(&certified.key_pair.serialize_der()).unwrap();

    Issuer {
        cert_body: STANDARD.encode(certified.cert.der()),
        signing_key,
    }
}

fn text_entry(key: &str, value: &str) -> (Value, Value) {
    (Value::Text(key.into()), Value::Text(value.into()))
}

fn int_entry(key: &str, value: i64) -> (Value, Value) {
    (Value::Text(key.into()), Value::Integer(value.into()))
}

fn vaccination_section() -> Value {
    Value::Array(vec![Value::Map(vec![
        text_entry("tg", "840539006"),
        text_entry("mp", "EU/1/20/1528"),
        text_entry("ma", "ORG-100030215"),
        int_entry("dn", 2),
        int_entry("sd", 2),
        text_entry("dt", "2021-06-01"),
        text_entry("co", "IT"),
        text_entry("is", "Ministero della Salute"),
        text_entry("ci", "01IT053059F7676042D9BEE9F874C4901F9B#3"),
    ])])
}

/// CWT claims: hcert (-260/1) with holder fields and the given sections.
fn claims(sections: Vec<(&str, Value)>) -> Vec<u8> {
    let mut dgc = vec![
        (
            Value::Text("nam".into()),
            Value::Map(vec![text_entry("fn", "ROSSI"), text_entry("gn", "MARIO")]),
        ),
        text_entry("dob", "1980-01-01"),
        text_entry("ver", "1.3.0"),
    ];
    for (key, section) in sections {
        dgc.push((Value::Text(key.into()), section));
    }

    let payload = Value::Map(vec![(
        Value::Integer((-260).into()),
        Value::Map(vec![(Value::Integer(1.into()), Value::Map(dgc))]),
    )]);

    let mut buf = Vec::new();
    coset::cbor::ser::into_writer(&payload, &mut buf).unwrap();
    buf
}

/// Sign claims into a COSE_Sign1 CWT and apply the transport encoding.
fn encode_credential(issuer: &Issuer, kid: &[u8], payload: Vec<u8>) -> String {
    let protected = HeaderBuilder::new()
        .algorithm(iana::Algorithm::ES256)
        .key_id(kid.to_vec())
        .build();

    let cose = CoseSign1Builder::new()
        .protected(protected)
        .payload(payload)
        .create_signature(&[], |data| {
            let sig: p256::ecdsa::Signature = issuer.signing_key.sign(data);
            sig.to_bytes().to_vec()
        })
        .build();

    let cwt = cose.to_tagged_vec().unwrap();

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&cwt).unwrap();
    let compressed = encoder.finish().unwrap();

    format!("HC1:{}", base45::encode(&compressed))
}

fn kid_set(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn decode_roundtrip_preserves_fields() {
    let issuer = make_issuer();
    let raw = encode_credential(&issuer, b"12345678", claims(vec![("v", vaccination_section())]));

    let credential = decode(&raw).unwrap();

    assert_eq!(credential.holder.surname, "ROSSI");
    assert_eq!(credential.holder.forename, "MARIO");
    assert_eq!(credential.holder.date_of_birth, "1980-01-01");
    assert_eq!(credential.kid.as_deref(), Some(STANDARD.encode(b"12345678").as_str()));

    match &credential.kind {
        CredentialKind::Vaccination(v) => {
            assert_eq!(v.medicinal_product, "EU/1/20/1528");
            assert_eq!(v.dose_number, 2);
            assert_eq!(v.total_doses, 2);
            assert_eq!(v.certificate_id, "01IT053059F7676042D9BEE9F874C4901F9B#3");
        }
        other => panic!("expected a vaccination credential, got {other:?}"),
    }
}

#[test]
fn credential_without_any_section_is_unsupported() {
    let issuer = make_issuer();
    let raw = encode_credential(&issuer, b"12345678", claims(vec![]));

    assert!(matches!(
        decode(&raw),
        Err(DecodeError::UnsupportedCredentialKind)
    ));
}

#[test]
fn trusted_issuer_validates() {
    let issuer = make_issuer();
    let raw = encode_credential(&issuer, b"12345678", claims(vec![("v", vaccination_section())]));
    let credential = decode(&raw).unwrap();

    let snapshot = TrustSnapshot::new(
        kid_set(&["KID1"]),
        vec![SignerCertificate::from_feed("KID1", &issuer.cert_body)],
    );

    let check = verify_signature(&credential, &snapshot);
    assert!(check.trusted);
    assert_eq!(check.attempts.last().unwrap().outcome, AttemptOutcome::Verified);
}

#[test]
fn issuer_outside_valid_kid_set_is_rejected() {
    let issuer = make_issuer();
    let raw = encode_credential(&issuer, b"12345678", claims(vec![("v", vaccination_section())]));
    let credential = decode(&raw).unwrap();

    // The signature is cryptographically valid against this certificate,
    // but its kid is not in the valid set, so it never enters the snapshot.
    let snapshot = TrustSnapshot::new(
        kid_set(&["OTHER"]),
        vec![SignerCertificate::from_feed("KID1", &issuer.cert_body)],
    );

    let check = verify_signature(&credential, &snapshot);
    assert!(!check.trusted);
    assert!(check.attempts.is_empty());
}

#[test]
fn wrong_issuer_key_is_a_signature_mismatch() {
    let signer = make_issuer();
    let other = make_issuer();

    let raw = encode_credential(&signer, b"12345678", claims(vec![("v", vaccination_section())]));
    let credential = decode(&raw).unwrap();

    let snapshot = TrustSnapshot::new(
        kid_set(&["KID1"]),
        vec![SignerCertificate::from_feed("KID1", &other.cert_body)],
    );

    let check = verify_signature(&credential, &snapshot);
    assert!(!check.trusted);
    assert_eq!(
        check.attempts[0].outcome,
        AttemptOutcome::SignatureMismatch
    );
}

#[test]
fn malformed_certificate_is_skipped_not_fatal() {
    let issuer = make_issuer();
    let raw = encode_credential(&issuer, b"12345678", claims(vec![("v", vaccination_section())]));
    let credential = decode(&raw).unwrap();

    let snapshot = TrustSnapshot::new(
        kid_set(&["BAD", "GOOD"]),
        vec![
            SignerCertificate::from_pem("BAD", "-----BEGIN CERTIFICATE-----\nnope\n-----END CERTIFICATE-----\n"),
            SignerCertificate::from_feed("GOOD", &issuer.cert_body),
        ],
    );

    let check = verify_signature(&credential, &snapshot);
    assert!(check.trusted);
    assert_eq!(check.attempts.len(), 2);
    assert!(matches!(check.attempts[0].outcome, AttemptOutcome::Unusable(_)));
    assert_eq!(check.attempts[1].outcome, AttemptOutcome::Verified);
}

#[test]
fn test_and_recovery_sections_decode() {
    let issuer = make_issuer();

    let test_section = Value::Array(vec![Value::Map(vec![
        text_entry("tg", "840539006"),
        text_entry("tt", "LP6464-4"),
        text_entry("tr", "260415000"),
        text_entry("sc", "2021-06-20T10:00:00Z"),
        text_entry("co", "IT"),
        text_entry("is", "Ministero della Salute"),
        text_entry("ci", "01IT0BFC93A7E66F4D2EB0A6763B4A1BD3A1#0"),
    ])]);
    let raw = encode_credential(&issuer, b"12345678", claims(vec![("t", test_section)]));
    match decode(&raw).unwrap().kind {
        CredentialKind::Test(t) => assert_eq!(t.result, "260415000"),
        other => panic!("expected a test credential, got {other:?}"),
    }

    let recovery_section = Value::Array(vec![Value::Map(vec![
        text_entry("tg", "840539006"),
        text_entry("fr", "2021-04-01"),
        text_entry("df", "2021-04-12"),
        text_entry("du", "2021-09-28"),
        text_entry("co", "IT"),
        text_entry("is", "Ministero della Salute"),
        text_entry("ci", "01IT48A8E92C7F9E4E2C9E07A72BBA13E9B5#1"),
    ])]);
    let raw = encode_credential(&issuer, b"12345678", claims(vec![("r", recovery_section)]));
    match decode(&raw).unwrap().kind {
        CredentialKind::Recovery(r) => assert_eq!(r.valid_until, "2021-09-28"),
        other => panic!("expected a recovery credential, got {other:?}"),
    }
}
