//! Wire decoding of the compact credential format
//!
//! An encoded credential is `HC1:` + Base45( zlib( COSE_Sign1 CWT ) ).
//! The CWT payload is a CBOR claims map whose `-260/1` claim carries the
//! hcert: holder name, date of birth, and exactly one of the `v`/`t`/`r`
//! sections.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use coset::{CborSerializable, CoseSign1, TaggedCborSerializable};
use flate2::read::ZlibDecoder;
use std::io::Read;

use coset::cbor::value::Value;

use crate::credential::{
    CredentialKind, DecodedCredential, Holder, RecoveryRecord, TestRecord, VaccinationRecord,
};
use crate::error::DecodeError;

/// Transport prefix of an encoded credential
const PREFIX: &str = "HC1:";

/// CWT claim key of the health certificate container
const HCERT_CLAIM: i64 = -260;

/// Key of the EU DGC entry inside the hcert container
const DGC_ENTRY: i64 = 1;

/// Decode a raw credential string into a [`DecodedCredential`].
///
/// Fails with a [`DecodeError`] on malformed input at any layer; the error
/// message names the offending layer so the API can surface it verbatim.
pub fn decode(raw: &str) -> Result<DecodedCredential, DecodeError> {
    let body = raw
        .trim()
        .strip_prefix(PREFIX)
        .ok_or(DecodeError::MissingPrefix)?;

    let compressed =
        base45::decode(body).map_err(|e| DecodeError::Base45(e.to_string()))?;

    // The CWT is normally zlib-deflated; tolerate an uncompressed envelope.
    let cwt = if compressed.first() == Some(&0x78) {
        let mut decoder = ZlibDecoder::new(compressed.as_slice());
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| DecodeError::Inflate(e.to_string()))?;
        out
    } else {
        compressed
    };

    // CWTs carry the COSE_Sign1 tag (18); accept an untagged envelope too.
    let cose = CoseSign1::from_tagged_slice(&cwt)
        .or_else(|_| CoseSign1::from_slice(&cwt))
        .map_err(|e| DecodeError::Cose(e.to_string()))?;

    let payload = cose
        .payload
        .as_deref()
        .ok_or_else(|| DecodeError::Cose("missing payload".into()))?;

    let claims: Value = coset::cbor::de::from_reader(payload)
        .map_err(|e| DecodeError::Cbor(e.to_string()))?;
    let claims = as_map(&claims).ok_or_else(|| DecodeError::Cbor("claims is not a map".into()))?;

    let hcert = get_int(claims, HCERT_CLAIM)
        .and_then(as_map)
        .ok_or(DecodeError::MissingClaim("hcert"))?;
    let dgc = get_int(hcert, DGC_ENTRY)
        .and_then(as_map)
        .ok_or(DecodeError::MissingClaim("hcert/1"))?;

    let kind = parse_kind(dgc)?;
    let holder = parse_holder(dgc)?;

    let kid = header_kid(&cose);
    let signed_data = cose.tbs_data(&[]);
    let signature = cose.signature.clone();

    Ok(DecodedCredential {
        kind,
        holder,
        kid,
        signed_data,
        signature,
    })
}

/// Key id from the COSE header, preferring the protected bucket.
///
/// Returned base64-encoded to match the authority's key-id strings.
fn header_kid(cose: &CoseSign1) -> Option<String> {
    let kid = if !cose.protected.header.key_id.is_empty() {
        &cose.protected.header.key_id
    } else if !cose.unprotected.key_id.is_empty() {
        &cose.unprotected.key_id
    } else {
        return None;
    };
    Some(STANDARD.encode(kid))
}

/// Select the single hcert section, in v/t/r order.
fn parse_kind(dgc: &[(Value, Value)]) -> Result<CredentialKind, DecodeError> {
    if let Some(section) = section_entry(dgc, "v")? {
        return Ok(CredentialKind::Vaccination(parse_vaccination(section)?));
    }
    if let Some(section) = section_entry(dgc, "t")? {
        return Ok(CredentialKind::Test(parse_test(section)?));
    }
    if let Some(section) = section_entry(dgc, "r")? {
        return Ok(CredentialKind::Recovery(parse_recovery(section)?));
    }
    Err(DecodeError::UnsupportedCredentialKind)
}

/// An hcert section is an array holding a single entry map.
fn section_entry<'a>(
    dgc: &'a [(Value, Value)],
    key: &'static str,
) -> Result<Option<&'a [(Value, Value)]>, DecodeError> {
    match get_text(dgc, key) {
        None => Ok(None),
        Some(Value::Array(entries)) => match entries.first().and_then(as_map) {
            Some(map) => Ok(Some(map)),
            None => Err(DecodeError::Cbor(format!("section '{key}' is empty"))),
        },
        Some(_) => Err(DecodeError::Cbor(format!("section '{key}' is not an array"))),
    }
}

fn parse_holder(dgc: &[(Value, Value)]) -> Result<Holder, DecodeError> {
    let nam = get_text(dgc, "nam")
        .and_then(as_map)
        .ok_or(DecodeError::MissingClaim("nam"))?;
    let date_of_birth = get_text(dgc, "dob")
        .and_then(as_str)
        .ok_or(DecodeError::MissingClaim("dob"))?
        .to_string();

    Ok(Holder {
        surname: get_text(nam, "fn").and_then(as_str).unwrap_or_default().to_string(),
        forename: get_text(nam, "gn").and_then(as_str).unwrap_or_default().to_string(),
        date_of_birth,
    })
}

fn parse_vaccination(map: &[(Value, Value)]) -> Result<VaccinationRecord, DecodeError> {
    Ok(VaccinationRecord {
        targeted_disease: require_str(map, "tg", "v/tg")?,
        medicinal_product: require_str(map, "mp", "v/mp")?,
        manufacturer: require_str(map, "ma", "v/ma")?,
        dose_number: require_u32(map, "dn", "v/dn")?,
        total_doses: require_u32(map, "sd", "v/sd")?,
        date: require_str(map, "dt", "v/dt")?,
        country: require_str(map, "co", "v/co")?,
        issuer: require_str(map, "is", "v/is")?,
        certificate_id: require_str(map, "ci", "v/ci")?,
    })
}

fn parse_test(map: &[(Value, Value)]) -> Result<TestRecord, DecodeError> {
    Ok(TestRecord {
        targeted_disease: require_str(map, "tg", "t/tg")?,
        test_type: require_str(map, "tt", "t/tt")?,
        result: require_str(map, "tr", "t/tr")?,
        sample_collected_at: require_str(map, "sc", "t/sc")?,
        country: require_str(map, "co", "t/co")?,
        issuer: require_str(map, "is", "t/is")?,
        certificate_id: require_str(map, "ci", "t/ci")?,
    })
}

fn parse_recovery(map: &[(Value, Value)]) -> Result<RecoveryRecord, DecodeError> {
    Ok(RecoveryRecord {
        targeted_disease: require_str(map, "tg", "r/tg")?,
        first_positive_date: require_str(map, "fr", "r/fr")?,
        valid_from: require_str(map, "df", "r/df")?,
        valid_until: require_str(map, "du", "r/du")?,
        country: require_str(map, "co", "r/co")?,
        issuer: require_str(map, "is", "r/is")?,
        certificate_id: require_str(map, "ci", "r/ci")?,
    })
}

// CBOR value accessors. ciborium maps are entry lists, not hash maps.

fn as_map(value: &Value) -> Option<&[(Value, Value)]> {
    match value {
        Value::Map(entries) => Some(entries),
        _ => None,
    }
}

fn as_str(value: &Value) -> Option<&str> {
    match value {
        Value::Text(text) => Some(text),
        _ => None,
    }
}

fn get_int<'a>(map: &'a [(Value, Value)], key: i64) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == i128::from(key)))
        .map(|(_, v)| v)
}

fn get_text<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Text(t) if t == key))
        .map(|(_, v)| v)
}

fn require_str(
    map: &[(Value, Value)],
    key: &str,
    claim: &'static str,
) -> Result<String, DecodeError> {
    get_text(map, key)
        .and_then(as_str)
        .map(str::to_string)
        .ok_or(DecodeError::MissingClaim(claim))
}

fn require_u32(
    map: &[(Value, Value)],
    key: &str,
    claim: &'static str,
) -> Result<u32, DecodeError> {
    let value = get_text(map, key).ok_or(DecodeError::MissingClaim(claim))?;
    match value {
        Value::Integer(i) => u32::try_from(i128::from(*i))
            .map_err(|_| DecodeError::Cbor(format!("claim '{claim}' out of range"))),
        _ => Err(DecodeError::MissingClaim(claim)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_prefix() {
        assert!(matches!(decode("NOPE:ABC"), Err(DecodeError::MissingPrefix)));
        assert!(matches!(decode(""), Err(DecodeError::MissingPrefix)));
    }

    #[test]
    fn rejects_invalid_base45() {
        // '#' is not in the Base45 alphabet
        assert!(matches!(decode("HC1:###"), Err(DecodeError::Base45(_))));
    }

    #[test]
    fn rejects_non_cose_payload() {
        // Valid Base45 for bytes that are not a COSE envelope
        let raw = format!("HC1:{}", base45::encode(b"not cose at all"));
        assert!(matches!(decode(&raw), Err(DecodeError::Cose(_))));
    }

    #[test]
    fn section_entry_rejects_empty_array() {
        let dgc = vec![(Value::Text("v".into()), Value::Array(vec![]))];
        assert!(matches!(
            section_entry(&dgc, "v"),
            Err(DecodeError::Cbor(_))
        ));
    }

    #[test]
    fn integer_claims_are_range_checked() {
        let map = vec![(Value::Text("dn".into()), Value::Integer((-1).into()))];
        assert!(matches!(
            require_u32(&map, "dn", "v/dn"),
            Err(DecodeError::Cbor(_))
        ));
    }
}
