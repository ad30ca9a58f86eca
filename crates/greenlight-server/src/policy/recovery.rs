//! Recovery-certificate rule evaluator
//!
//! The certificate itself carries its validity window (`df`..`du`); the
//! evaluator checks the clock against it after the revocation guard.

use chrono::{DateTime, NaiveDate, Utc};

use greenlight_core::RecoveryRecord;

use super::{revoked_result, RevocationSet, SettingsTable, ValidationResult};

pub fn evaluate(
    _settings: &SettingsTable,
    revoked: &RevocationSet,
    record: &RecoveryRecord,
    now: DateTime<Utc>,
) -> ValidationResult {
    if let Some(result) = revoked_result(revoked, &record.certificate_id) {
        return result;
    }

    let (Ok(valid_from), Ok(valid_until)) = (
        NaiveDate::parse_from_str(&record.valid_from, "%Y-%m-%d"),
        NaiveDate::parse_from_str(&record.valid_until, "%Y-%m-%d"),
    ) else {
        return ValidationResult::invalid("INVALID: malformed recovery validity dates");
    };

    let today = now.date_naive();
    if today < valid_from {
        ValidationResult::invalid("INVALID: recovery certificate not yet valid")
    } else if today > valid_until {
        ValidationResult::invalid("INVALID: recovery certificate expired")
    } else {
        ValidationResult::valid("VALID: recovery")
    }
}
