//! Test-certificate rule evaluator
//!
//! A detected result always rejects. Otherwise the sample-collection
//! timestamp must fall inside the hour window the authority publishes for
//! the test type (molecular or rapid antigen).

use chrono::{DateTime, Duration, Utc};

use greenlight_core::TestRecord;

use super::{revoked_result, RevocationSet, SettingsTable, ValidationResult};

/// LOINC code for molecular (NAAT) tests
const TYPE_MOLECULAR: &str = "LP6464-4";
/// LOINC code for rapid antigen tests
const TYPE_RAPID: &str = "LP217198-3";

/// SNOMED CT code for a detected (positive) result
const RESULT_DETECTED: &str = "260373001";

/// Hour-window settings apply to every product, keyed by the GENERIC type
const SETTING_TYPE_GENERIC: &str = "GENERIC";

const MOLECULAR_START_HOURS: &str = "molecular_test_start_hours";
const MOLECULAR_END_HOURS: &str = "molecular_test_end_hours";
const RAPID_START_HOURS: &str = "rapid_test_start_hours";
const RAPID_END_HOURS: &str = "rapid_test_end_hours";

pub fn evaluate(
    settings: &SettingsTable,
    revoked: &RevocationSet,
    record: &TestRecord,
    now: DateTime<Utc>,
) -> ValidationResult {
    if let Some(result) = revoked_result(revoked, &record.certificate_id) {
        return result;
    }

    if record.result == RESULT_DETECTED {
        return ValidationResult::invalid("INVALID: positive test result");
    }

    let (start_name, end_name) = match record.test_type.as_str() {
        TYPE_MOLECULAR => (MOLECULAR_START_HOURS, MOLECULAR_END_HOURS),
        TYPE_RAPID => (RAPID_START_HOURS, RAPID_END_HOURS),
        _ => return ValidationResult::invalid("INVALID: unknown test type"),
    };

    let (Some(start_hours), Some(end_hours)) = (
        settings.integer(start_name, SETTING_TYPE_GENERIC),
        settings.integer(end_name, SETTING_TYPE_GENERIC),
    ) else {
        return ValidationResult::invalid("INVALID: test validity rules unavailable");
    };

    let Ok(collected) = DateTime::parse_from_rfc3339(&record.sample_collected_at) else {
        return ValidationResult::invalid("INVALID: malformed sample collection time");
    };
    let collected = collected.with_timezone(&Utc);

    // The feed is untrusted: an hour value that overflows timestamp
    // arithmetic rejects the credential instead of panicking.
    let (Some(valid_from), Some(valid_until)) = (
        window_bound(collected, start_hours),
        window_bound(collected, end_hours),
    ) else {
        return ValidationResult::invalid("INVALID: test validity rules unavailable");
    };

    if now < valid_from {
        ValidationResult::invalid("INVALID: test not yet valid")
    } else if now > valid_until {
        ValidationResult::invalid("INVALID: test expired")
    } else {
        ValidationResult::valid("VALID: test")
    }
}

fn window_bound(collected: DateTime<Utc>, hours: i64) -> Option<DateTime<Utc>> {
    collected.checked_add_signed(Duration::try_hours(hours)?)
}
