//! Vaccination rule evaluator
//!
//! Validity window is anchored on the vaccination date and parameterized
//! per medicinal product by the authority settings: the
//! `vaccine_{start,end}_day_complete` pair for a completed cycle
//! (`dn >= sd`), the `_not_complete` pair otherwise.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use greenlight_core::VaccinationRecord;

use super::{revoked_result, RevocationSet, SettingsTable, ValidationResult};

const START_DAY_COMPLETE: &str = "vaccine_start_day_complete";
const END_DAY_COMPLETE: &str = "vaccine_end_day_complete";
const START_DAY_NOT_COMPLETE: &str = "vaccine_start_day_not_complete";
const END_DAY_NOT_COMPLETE: &str = "vaccine_end_day_not_complete";

pub fn evaluate(
    settings: &SettingsTable,
    revoked: &RevocationSet,
    record: &VaccinationRecord,
    now: DateTime<Utc>,
) -> ValidationResult {
    if let Some(result) = revoked_result(revoked, &record.certificate_id) {
        return result;
    }

    let complete = record.dose_number >= record.total_doses;
    let (start_name, end_name) = if complete {
        (START_DAY_COMPLETE, END_DAY_COMPLETE)
    } else {
        (START_DAY_NOT_COMPLETE, END_DAY_NOT_COMPLETE)
    };

    let product = record.medicinal_product.as_str();
    let (Some(start_days), Some(end_days)) = (
        settings.integer(start_name, product),
        settings.integer(end_name, product),
    ) else {
        return ValidationResult::invalid("INVALID: unknown vaccine product");
    };

    let Ok(date) = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d") else {
        return ValidationResult::invalid("INVALID: malformed vaccination date");
    };

    // The feed is untrusted: a window value that overflows date arithmetic
    // rejects the credential instead of panicking in the request path.
    let (Some(valid_from), Some(valid_until)) = (
        window_bound(date, start_days),
        window_bound(date, end_days),
    ) else {
        return ValidationResult::invalid("INVALID: vaccination validity rules unavailable");
    };

    let today = now.date_naive();

    if today < valid_from {
        ValidationResult::invalid("INVALID: vaccination not yet valid")
    } else if today > valid_until {
        ValidationResult::invalid("INVALID: vaccination expired")
    } else if complete {
        ValidationResult::valid("VALID: complete vaccination")
    } else {
        ValidationResult::valid("VALID: partial vaccination")
    }
}

fn window_bound(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::try_days(days)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::SettingEntry;
    use chrono::TimeZone;

    const PRODUCT: &str = "EU/1/20/1528";

    fn settings() -> SettingsTable {
        SettingsTable::new(vec![
            SettingEntry {
                name: START_DAY_COMPLETE.into(),
                setting_type: PRODUCT.into(),
                value: "0".into(),
            },
            SettingEntry {
                name: END_DAY_COMPLETE.into(),
                setting_type: PRODUCT.into(),
                value: "365".into(),
            },
            SettingEntry {
                name: START_DAY_NOT_COMPLETE.into(),
                setting_type: PRODUCT.into(),
                value: "15".into(),
            },
            SettingEntry {
                name: END_DAY_NOT_COMPLETE.into(),
                setting_type: PRODUCT.into(),
                value: "84".into(),
            },
        ])
    }

    fn record(dose: u32, total: u32, date: &str) -> VaccinationRecord {
        VaccinationRecord {
            targeted_disease: "840539006".into(),
            medicinal_product: PRODUCT.into(),
            manufacturer: "ORG-100030215".into(),
            dose_number: dose,
            total_doses: total,
            date: date.into(),
            country: "IT".into(),
            issuer: "Ministero della Salute".into(),
            certificate_id: "01IT0001#0".into(),
        }
    }

    fn at(date: &str) -> DateTime<Utc> {
        Utc.from_utc_datetime(
            &NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn complete_cycle_inside_window_is_valid() {
        let result = evaluate(&settings(), &RevocationSet::new(), &record(2, 2, "2021-06-01"), at("2021-08-01"));
        assert!(result.accepted);
        assert_eq!(result.message, "VALID: complete vaccination");
    }

    #[test]
    fn complete_cycle_expires_after_end_day() {
        let result = evaluate(&settings(), &RevocationSet::new(), &record(2, 2, "2021-06-01"), at("2022-08-01"));
        assert!(!result.accepted);
        assert_eq!(result.message, "INVALID: vaccination expired");
    }

    #[test]
    fn partial_cycle_waits_for_start_day() {
        // First dose on June 1st, window opens 15 days later
        let result = evaluate(&settings(), &RevocationSet::new(), &record(1, 2, "2021-06-01"), at("2021-06-10"));
        assert!(!result.accepted);
        assert_eq!(result.message, "INVALID: vaccination not yet valid");

        let result = evaluate(&settings(), &RevocationSet::new(), &record(1, 2, "2021-06-01"), at("2021-06-20"));
        assert!(result.accepted);
        assert_eq!(result.message, "VALID: partial vaccination");
    }

    #[test]
    fn unknown_product_is_rejected() {
        let mut rec = record(2, 2, "2021-06-01");
        rec.medicinal_product = "EU/1/99/0000".into();
        let result = evaluate(&settings(), &RevocationSet::new(), &rec, at("2021-08-01"));
        assert!(!result.accepted);
        assert_eq!(result.message, "INVALID: unknown vaccine product");
    }

    #[test]
    fn revoked_uvci_rejects_even_inside_window() {
        let revoked: RevocationSet = ["01IT0001#0".to_string()].into_iter().collect();
        let result = evaluate(&settings(), &revoked, &record(2, 2, "2021-06-01"), at("2021-08-01"));
        assert!(!result.accepted);
        assert_eq!(result.message, "INVALID: revoked certificate");
    }

    #[test]
    fn out_of_range_window_setting_rejects_instead_of_panicking() {
        let settings = SettingsTable::new(vec![
            SettingEntry {
                name: START_DAY_COMPLETE.into(),
                setting_type: PRODUCT.into(),
                value: "0".into(),
            },
            SettingEntry {
                name: END_DAY_COMPLETE.into(),
                setting_type: PRODUCT.into(),
                value: "999999999999".into(),
            },
        ]);

        let result = evaluate(&settings, &RevocationSet::new(), &record(2, 2, "2021-06-01"), at("2021-08-01"));
        assert!(!result.accepted);
        assert_eq!(result.message, "INVALID: vaccination validity rules unavailable");
    }

    #[test]
    fn malformed_date_is_rejected() {
        let result = evaluate(&settings(), &RevocationSet::new(), &record(2, 2, "junk"), at("2021-08-01"));
        assert!(!result.accepted);
        assert_eq!(result.message, "INVALID: malformed vaccination date");
    }
}
