//! Input validation utilities.
//!
//! Request-shape checks go through `validator`; the domain rules a vacation
//! must satisfy (date order, price sign) live here too so every write path
//! applies the same ones.

use chrono::{Datelike, NaiveDate};
use validator::Validate;

use crate::error::VoyageError;

/// Validate a request body, returning a VoyageError::Validation on failure.
pub fn validate_request<T: Validate>(body: &T) -> Result<(), VoyageError> {
    body.validate().map_err(|e| VoyageError::Validation {
        message: format_validation_errors(e),
    })
}

/// Format validation errors into a human-readable string.
fn format_validation_errors(errors: validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for '{field}'"))
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// Dates are stored as `YYYY-MM-DD` text and compared as strings, which only
/// orders correctly for four-digit years.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

/// Check the schedule and price of a vacation.
pub fn validate_vacation_terms(
    start_date: NaiveDate,
    end_date: NaiveDate,
    price: f64,
) -> Result<(), VoyageError> {
    for date in [start_date, end_date] {
        if !YEAR_RANGE.contains(&date.year()) {
            return Err(VoyageError::invalid_vacation(format!(
                "date {date} is outside the years {}..={}",
                YEAR_RANGE.start(),
                YEAR_RANGE.end()
            )));
        }
    }
    if start_date >= end_date {
        return Err(VoyageError::invalid_vacation(format!(
            "start date {start_date} must be before end date {end_date}"
        )));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(VoyageError::invalid_vacation(format!(
            "price must be a non-negative amount, got {price}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn negative_price_is_invalid() {
        let err = validate_vacation_terms(date("2024-06-01"), date("2024-06-05"), -10.0).unwrap_err();
        assert!(matches!(err, VoyageError::InvalidVacation { .. }));
    }

    #[test]
    fn reversed_dates_are_invalid() {
        let err = validate_vacation_terms(date("2024-06-10"), date("2024-06-05"), 100.0).unwrap_err();
        assert!(matches!(err, VoyageError::InvalidVacation { .. }));
    }

    #[test]
    fn same_day_trip_is_invalid() {
        assert!(validate_vacation_terms(date("2024-06-10"), date("2024-06-10"), 0.0).is_err());
    }

    #[test]
    fn free_trip_is_allowed() {
        assert!(validate_vacation_terms(date("2024-06-01"), date("2024-06-05"), 0.0).is_ok());
    }

    #[test]
    fn five_digit_years_are_invalid() {
        let far = NaiveDate::from_ymd_opt(10000, 1, 1).unwrap();
        let err = validate_vacation_terms(date("2024-06-01"), far, 100.0).unwrap_err();
        assert!(matches!(err, VoyageError::InvalidVacation { .. }));
        assert!(validate_vacation_terms(date("2024-06-01"), date("9999-12-31"), 100.0).is_ok());
    }

    #[test]
    fn nan_price_is_invalid() {
        assert!(validate_vacation_terms(date("2024-06-01"), date("2024-06-05"), f64::NAN).is_err());
    }
}
