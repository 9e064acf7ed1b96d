//! Validation helpers for DTOs.

use std::collections::HashSet;

use validator::ValidationError;

/// Validates a weekday set: non-empty, unique, each in 1 (Monday) ..= 7 (Sunday).
pub fn validate_weekdays(weekdays: &[u8]) -> Result<(), ValidationError> {
    if weekdays.is_empty() {
        let mut err = ValidationError::new("weekdays_empty");
        err.message = Some("rule must name at least one weekday".into());
        return Err(err);
    }

    let mut seen = HashSet::new();
    for weekday in weekdays {
        if !(1..=7).contains(weekday) {
            let mut err = ValidationError::new("weekday_range");
            err.message =
                Some(format!("weekday {} is out of range (1=Monday..7=Sunday)", weekday).into());
            return Err(err);
        }
        if !seen.insert(*weekday) {
            let mut err = ValidationError::new("weekday_duplicate");
            err.message = Some(format!("weekday {} is listed twice", weekday).into());
            return Err(err);
        }
    }

    Ok(())
}

/// Validates a local time-of-day pair.
pub fn validate_time_of_day(hour: u8, minute: u8) -> Result<(), ValidationError> {
    if hour >= 24 {
        let mut err = ValidationError::new("hour_range");
        err.message = Some(format!("hour {} is out of range", hour).into());
        return Err(err);
    }
    if minute >= 60 {
        let mut err = ValidationError::new("minute_range");
        err.message = Some(format!("minute {} is out of range", minute).into());
        return Err(err);
    }
    Ok(())
}

/// Validates a claimed race position (1-based, bounded by the largest lobby).
pub fn validate_position(position: u8) -> Result<(), ValidationError> {
    if !(1..=99).contains(&position) {
        let mut err = ValidationError::new("position_range");
        err.message = Some(format!("position {} is out of range (1..=99)", position).into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_sets_are_checked_for_range_and_duplicates() {
        assert!(validate_weekdays(&[1, 3, 7]).is_ok());
        assert!(validate_weekdays(&[]).is_err());
        assert!(validate_weekdays(&[0]).is_err());
        assert!(validate_weekdays(&[8]).is_err());
        assert!(validate_weekdays(&[2, 2]).is_err());
    }

    #[test]
    fn time_of_day_bounds() {
        assert!(validate_time_of_day(20, 0).is_ok());
        assert!(validate_time_of_day(23, 59).is_ok());
        assert!(validate_time_of_day(24, 0).is_err());
        assert!(validate_time_of_day(0, 60).is_err());
    }

    #[test]
    fn positions_are_one_based() {
        assert!(validate_position(1).is_ok());
        assert!(validate_position(99).is_ok());
        assert!(validate_position(0).is_err());
        assert!(validate_position(100).is_err());
    }
}
