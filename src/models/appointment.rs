use chrono::{DateTime, Duration, DurationRound, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const DEFAULT_DURATION_MINUTES: i64 = 30;
pub const MAX_DURATION_MINUTES: i64 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(self.duration_minutes)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAppointmentRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub scheduled_at: DateTime<Utc>,
    #[validate(range(min = 5, max = 240))]
    pub duration_minutes: Option<i64>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RescheduleRequest {
    pub scheduled_at: DateTime<Utc>,
    #[validate(range(min = 5, max = 240))]
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentFilter {
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
    /// Calendar day (UTC)
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

/// Appointments start on whole minutes; stored times then compare
/// correctly as text.
pub fn normalize_start(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(Duration::minutes(1)).unwrap_or(at)
}

/// Half-open interval overlap: back-to-back slots do not collide
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_minutes: i64,
    b_start: DateTime<Utc>,
    b_minutes: i64,
) -> bool {
    let a_end = a_start + Duration::minutes(a_minutes);
    let b_end = b_start + Duration::minutes(b_minutes);
    a_start < b_end && b_start < a_end
}

/// `[start of day, start of next day)` in UTC
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    (start, start + Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 5, 14, hour, minute, 0).unwrap()
    }

    #[test_case(at(9, 0), 30, at(9, 15), 30 => true ; "partial overlap")]
    #[test_case(at(9, 0), 30, at(9, 30), 30 => false ; "back to back")]
    #[test_case(at(9, 0), 120, at(9, 30), 15 => true ; "contained")]
    #[test_case(at(10, 0), 30, at(9, 0), 30 => false ; "earlier slot")]
    fn overlap(a: DateTime<Utc>, a_min: i64, b: DateTime<Utc>, b_min: i64) -> bool {
        overlaps(a, a_min, b, b_min)
    }

    #[test]
    fn normalize_drops_seconds() {
        let raw = Utc.with_ymd_and_hms(2030, 5, 14, 9, 7, 42).unwrap();
        assert_eq!(normalize_start(raw), at(9, 7));
    }

    #[test]
    fn appointment_ends_after_its_duration() {
        let appointment = Appointment {
            id: 1,
            patient_id: 1,
            doctor_id: 2,
            scheduled_at: at(9, 0),
            duration_minutes: 45,
            reason: None,
            status: AppointmentStatus::Scheduled,
            created_by: 1,
            created_at: at(8, 0),
        };
        assert_eq!(appointment.ends_at(), at(9, 45));
    }

    #[test]
    fn day_bounds_cover_one_day() {
        let (start, end) = day_bounds(NaiveDate::from_ymd_opt(2030, 5, 14).unwrap());
        assert_eq!(start, at(0, 0));
        assert_eq!(end - start, Duration::days(1));
    }
}
