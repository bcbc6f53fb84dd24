use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::admission::Admission;
use super::appointment::Appointment;
use super::billing::Bill;
use super::lab::LabTest;
use super::pharmacy::Prescription;
use super::radiology::RadiologyScan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Patient {
    pub id: i64,
    pub mrn: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration and full-update payload
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct PatientRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(custom = "not_in_future")]
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    #[validate(length(min = 5, max = 30))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    #[validate(custom = "known_blood_group")]
    pub blood_group: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PatientSearch {
    /// Matches first name, last name or MRN
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Everything recorded against one patient
#[derive(Debug, Serialize)]
pub struct PatientHistory {
    pub patient: Patient,
    pub admissions: Vec<Admission>,
    pub lab_tests: Vec<LabTest>,
    pub radiology_scans: Vec<RadiologyScan>,
    pub prescriptions: Vec<Prescription>,
    pub appointments: Vec<Appointment>,
    pub bills: Vec<Bill>,
}

const BLOOD_GROUPS: &[&str] = &["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

fn not_in_future(date: &NaiveDate) -> Result<(), ValidationError> {
    if *date > Utc::now().date_naive() {
        let mut err = ValidationError::new("future_date");
        err.message = Some("date of birth cannot be in the future".into());
        return Err(err);
    }
    Ok(())
}

fn known_blood_group(group: &str) -> Result<(), ValidationError> {
    if BLOOD_GROUPS.contains(&group) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_blood_group"))
    }
}

/// New medical record number, e.g. `MRN-3F9A0C21`
pub fn generate_mrn() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("MRN-{}", id[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request() -> PatientRequest {
        PatientRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 12, 10).unwrap(),
            gender: Gender::Female,
            phone: Some("555-0100".into()),
            email: Some("ada@example.org".into()),
            address: None,
            blood_group: Some("O+".into()),
            emergency_contact_name: None,
            emergency_contact_phone: None,
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn future_birth_date_fails() {
        let mut req = request();
        req.date_of_birth = Utc::now().date_naive() + Duration::days(2);
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("date_of_birth"));
    }

    #[test]
    fn unknown_blood_group_fails() {
        let mut req = request();
        req.blood_group = Some("C+".into());
        assert!(req.validate().is_err());
    }

    #[test]
    fn mrn_format() {
        let mrn = generate_mrn();
        assert_eq!(mrn.len(), 12);
        assert!(mrn.starts_with("MRN-"));
        assert!(mrn[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
}
