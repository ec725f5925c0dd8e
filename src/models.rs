use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::decimal::{Money, Rating};
use crate::error::SchemaError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccreditedSchool {
    pub id: i64,
    pub name: String,
}

impl fmt::Display for AccreditedSchool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorkExperience {
    pub candidate_id: i64,
    pub company_name: String,
    pub job_title: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkExperience {
    pub id: i64,
    pub candidate_id: i64,
    pub company_name: String,
    pub job_title: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub description: String,
}

impl fmt::Display for WorkExperience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.job_title, self.company_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReference {
    pub candidate_id: i64,
    pub name: String,
    pub email: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: i64,
    pub candidate_id: i64,
    pub name: String,
    pub email: String,
    pub phone_number: String,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// --- Choice columns ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JobType {
    #[default]
    #[serde(rename = "Full-time")]
    FullTime,
    #[serde(rename = "Part-time")]
    PartTime,
    Contract,
    Internship,
    Remote,
    Other,
}

impl JobType {
    pub const ALL: [JobType; 6] = [
        JobType::FullTime,
        JobType::PartTime,
        JobType::Contract,
        JobType::Internship,
        JobType::Remote,
        JobType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "Full-time",
            JobType::PartTime => "Part-time",
            JobType::Contract => "Contract",
            JobType::Internship => "Internship",
            JobType::Remote => "Remote",
            JobType::Other => "Other",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SchemaError::InvalidChoice {
                field: "job_type",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContactMethod {
    #[default]
    Email,
    Phone,
    Text,
}

impl ContactMethod {
    pub const ALL: [ContactMethod; 3] = [ContactMethod::Email, ContactMethod::Phone, ContactMethod::Text];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContactMethod::Email => "Email",
            ContactMethod::Phone => "Phone",
            ContactMethod::Text => "Text",
        }
    }
}

impl fmt::Display for ContactMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactMethod {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContactMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| SchemaError::InvalidChoice {
                field: "preferred_contact_method",
                value: s.to_string(),
            })
    }
}

macro_rules! choice_sql {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: SchemaError| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

choice_sql!(JobType);
choice_sql!(ContactMethod);

// --- Candidate ---

/// Every column of a candidate the caller controls. Used both to create a
/// candidate and to replace one wholesale on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDetails {
    // Personal
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub ethnicity: Option<String>,

    // Education
    pub education_level: String,
    #[serde(default)]
    pub school_id: Option<i64>,
    pub degree: String,
    pub graduation_year: u32,

    pub skills: String,

    // Job preferences
    #[serde(default)]
    pub job_type: JobType,
    pub area_preference: String,
    pub industry_preference: String,
    #[serde(default)]
    pub salary_expectation: Option<Money>,

    // Availability
    pub available_start_date: NaiveDate,
    #[serde(default)]
    pub available_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub specific_availability_details: Option<String>,

    #[serde(default)]
    pub languages: Option<String>,
    #[serde(default)]
    pub certifications: Option<String>,
    #[serde(default)]
    pub portfolio_link: Option<String>,

    // Address
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,

    #[serde(default)]
    pub interview_notes: Option<String>,

    // Tracking
    #[serde(default)]
    pub resume_received: bool,
    #[serde(default)]
    pub references_checked: bool,
    #[serde(default)]
    pub background_check_completed: bool,
    #[serde(default)]
    pub data_processing_consent: bool,

    #[serde(default)]
    pub preferred_contact_method: ContactMethod,

    #[serde(default)]
    pub soft_skills: Option<String>,
    #[serde(default)]
    pub remote_work_experience: Option<String>,
    #[serde(default)]
    pub linkedin_profile: Option<String>,
    #[serde(default)]
    pub github_profile: Option<String>,
    #[serde(default)]
    pub volunteer_experience: Option<String>,
    #[serde(default)]
    pub professional_development: Option<String>,

    // Work authorization
    #[serde(default)]
    pub work_authorization_status: Option<String>,
    #[serde(default)]
    pub visa_type: Option<String>,
    #[serde(default)]
    pub visa_expiration_date: Option<NaiveDate>,

    #[serde(default)]
    pub relocation_willingness: bool,
    #[serde(default)]
    pub relocation_preferences: Option<String>,

    #[serde(default)]
    pub recruiter_feedback: Option<String>,

    // Offer
    #[serde(default)]
    pub offer_salary: Option<Money>,
    #[serde(default)]
    pub offer_benefits: Option<String>,
    #[serde(default)]
    pub offer_start_date: Option<NaiveDate>,

    #[serde(default)]
    pub onboarding_information: Option<String>,

    // Retention
    #[serde(default)]
    pub reasons_for_leaving: Option<String>,
    #[serde(default)]
    pub job_satisfaction_factors: Option<String>,

    // Performance
    #[serde(default)]
    pub performance_review_rating: Option<Rating>,
    #[serde(default)]
    pub performance_review_comments: Option<String>,
    #[serde(default)]
    pub performance_review_goals: Option<String>,

    #[serde(default)]
    pub exit_interview_feedback: Option<String>,
}

impl CandidateDetails {
    /// A candidate with the given name, email and start date. The remaining
    /// required text columns start empty and must be filled before saving;
    /// every defaulted column carries its default.
    pub fn new(first_name: &str, last_name: &str, email: &str, available_start_date: NaiveDate) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            phone_number: None,
            date_of_birth: None,
            gender: None,
            nationality: None,
            ethnicity: None,
            education_level: String::new(),
            school_id: None,
            degree: String::new(),
            graduation_year: 0,
            skills: String::new(),
            job_type: JobType::default(),
            area_preference: String::new(),
            industry_preference: String::new(),
            salary_expectation: None,
            available_start_date,
            available_end_date: None,
            specific_availability_details: None,
            languages: None,
            certifications: None,
            portfolio_link: None,
            address: String::new(),
            city: String::new(),
            state: String::new(),
            zip_code: String::new(),
            country: String::new(),
            interview_notes: None,
            resume_received: false,
            references_checked: false,
            background_check_completed: false,
            data_processing_consent: false,
            preferred_contact_method: ContactMethod::default(),
            soft_skills: None,
            remote_work_experience: None,
            linkedin_profile: None,
            github_profile: None,
            volunteer_experience: None,
            professional_development: None,
            work_authorization_status: None,
            visa_type: None,
            visa_expiration_date: None,
            relocation_willingness: false,
            relocation_preferences: None,
            recruiter_feedback: None,
            offer_salary: None,
            offer_benefits: None,
            offer_start_date: None,
            onboarding_information: None,
            reasons_for_leaving: None,
            job_satisfaction_factors: None,
            performance_review_rating: None,
            performance_review_comments: None,
            performance_review_goals: None,
            exit_interview_feedback: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    #[serde(flatten)]
    pub details: CandidateDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.details.first_name, self.details.last_name)
    }
}

/// Partial update of the document-tracking and consent flags. `None` leaves
/// a flag unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackingUpdate {
    pub resume_received: Option<bool>,
    pub references_checked: Option<bool>,
    pub background_check_completed: Option<bool>,
    pub data_processing_consent: Option<bool>,
    pub relocation_willingness: Option<bool>,
}

impl TrackingUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub job_type: Option<JobType>,
    pub school_id: Option<i64>,
    /// Case-insensitive substring of first or last name.
    pub name: Option<String>,
}
