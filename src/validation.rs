use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::error::{Result, SchemaError};
use crate::models::{CandidateDetails, NewReference, NewWorkExperience};

pub const NAME_MAX: usize = 100;
pub const PHONE_MAX: usize = 20;
pub const GENDER_MAX: usize = 10;
pub const EMAIL_MAX: usize = 254;
pub const URL_MAX: usize = 200;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("email pattern compiles"));

/// Field-level checks run before a record is written.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn required(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SchemaError::invalid(field, "this field is required"));
    }
    Ok(())
}

pub fn max_len(field: &'static str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(SchemaError::invalid(
            field,
            format!("ensure this value has at most {} characters (it has {})", max, len),
        ));
    }
    Ok(())
}

/// Required and bounded, the shape of every mandatory short text column.
pub fn required_text(field: &'static str, value: &str, max: usize) -> Result<()> {
    required(field, value)?;
    max_len(field, value, max)
}

pub fn optional_text(field: &'static str, value: Option<&str>, max: usize) -> Result<()> {
    match value {
        Some(v) => max_len(field, v, max),
        None => Ok(()),
    }
}

pub fn email(field: &'static str, value: &str) -> Result<()> {
    required(field, value)?;
    max_len(field, value, EMAIL_MAX)?;
    if !EMAIL_RE.is_match(value) {
        return Err(SchemaError::invalid(field, "enter a valid email address"));
    }
    Ok(())
}

pub fn web_url(field: &'static str, value: Option<&str>) -> Result<()> {
    let Some(value) = value else { return Ok(()) };
    max_len(field, value, URL_MAX)?;

    let parsed = Url::parse(value).map_err(|e| SchemaError::invalid(field, format!("enter a valid URL ({})", e)))?;
    match parsed.scheme() {
        "http" | "https" | "ftp" | "ftps" => {}
        scheme => {
            return Err(SchemaError::invalid(field, format!("unsupported URL scheme: {}", scheme)));
        }
    }
    if parsed.host_str().is_none() {
        return Err(SchemaError::invalid(field, "enter a valid URL (missing host)"));
    }
    Ok(())
}

pub fn school_name(name: &str) -> Result<()> {
    required_text("name", name, NAME_MAX)
}

impl Validate for NewWorkExperience {
    fn validate(&self) -> Result<()> {
        required_text("company_name", &self.company_name, NAME_MAX)?;
        required_text("job_title", &self.job_title, NAME_MAX)?;
        required("description", &self.description)
    }
}

impl Validate for NewReference {
    fn validate(&self) -> Result<()> {
        required_text("name", &self.name, NAME_MAX)?;
        email("email", &self.email)?;
        required_text("phone_number", &self.phone_number, PHONE_MAX)
    }
}

impl Validate for CandidateDetails {
    fn validate(&self) -> Result<()> {
        required_text("first_name", &self.first_name, NAME_MAX)?;
        required_text("last_name", &self.last_name, NAME_MAX)?;
        email("email", &self.email)?;
        optional_text("phone_number", self.phone_number.as_deref(), PHONE_MAX)?;

        optional_text("gender", self.gender.as_deref(), GENDER_MAX)?;
        optional_text("nationality", self.nationality.as_deref(), NAME_MAX)?;
        optional_text("ethnicity", self.ethnicity.as_deref(), NAME_MAX)?;

        required_text("education_level", &self.education_level, NAME_MAX)?;
        required_text("degree", &self.degree, NAME_MAX)?;
        required("skills", &self.skills)?;

        required_text("area_preference", &self.area_preference, NAME_MAX)?;
        required_text("industry_preference", &self.industry_preference, NAME_MAX)?;

        web_url("portfolio_link", self.portfolio_link.as_deref())?;
        web_url("linkedin_profile", self.linkedin_profile.as_deref())?;
        web_url("github_profile", self.github_profile.as_deref())?;

        required_text("address", &self.address, NAME_MAX)?;
        required_text("city", &self.city, NAME_MAX)?;
        required_text("state", &self.state, NAME_MAX)?;
        required_text("zip_code", &self.zip_code, PHONE_MAX)?;
        required_text("country", &self.country, NAME_MAX)?;

        optional_text("work_authorization_status", self.work_authorization_status.as_deref(), NAME_MAX)?;
        optional_text("visa_type", self.visa_type.as_deref(), NAME_MAX)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn reference() -> NewReference {
        NewReference {
            candidate_id: 1,
            name: "Linus".to_string(),
            email: "linus@example.org".to_string(),
            phone_number: "555-0100".to_string(),
        }
    }

    #[test]
    fn accepts_valid_reference() {
        assert!(reference().validate().is_ok());
    }

    #[test]
    fn rejects_bad_email() {
        for bad in ["", "linus", "linus@", "@example.org", "linus@example", "li nus@example.org"] {
            let mut r = reference();
            r.email = bad.to_string();
            assert!(r.validate().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn rejects_overlong_phone() {
        let mut r = reference();
        r.phone_number = "1".repeat(PHONE_MAX + 1);
        let err = r.validate().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { field: "phone_number", .. }));
    }

    #[test]
    fn max_len_counts_characters_not_bytes() {
        assert!(max_len("name", &"é".repeat(NAME_MAX), NAME_MAX).is_ok());
        assert!(max_len("name", &"é".repeat(NAME_MAX + 1), NAME_MAX).is_err());
    }

    #[test]
    fn url_checks() {
        assert!(web_url("github_profile", None).is_ok());
        assert!(web_url("github_profile", Some("https://github.com/ada")).is_ok());
        assert!(web_url("github_profile", Some("github.com/ada")).is_err());
        assert!(web_url("github_profile", Some("mailto:ada@example.com")).is_err());
    }

    #[test]
    fn work_experience_requires_description() {
        let we = NewWorkExperience {
            candidate_id: 1,
            company_name: "Initech".to_string(),
            job_title: "Engineer".to_string(),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end_date: None,
            description: "   ".to_string(),
        };
        let err = we.validate().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { field: "description", .. }));
    }

    #[test]
    fn candidate_new_is_incomplete_until_required_fields_are_set() {
        let details = CandidateDetails::new(
            "Ada",
            "Lovelace",
            "ada@example.com",
            NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
        );
        let err = details.validate().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { field: "education_level", .. }));
    }
}
