use chrono::{DateTime, Duration, Utc};
use rusqlite::types::ToSql;
use rusqlite::{named_params, params, params_from_iter, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::error::{Result, SchemaError};
use crate::models::{
    AccreditedSchool, Candidate, CandidateDetails, CandidateFilter, NewReference, NewWorkExperience, Reference,
    TrackingUpdate, WorkExperience,
};
use crate::validation::{self, Validate};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accredited_school (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS candidate (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone_number TEXT,
    date_of_birth TEXT,
    gender TEXT,
    nationality TEXT,
    ethnicity TEXT,
    education_level TEXT NOT NULL,
    school_id INTEGER REFERENCES accredited_school(id) ON DELETE SET NULL,
    degree TEXT NOT NULL,
    graduation_year INTEGER NOT NULL CHECK (graduation_year >= 0),
    skills TEXT NOT NULL,
    job_type TEXT NOT NULL DEFAULT 'Full-time'
        CHECK (job_type IN ('Full-time', 'Part-time', 'Contract', 'Internship', 'Remote', 'Other')),
    area_preference TEXT NOT NULL,
    industry_preference TEXT NOT NULL,
    salary_expectation TEXT,
    available_start_date TEXT NOT NULL,
    available_end_date TEXT,
    specific_availability_details TEXT,
    languages TEXT,
    certifications TEXT,
    portfolio_link TEXT,
    address TEXT NOT NULL,
    city TEXT NOT NULL,
    state TEXT NOT NULL,
    zip_code TEXT NOT NULL,
    country TEXT NOT NULL,
    interview_notes TEXT,
    resume_received INTEGER NOT NULL DEFAULT 0 CHECK (resume_received IN (0, 1)),
    references_checked INTEGER NOT NULL DEFAULT 0 CHECK (references_checked IN (0, 1)),
    background_check_completed INTEGER NOT NULL DEFAULT 0 CHECK (background_check_completed IN (0, 1)),
    data_processing_consent INTEGER NOT NULL DEFAULT 0 CHECK (data_processing_consent IN (0, 1)),
    preferred_contact_method TEXT NOT NULL DEFAULT 'Email'
        CHECK (preferred_contact_method IN ('Email', 'Phone', 'Text')),
    soft_skills TEXT,
    remote_work_experience TEXT,
    linkedin_profile TEXT,
    github_profile TEXT,
    volunteer_experience TEXT,
    professional_development TEXT,
    work_authorization_status TEXT,
    visa_type TEXT,
    visa_expiration_date TEXT,
    relocation_willingness INTEGER NOT NULL DEFAULT 0 CHECK (relocation_willingness IN (0, 1)),
    relocation_preferences TEXT,
    recruiter_feedback TEXT,
    offer_salary TEXT,
    offer_benefits TEXT,
    offer_start_date TEXT,
    onboarding_information TEXT,
    reasons_for_leaving TEXT,
    job_satisfaction_factors TEXT,
    performance_review_rating TEXT,
    performance_review_comments TEXT,
    performance_review_goals TEXT,
    exit_interview_feedback TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS work_experience (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    candidate_id INTEGER NOT NULL REFERENCES candidate(id) ON DELETE CASCADE,
    company_name TEXT NOT NULL,
    job_title TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT,
    description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reference (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    candidate_id INTEGER NOT NULL REFERENCES candidate(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone_number TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS candidate_work_experiences (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    candidate_id INTEGER NOT NULL REFERENCES candidate(id) ON DELETE CASCADE,
    work_experience_id INTEGER NOT NULL REFERENCES work_experience(id) ON DELETE CASCADE,
    UNIQUE (candidate_id, work_experience_id)
);

CREATE TABLE IF NOT EXISTS candidate_references (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    candidate_id INTEGER NOT NULL REFERENCES candidate(id) ON DELETE CASCADE,
    reference_id INTEGER NOT NULL REFERENCES reference(id) ON DELETE CASCADE,
    UNIQUE (candidate_id, reference_id)
);

CREATE INDEX IF NOT EXISTS idx_candidate_school ON candidate(school_id);
CREATE INDEX IF NOT EXISTS idx_candidate_job_type ON candidate(job_type);
CREATE INDEX IF NOT EXISTS idx_work_experience_candidate ON work_experience(candidate_id);
CREATE INDEX IF NOT EXISTS idx_reference_candidate ON reference(candidate_id);
CREATE INDEX IF NOT EXISTS idx_cwe_work_experience ON candidate_work_experiences(work_experience_id);
CREATE INDEX IF NOT EXISTS idx_cr_reference ON candidate_references(reference_id);

CREATE TRIGGER IF NOT EXISTS candidate_created_at_fixed
BEFORE UPDATE OF created_at ON candidate
WHEN NEW.created_at IS NOT OLD.created_at
BEGIN
    SELECT RAISE(ABORT, 'candidate.created_at cannot change');
END;
"#;

pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&path)?;
        Self::configure(&conn)?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Ok(Self { conn, path: None })
    }

    fn configure(conn: &Connection) -> Result<()> {
        // Cascade and set-null rules only fire with enforcement on.
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(())
    }

    /// On-disk location, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        tracing::info!("schema initialized");
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='candidate'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(SchemaError::NotInitialized);
        }
        Ok(())
    }

    // --- Accredited school operations ---

    pub fn create_school(&self, name: &str) -> Result<i64> {
        validation::school_name(name)?;
        self.conn
            .execute("INSERT INTO accredited_school (name) VALUES (?1)", [name])
            .map_err(|e| SchemaError::from(e).with_value(name))?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(school_id = id, name, "created accredited school");
        Ok(id)
    }

    pub fn get_school(&self, id: i64) -> Result<Option<AccreditedSchool>> {
        self.conn
            .query_row(
                "SELECT id, name FROM accredited_school WHERE id = ?1",
                [id],
                Self::row_to_school,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn get_school_by_name(&self, name: &str) -> Result<Option<AccreditedSchool>> {
        self.conn
            .query_row(
                "SELECT id, name FROM accredited_school WHERE LOWER(name) = LOWER(?1)",
                [name],
                Self::row_to_school,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_schools(&self) -> Result<Vec<AccreditedSchool>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM accredited_school ORDER BY name")?;
        let rows = stmt.query_map([], Self::row_to_school)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn rename_school(&self, id: i64, name: &str) -> Result<()> {
        validation::school_name(name)?;
        let changed = self
            .conn
            .execute("UPDATE accredited_school SET name = ?1 WHERE id = ?2", params![name, id])
            .map_err(|e| SchemaError::from(e).with_value(name))?;
        if changed == 0 {
            return Err(SchemaError::not_found("AccreditedSchool", id));
        }
        tracing::debug!(school_id = id, name, "renamed accredited school");
        Ok(())
    }

    /// Candidates that referenced the school keep their row with `school_id`
    /// cleared.
    pub fn delete_school(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM accredited_school WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(SchemaError::not_found("AccreditedSchool", id));
        }
        tracing::debug!(school_id = id, "deleted accredited school");
        Ok(())
    }

    fn row_to_school(row: &rusqlite::Row) -> rusqlite::Result<AccreditedSchool> {
        Ok(AccreditedSchool {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }

    // --- Work experience operations ---

    pub fn create_work_experience(&self, new: &NewWorkExperience) -> Result<i64> {
        new.validate()?;
        self.conn.execute(
            "INSERT INTO work_experience (candidate_id, company_name, job_title, start_date, end_date, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.candidate_id,
                new.company_name,
                new.job_title,
                new.start_date,
                new.end_date,
                new.description
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(work_experience_id = id, candidate_id = new.candidate_id, "created work experience");
        Ok(id)
    }

    pub fn get_work_experience(&self, id: i64) -> Result<Option<WorkExperience>> {
        self.conn
            .query_row(
                "SELECT id, candidate_id, company_name, job_title, start_date, end_date, description
                 FROM work_experience WHERE id = ?1",
                [id],
                Self::row_to_work_experience,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Work experiences owned by the candidate through the direct key.
    pub fn list_work_experiences_for(&self, candidate_id: i64) -> Result<Vec<WorkExperience>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, candidate_id, company_name, job_title, start_date, end_date, description
             FROM work_experience WHERE candidate_id = ?1
             ORDER BY start_date DESC, id",
        )?;
        let rows = stmt.query_map([candidate_id], Self::row_to_work_experience)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn update_work_experience(&self, id: i64, new: &NewWorkExperience) -> Result<()> {
        new.validate()?;
        let changed = self.conn.execute(
            "UPDATE work_experience
             SET candidate_id = ?1, company_name = ?2, job_title = ?3,
                 start_date = ?4, end_date = ?5, description = ?6
             WHERE id = ?7",
            params![
                new.candidate_id,
                new.company_name,
                new.job_title,
                new.start_date,
                new.end_date,
                new.description,
                id
            ],
        )?;
        if changed == 0 {
            return Err(SchemaError::not_found("WorkExperience", id));
        }
        Ok(())
    }

    pub fn delete_work_experience(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM work_experience WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(SchemaError::not_found("WorkExperience", id));
        }
        tracing::debug!(work_experience_id = id, "deleted work experience");
        Ok(())
    }

    fn row_to_work_experience(row: &rusqlite::Row) -> rusqlite::Result<WorkExperience> {
        Ok(WorkExperience {
            id: row.get(0)?,
            candidate_id: row.get(1)?,
            company_name: row.get(2)?,
            job_title: row.get(3)?,
            start_date: row.get(4)?,
            end_date: row.get(5)?,
            description: row.get(6)?,
        })
    }

    // --- Reference operations ---

    pub fn create_reference(&self, new: &NewReference) -> Result<i64> {
        new.validate()?;
        self.conn.execute(
            "INSERT INTO reference (candidate_id, name, email, phone_number) VALUES (?1, ?2, ?3, ?4)",
            params![new.candidate_id, new.name, new.email, new.phone_number],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(reference_id = id, candidate_id = new.candidate_id, "created reference");
        Ok(id)
    }

    pub fn get_reference(&self, id: i64) -> Result<Option<Reference>> {
        self.conn
            .query_row(
                "SELECT id, candidate_id, name, email, phone_number FROM reference WHERE id = ?1",
                [id],
                Self::row_to_reference,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_references_for(&self, candidate_id: i64) -> Result<Vec<Reference>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, candidate_id, name, email, phone_number
             FROM reference WHERE candidate_id = ?1 ORDER BY name, id",
        )?;
        let rows = stmt.query_map([candidate_id], Self::row_to_reference)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn update_reference(&self, id: i64, new: &NewReference) -> Result<()> {
        new.validate()?;
        let changed = self.conn.execute(
            "UPDATE reference SET candidate_id = ?1, name = ?2, email = ?3, phone_number = ?4 WHERE id = ?5",
            params![new.candidate_id, new.name, new.email, new.phone_number, id],
        )?;
        if changed == 0 {
            return Err(SchemaError::not_found("Reference", id));
        }
        Ok(())
    }

    pub fn delete_reference(&self, id: i64) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM reference WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(SchemaError::not_found("Reference", id));
        }
        tracing::debug!(reference_id = id, "deleted reference");
        Ok(())
    }

    fn row_to_reference(row: &rusqlite::Row) -> rusqlite::Result<Reference> {
        Ok(Reference {
            id: row.get(0)?,
            candidate_id: row.get(1)?,
            name: row.get(2)?,
            email: row.get(3)?,
            phone_number: row.get(4)?,
        })
    }

    // --- Candidate operations ---

    pub fn create_candidate(&self, details: &CandidateDetails) -> Result<i64> {
        details.validate()?;
        let now = Utc::now();

        let mut params = detail_params(details);
        params.push((":created_at", &now as &dyn ToSql));
        params.push((":updated_at", &now as &dyn ToSql));

        let columns: Vec<&str> = params.iter().map(|(name, _)| &name[1..]).collect();
        let placeholders: Vec<&str> = params.iter().map(|(name, _)| *name).collect();
        let sql = format!(
            "INSERT INTO candidate ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );

        self.conn.execute(&sql, &params[..])?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(candidate_id = id, name = %details.full_name(), "created candidate");
        Ok(id)
    }

    pub fn get_candidate(&self, id: i64) -> Result<Option<Candidate>> {
        self.conn
            .query_row("SELECT * FROM candidate WHERE id = ?1", [id], Self::row_to_candidate)
            .optional()
            .map_err(Into::into)
    }

    pub fn list_candidates(&self, filter: &CandidateFilter) -> Result<Vec<Candidate>> {
        let mut sql = String::from("SELECT * FROM candidate WHERE 1=1");
        let mut params: Vec<Box<dyn ToSql>> = vec![];

        if let Some(job_type) = filter.job_type {
            params.push(Box::new(job_type));
            sql.push_str(&format!(" AND job_type = ?{}", params.len()));
        }

        if let Some(school_id) = filter.school_id {
            params.push(Box::new(school_id));
            sql.push_str(&format!(" AND school_id = ?{}", params.len()));
        }

        if let Some(name) = &filter.name {
            params.push(Box::new(format!("%{}%", escape_like(name))));
            let n = params.len();
            sql.push_str(&format!(
                r" AND (first_name LIKE ?{n} ESCAPE '\' OR last_name LIKE ?{n} ESCAPE '\')"
            ));
        }

        sql.push_str(" ORDER BY last_name, first_name, id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), Self::row_to_candidate)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Replace every caller-controlled column. `created_at` is left alone and
    /// `updated_at` moves forward.
    pub fn update_candidate(&self, id: i64, details: &CandidateDetails) -> Result<()> {
        details.validate()?;
        let tx = self.conn.unchecked_transaction()?;
        let updated_at = next_updated_at(&tx, id)?;

        let mut params = detail_params(details);
        params.push((":updated_at", &updated_at as &dyn ToSql));
        let assignments: Vec<String> = params
            .iter()
            .map(|(name, _)| format!("{} = {}", &name[1..], name))
            .collect();
        params.push((":id", &id as &dyn ToSql));

        let sql = format!("UPDATE candidate SET {} WHERE id = :id", assignments.join(", "));
        tx.execute(&sql, &params[..])?;
        tx.commit()?;

        tracing::debug!(candidate_id = id, "updated candidate");
        Ok(())
    }

    pub fn set_tracking(&self, id: i64, update: &TrackingUpdate) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let updated_at = next_updated_at(&tx, id)?;
        tx.execute(
            "UPDATE candidate SET
                resume_received = COALESCE(:resume_received, resume_received),
                references_checked = COALESCE(:references_checked, references_checked),
                background_check_completed = COALESCE(:background_check_completed, background_check_completed),
                data_processing_consent = COALESCE(:data_processing_consent, data_processing_consent),
                relocation_willingness = COALESCE(:relocation_willingness, relocation_willingness),
                updated_at = :updated_at
             WHERE id = :id",
            named_params! {
                ":resume_received": update.resume_received,
                ":references_checked": update.references_checked,
                ":background_check_completed": update.background_check_completed,
                ":data_processing_consent": update.data_processing_consent,
                ":relocation_willingness": update.relocation_willingness,
                ":updated_at": updated_at,
                ":id": id,
            },
        )?;
        tx.commit()?;
        tracing::debug!(candidate_id = id, ?update, "updated tracking flags");
        Ok(())
    }

    /// Owned work experiences, owned references and all junction rows go
    /// with the candidate.
    pub fn delete_candidate(&self, id: i64) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM candidate WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(SchemaError::not_found("Candidate", id));
        }
        tracing::debug!(candidate_id = id, "deleted candidate");
        Ok(())
    }

    fn row_to_candidate(row: &rusqlite::Row) -> rusqlite::Result<Candidate> {
        Ok(Candidate {
            id: row.get("id")?,
            details: CandidateDetails {
                first_name: row.get("first_name")?,
                last_name: row.get("last_name")?,
                email: row.get("email")?,
                phone_number: row.get("phone_number")?,
                date_of_birth: row.get("date_of_birth")?,
                gender: row.get("gender")?,
                nationality: row.get("nationality")?,
                ethnicity: row.get("ethnicity")?,
                education_level: row.get("education_level")?,
                school_id: row.get("school_id")?,
                degree: row.get("degree")?,
                graduation_year: row.get("graduation_year")?,
                skills: row.get("skills")?,
                job_type: row.get("job_type")?,
                area_preference: row.get("area_preference")?,
                industry_preference: row.get("industry_preference")?,
                salary_expectation: row.get("salary_expectation")?,
                available_start_date: row.get("available_start_date")?,
                available_end_date: row.get("available_end_date")?,
                specific_availability_details: row.get("specific_availability_details")?,
                languages: row.get("languages")?,
                certifications: row.get("certifications")?,
                portfolio_link: row.get("portfolio_link")?,
                address: row.get("address")?,
                city: row.get("city")?,
                state: row.get("state")?,
                zip_code: row.get("zip_code")?,
                country: row.get("country")?,
                interview_notes: row.get("interview_notes")?,
                resume_received: row.get("resume_received")?,
                references_checked: row.get("references_checked")?,
                background_check_completed: row.get("background_check_completed")?,
                data_processing_consent: row.get("data_processing_consent")?,
                preferred_contact_method: row.get("preferred_contact_method")?,
                soft_skills: row.get("soft_skills")?,
                remote_work_experience: row.get("remote_work_experience")?,
                linkedin_profile: row.get("linkedin_profile")?,
                github_profile: row.get("github_profile")?,
                volunteer_experience: row.get("volunteer_experience")?,
                professional_development: row.get("professional_development")?,
                work_authorization_status: row.get("work_authorization_status")?,
                visa_type: row.get("visa_type")?,
                visa_expiration_date: row.get("visa_expiration_date")?,
                relocation_willingness: row.get("relocation_willingness")?,
                relocation_preferences: row.get("relocation_preferences")?,
                recruiter_feedback: row.get("recruiter_feedback")?,
                offer_salary: row.get("offer_salary")?,
                offer_benefits: row.get("offer_benefits")?,
                offer_start_date: row.get("offer_start_date")?,
                onboarding_information: row.get("onboarding_information")?,
                reasons_for_leaving: row.get("reasons_for_leaving")?,
                job_satisfaction_factors: row.get("job_satisfaction_factors")?,
                performance_review_rating: row.get("performance_review_rating")?,
                performance_review_comments: row.get("performance_review_comments")?,
                performance_review_goals: row.get("performance_review_goals")?,
                exit_interview_feedback: row.get("exit_interview_feedback")?,
            },
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    // --- Many-to-many links ---

    /// Returns false when the pair was already linked.
    pub fn link_work_experience(&self, candidate_id: i64, work_experience_id: i64) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO candidate_work_experiences (candidate_id, work_experience_id) VALUES (?1, ?2)",
            params![candidate_id, work_experience_id],
        )?;
        Ok(inserted > 0)
    }

    pub fn unlink_work_experience(&self, candidate_id: i64, work_experience_id: i64) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM candidate_work_experiences WHERE candidate_id = ?1 AND work_experience_id = ?2",
            params![candidate_id, work_experience_id],
        )?;
        Ok(removed > 0)
    }

    pub fn linked_work_experiences(&self, candidate_id: i64) -> Result<Vec<WorkExperience>> {
        let mut stmt = self.conn.prepare(
            "SELECT w.id, w.candidate_id, w.company_name, w.job_title, w.start_date, w.end_date, w.description
             FROM work_experience w
             JOIN candidate_work_experiences cw ON cw.work_experience_id = w.id
             WHERE cw.candidate_id = ?1
             ORDER BY w.start_date DESC, w.id",
        )?;
        let rows = stmt.query_map([candidate_id], Self::row_to_work_experience)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn link_reference(&self, candidate_id: i64, reference_id: i64) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO candidate_references (candidate_id, reference_id) VALUES (?1, ?2)",
            params![candidate_id, reference_id],
        )?;
        Ok(inserted > 0)
    }

    pub fn unlink_reference(&self, candidate_id: i64, reference_id: i64) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM candidate_references WHERE candidate_id = ?1 AND reference_id = ?2",
            params![candidate_id, reference_id],
        )?;
        Ok(removed > 0)
    }

    pub fn linked_references(&self, candidate_id: i64) -> Result<Vec<Reference>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.candidate_id, r.name, r.email, r.phone_number
             FROM reference r
             JOIN candidate_references cr ON cr.reference_id = r.id
             WHERE cr.candidate_id = ?1
             ORDER BY r.name, r.id",
        )?;
        let rows = stmt.query_map([candidate_id], Self::row_to_reference)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

/// Named parameters for every caller-controlled candidate column. The names
/// double as the column list for the insert and update statements.
fn detail_params(d: &CandidateDetails) -> Vec<(&'static str, &dyn ToSql)> {
    vec![
        (":first_name", &d.first_name as &dyn ToSql),
        (":last_name", &d.last_name as &dyn ToSql),
        (":email", &d.email as &dyn ToSql),
        (":phone_number", &d.phone_number as &dyn ToSql),
        (":date_of_birth", &d.date_of_birth as &dyn ToSql),
        (":gender", &d.gender as &dyn ToSql),
        (":nationality", &d.nationality as &dyn ToSql),
        (":ethnicity", &d.ethnicity as &dyn ToSql),
        (":education_level", &d.education_level as &dyn ToSql),
        (":school_id", &d.school_id as &dyn ToSql),
        (":degree", &d.degree as &dyn ToSql),
        (":graduation_year", &d.graduation_year as &dyn ToSql),
        (":skills", &d.skills as &dyn ToSql),
        (":job_type", &d.job_type as &dyn ToSql),
        (":area_preference", &d.area_preference as &dyn ToSql),
        (":industry_preference", &d.industry_preference as &dyn ToSql),
        (":salary_expectation", &d.salary_expectation as &dyn ToSql),
        (":available_start_date", &d.available_start_date as &dyn ToSql),
        (":available_end_date", &d.available_end_date as &dyn ToSql),
        (":specific_availability_details", &d.specific_availability_details as &dyn ToSql),
        (":languages", &d.languages as &dyn ToSql),
        (":certifications", &d.certifications as &dyn ToSql),
        (":portfolio_link", &d.portfolio_link as &dyn ToSql),
        (":address", &d.address as &dyn ToSql),
        (":city", &d.city as &dyn ToSql),
        (":state", &d.state as &dyn ToSql),
        (":zip_code", &d.zip_code as &dyn ToSql),
        (":country", &d.country as &dyn ToSql),
        (":interview_notes", &d.interview_notes as &dyn ToSql),
        (":resume_received", &d.resume_received as &dyn ToSql),
        (":references_checked", &d.references_checked as &dyn ToSql),
        (":background_check_completed", &d.background_check_completed as &dyn ToSql),
        (":data_processing_consent", &d.data_processing_consent as &dyn ToSql),
        (":preferred_contact_method", &d.preferred_contact_method as &dyn ToSql),
        (":soft_skills", &d.soft_skills as &dyn ToSql),
        (":remote_work_experience", &d.remote_work_experience as &dyn ToSql),
        (":linkedin_profile", &d.linkedin_profile as &dyn ToSql),
        (":github_profile", &d.github_profile as &dyn ToSql),
        (":volunteer_experience", &d.volunteer_experience as &dyn ToSql),
        (":professional_development", &d.professional_development as &dyn ToSql),
        (":work_authorization_status", &d.work_authorization_status as &dyn ToSql),
        (":visa_type", &d.visa_type as &dyn ToSql),
        (":visa_expiration_date", &d.visa_expiration_date as &dyn ToSql),
        (":relocation_willingness", &d.relocation_willingness as &dyn ToSql),
        (":relocation_preferences", &d.relocation_preferences as &dyn ToSql),
        (":recruiter_feedback", &d.recruiter_feedback as &dyn ToSql),
        (":offer_salary", &d.offer_salary as &dyn ToSql),
        (":offer_benefits", &d.offer_benefits as &dyn ToSql),
        (":offer_start_date", &d.offer_start_date as &dyn ToSql),
        (":onboarding_information", &d.onboarding_information as &dyn ToSql),
        (":reasons_for_leaving", &d.reasons_for_leaving as &dyn ToSql),
        (":job_satisfaction_factors", &d.job_satisfaction_factors as &dyn ToSql),
        (":performance_review_rating", &d.performance_review_rating as &dyn ToSql),
        (":performance_review_comments", &d.performance_review_comments as &dyn ToSql),
        (":performance_review_goals", &d.performance_review_goals as &dyn ToSql),
        (":exit_interview_feedback", &d.exit_interview_feedback as &dyn ToSql),
    ]
}

/// A timestamp strictly after the candidate's current `updated_at`, so two
/// writes inside one clock tick still move it.
fn next_updated_at(conn: &Connection, id: i64) -> Result<DateTime<Utc>> {
    let previous: DateTime<Utc> = conn
        .query_row("SELECT updated_at FROM candidate WHERE id = ?1", [id], |row| row.get(0))
        .optional()?
        .ok_or_else(|| SchemaError::not_found("Candidate", id))?;

    let now = Utc::now();
    if now > previous {
        Ok(now)
    } else {
        Ok(previous + Duration::microseconds(1))
    }
}

/// Escape LIKE metacharacters so user text matches literally under `ESCAPE '\'`.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactMethod, JobType};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    fn details(first: &str, last: &str) -> CandidateDetails {
        CandidateDetails {
            education_level: "Bachelor".to_string(),
            degree: "Computer Science".to_string(),
            graduation_year: 2019,
            skills: "Rust, SQL".to_string(),
            area_preference: "Remote".to_string(),
            industry_preference: "Software".to_string(),
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
            country: "USA".to_string(),
            ..CandidateDetails::new(first, last, "someone@example.com", date(2025, 3, 1))
        }
    }

    fn experience(candidate_id: i64, company: &str) -> NewWorkExperience {
        NewWorkExperience {
            candidate_id,
            company_name: company.to_string(),
            job_title: "Engineer".to_string(),
            start_date: date(2020, 1, 1),
            end_date: Some(date(2022, 6, 30)),
            description: "Built things".to_string(),
        }
    }

    fn reference(candidate_id: i64, name: &str) -> NewReference {
        NewReference {
            candidate_id,
            name: name.to_string(),
            email: "ref@example.com".to_string(),
            phone_number: "555-0101".to_string(),
        }
    }

    #[test]
    fn init_is_idempotent_and_required() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.ensure_initialized(), Err(SchemaError::NotInitialized)));
        db.init().unwrap();
        db.init().unwrap();
        db.ensure_initialized().unwrap();
    }

    #[test]
    fn duplicate_school_name_is_a_unique_violation() {
        let db = setup();
        db.create_school("State University").unwrap();
        let err = db.create_school("State University").unwrap_err();
        match err {
            SchemaError::UniqueViolation { table, value } => {
                assert_eq!(table, "accredited_school");
                assert_eq!(value, "State University");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(db.list_schools().unwrap().len(), 1);
    }

    #[test]
    fn school_lookup_and_rename() {
        let db = setup();
        let id = db.create_school("Tech Institute").unwrap();
        assert_eq!(db.get_school_by_name("tech institute").unwrap().unwrap().id, id);

        db.rename_school(id, "Institute of Technology").unwrap();
        assert_eq!(db.get_school(id).unwrap().unwrap().name, "Institute of Technology");

        assert!(matches!(
            db.rename_school(id + 100, "Nowhere"),
            Err(SchemaError::NotFound { entity: "AccreditedSchool", .. })
        ));
        assert!(db.create_school("").is_err());
    }

    #[test]
    fn candidate_defaults_are_applied() {
        let db = setup();
        let id = db.create_candidate(&details("Ada", "Lovelace")).unwrap();
        let candidate = db.get_candidate(id).unwrap().unwrap();

        assert_eq!(candidate.details.job_type, JobType::FullTime);
        assert_eq!(candidate.details.preferred_contact_method, ContactMethod::Email);
        assert!(!candidate.details.resume_received);
        assert!(!candidate.details.references_checked);
        assert!(!candidate.details.background_check_completed);
        assert!(!candidate.details.data_processing_consent);
        assert!(!candidate.details.relocation_willingness);
        assert_eq!(candidate.created_at, candidate.updated_at);
        assert_eq!(candidate.to_string(), "Ada Lovelace");
    }

    #[test]
    fn sql_defaults_match_rust_defaults() {
        let db = setup();
        // Leave every defaulted column out of the insert.
        db.conn
            .execute(
                "INSERT INTO candidate (first_name, last_name, email, education_level, degree,
                     graduation_year, skills, area_preference, industry_preference,
                     available_start_date, address, city, state, zip_code, country,
                     created_at, updated_at)
                 VALUES ('Ada', 'Lovelace', 'ada@example.com', 'Bachelor', 'Mathematics',
                     1835, 'Analysis', 'London', 'Computing', '2025-03-01', '1 Main St',
                     'London', 'LDN', 'W1', 'UK', ?1, ?1)",
                [Utc::now()],
            )
            .unwrap();
        let id = db.conn.last_insert_rowid();

        let stored = db.get_candidate(id).unwrap().unwrap().details;
        let defaults = details("Ada", "Lovelace");
        assert_eq!(stored.job_type, defaults.job_type);
        assert_eq!(stored.preferred_contact_method, defaults.preferred_contact_method);
        assert_eq!(stored.resume_received, defaults.resume_received);
        assert_eq!(stored.references_checked, defaults.references_checked);
        assert_eq!(stored.background_check_completed, defaults.background_check_completed);
        assert_eq!(stored.data_processing_consent, defaults.data_processing_consent);
        assert_eq!(stored.relocation_willingness, defaults.relocation_willingness);
        assert_eq!(stored.job_type, JobType::FullTime);
        assert_eq!(stored.preferred_contact_method, ContactMethod::Email);
    }

    #[test]
    fn candidate_round_trips_every_column_kind() {
        let db = setup();
        let school = db.create_school("Polytechnic").unwrap();
        let mut d = details("Grace", "Hopper");
        d.school_id = Some(school);
        d.job_type = JobType::Contract;
        d.preferred_contact_method = ContactMethod::Text;
        d.salary_expectation = Some("120000.5".parse().unwrap());
        d.offer_salary = Some("115000".parse().unwrap());
        d.performance_review_rating = Some("4.25".parse().unwrap());
        d.date_of_birth = Some(date(1990, 12, 9));
        d.github_profile = Some("https://github.com/grace".to_string());
        d.relocation_willingness = true;

        let id = db.create_candidate(&d).unwrap();
        let stored = db.get_candidate(id).unwrap().unwrap();
        assert_eq!(stored.details, d);
        assert_eq!(stored.details.salary_expectation.unwrap().to_string(), "120000.50");
    }

    #[test]
    fn updated_at_moves_and_created_at_stays() {
        let db = setup();
        let id = db.create_candidate(&details("Ada", "Lovelace")).unwrap();
        let before = db.get_candidate(id).unwrap().unwrap();

        let mut d = before.details.clone();
        d.interview_notes = Some("Strong on analysis".to_string());
        db.update_candidate(id, &d).unwrap();
        let first = db.get_candidate(id).unwrap().unwrap();
        assert_eq!(first.created_at, before.created_at);
        assert!(first.updated_at > before.updated_at);
        assert_eq!(first.details.interview_notes.as_deref(), Some("Strong on analysis"));

        db.set_tracking(
            id,
            &TrackingUpdate {
                resume_received: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        let second = db.get_candidate(id).unwrap().unwrap();
        assert_eq!(second.created_at, before.created_at);
        assert!(second.updated_at > first.updated_at);
        assert!(second.details.resume_received);
        assert!(!second.details.references_checked);
    }

    #[test]
    fn created_at_cannot_be_rewritten() {
        let db = setup();
        let id = db.create_candidate(&details("Ada", "Lovelace")).unwrap();
        let result = db.conn.execute(
            "UPDATE candidate SET created_at = '2000-01-01 00:00:00+00:00' WHERE id = ?1",
            [id],
        );
        assert!(result.is_err());
    }

    #[test]
    fn out_of_set_job_type_is_rejected() {
        let db = setup();
        let id = db.create_candidate(&details("Ada", "Lovelace")).unwrap();
        assert!("Gig".parse::<JobType>().is_err());

        let err: SchemaError = db
            .conn
            .execute("UPDATE candidate SET job_type = 'Gig' WHERE id = ?1", [id])
            .unwrap_err()
            .into();
        assert!(matches!(err, SchemaError::CheckViolation { .. }));
    }

    #[test]
    fn negative_graduation_year_is_rejected_by_storage() {
        let db = setup();
        let id = db.create_candidate(&details("Ada", "Lovelace")).unwrap();
        let err: SchemaError = db
            .conn
            .execute("UPDATE candidate SET graduation_year = -1 WHERE id = ?1", [id])
            .unwrap_err()
            .into();
        assert!(err.is_constraint());
    }

    #[test]
    fn invalid_candidate_is_not_written() {
        let db = setup();
        let mut d = details("Ada", "Lovelace");
        d.email = "not-an-email".to_string();
        assert!(matches!(
            db.create_candidate(&d),
            Err(SchemaError::InvalidField { field: "email", .. })
        ));
        assert!(db.list_candidates(&CandidateFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn deleting_candidate_cascades_to_owned_rows_only() {
        let db = setup();
        let school = db.create_school("State University").unwrap();
        let mut d = details("Ada", "Lovelace");
        d.school_id = Some(school);
        let ada = db.create_candidate(&d).unwrap();
        let other = db.create_candidate(&details("Alan", "Turing")).unwrap();

        let we = db.create_work_experience(&experience(ada, "Analytical Engines")).unwrap();
        let reference_id = db.create_reference(&reference(ada, "Charles")).unwrap();
        let kept_we = db.create_work_experience(&experience(other, "Bletchley")).unwrap();

        db.delete_candidate(ada).unwrap();

        assert!(db.get_candidate(ada).unwrap().is_none());
        assert!(db.get_work_experience(we).unwrap().is_none());
        assert!(db.get_reference(reference_id).unwrap().is_none());
        assert!(db.get_work_experience(kept_we).unwrap().is_some());
        assert!(db.get_school(school).unwrap().is_some());
    }

    #[test]
    fn deleting_school_clears_candidate_reference() {
        let db = setup();
        let school = db.create_school("State University").unwrap();
        let mut d = details("Ada", "Lovelace");
        d.school_id = Some(school);
        let id = db.create_candidate(&d).unwrap();

        db.delete_school(school).unwrap();

        let candidate = db.get_candidate(id).unwrap().unwrap();
        assert_eq!(candidate.details.school_id, None);
    }

    #[test]
    fn missing_candidate_is_a_foreign_key_violation() {
        let db = setup();
        let err = db.create_work_experience(&experience(42, "Ghost Corp")).unwrap_err();
        assert!(matches!(err, SchemaError::ForeignKeyViolation { .. }));

        let mut d = details("Ada", "Lovelace");
        d.school_id = Some(7);
        assert!(matches!(
            db.create_candidate(&d),
            Err(SchemaError::ForeignKeyViolation { .. })
        ));
    }

    #[test]
    fn shared_work_experience_follows_its_owner() {
        let db = setup();
        let owner = db.create_candidate(&details("Ada", "Lovelace")).unwrap();
        let sharer = db.create_candidate(&details("Alan", "Turing")).unwrap();
        let we = db.create_work_experience(&experience(owner, "Analytical Engines")).unwrap();

        assert!(db.link_work_experience(owner, we).unwrap());
        assert!(db.link_work_experience(sharer, we).unwrap());
        assert!(!db.link_work_experience(sharer, we).unwrap());
        assert_eq!(db.linked_work_experiences(sharer).unwrap().len(), 1);
        // Linking never changes the owner.
        assert!(db.list_work_experiences_for(sharer).unwrap().is_empty());

        db.delete_candidate(sharer).unwrap();
        assert!(db.get_work_experience(we).unwrap().is_some());
        assert_eq!(db.linked_work_experiences(owner).unwrap().len(), 1);

        let third = db.create_candidate(&details("Grace", "Hopper")).unwrap();
        db.link_work_experience(third, we).unwrap();
        db.delete_candidate(owner).unwrap();
        assert!(db.get_work_experience(we).unwrap().is_none());
        assert!(db.linked_work_experiences(third).unwrap().is_empty());
    }

    #[test]
    fn reference_links_and_unlinks() {
        let db = setup();
        let a = db.create_candidate(&details("Ada", "Lovelace")).unwrap();
        let b = db.create_candidate(&details("Alan", "Turing")).unwrap();
        let r = db.create_reference(&reference(a, "Charles")).unwrap();

        db.link_reference(b, r).unwrap();
        assert_eq!(db.linked_references(b).unwrap()[0].name, "Charles");
        assert!(db.unlink_reference(b, r).unwrap());
        assert!(!db.unlink_reference(b, r).unwrap());
        assert!(db.linked_references(b).unwrap().is_empty());
        assert!(matches!(
            db.link_reference(b, r + 99),
            Err(SchemaError::ForeignKeyViolation { .. })
        ));
    }

    #[test]
    fn work_experience_and_reference_updates() {
        let db = setup();
        let a = db.create_candidate(&details("Ada", "Lovelace")).unwrap();
        let we = db.create_work_experience(&experience(a, "Initech")).unwrap();
        let mut changed = experience(a, "Initrode");
        changed.end_date = None;
        db.update_work_experience(we, &changed).unwrap();
        let stored = db.get_work_experience(we).unwrap().unwrap();
        assert_eq!(stored.to_string(), "Engineer at Initrode");
        assert_eq!(stored.end_date, None);

        let r = db.create_reference(&reference(a, "Charles")).unwrap();
        let mut changed = reference(a, "Charles Babbage");
        changed.email = "bad".to_string();
        assert!(db.update_reference(r, &changed).is_err());
        changed.email = "cb@example.com".to_string();
        db.update_reference(r, &changed).unwrap();
        assert_eq!(db.list_references_for(a).unwrap()[0].email, "cb@example.com");

        db.delete_reference(r).unwrap();
        assert!(matches!(
            db.delete_reference(r),
            Err(SchemaError::NotFound { entity: "Reference", .. })
        ));
    }

    #[test]
    fn list_candidates_filters() {
        let db = setup();
        let school = db.create_school("State University").unwrap();

        let mut ada = details("Ada", "Lovelace");
        ada.school_id = Some(school);
        ada.job_type = JobType::Remote;
        db.create_candidate(&ada).unwrap();
        db.create_candidate(&details("Alan", "Turing")).unwrap();

        let all = db.list_candidates(&CandidateFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].details.last_name, "Lovelace");

        let remote = db
            .list_candidates(&CandidateFilter {
                job_type: Some(JobType::Remote),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(remote.len(), 1);

        let by_school_and_name = db
            .list_candidates(&CandidateFilter {
                school_id: Some(school),
                name: Some("LOVE".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_school_and_name.len(), 1);

        let none = db
            .list_candidates(&CandidateFilter {
                name: Some("hopper".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn name_filter_matches_accents_and_literal_wildcards() {
        let db = setup();
        db.create_candidate(&details("Émile", "Zola")).unwrap();
        db.create_candidate(&details("Bob", "Smith")).unwrap();
        db.create_candidate(&details("Jo_Ann", "100%")).unwrap();

        let by_name = |name: &str| {
            db.list_candidates(&CandidateFilter {
                name: Some(name.to_string()),
                ..Default::default()
            })
            .unwrap()
        };

        let emile = by_name("Émile");
        assert_eq!(emile.len(), 1);
        assert_eq!(emile[0].details.last_name, "Zola");
        assert_eq!(by_name("zola").len(), 1);

        let underscore = by_name("_");
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].details.first_name, "Jo_Ann");

        let percent = by_name("%");
        assert_eq!(percent.len(), 1);
        assert_eq!(percent[0].details.last_name, "100%");

        assert!(by_name("\\").is_empty());
    }

    #[test]
    fn updating_missing_candidate_is_not_found() {
        let db = setup();
        assert!(matches!(
            db.update_candidate(9, &details("Ada", "Lovelace")),
            Err(SchemaError::NotFound { entity: "Candidate", id: 9 })
        ));
        assert!(matches!(
            db.set_tracking(9, &TrackingUpdate::default()),
            Err(SchemaError::NotFound { .. })
        ));
        assert!(matches!(db.delete_candidate(9), Err(SchemaError::NotFound { .. })));
    }
}
