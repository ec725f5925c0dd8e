use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use skills_mapped::config::Config;
use skills_mapped::decimal::{Money, Rating};
use skills_mapped::models::{
    AccreditedSchool, Candidate, CandidateDetails, CandidateFilter, JobType, NewReference, NewWorkExperience,
    TrackingUpdate,
};
use skills_mapped::{logging, tui, Database};

#[derive(Parser)]
#[command(name = "skills-mapped")]
#[command(about = "Candidate tracking - schools, work history, references, offers and reviews")]
struct Cli {
    /// Database file (defaults to $SKILLS_MAPPED_DB, then the user data dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Manage accredited schools
    School {
        #[command(subcommand)]
        command: SchoolCommands,
    },

    /// Manage candidates
    Candidate {
        #[command(subcommand)]
        command: CandidateCommands,
    },

    /// Manage work experiences
    Experience {
        #[command(subcommand)]
        command: ExperienceCommands,
    },

    /// Manage references
    Reference {
        #[command(subcommand)]
        command: ReferenceCommands,
    },
}

#[derive(Subcommand)]
enum SchoolCommands {
    /// Add an accredited school
    Add {
        /// School name (must be unique)
        name: String,
    },

    /// List accredited schools
    List,

    /// Show a school and its candidates
    Show {
        /// School name or ID
        school: String,
    },

    /// Rename a school
    Rename {
        /// School name or ID
        school: String,

        /// New name
        new_name: String,
    },

    /// Remove a school (candidates keep their record, without a school)
    Remove {
        /// School name or ID
        school: String,
    },
}

#[derive(Subcommand)]
enum CandidateCommands {
    /// Add a candidate from a JSON file
    Add {
        /// Path to candidate JSON
        file: PathBuf,

        /// Accredited school name or ID (overrides school_id in the file)
        #[arg(short, long)]
        school: Option<String>,
    },

    /// List candidates
    List {
        /// Filter by job type (Full-time, Part-time, Contract, Internship, Remote, Other)
        #[arg(short, long)]
        job_type: Option<JobType>,

        /// Filter by accredited school name or ID
        #[arg(short, long)]
        school: Option<String>,

        /// Filter by part of the first or last name
        #[arg(short, long)]
        name: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show candidate details
    Show {
        /// Candidate ID
        id: i64,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Replace a candidate's details from a JSON file
    Update {
        /// Candidate ID
        id: i64,

        /// Path to candidate JSON
        file: PathBuf,
    },

    /// Remove a candidate with their work experiences and references
    Remove {
        /// Candidate ID
        id: i64,
    },

    /// Set document tracking flags
    Track {
        /// Candidate ID
        id: i64,

        #[arg(long)]
        resume_received: Option<bool>,

        #[arg(long)]
        references_checked: Option<bool>,

        #[arg(long)]
        background_check_completed: Option<bool>,

        #[arg(long)]
        data_processing_consent: Option<bool>,

        #[arg(long)]
        relocation_willingness: Option<bool>,
    },

    /// Record offer details
    Offer {
        /// Candidate ID
        id: i64,

        /// Offered salary, up to 8 whole digits and 2 decimals
        #[arg(long)]
        salary: Option<String>,

        #[arg(long)]
        start_date: Option<NaiveDate>,

        #[arg(long)]
        benefits: Option<String>,
    },

    /// Record a performance review
    Review {
        /// Candidate ID
        id: i64,

        /// Rating, one whole digit and up to 2 decimals (e.g. 4.25)
        #[arg(long)]
        rating: Option<String>,

        #[arg(long)]
        comments: Option<String>,

        #[arg(long)]
        goals: Option<String>,
    },

    /// Browse candidates interactively
    Browse {
        #[arg(short, long)]
        job_type: Option<JobType>,

        #[arg(short, long)]
        school: Option<String>,
    },
}

#[derive(Subcommand)]
enum ExperienceCommands {
    /// Add a work experience owned by a candidate
    Add {
        /// Owning candidate ID
        candidate_id: i64,

        #[arg(long)]
        company: String,

        #[arg(long)]
        title: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// End date (YYYY-MM-DD), omit for a current position
        #[arg(long)]
        end: Option<NaiveDate>,

        #[arg(short, long)]
        description: String,
    },

    /// List a candidate's work experiences
    List {
        /// Candidate ID
        candidate_id: i64,

        /// Show linked experiences instead of owned ones
        #[arg(long)]
        linked: bool,
    },

    /// Remove a work experience
    Remove {
        /// Work experience ID
        id: i64,
    },

    /// Link a work experience to a candidate
    Link { candidate_id: i64, id: i64 },

    /// Unlink a work experience from a candidate
    Unlink { candidate_id: i64, id: i64 },
}

#[derive(Subcommand)]
enum ReferenceCommands {
    /// Add a reference owned by a candidate
    Add {
        /// Owning candidate ID
        candidate_id: i64,

        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        phone: String,
    },

    /// List a candidate's references
    List {
        /// Candidate ID
        candidate_id: i64,

        /// Show linked references instead of owned ones
        #[arg(long)]
        linked: bool,
    },

    /// Remove a reference
    Remove {
        /// Reference ID
        id: i64,
    },

    /// Link a reference to a candidate
    Link { candidate_id: i64, id: i64 },

    /// Unlink a reference from a candidate
    Unlink { candidate_id: i64, id: i64 },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.db, cli.verbose);
    logging::init(config.verbose);

    let db = Database::open(&config.db_path)
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;

    match cli.command {
        Commands::Init => {
            db.init()?;
            println!("Database initialized at {}", config.db_path.display());
        }

        Commands::School { command } => {
            db.ensure_initialized()?;
            run_school(&db, command)?;
        }

        Commands::Candidate { command } => {
            db.ensure_initialized()?;
            run_candidate(&db, command)?;
        }

        Commands::Experience { command } => {
            db.ensure_initialized()?;
            run_experience(&db, command)?;
        }

        Commands::Reference { command } => {
            db.ensure_initialized()?;
            run_reference(&db, command)?;
        }
    }

    Ok(())
}

fn run_school(db: &Database, command: SchoolCommands) -> Result<()> {
    match command {
        SchoolCommands::Add { name } => {
            let id = db.create_school(&name)?;
            println!("Added school '{}' (ID: {})", name, id);
        }

        SchoolCommands::List => {
            let schools = db.list_schools()?;
            if schools.is_empty() {
                println!("No schools found.");
            } else {
                println!("{:<6} {:<40}", "ID", "NAME");
                println!("{}", "-".repeat(46));
                for school in schools {
                    println!("{:<6} {:<40}", school.id, truncate(&school.name, 38));
                }
            }
        }

        SchoolCommands::Show { school } => {
            let school = resolve_school(db, &school)?;
            println!("School #{}", school.id);
            println!("Name: {}", school);
            let candidates = db.list_candidates(&CandidateFilter {
                school_id: Some(school.id),
                ..Default::default()
            })?;
            if !candidates.is_empty() {
                println!("\nCandidates ({}):", candidates.len());
                for c in candidates {
                    println!("  #{} - {} ({})", c.id, c, c.details.degree);
                }
            }
        }

        SchoolCommands::Rename { school, new_name } => {
            let school = resolve_school(db, &school)?;
            db.rename_school(school.id, &new_name)?;
            println!("Renamed '{}' to '{}'.", school, new_name);
        }

        SchoolCommands::Remove { school } => {
            let school = resolve_school(db, &school)?;
            db.delete_school(school.id)?;
            println!("Removed school '{}'.", school);
        }
    }
    Ok(())
}

fn run_candidate(db: &Database, command: CandidateCommands) -> Result<()> {
    match command {
        CandidateCommands::Add { file, school } => {
            let mut details = read_details(&file)?;
            if let Some(school) = school {
                details.school_id = Some(resolve_school(db, &school)?.id);
            }
            let id = db.create_candidate(&details)?;
            println!("Added candidate #{} ({})", id, details.full_name());
        }

        CandidateCommands::List {
            job_type,
            school,
            name,
            json,
        } => {
            let school_id = match school {
                Some(s) => Some(resolve_school(db, &s)?.id),
                None => None,
            };
            let candidates = db.list_candidates(&CandidateFilter {
                job_type,
                school_id,
                name,
            })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&candidates)?);
            } else if candidates.is_empty() {
                println!("No candidates found.");
            } else {
                println!(
                    "{:<6} {:<24} {:<12} {:<28} {:<8}",
                    "ID", "NAME", "JOB TYPE", "EMAIL", "DOCS"
                );
                println!("{}", "-".repeat(80));
                for c in candidates {
                    println!(
                        "{:<6} {:<24} {:<12} {:<28} {:<8}",
                        c.id,
                        truncate(&c.to_string(), 22),
                        c.details.job_type,
                        truncate(&c.details.email, 26),
                        docs_summary(&c)
                    );
                }
            }
        }

        CandidateCommands::Show { id, json } => {
            let candidate = db
                .get_candidate(id)?
                .ok_or_else(|| anyhow!("Candidate #{} not found", id))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&candidate)?);
            } else {
                print_candidate(db, &candidate)?;
            }
        }

        CandidateCommands::Update { id, file } => {
            let details = read_details(&file)?;
            db.update_candidate(id, &details)?;
            println!("Updated candidate #{}.", id);
        }

        CandidateCommands::Remove { id } => {
            db.delete_candidate(id)?;
            println!("Removed candidate #{}.", id);
        }

        CandidateCommands::Track {
            id,
            resume_received,
            references_checked,
            background_check_completed,
            data_processing_consent,
            relocation_willingness,
        } => {
            let update = TrackingUpdate {
                resume_received,
                references_checked,
                background_check_completed,
                data_processing_consent,
                relocation_willingness,
            };
            if update.is_empty() {
                println!("No flags specified. Use --resume-received, --references-checked, ...");
                return Ok(());
            }
            db.set_tracking(id, &update)?;
            println!("Updated tracking for candidate #{}.", id);
        }

        CandidateCommands::Offer {
            id,
            salary,
            start_date,
            benefits,
        } => {
            let mut candidate = db
                .get_candidate(id)?
                .ok_or_else(|| anyhow!("Candidate #{} not found", id))?;
            if let Some(raw) = salary {
                candidate.details.offer_salary = Some(Money::parse_field("offer_salary", &raw)?);
            }
            if start_date.is_some() {
                candidate.details.offer_start_date = start_date;
            }
            if benefits.is_some() {
                candidate.details.offer_benefits = benefits;
            }
            db.update_candidate(id, &candidate.details)?;
            println!("Recorded offer for candidate #{}.", id);
        }

        CandidateCommands::Review {
            id,
            rating,
            comments,
            goals,
        } => {
            let mut candidate = db
                .get_candidate(id)?
                .ok_or_else(|| anyhow!("Candidate #{} not found", id))?;
            if let Some(raw) = rating {
                candidate.details.performance_review_rating =
                    Some(Rating::parse_field("performance_review_rating", &raw)?);
            }
            if comments.is_some() {
                candidate.details.performance_review_comments = comments;
            }
            if goals.is_some() {
                candidate.details.performance_review_goals = goals;
            }
            db.update_candidate(id, &candidate.details)?;
            println!("Recorded review for candidate #{}.", id);
        }

        CandidateCommands::Browse { job_type, school } => {
            let school_id = match school {
                Some(s) => Some(resolve_school(db, &s)?.id),
                None => None,
            };
            tui::run_browse(
                db,
                &CandidateFilter {
                    job_type,
                    school_id,
                    name: None,
                },
            )?;
        }
    }
    Ok(())
}

fn run_experience(db: &Database, command: ExperienceCommands) -> Result<()> {
    match command {
        ExperienceCommands::Add {
            candidate_id,
            company,
            title,
            start,
            end,
            description,
        } => {
            let new = NewWorkExperience {
                candidate_id,
                company_name: company,
                job_title: title,
                start_date: start,
                end_date: end,
                description,
            };
            let id = db.create_work_experience(&new)?;
            println!("Added work experience #{} for candidate #{}", id, candidate_id);
        }

        ExperienceCommands::List { candidate_id, linked } => {
            let experiences = if linked {
                db.linked_work_experiences(candidate_id)?
            } else {
                db.list_work_experiences_for(candidate_id)?
            };
            if experiences.is_empty() {
                println!("No work experiences found for candidate #{}.", candidate_id);
            } else {
                println!("{:<6} {:<40} {:<12} {:<12}", "ID", "POSITION", "START", "END");
                println!("{}", "-".repeat(72));
                for we in experiences {
                    println!(
                        "{:<6} {:<40} {:<12} {:<12}",
                        we.id,
                        truncate(&we.to_string(), 38),
                        we.start_date,
                        we.end_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
                    );
                }
            }
        }

        ExperienceCommands::Remove { id } => {
            db.delete_work_experience(id)?;
            println!("Removed work experience #{}.", id);
        }

        ExperienceCommands::Link { candidate_id, id } => {
            if db.link_work_experience(candidate_id, id)? {
                println!("Linked work experience #{} to candidate #{}.", id, candidate_id);
            } else {
                println!("Work experience #{} is already linked to candidate #{}.", id, candidate_id);
            }
        }

        ExperienceCommands::Unlink { candidate_id, id } => {
            if db.unlink_work_experience(candidate_id, id)? {
                println!("Unlinked work experience #{} from candidate #{}.", id, candidate_id);
            } else {
                println!("Work experience #{} was not linked to candidate #{}.", id, candidate_id);
            }
        }
    }
    Ok(())
}

fn run_reference(db: &Database, command: ReferenceCommands) -> Result<()> {
    match command {
        ReferenceCommands::Add {
            candidate_id,
            name,
            email,
            phone,
        } => {
            let new = NewReference {
                candidate_id,
                name,
                email,
                phone_number: phone,
            };
            let id = db.create_reference(&new)?;
            println!("Added reference #{} for candidate #{}", id, candidate_id);
        }

        ReferenceCommands::List { candidate_id, linked } => {
            let references = if linked {
                db.linked_references(candidate_id)?
            } else {
                db.list_references_for(candidate_id)?
            };
            if references.is_empty() {
                println!("No references found for candidate #{}.", candidate_id);
            } else {
                println!("{:<6} {:<24} {:<30} {:<16}", "ID", "NAME", "EMAIL", "PHONE");
                println!("{}", "-".repeat(76));
                for r in references {
                    println!(
                        "{:<6} {:<24} {:<30} {:<16}",
                        r.id,
                        truncate(&r.name, 22),
                        truncate(&r.email, 28),
                        r.phone_number
                    );
                }
            }
        }

        ReferenceCommands::Remove { id } => {
            db.delete_reference(id)?;
            println!("Removed reference #{}.", id);
        }

        ReferenceCommands::Link { candidate_id, id } => {
            if db.link_reference(candidate_id, id)? {
                println!("Linked reference #{} to candidate #{}.", id, candidate_id);
            } else {
                println!("Reference #{} is already linked to candidate #{}.", id, candidate_id);
            }
        }

        ReferenceCommands::Unlink { candidate_id, id } => {
            if db.unlink_reference(candidate_id, id)? {
                println!("Unlinked reference #{} from candidate #{}.", id, candidate_id);
            } else {
                println!("Reference #{} was not linked to candidate #{}.", id, candidate_id);
            }
        }
    }
    Ok(())
}

fn read_details(file: &Path) -> Result<CandidateDetails> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read candidate file: {}", file.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid candidate JSON in {}", file.display()))
}

fn resolve_school(db: &Database, school: &str) -> Result<AccreditedSchool> {
    let found = if let Ok(id) = school.parse::<i64>() {
        db.get_school(id)?
    } else {
        db.get_school_by_name(school)?
    };
    found.ok_or_else(|| anyhow!("School '{}' not found", school))
}

fn docs_summary(c: &Candidate) -> String {
    let flag = |set: bool, ch: char| if set { ch } else { '-' };
    [
        flag(c.details.resume_received, 'R'),
        flag(c.details.references_checked, 'C'),
        flag(c.details.background_check_completed, 'B'),
        flag(c.details.data_processing_consent, 'P'),
    ]
    .iter()
    .collect()
}

fn print_candidate(db: &Database, c: &Candidate) -> Result<()> {
    let d = &c.details;
    println!("Candidate #{}", c.id);
    println!("Name: {}", c);
    println!("Email: {} ({} preferred)", d.email, d.preferred_contact_method);
    if let Some(phone) = &d.phone_number {
        println!("Phone: {}", phone);
    }
    println!("Address: {}, {}, {} {}, {}", d.address, d.city, d.state, d.zip_code, d.country);

    let school = match d.school_id {
        Some(id) => db.get_school(id)?.map(|s| s.name),
        None => None,
    };
    println!(
        "Education: {} in {} ({}){}",
        d.education_level,
        d.degree,
        d.graduation_year,
        school.map(|s| format!(", {}", s)).unwrap_or_default()
    );
    println!("Job type: {}", d.job_type);
    println!("Preferences: {} / {}", d.area_preference, d.industry_preference);
    if let Some(salary) = &d.salary_expectation {
        println!("Salary expectation: {}", salary);
    }
    match d.available_end_date {
        Some(end) => println!("Available: {} to {}", d.available_start_date, end),
        None => println!("Available: from {}", d.available_start_date),
    }
    println!("Documents: {}", docs_summary(c));
    if let Some(salary) = &d.offer_salary {
        println!("Offer salary: {}", salary);
    }
    if let Some(rating) = &d.performance_review_rating {
        println!("Performance rating: {}", rating);
    }
    println!("Created: {}", c.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Updated: {}", c.updated_at.format("%Y-%m-%d %H:%M:%S"));

    println!("\n--- Skills ---\n{}", d.skills);

    let owned = db.list_work_experiences_for(c.id)?;
    let linked = db.linked_work_experiences(c.id)?;
    if !owned.is_empty() || !linked.is_empty() {
        println!("\nWork experiences:");
        for we in &owned {
            println!("  #{} - {}", we.id, we);
        }
        for we in linked.iter().filter(|w| w.candidate_id != c.id) {
            println!("  #{} - {} (linked)", we.id, we);
        }
    }

    let owned = db.list_references_for(c.id)?;
    let linked = db.linked_references(c.id)?;
    if !owned.is_empty() || !linked.is_empty() {
        println!("\nReferences:");
        for r in &owned {
            println!("  #{} - {} <{}>", r.id, r, r.email);
        }
        for r in linked.iter().filter(|r| r.candidate_id != c.id) {
            println!("  #{} - {} <{}> (linked)", r.id, r, r.email);
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
