use rusqlite::ffi;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("{table} already has an entry '{value}'")]
    UniqueViolation { table: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    #[error("Invalid value '{value}' for {field}")]
    InvalidChoice { field: &'static str, value: String },

    #[error("Invalid decimal '{value}' for {field}: {reason}")]
    InvalidDecimal {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("{entity} #{id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Database not initialized. Run 'skills-mapped init' first.")]
    NotInitialized,

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchemaError>;

impl SchemaError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Attach the offending value to a unique violation; other errors pass through.
    pub fn with_value(self, value: &str) -> Self {
        match self {
            Self::UniqueViolation { table, .. } => Self::UniqueViolation {
                table,
                value: value.to_string(),
            },
            other => other,
        }
    }

    /// True for errors the storage engine raised while enforcing a constraint.
    pub fn is_constraint(&self) -> bool {
        matches!(
            self,
            Self::UniqueViolation { .. } | Self::ForeignKeyViolation { .. } | Self::CheckViolation { .. }
        )
    }
}

impl From<rusqlite::Error> for SchemaError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &err {
            let message = message.clone().unwrap_or_else(|| failure.to_string());
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    let columns = message.trim_start_matches("UNIQUE constraint failed: ");
                    let table = columns.split('.').next().unwrap_or(columns).to_string();
                    return Self::UniqueViolation {
                        table,
                        value: String::new(),
                    };
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return Self::ForeignKeyViolation { message },
                ffi::SQLITE_CONSTRAINT_CHECK
                | ffi::SQLITE_CONSTRAINT_NOTNULL
                | ffi::SQLITE_CONSTRAINT_TRIGGER => return Self::CheckViolation { message },
                _ => {}
            }
        }
        Self::Sqlite(err)
    }
}
